use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use habitat_eval::{
    ConfusionMatrix, CrossValidation, FeatureSubset, FoldStrategy, ForwardSelection, Holdout,
    Shuffle, ThresholdSweep,
};
use habitat_explain::ShapleyEstimator;
use habitat_io::{
    CellGrid, CellReader, CvRecord, ExperimentName, MetricsRecord, ResultWriter, SampleReader,
    SampleSet, SelectionRound,
};
use habitat_nb::{
    DEFAULT_VARIANCE_FLOOR, GaussianNaiveBayes, GaussianNbConfig, VariancePolicy,
};

#[derive(Parser)]
#[command(name = "habitat")]
#[command(about = "Gaussian Naive Bayes species distribution modelling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Classifier fitting options.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Lower bound on per-class feature variances
    #[arg(long, default_value_t = DEFAULT_VARIANCE_FLOOR)]
    variance_floor: f64,

    /// Fail on a constant feature within a class instead of flooring its variance
    #[arg(long, default_value_t = false)]
    reject_zero_variance: bool,
}

/// Cross-validation options.
#[derive(Args, Debug, Clone)]
struct CvArgs {
    /// Number of cross-validation folds
    #[arg(long, default_value_t = 5)]
    cv_folds: usize,

    /// Keep the presence/absence ratio in every fold
    #[arg(long, default_value_t = false)]
    stratified: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Holdout split, cross-validate on the training part, fit and save a model
    Evaluate {
        /// Path to the occurrence samples CSV file
        #[arg(long)]
        samples: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Comma-separated feature columns to use (defaults to all)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Fraction of samples used for training; the rest is held out
        #[arg(long, default_value_t = 0.7)]
        holdout: f64,

        /// Decision threshold on P(presence)
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        cv: CvArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Greedy forward selection of covariates by cross-validated MCC
    Select {
        /// Path to the occurrence samples CSV file
        #[arg(long)]
        samples: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Comma-separated feature columns to start from
        #[arg(long, value_delimiter = ',')]
        initial: Vec<String>,

        /// Minimum MCC gain required to accept a feature
        #[arg(long, default_value_t = 0.0)]
        min_improvement: f64,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        cv: CvArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Sweep the decision threshold over out-of-fold probabilities
    Tune {
        /// Path to the occurrence samples CSV file
        #[arg(long)]
        samples: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Comma-separated feature columns to use (defaults to all)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Number of evenly spaced thresholds in [0, 1]
        #[arg(long, default_value_t = 101)]
        steps: usize,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        cv: CvArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Predict a probability surface over raster grid cells
    Predict {
        /// Path to a trained model file
        #[arg(long)]
        model: PathBuf,

        /// Path to the grid cells CSV file
        #[arg(long)]
        cells: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Override the model's decision threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Shapley attributions of grid cell predictions
    Explain {
        /// Path to a trained model file
        #[arg(long)]
        model: PathBuf,

        /// Path to the grid cells CSV file
        #[arg(long)]
        cells: PathBuf,

        /// Samples CSV whose rows serve as the reference pool
        #[arg(long)]
        reference: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Monte-Carlo draws per feature
        #[arg(long, default_value_t = 50)]
        draws: usize,

        /// Explain only the first N cells
        #[arg(long)]
        limit: Option<usize>,

        /// Substitute this value for non-finite model outputs instead of failing
        #[arg(long)]
        non_finite_fill: Option<f64>,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    features: Vec<String>,
    n_train: usize,
    n_holdout: usize,
    cv_mean_mcc: f64,
    cv_std_mcc: f64,
    holdout_mcc: f64,
    holdout_tss: f64,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct SelectOutput {
    experiment: String,
    n_samples: usize,
    selected: Vec<String>,
    best_score: Option<f64>,
    n_rounds: usize,
}

#[derive(Serialize)]
struct TuneOutput {
    experiment: String,
    features: Vec<String>,
    best_threshold: f64,
    best_mcc: f64,
    roc_auc: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_cells: usize,
    n_present: usize,
    threshold: f64,
    model_n_features: usize,
}

#[derive(Serialize)]
struct ExplainOutput {
    experiment: String,
    n_cells: usize,
    n_reference: usize,
    n_draws: usize,
}

fn build_config(args: &ModelArgs, threshold: f64) -> GaussianNbConfig {
    let policy = if args.reject_zero_variance {
        VariancePolicy::Reject
    } else {
        VariancePolicy::Floor(args.variance_floor)
    };
    GaussianNbConfig::new()
        .with_variance_policy(policy)
        .with_threshold(threshold)
}

fn build_cv(args: &CvArgs, seed: u64, threshold: f64) -> Result<CrossValidation> {
    let strategy = if args.stratified {
        FoldStrategy::Stratified
    } else {
        FoldStrategy::Contiguous
    };
    Ok(CrossValidation::new(args.cv_folds)?
        .with_seed(seed)
        .with_strategy(strategy)
        .with_threshold(threshold))
}

/// Resolve column names to a subset; empty means every column.
fn resolve_subset(set: &SampleSet, names: &[String]) -> Result<FeatureSubset> {
    let subset = if names.is_empty() {
        FeatureSubset::all(set.n_features())?
    } else {
        FeatureSubset::new(set.feature_indices(names)?, set.n_features())?
    };
    Ok(subset)
}

fn gather(set: &SampleSet, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<bool>) {
    let features = indices.iter().map(|&i| set.features()[i].clone()).collect();
    let labels = indices.iter().map(|&i| set.labels()[i]).collect();
    (features, labels)
}

fn metrics_record(cm: &ConfusionMatrix) -> MetricsRecord {
    MetricsRecord {
        true_positives: cm.true_positives,
        false_positives: cm.false_positives,
        true_negatives: cm.true_negatives,
        false_negatives: cm.false_negatives,
        tpr: cm.tpr(),
        tnr: cm.tnr(),
        fpr: cm.fpr(),
        fnr: cm.fnr(),
        precision: cm.precision(),
        accuracy: cm.accuracy(),
        f1: cm.f1(),
        tss: cm.tss(),
        mcc: cm.mcc(),
    }
}

fn read_samples(path: &Path) -> Result<SampleSet> {
    SampleReader::new(path)
        .read()
        .context("failed to read samples CSV")
}

/// Load a model and the grid cells aligned to its feature order.
fn load_model_and_cells(model: &Path, cells: &Path) -> Result<(GaussianNaiveBayes, CellGrid)> {
    let model = GaussianNaiveBayes::load(model).context("failed to load model")?;
    info!(
        n_features = model.n_features(),
        threshold = model.threshold(),
        "model loaded"
    );
    let grid = CellReader::new(cells)
        .read()
        .context("failed to read cells CSV")?
        .select_columns(model.feature_names())
        .context("cells CSV does not match the model's features")?;
    Ok((model, grid))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Evaluate {
            samples,
            experiment,
            features,
            holdout,
            threshold,
            output_dir,
            cv,
            model,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let set = read_samples(&samples)?;
            let subset = resolve_subset(&set, &features)?;
            let names = subset.names(set.feature_names());
            let config = build_config(&model, threshold);

            // 1. Holdout split
            let split = Holdout::new(holdout)?
                .with_shuffle(Shuffle::Seeded(cli.seed))
                .split(set.n_samples())?;
            let (train_x, train_y) = gather(&set, &split.train);
            let (test_x, test_y) = gather(&set, &split.test);
            info!(n_train = train_x.len(), n_holdout = test_x.len(), "holdout split");

            // 2. Cross-validate on the training part
            let cross_validation = build_cv(&cv, cli.seed, threshold)?;
            let cv_result = cross_validation
                .evaluate(&config, &train_x, &train_y, &subset)
                .context("cross-validation failed")?;

            // 3. Fit on the full training part and score the holdout
            let nb = config
                .fit(&subset.project_all(&train_x), &train_y, &names)
                .context("training failed")?;
            let probabilities = nb.predict_proba_batch(&subset.project_all(&test_x))?;
            let holdout_cm = ConfusionMatrix::from_probabilities(&probabilities, &test_y, threshold)?;
            info!(mcc = holdout_cm.mcc(), tss = holdout_cm.tss(), "holdout scored");

            // 4. Write artifacts
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let cv_record = CvRecord {
                n_folds: cross_validation.n_folds(),
                mean_mcc: cv_result.mean_mcc,
                std_mcc: cv_result.std_mcc,
                fold_mcc: cv_result.folds.iter().map(|f| f.mcc).collect(),
                pooled: metrics_record(&cv_result.pooled),
            };
            writer.write_evaluation(
                &names,
                threshold,
                train_x.len(),
                test_x.len(),
                &metrics_record(&holdout_cm),
                &cv_record,
            )?;
            let model_path = writer.model_path();
            nb.save(&model_path).context("failed to save model")?;

            let output = EvaluateOutput {
                experiment,
                features: names,
                n_train: train_x.len(),
                n_holdout: test_x.len(),
                cv_mean_mcc: cv_result.mean_mcc,
                cv_std_mcc: cv_result.std_mcc,
                holdout_mcc: holdout_cm.mcc(),
                holdout_tss: holdout_cm.tss(),
                model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Select {
            samples,
            experiment,
            initial,
            min_improvement,
            output_dir,
            cv,
            model,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let set = read_samples(&samples)?;
            let initial = set.feature_indices(&initial)?;
            let config = build_config(&model, habitat_nb::DEFAULT_THRESHOLD);

            let result = ForwardSelection::new(build_cv(&cv, cli.seed, config.threshold())?)
                .with_initial(initial)
                .with_min_improvement(min_improvement)
                .run(&config, set.features(), set.labels())
                .context("forward selection failed")?;

            let rounds: Vec<SelectionRound> = result
                .steps
                .iter()
                .map(|step| SelectionRound {
                    feature: step.feature,
                    score: step.score,
                    candidates: step
                        .candidates
                        .iter()
                        .map(|c| (c.feature, c.mean_mcc))
                        .collect(),
                })
                .collect();

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_selection(set.feature_names(), &result.selected, &rounds, result.best_score)?;

            let output = SelectOutput {
                experiment,
                n_samples: set.n_samples(),
                selected: result
                    .selected
                    .iter()
                    .map(|&i| set.feature_names()[i].clone())
                    .collect(),
                best_score: result.best_score.is_finite().then_some(result.best_score),
                n_rounds: result.steps.len(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Tune {
            samples,
            experiment,
            features,
            steps,
            output_dir,
            cv,
            model,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let set = read_samples(&samples)?;
            let subset = resolve_subset(&set, &features)?;
            let config = build_config(&model, habitat_nb::DEFAULT_THRESHOLD);

            let cv_result = build_cv(&cv, cli.seed, config.threshold())?
                .evaluate(&config, set.features(), set.labels(), &subset)
                .context("cross-validation failed")?;
            let sweep = ThresholdSweep::new(steps)?;
            let curve = sweep
                .sweep(&cv_result.out_of_fold, set.labels())
                .context("threshold sweep failed")?;
            let best = curve.best();
            info!(
                n_steps = sweep.n_steps(),
                best_threshold = best.threshold,
                best_mcc = best.mcc,
                "threshold sweep finished"
            );

            let points: Vec<(f64, f64, f64, f64)> = curve
                .points()
                .iter()
                .map(|p| (p.threshold, p.mcc, p.tpr, p.fpr))
                .collect();
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_threshold(&points, best.threshold, best.mcc, curve.roc_auc())?;

            let output = TuneOutput {
                experiment,
                features: subset.names(set.feature_names()),
                best_threshold: best.threshold,
                best_mcc: best.mcc,
                roc_auc: curve.roc_auc(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            cells,
            experiment,
            threshold,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let (mut nb, grid) = load_model_and_cells(&model, &cells)?;
            if let Some(threshold) = threshold {
                nb = nb.with_threshold(threshold)?;
            }

            let probabilities = nb
                .predict_proba_batch(grid.features())
                .context("prediction failed")?;
            let n_present = probabilities.iter().filter(|&&p| p >= nb.threshold()).count();

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(grid.ids(), grid.coords(), &probabilities, nb.threshold())?;

            let output = PredictOutput {
                experiment,
                n_cells: grid.n_cells(),
                n_present,
                threshold: nb.threshold(),
                model_n_features: nb.n_features(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Explain {
            model,
            cells,
            reference,
            experiment,
            draws,
            limit,
            non_finite_fill,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let (nb, mut grid) = load_model_and_cells(&model, &cells)?;
            if let Some(limit) = limit {
                grid = grid.truncate(limit);
            }
            let reference = read_samples(&reference)?
                .select_columns(nb.feature_names())
                .context("reference CSV does not match the model's features")?;

            let estimator = ShapleyEstimator::new(draws)?
                .with_seed(cli.seed)
                .with_non_finite_fill(non_finite_fill);
            let attributions = estimator
                .explain_batch(&nb, grid.features(), reference.features())
                .context("Shapley estimation failed")?;

            let probabilities: Vec<f64> = attributions.iter().map(|a| a.probability).collect();
            let values: Vec<Vec<f64>> = attributions.into_iter().map(|a| a.values).collect();
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_explanations(
                grid.ids(),
                nb.feature_names(),
                &probabilities,
                &values,
                draws,
            )?;

            let output = ExplainOutput {
                experiment,
                n_cells: grid.n_cells(),
                n_reference: reference.n_samples(),
                n_draws: draws,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
