//! File I/O, validation, and serialization for the habitat pipeline.

#![warn(missing_docs)]

mod cell_reader;
mod csv_source;
mod domain;
mod error;
mod sample_reader;
mod writer;

pub use cell_reader::CellReader;
pub use domain::{CellGrid, CellId, ExperimentName, SampleId, SampleSet};
pub use error::IoError;
pub use sample_reader::SampleReader;
pub use writer::{CvRecord, MetricsRecord, ResultWriter, SelectionRound};
