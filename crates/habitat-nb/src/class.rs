//! Binary class labels.

use std::fmt;

/// One side of a presence/absence problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Class {
    /// The species was recorded at the site.
    Presence,
    /// The site is a recorded absence or a background point.
    Absence,
}

impl Class {
    /// Map a boolean label (`true` = presence) to a class.
    #[must_use]
    pub fn from_label(label: bool) -> Self {
        if label { Self::Presence } else { Self::Absence }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presence => f.write_str("presence"),
            Self::Absence => f.write_str("absence"),
        }
    }
}
