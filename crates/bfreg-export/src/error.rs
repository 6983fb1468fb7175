//! Export errors.

use std::error::Error;
use std::fmt;

use bfreg_core::ConfigError;

/// A value that cannot be represented in the requested format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportError {
    /// The biased exponent reaches the all-ones field.
    ExponentOverflow {
        /// Biased exponent of the value.
        biased: i64,
        /// Largest finite biased exponent.
        max: i64,
    },
    /// The value is below the smallest subnormal.
    ExponentUnderflow {
        /// Biased exponent of the value.
        biased: i64,
        /// Smallest biased exponent that still encodes.
        min: i64,
    },
    /// A fixed-width format needs a finite precision.
    UnboundedPrecision,
    /// Precision or exponent width out of range.
    Config(ConfigError),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExponentOverflow { biased, max } => {
                write!(f, "exponent overflow: biased exponent {biased} exceeds {max}")
            }
            Self::ExponentUnderflow { biased, min } => {
                write!(f, "exponent underflow: biased exponent {biased} below {min}")
            }
            Self::UnboundedPrecision => {
                write!(f, "cannot encode with unbounded precision")
            }
            Self::Config(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ExportError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
