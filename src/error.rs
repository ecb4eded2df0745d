//! Error module for the Rusty Bursts library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum BurstError {
    /// Error for invalid firing times, e.g., NaN or infinite values.
    InvalidFiringTimes(String),
    /// Error for firing times which are not sorted in increasing order.
    UnsortedFiringTimes { t1: f64, t2: f64 },
    /// Error for invalid parameters, e.g., a non-positive period.
    InvalidParameter(String),
    /// Error for invalid channel, e.g., unknown or duplicated name.
    InvalidChannel(String),
    /// Error for channels without enough bursts to define cycles.
    InsufficientBursts(String),
    /// Error while rendering a plot.
    PlotError(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for BurstError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BurstError::InvalidFiringTimes(e) => write!(f, "Invalid firing times: {}", e),
            BurstError::UnsortedFiringTimes { t1, t2 } => {
                write!(f, "Firing times are not sorted: {} comes before {}", t1, t2)
            }
            BurstError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            BurstError::InvalidChannel(e) => write!(f, "Invalid channel: {}", e),
            BurstError::InsufficientBursts(e) => write!(f, "Insufficient bursts: {}", e),
            BurstError::PlotError(e) => write!(f, "Plot error: {}", e),
            BurstError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for BurstError {}

impl From<std::io::Error> for BurstError {
    fn from(e: std::io::Error) -> Self {
        BurstError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for BurstError {
    fn from(e: serde_json::Error) -> Self {
        BurstError::IOError(e.to_string())
    }
}
