//! Utility functions and types.
use serde::{Deserialize, Serialize};

use crate::spike_train::MultiChannelSpikeTrain;

/// Returns true if `name` contains any of the patterns, ignoring case.
///
/// # Examples
///
/// ```rust
/// use rusty_bursts::utils::or_within;
///
/// assert!(or_within("LP neuron", &["pd", "lp"]));
/// assert!(!or_within("PY", &["pd", "lp"]));
/// assert!(!or_within("PY", &[] as &[&str]));
/// ```
pub fn or_within<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    let name = name.to_lowercase();
    patterns
        .iter()
        .any(|pattern| name.contains(&pattern.as_ref().to_lowercase()))
}

/// Indices of the channels whose name matches any of the patterns (see [`or_within`]).
pub fn select_channels<S: AsRef<str>>(
    spike_train: &MultiChannelSpikeTrain,
    patterns: &[S],
) -> Vec<usize> {
    spike_train
        .iter()
        .enumerate()
        .filter(|(_, channel)| or_within(&channel.name, patterns))
        .map(|(index, _)| index)
        .collect()
}

/// Arithmetic mean, NaN for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (with n-1 normalization).
/// It is 0 for a single value and NaN for an empty sample.
pub fn std(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let mu = mean(values);
            let ss = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>();
            (ss / (n - 1) as f64).sqrt()
        }
    }
}

/// Median of a sorted sample, i.e., the mean of the two middle values for an even count.
/// NaN for an empty sample.
pub fn median_sorted(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Mean, standard deviation and size of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl Summary {
    /// Summarize the available values, skipping missing (`None`) ones.
    pub fn from_options<I: IntoIterator<Item = Option<f64>>>(values: I) -> Self {
        let values: Vec<f64> = values.into_iter().flatten().collect();
        Summary {
            mean: mean(&values),
            std: std(&values),
            count: values.len(),
        }
    }
}
