//! Burst detection in sorted spike trains.
//!
//! A burst is a run of spikes whose consecutive interspike intervals (ISIs) are all at most `max_isi`,
//! separated from the neighbouring spikes by gaps of at least `min_ibi` (the interburst interval).
//! Runs which are not isolated enough, too small, too short or too long are rejected.
//! With trimming, runs cut by the borders of the recording are rejected as well.
use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::BurstError;
use crate::spike_train::{Channel, MultiChannelSpikeTrain};
use crate::utils::median_sorted;
use crate::MIN_PARALLEL_CHANNELS;

/// Parameters of the burst detection.
///
/// # Examples
///
/// ```rust
/// use rusty_bursts::burst::{find_bursts, Burst, BurstParams};
///
/// let times = vec![0.0, 1.0, 1.05, 1.1, 1.15, 2.0, 2.05, 2.1, 3.0];
/// let params = BurstParams::new(0.1).with_min_ibi(0.5);
///
/// let bursts = find_bursts(&times, &params).unwrap();
/// assert_eq!(bursts, vec![Burst { start: 1, end: 4 }, Burst { start: 5, end: 7 }]);
/// ```
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BurstParams {
    /// The largest interspike interval within a burst.
    pub max_isi: f64,
    /// The smallest gap before and after a burst. Defaults to `max_isi`.
    #[serde(default)]
    pub min_ibi: Option<f64>,
    #[serde(default = "default_min_spikes")]
    pub min_spikes: usize,
    #[serde(default)]
    pub min_duration: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
    /// Whether to drop the bursts cut by the borders of the recording.
    #[serde(default = "default_trim")]
    pub trim: bool,
    /// The recording window. Defaults to the first and last spikes.
    #[serde(default)]
    pub window: Option<(f64, f64)>,
}

fn default_min_spikes() -> usize {
    2
}

fn default_max_duration() -> f64 {
    f64::INFINITY
}

fn default_trim() -> bool {
    true
}

impl BurstParams {
    pub fn new(max_isi: f64) -> Self {
        BurstParams {
            max_isi,
            min_ibi: None,
            min_spikes: default_min_spikes(),
            min_duration: 0.0,
            max_duration: default_max_duration(),
            trim: default_trim(),
            window: None,
        }
    }

    pub fn with_min_ibi(mut self, min_ibi: f64) -> Self {
        self.min_ibi = Some(min_ibi);
        self
    }

    pub fn with_min_spikes(mut self, min_spikes: usize) -> Self {
        self.min_spikes = min_spikes;
        self
    }

    pub fn with_duration(mut self, min_duration: f64, max_duration: f64) -> Self {
        self.min_duration = min_duration;
        self.max_duration = max_duration;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.window = Some((start, end));
        self
    }

    /// The effective minimum interburst interval.
    pub fn min_ibi(&self) -> f64 {
        self.min_ibi.unwrap_or(self.max_isi)
    }

    pub fn validate(&self) -> Result<(), BurstError> {
        if !(self.max_isi.is_finite() && self.max_isi > 0.0) {
            return Err(BurstError::InvalidParameter(
                "The maximum ISI must be a positive number".to_string(),
            ));
        }
        if self.min_ibi() < self.max_isi || self.min_ibi().is_nan() {
            return Err(BurstError::InvalidParameter(format!(
                "The minimum IBI ({}) must be at least the maximum ISI ({})",
                self.min_ibi(),
                self.max_isi
            )));
        }
        if !(self.min_duration >= 0.0 && self.max_duration >= self.min_duration) {
            return Err(BurstError::InvalidParameter(format!(
                "Invalid burst duration range [{}, {}]",
                self.min_duration, self.max_duration
            )));
        }
        if let Some((start, end)) = self.window {
            if !(start <= end) {
                return Err(BurstError::InvalidParameter(format!(
                    "Invalid recording window [{}, {}]",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

/// A burst, given by the (inclusive) indices of its first and last spikes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Burst {
    pub start: usize,
    pub end: usize,
}

impl Burst {
    pub fn num_spikes(&self) -> usize {
        self.end - self.start + 1
    }

    /// The time between the first and last spikes of the burst.
    pub fn duration(&self, times: &[f64]) -> f64 {
        times[self.end] - times[self.start]
    }

    /// The onset, offset and median spike times of the burst.
    pub fn times(&self, times: &[f64]) -> BurstTimes {
        BurstTimes {
            start: times[self.start],
            end: times[self.end],
            median: median_sorted(&times[self.start..=self.end]),
            num_spikes: self.num_spikes(),
        }
    }
}

/// The timing of a burst.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct BurstTimes {
    pub start: f64,
    pub end: f64,
    /// The median spike time.
    pub median: f64,
    pub num_spikes: usize,
}

impl BurstTimes {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// The reason why a run of spikes is not a burst.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Rejection {
    /// The run is cut by the border of the recording.
    Boundary,
    /// The run is too close to a neighbouring spike.
    Isolation,
    /// The run has too few spikes.
    Size,
    /// The run is too short or too long.
    Duration,
}

/// Counts of the runs of spikes examined by the burst detection.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BurstReport {
    pub num_runs: usize,
    pub num_bursts: usize,
    pub boundary: usize,
    pub isolation: usize,
    pub size: usize,
    pub duration: usize,
}

impl BurstReport {
    fn record(&mut self, rejection: Option<Rejection>) {
        self.num_runs += 1;
        match rejection {
            None => self.num_bursts += 1,
            Some(Rejection::Boundary) => self.boundary += 1,
            Some(Rejection::Isolation) => self.isolation += 1,
            Some(Rejection::Size) => self.size += 1,
            Some(Rejection::Duration) => self.duration += 1,
        }
    }
}

/// Detect the bursts in a sorted spike train.
/// See [`find_bursts_with_report`] for the counts of rejected runs.
pub fn find_bursts(times: &[f64], params: &BurstParams) -> Result<Vec<Burst>, BurstError> {
    find_bursts_with_report(times, params).map(|(bursts, _)| bursts)
}

/// Detect the bursts in a sorted spike train, in a single pass.
///
/// The train is split into maximal runs of spikes with ISIs at most `max_isi`.
/// Each run is then kept or rejected, checking in order:
/// 1. boundary: with trimming, the gap to the border of the recording window must be at least `min_ibi`;
/// 2. isolation: the gaps to the previous and next spikes must be at least `min_ibi`;
/// 3. size: the run must have at least `min_spikes` spikes;
/// 4. duration: the run must last between `min_duration` and `max_duration`.
///
/// The function returns an error for invalid parameters, non-finite or unsorted times,
/// or a recording window which does not contain all spikes.
pub fn find_bursts_with_report(
    times: &[f64],
    params: &BurstParams,
) -> Result<(Vec<Burst>, BurstReport), BurstError> {
    params.validate()?;
    check_times(times)?;

    let mut bursts = vec![];
    let mut report = BurstReport::default();

    let (first, last) = match (times.first(), times.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Ok((bursts, report)),
    };

    let window = params.window.unwrap_or((first, last));
    if window.0 > first || window.1 < last {
        return Err(BurstError::InvalidParameter(format!(
            "The recording window [{}, {}] does not contain all spikes in [{}, {}]",
            window.0, window.1, first, last
        )));
    }

    let mut start = 0;
    for end in 0..times.len() {
        if end + 1 < times.len() && times[end + 1] - times[end] <= params.max_isi {
            continue;
        }

        let run = Burst { start, end };
        let rejection = check_run(times, &run, window, params);
        match rejection {
            None => bursts.push(run),
            Some(reason) => log::debug!(
                "Run of {} spikes at [{}, {}] rejected: {:?}",
                run.num_spikes(),
                times[run.start],
                times[run.end],
                reason
            ),
        }
        report.record(rejection);
        start = end + 1;
    }

    Ok((bursts, report))
}

fn check_times(times: &[f64]) -> Result<(), BurstError> {
    if let Some(t) = times.iter().find(|t| !t.is_finite()) {
        return Err(BurstError::InvalidFiringTimes(format!(
            "the non-finite time {} cannot be processed",
            t
        )));
    }
    if let Some(ts) = times.windows(2).find(|ts| ts[1] < ts[0]) {
        return Err(BurstError::UnsortedFiringTimes {
            t1: ts[0],
            t2: ts[1],
        });
    }
    Ok(())
}

fn check_run(
    times: &[f64],
    run: &Burst,
    window: (f64, f64),
    params: &BurstParams,
) -> Option<Rejection> {
    let min_ibi = params.min_ibi();
    let last = times.len() - 1;

    // gaps to the previous and next spikes, flagged when they extend to the window border
    let before = match run.start {
        0 => (times[0] - window.0, true),
        i => (times[i] - times[i - 1], false),
    };
    let after = match run.end {
        j if j == last => (window.1 - times[last], true),
        j => (times[j + 1] - times[j], false),
    };

    if params.trim && [before, after].iter().any(|&(gap, edge)| edge && gap < min_ibi) {
        return Some(Rejection::Boundary);
    }

    if [before, after].iter().any(|&(gap, edge)| !edge && gap < min_ibi) {
        return Some(Rejection::Isolation);
    }

    if run.num_spikes() < params.min_spikes {
        return Some(Rejection::Size);
    }

    let duration = run.duration(times);
    if duration < params.min_duration || duration > params.max_duration {
        return Some(Rejection::Duration);
    }

    None
}

/// Burst detection parameters for a multi-channel spike train, with per-channel overrides.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChannelParams {
    pub default: BurstParams,
    #[serde(default)]
    pub overrides: HashMap<String, BurstParams>,
}

impl ChannelParams {
    pub fn new(default: BurstParams) -> Self {
        ChannelParams {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, name: &str, params: BurstParams) -> Self {
        self.overrides.insert(name.to_string(), params);
        self
    }

    /// The parameters to use for the given channel.
    pub fn get(&self, name: &str) -> &BurstParams {
        self.overrides.get(name).unwrap_or(&self.default)
    }
}

/// The bursts detected on a channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChannelBursts {
    pub name: String,
    pub bursts: Vec<Burst>,
    pub times: Vec<BurstTimes>,
    pub report: BurstReport,
}

/// Detect the bursts on every channel of a spike train.
/// Channels are processed in parallel for large recordings.
pub fn detect_all(
    spike_train: &MultiChannelSpikeTrain,
    params: &ChannelParams,
) -> Result<Vec<ChannelBursts>, BurstError> {
    let detect = |channel: &Channel| -> Result<ChannelBursts, BurstError> {
        let (bursts, report) = find_bursts_with_report(&channel.times, params.get(&channel.name))?;
        log::info!(
            "Channel {}: {} bursts found among {} runs",
            channel.name,
            report.num_bursts,
            report.num_runs
        );
        let times = bursts.iter().map(|b| b.times(&channel.times)).collect();
        Ok(ChannelBursts {
            name: channel.name.clone(),
            bursts,
            times,
            report,
        })
    };

    if spike_train.num_channels() >= MIN_PARALLEL_CHANNELS {
        spike_train.channels().par_iter().map(&detect).collect()
    } else {
        spike_train.channels().iter().map(&detect).collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// Three bursts separated by long gaps, the first and last touching the recording borders.
    fn three_bursts() -> Vec<f64> {
        vec![
            0.0, 0.05, 0.1, // cut by the start
            1.0, 1.05, 1.1, 1.15, // complete
            2.0, 2.02, 2.04, // complete
            3.0, 3.05, // cut by the end
        ]
    }

    #[test]
    fn test_params_validation() {
        assert!(BurstParams::new(0.1).validate().is_ok());
        assert!(matches!(
            BurstParams::new(0.0).validate(),
            Err(BurstError::InvalidParameter(_))
        ));
        assert!(matches!(
            BurstParams::new(f64::NAN).validate(),
            Err(BurstError::InvalidParameter(_))
        ));
        assert!(matches!(
            BurstParams::new(0.1).with_min_ibi(0.05).validate(),
            Err(BurstError::InvalidParameter(_))
        ));
        assert!(matches!(
            BurstParams::new(0.1).with_duration(1.0, 0.5).validate(),
            Err(BurstError::InvalidParameter(_))
        ));
        assert!(matches!(
            BurstParams::new(0.1).with_window(5.0, 1.0).validate(),
            Err(BurstError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_min_ibi_defaults_to_max_isi() {
        assert_eq!(BurstParams::new(0.1).min_ibi(), 0.1);
        assert_eq!(BurstParams::new(0.1).with_min_ibi(0.3).min_ibi(), 0.3);

        let params: BurstParams = serde_json::from_str(r#"{"max_isi": 0.2}"#).unwrap();
        assert_eq!(params, BurstParams::new(0.2));
    }

    #[test]
    fn test_find_bursts_empty() {
        let params = BurstParams::new(0.1);
        assert_eq!(find_bursts(&[], &params).unwrap(), vec![]);
        assert_eq!(find_bursts(&[1.0], &params).unwrap(), vec![]);
    }

    #[test]
    fn test_find_bursts_single_spike() {
        let params = BurstParams::new(0.1).with_min_spikes(1);
        assert_eq!(
            find_bursts(&[1.0], &params.clone().with_window(0.0, 2.0)).unwrap(),
            vec![Burst { start: 0, end: 0 }]
        );
        assert_eq!(
            find_bursts(&[1.0], &params.clone().with_trim(false)).unwrap(),
            vec![Burst { start: 0, end: 0 }]
        );
        // too close to the start of the recording
        assert_eq!(
            find_bursts(&[1.0], &params.with_window(0.95, 2.0)).unwrap(),
            vec![]
        );
    }

    #[test]
    fn test_find_bursts_invalid_times() {
        let params = BurstParams::new(0.1);
        assert_eq!(
            find_bursts(&[0.0, 2.0, 1.0], &params),
            Err(BurstError::UnsortedFiringTimes { t1: 2.0, t2: 1.0 })
        );
        assert!(matches!(
            find_bursts(&[0.0, f64::NAN], &params),
            Err(BurstError::InvalidFiringTimes(_))
        ));
        assert!(matches!(
            find_bursts(&[0.0, 1.0], &params.with_window(0.5, 2.0)),
            Err(BurstError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_find_bursts_trims_boundaries() {
        let times = three_bursts();
        let params = BurstParams::new(0.1).with_min_ibi(0.5);

        let (bursts, report) = find_bursts_with_report(&times, &params).unwrap();
        assert_eq!(
            bursts,
            vec![Burst { start: 3, end: 6 }, Burst { start: 7, end: 9 }]
        );
        assert_eq!(
            report,
            BurstReport {
                num_runs: 4,
                num_bursts: 2,
                boundary: 2,
                ..Default::default()
            }
        );

        // without trimming, the border runs are kept
        let bursts = find_bursts(&times, &params.clone().with_trim(false)).unwrap();
        assert_eq!(bursts.len(), 4);
        assert_eq!(bursts[0], Burst { start: 0, end: 2 });
        assert_eq!(bursts[3], Burst { start: 10, end: 11 });

        // a wider recording window makes the border runs complete
        let bursts = find_bursts(&times, &params.with_window(-1.0, 4.0)).unwrap();
        assert_eq!(bursts.len(), 4);
    }

    #[test]
    fn test_find_bursts_isolation() {
        // the runs around the ambiguous gap of 0.3 are rejected
        let times = vec![0.0, 1.0, 1.05, 1.1, 1.4, 1.45, 2.5, 2.55, 3.5];
        let params = BurstParams::new(0.1).with_min_ibi(0.5);

        let (bursts, report) = find_bursts_with_report(&times, &params).unwrap();
        assert_eq!(bursts, vec![Burst { start: 6, end: 7 }]);
        assert_eq!(report.isolation, 2);
        assert_eq!(report.boundary, 2);
    }

    #[test]
    fn test_find_bursts_size_and_duration() {
        let times = vec![0.0, 1.0, 1.08, 2.0, 2.05, 2.1, 2.15, 2.2, 3.0, 4.0];
        let params = BurstParams::new(0.1).with_min_ibi(0.5);

        // the isolated spike at 3.0 is a run of a single spike
        let (bursts, report) = find_bursts_with_report(&times, &params).unwrap();
        assert_eq!(
            bursts,
            vec![Burst { start: 1, end: 2 }, Burst { start: 3, end: 7 }]
        );
        assert_eq!(report.size, 1);

        let bursts = find_bursts(&times, &params.clone().with_min_spikes(3)).unwrap();
        assert_eq!(bursts, vec![Burst { start: 3, end: 7 }]);

        let (bursts, report) =
            find_bursts_with_report(&times, &params.clone().with_duration(0.1, 1.0)).unwrap();
        assert_eq!(bursts, vec![Burst { start: 3, end: 7 }]);
        assert_eq!(report.duration, 1);

        let bursts = find_bursts(&times, &params.clone().with_duration(0.0, 0.1)).unwrap();
        assert_eq!(bursts, vec![Burst { start: 1, end: 2 }]);

        // single-spike bursts are allowed if requested
        let bursts = find_bursts(&times, &params.with_min_spikes(1)).unwrap();
        assert_eq!(bursts.len(), 3);
        assert_eq!(bursts[2], Burst { start: 8, end: 8 });
    }

    #[test]
    fn test_burst_times() {
        let times = vec![0.0, 1.0, 1.1, 1.3, 1.4, 3.0];
        let burst = Burst { start: 1, end: 4 };
        assert_eq!(burst.num_spikes(), 4);
        assert_relative_eq!(burst.duration(&times), 0.4);

        let burst_times = burst.times(&times);
        assert_eq!(burst_times.start, 1.0);
        assert_eq!(burst_times.end, 1.4);
        assert_relative_eq!(burst_times.median, 1.2);
        assert_relative_eq!(burst_times.duration(), 0.4);

        let burst_times = Burst { start: 1, end: 3 }.times(&times);
        assert_eq!(burst_times.median, 1.1);
    }

    #[test]
    fn test_detect_all() {
        let spike_train = MultiChannelSpikeTrain::build_from(vec![
            ("PD", three_bursts()),
            ("LP", vec![0.0, 0.5, 0.52, 0.54, 1.5]),
        ])
        .unwrap();
        let params = ChannelParams::new(BurstParams::new(0.1).with_min_ibi(0.5))
            .with_override("LP", BurstParams::new(0.05).with_min_ibi(0.4));

        let channel_bursts = detect_all(&spike_train, &params).unwrap();
        assert_eq!(channel_bursts.len(), 2);
        assert_eq!(channel_bursts[0].name, "PD");
        assert_eq!(channel_bursts[0].bursts.len(), 2);
        assert_eq!(channel_bursts[1].bursts, vec![Burst { start: 1, end: 3 }]);
        assert_relative_eq!(channel_bursts[1].times[0].median, 0.52);
    }

    #[test]
    fn test_detect_all_parallel() {
        let channels = (0..MIN_PARALLEL_CHANNELS + 1)
            .map(|id| (format!("ch{}", id), three_bursts()))
            .collect();
        let spike_train = MultiChannelSpikeTrain::build_from(channels).unwrap();
        let params = ChannelParams::new(BurstParams::new(0.1).with_min_ibi(0.5));

        let channel_bursts = detect_all(&spike_train, &params).unwrap();
        assert_eq!(channel_bursts.len(), MIN_PARALLEL_CHANNELS + 1);
        assert!(channel_bursts.iter().all(|c| c.bursts.len() == 2));
        assert_eq!(channel_bursts[3].name, "ch3");
    }
}
