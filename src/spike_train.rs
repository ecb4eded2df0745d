//! Multi-channel spike trains, i.e., the recorded firing times of several channels.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::BurstError;

/// The (sorted) firing times recorded on a named channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// The name of the channel, e.g., the recorded nerve or neuron.
    pub name: String,
    /// The firing times, sorted in increasing order.
    pub times: Vec<f64>,
}

impl Channel {
    /// Create a channel with the specified firing times.
    /// If necessary, the firing times are sorted.
    /// The function returns an error for non-finite firing times.
    pub fn build(name: &str, times: Vec<f64>) -> Result<Self, BurstError> {
        if let Some(t) = times.iter().find(|t| !t.is_finite()) {
            return Err(BurstError::InvalidFiringTimes(format!(
                "channel {} contains the non-finite time {}",
                name, t
            )));
        }

        let mut times = times;
        times.sort_by(|t1, t2| t1.total_cmp(t2));

        Ok(Channel {
            name: name.to_string(),
            times,
        })
    }

    pub fn num_spikes(&self) -> usize {
        self.times.len()
    }
}

/// A multi-channel spike train, i.e., one sorted sequence of firing times per channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MultiChannelSpikeTrain {
    channels: Vec<Channel>,
}

impl MultiChannelSpikeTrain {
    /// Create a multi-channel spike train from a collection of channels.
    /// The function returns an error if two channels share the same name.
    pub fn build(channels: Vec<Channel>) -> Result<Self, BurstError> {
        if let Some(name) = channels.iter().map(|c| &c.name).duplicates().next() {
            return Err(BurstError::InvalidChannel(format!(
                "the name {} is used by several channels",
                name
            )));
        }
        Ok(MultiChannelSpikeTrain { channels })
    }

    /// Create a multi-channel spike train from (name, firing times) pairs.
    pub fn build_from<S: AsRef<str>>(channels: Vec<(S, Vec<f64>)>) -> Result<Self, BurstError> {
        let channels = channels
            .into_iter()
            .map(|(name, times)| Channel::build(name.as_ref(), times))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(channels)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_spikes(&self) -> usize {
        self.channels.iter().map(|c| c.num_spikes()).sum()
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Returns the index of the channel with the given name, if any.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// The first and last firing times over all channels, if any.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.channels
            .iter()
            .filter_map(|c| Some((*c.times.first()?, *c.times.last()?)))
            .reduce(|(min_t, max_t), (first, last)| (min_t.min(first), max_t.max(last)))
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), BurstError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a spike train from a JSON file.
    /// The channels are validated as in [`MultiChannelSpikeTrain::build`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, BurstError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let spike_train: MultiChannelSpikeTrain = serde_json::from_reader(reader)?;
        let channels = spike_train
            .channels
            .into_iter()
            .map(|c| Channel::build(&c.name, c.times))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(channels)
    }
}

/// The bursting pattern of a channel in a synthetic recording.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BurstTemplate {
    pub name: String,
    /// Onset of the burst, as a fraction of the cycle.
    pub phase: f64,
    /// Duration of the burst, as a fraction of the cycle.
    pub duty_cycle: f64,
    /// Number of spikes per unit of time within a burst.
    pub spike_rate: f64,
}

/// Parameters of a synthetic periodic bursting recording.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BurstingConfig {
    pub templates: Vec<BurstTemplate>,
    /// The nominal cycle period.
    pub period: f64,
    pub num_cycles: usize,
    /// Standard deviation of the cycle-to-cycle period and of the burst onsets.
    pub jitter_std: f64,
}

/// Samples a periodic bursting recording.
///
/// Every cycle draws its own period around the nominal one.
/// In each cycle, every channel fires one burst of regularly spaced spikes starting at its phase.
///
/// # Examples
///
/// ```rust
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use rusty_bursts::spike_train::{rand_bursting, BurstTemplate, BurstingConfig};
///
/// let config = BurstingConfig {
///     templates: vec![BurstTemplate { name: "PD".to_string(), phase: 0.0, duty_cycle: 0.3, spike_rate: 20.0 }],
///     period: 1.0,
///     num_cycles: 10,
///     jitter_std: 0.01,
/// };
/// let mut rng = StdRng::seed_from_u64(42);
/// let spike_train = rand_bursting(&config, &mut rng).unwrap();
/// assert_eq!(spike_train.num_channels(), 1);
/// ```
pub fn rand_bursting<R: Rng>(
    config: &BurstingConfig,
    rng: &mut R,
) -> Result<MultiChannelSpikeTrain, BurstError> {
    if config.period <= 0.0 {
        return Err(BurstError::InvalidParameter(
            "Invalid period value: must be positive".to_string(),
        ));
    }

    for template in config.templates.iter() {
        if !(0.0..1.0).contains(&template.phase) {
            return Err(BurstError::InvalidParameter(format!(
                "Invalid phase for channel {}: must be in [0, 1)",
                template.name
            )));
        }
        if template.duty_cycle <= 0.0 || template.duty_cycle >= 1.0 {
            return Err(BurstError::InvalidParameter(format!(
                "Invalid duty cycle for channel {}: must be in (0, 1)",
                template.name
            )));
        }
        if template.spike_rate <= 0.0 {
            return Err(BurstError::InvalidParameter(format!(
                "Invalid spike rate for channel {}: must be positive",
                template.name
            )));
        }
    }

    let jitter = Normal::new(0.0, config.jitter_std)
        .map_err(|e| BurstError::InvalidParameter(e.to_string()))?;

    let mut times: Vec<Vec<f64>> = vec![vec![]; config.templates.len()];
    let mut cycle_start = 0.0;

    for _ in 0..config.num_cycles {
        let period = (config.period + jitter.sample(rng)).max(config.period / 2.0);

        for (template, ctimes) in config.templates.iter().zip_eq(times.iter_mut()) {
            let onset = cycle_start + template.phase * period + jitter.sample(rng);
            let duration = template.duty_cycle * period;
            let num_spikes = ((template.spike_rate * duration).round() as usize).max(2);
            let isi = duration / (num_spikes - 1) as f64;
            ctimes.extend((0..num_spikes).map(|n| onset + n as f64 * isi));
        }

        cycle_start += period;
    }

    let channels = config
        .templates
        .iter()
        .zip_eq(times)
        .map(|(template, ctimes)| Channel::build(&template.name, ctimes))
        .collect::<Result<Vec<_>, _>>()?;

    MultiChannelSpikeTrain::build(channels)
}
