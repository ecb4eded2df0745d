//! Cross-channel phase statistics relative to a reference channel.
//!
//! The cycles of the rhythm are delimited by the median spike times of consecutive reference bursts.
//! Every channel contributes at most one burst per cycle, which is timed relative to the cycle start and normalized by the cycle period.
use serde::{Deserialize, Serialize};

use crate::burst::{BurstTimes, ChannelBursts};
use crate::error::BurstError;
use crate::utils::Summary;

/// Bursts of several channels, aligned on the cycles of a reference channel.
/// Missing bursts are `None`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BurstTable {
    /// The index of the reference channel.
    pub reference: usize,
    pub names: Vec<String>,
    /// The start of each cycle, i.e., the median spike time of the reference burst.
    pub cycle_starts: Vec<f64>,
    pub periods: Vec<f64>,
    /// One row per channel, one entry per cycle.
    pub rows: Vec<Vec<Option<BurstTimes>>>,
}

impl BurstTable {
    /// Align the bursts of every channel on the cycles of the reference channel.
    ///
    /// Cycle `k` spans from the median of the `k`-th reference burst (included) to the median of the next one (excluded).
    /// A channel is assigned the first of its bursts whose median falls within the cycle.
    /// The function returns an error if the reference has fewer than two bursts.
    pub fn align(channels: &[ChannelBursts], reference: usize) -> Result<Self, BurstError> {
        let ref_channel = channels.get(reference).ok_or_else(|| {
            BurstError::InvalidChannel(format!(
                "reference {} out of {} channels",
                reference,
                channels.len()
            ))
        })?;

        if ref_channel.times.len() < 2 {
            return Err(BurstError::InsufficientBursts(format!(
                "the reference channel {} has {} burst(s), at least 2 are needed to define a cycle",
                ref_channel.name,
                ref_channel.times.len()
            )));
        }

        let medians: Vec<f64> = ref_channel.times.iter().map(|b| b.median).collect();
        let cycle_starts = medians[..medians.len() - 1].to_vec();
        let periods: Vec<f64> = medians.windows(2).map(|ts| ts[1] - ts[0]).collect();

        let rows = channels
            .iter()
            .map(|channel| align_channel(&channel.times, &medians))
            .collect();

        Ok(BurstTable {
            reference,
            names: channels.iter().map(|c| c.name.clone()).collect(),
            cycle_starts,
            periods,
            rows,
        })
    }

    pub fn num_cycles(&self) -> usize {
        self.periods.len()
    }

    pub fn num_channels(&self) -> usize {
        self.rows.len()
    }

    /// The name of the reference channel, empty if the table does not hold it.
    pub fn reference_name(&self) -> &str {
        self.names
            .get(self.reference)
            .map(|name| name.as_str())
            .unwrap_or("")
    }

    /// Returns the cycle containing the given time, if any.
    pub fn cycle_of(&self, time: f64) -> Option<usize> {
        let k = self.cycle_starts.partition_point(|&start| start <= time);
        if k == 0 {
            return None;
        }
        let k = k - 1;
        if time < self.cycle_starts[k] + self.periods[k] {
            Some(k)
        } else {
            None
        }
    }

    /// Compute the phase, duty cycle and period statistics of every channel.
    pub fn stats(&self) -> PhaseStats {
        let channels = self
            .names
            .iter()
            .zip(self.rows.iter())
            .map(|(name, row)| {
                let normalized = |f: fn(&BurstTimes) -> f64| {
                    Summary::from_options(row.iter().enumerate().map(|(k, burst)| {
                        burst.map(|b| (f(&b) - self.cycle_starts[k]) / self.periods[k])
                    }))
                };

                let stats = ChannelStats {
                    name: name.clone(),
                    phase: normalized(|b| b.median),
                    onset_phase: normalized(|b| b.start),
                    offset_phase: normalized(|b| b.end),
                    duty_cycle: Summary::from_options(
                        row.iter()
                            .zip(self.periods.iter())
                            .map(|(burst, period)| burst.map(|b| b.duration() / period)),
                    ),
                    period: Summary::from_options(row.windows(2).map(|bursts| {
                        match (bursts[0], bursts[1]) {
                            (Some(b0), Some(b1)) => Some(b1.median - b0.median),
                            _ => None,
                        }
                    })),
                };
                log::info!(
                    "Channel {}: phase {:.3} +/- {:.3}, duty cycle {:.3} +/- {:.3} over {} cycles",
                    stats.name,
                    stats.phase.mean,
                    stats.phase.std,
                    stats.duty_cycle.mean,
                    stats.duty_cycle.std,
                    stats.phase.count
                );
                stats
            })
            .collect();

        PhaseStats {
            reference: self.reference_name().to_string(),
            num_cycles: self.num_cycles(),
            cycle_period: Summary::from_options(self.periods.iter().map(|&p| Some(p))),
            channels,
        }
    }
}

/// For each cycle delimited by consecutive medians, the first burst whose median lies within it.
fn align_channel(bursts: &[BurstTimes], medians: &[f64]) -> Vec<Option<BurstTimes>> {
    let mut bursts = bursts.iter().peekable();
    medians
        .windows(2)
        .map(|cycle| {
            while bursts.next_if(|b| b.median < cycle[0]).is_some() {}
            let first = bursts.next_if(|b| b.median < cycle[1]).copied();
            while bursts.next_if(|b| b.median < cycle[1]).is_some() {}
            first
        })
        .collect()
}

/// The phase statistics of a channel. Phases and duty cycles are fractions of the cycle period.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub name: String,
    /// Phase of the median spike.
    pub phase: Summary,
    /// Phase of the first spike.
    pub onset_phase: Summary,
    /// Phase of the last spike.
    pub offset_phase: Summary,
    pub duty_cycle: Summary,
    /// Time between the medians of bursts in consecutive cycles.
    pub period: Summary,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PhaseStats {
    pub reference: String,
    pub num_cycles: usize,
    pub cycle_period: Summary,
    pub channels: Vec<ChannelStats>,
}

/// Align the channels on the reference and compute their phase statistics.
pub fn phase_stats(channels: &[ChannelBursts], reference: usize) -> Result<PhaseStats, BurstError> {
    Ok(BurstTable::align(channels, reference)?.stats())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::burst::BurstReport;

    fn burst(start: f64, end: f64) -> BurstTimes {
        BurstTimes {
            start,
            end,
            median: (start + end) / 2.0,
            num_spikes: 3,
        }
    }

    fn channel(name: &str, times: Vec<BurstTimes>) -> ChannelBursts {
        ChannelBursts {
            name: name.to_string(),
            bursts: vec![],
            times,
            report: BurstReport::default(),
        }
    }

    fn pyloric() -> Vec<ChannelBursts> {
        vec![
            channel(
                "PD",
                vec![burst(-0.1, 0.1), burst(0.9, 1.1), burst(1.9, 2.1), burst(3.8, 4.2)],
            ),
            channel(
                "LP",
                vec![
                    burst(-0.6, -0.4), // before the first cycle
                    burst(0.4, 0.6),
                    burst(1.35, 1.55),
                    burst(1.7, 1.8), // second burst in the same cycle
                    burst(2.5, 2.7),
                ],
            ),
            channel("PY", vec![]),
        ]
    }

    #[test]
    fn test_align() {
        let table = BurstTable::align(&pyloric(), 0).unwrap();
        assert_eq!(table.num_cycles(), 3);
        assert_eq!(table.num_channels(), 3);
        assert_eq!(table.cycle_starts, vec![0.0, 1.0, 2.0]);
        assert_eq!(table.periods, vec![1.0, 1.0, 2.0]);

        assert_eq!(
            table.rows[0],
            vec![Some(burst(-0.1, 0.1)), Some(burst(0.9, 1.1)), Some(burst(1.9, 2.1))]
        );
        assert_eq!(
            table.rows[1],
            vec![Some(burst(0.4, 0.6)), Some(burst(1.35, 1.55)), Some(burst(2.5, 2.7))]
        );
        assert_eq!(table.rows[2], vec![None, None, None]);
    }

    #[test]
    fn test_align_errors() {
        let channels = vec![channel("PD", vec![burst(0.0, 0.1)])];
        assert!(matches!(
            BurstTable::align(&channels, 0),
            Err(BurstError::InsufficientBursts(_))
        ));
        assert!(matches!(
            BurstTable::align(&channels, 1),
            Err(BurstError::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_cycle_of() {
        let table = BurstTable::align(&pyloric(), 0).unwrap();
        assert_eq!(table.cycle_of(-0.5), None);
        assert_eq!(table.cycle_of(0.0), Some(0));
        assert_eq!(table.cycle_of(1.5), Some(1));
        assert_eq!(table.cycle_of(3.99), Some(2));
        assert_eq!(table.cycle_of(4.0), None);
    }

    #[test]
    fn test_phase_stats() {
        let stats = phase_stats(&pyloric(), 0).unwrap();
        assert_eq!(stats.reference, "PD");
        assert_eq!(stats.num_cycles, 3);
        assert_relative_eq!(stats.cycle_period.mean, 4.0 / 3.0);

        // the reference leads every cycle
        let pd = &stats.channels[0];
        assert_eq!(pd.phase.mean, 0.0);
        assert_eq!(pd.phase.std, 0.0);
        assert_eq!(pd.phase.count, 3);
        assert_relative_eq!(pd.period.mean, 1.0);

        let lp = &stats.channels[1];
        assert_eq!(lp.phase.count, 3);
        assert_relative_eq!(lp.phase.mean, (0.5 + 0.45 + 0.3) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(lp.onset_phase.mean, (0.4 + 0.35 + 0.25) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(lp.offset_phase.mean, (0.6 + 0.55 + 0.35) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(lp.duty_cycle.mean, (0.2 + 0.2 + 0.1) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(lp.period.mean, (0.95 + 1.15) / 2.0, epsilon = 1e-12);
        assert_relative_eq!(lp.period.std, 0.2 / 2.0_f64.sqrt(), epsilon = 1e-12);

        // a silent channel has no statistics
        let py = &stats.channels[2];
        assert_eq!(py.phase.count, 0);
        assert!(py.phase.mean.is_nan());
        assert!(py.duty_cycle.std.is_nan());
    }

    #[test]
    fn test_reference_out_of_table() {
        let mut table = BurstTable::align(&pyloric(), 0).unwrap();
        assert_eq!(table.reference_name(), "PD");

        table.reference = 10;
        assert_eq!(table.reference_name(), "");
        let stats = table.stats();
        assert_eq!(stats.reference, "");
        assert_eq!(stats.channels.len(), 3);
    }
}
