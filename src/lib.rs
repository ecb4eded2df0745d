//! This crate provides tools for analyzing periodic, multi-channel spike trains in Rust,
//! e.g., the rhythmic bursting of a central pattern generator recorded on several nerves.
//!
//! # Detecting Bursts
//!
//! ```rust
//! use rusty_bursts::burst::{find_bursts, BurstParams};
//!
//! // Bursts of spikes at most 0.1 apart, separated by at least 0.5
//! let times = vec![0.0, 1.0, 1.05, 1.1, 2.0, 2.05, 2.1, 3.0];
//! let params = BurstParams::new(0.1).with_min_ibi(0.5);
//!
//! // The isolated spikes at the borders of the recording are not bursts
//! let bursts = find_bursts(&times, &params).unwrap();
//! assert_eq!(bursts.len(), 2);
//! assert_eq!(bursts[1].times(&times).median, 2.05);
//! ```
//!
//! # Computing Phases
//!
//! ```rust
//! use rusty_bursts::burst::{detect_all, BurstParams, ChannelParams};
//! use rusty_bursts::phase::phase_stats;
//! use rusty_bursts::spike_train::{rand_bursting, BurstTemplate, BurstingConfig};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! // Sample a recording where LP fires a burst halfway through every PD cycle
//! let template = |name: &str, phase: f64| BurstTemplate {
//!     name: name.to_string(),
//!     phase,
//!     duty_cycle: 0.2,
//!     spike_rate: 50.0,
//! };
//! let config = BurstingConfig {
//!     templates: vec![template("PD", 0.0), template("LP", 0.5)],
//!     period: 1.0,
//!     num_cycles: 20,
//!     jitter_std: 0.0,
//! };
//! let mut rng = StdRng::seed_from_u64(42);
//! let spike_train = rand_bursting(&config, &mut rng).unwrap();
//!
//! // Detect the bursts and compute the phases relative to PD
//! let params = ChannelParams::new(BurstParams::new(0.05).with_min_ibi(0.3).with_trim(false));
//! let bursts = detect_all(&spike_train, &params).unwrap();
//! let stats = phase_stats(&bursts, 0).unwrap();
//!
//! assert!((stats.channels[1].phase.mean - 0.5).abs() < 1e-6);
//! ```
//!
//! # Plotting
//!
//! Actograms and phase diagrams are rendered to SVG files, see [`plot`].

pub mod burst;
pub mod error;
pub mod phase;
pub mod plot;
pub mod spike_train;
pub mod utils;

/// Minimum number of channels to consider parallel processing.
pub const MIN_PARALLEL_CHANNELS: usize = 100;
