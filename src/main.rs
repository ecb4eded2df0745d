use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rusty_bursts::burst::{detect_all, BurstParams, ChannelBursts, ChannelParams};
use rusty_bursts::error::BurstError;
use rusty_bursts::phase::{phase_stats, BurstTable};
use rusty_bursts::plot::actogram::ActogramPlot;
use rusty_bursts::plot::phase_plot::PhasePlot;
use rusty_bursts::spike_train::{rand_bursting, BurstTemplate, BurstingConfig, MultiChannelSpikeTrain};
use rusty_bursts::utils::select_channels;

#[derive(Parser, Debug)]
#[command(about = "Burst detection, phase statistics and actograms of periodic spike trains")]
struct Cli {
    /// Write the log to this file instead of the console
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Log debug messages, e.g., every rejected run of spikes
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the bursts of every channel and print them as JSON
    Bursts(DetectArgs),
    /// Print the phase statistics of every channel relative to a reference
    Stats {
        #[command(flatten)]
        detect: DetectArgs,
        /// Name (or part of the name) of the reference channel
        #[arg(short, long)]
        reference: String,
    },
    /// Render an actogram of the spike times
    Actogram {
        #[command(flatten)]
        detect: DetectArgs,
        /// The output SVG file
        #[arg(short, long)]
        output: PathBuf,
        /// Fold the spike times with a fixed period
        #[arg(short = 'T', long, conflicts_with = "reference")]
        period: Option<f64>,
        /// Start of the first cycle, for a fixed period
        #[arg(long, default_value = "0.0")]
        origin: f64,
        /// Fold the spike times on the cycles of a reference channel
        #[arg(short, long)]
        reference: Option<String>,
        /// Show two consecutive cycles side by side
        #[arg(long)]
        double: bool,
    },
    /// Render a phase diagram of every channel relative to a reference
    Phase {
        #[command(flatten)]
        detect: DetectArgs,
        /// Name (or part of the name) of the reference channel
        #[arg(short, long)]
        reference: String,
        /// The output SVG file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Sample a synthetic triphasic bursting recording
    Sample {
        /// The output JSON file
        #[arg(short, long)]
        output: PathBuf,
        /// The seed used for sampling
        #[arg(long, default_value = "0")]
        seed: u64,
        /// The nominal cycle period
        #[arg(short = 'T', long, default_value = "1.0")]
        period: f64,
        /// The number of cycles
        #[arg(long, default_value = "50")]
        num_cycles: usize,
        /// The standard deviation of the period and burst onsets
        #[arg(long, default_value = "0.02")]
        jitter_std: f64,
    },
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// The recording, a JSON multi-channel spike train
    #[arg(short, long)]
    input: PathBuf,
    /// Burst detection parameters as JSON, overriding the options below
    #[arg(long)]
    params: Option<PathBuf>,
    /// The largest interspike interval within a burst
    #[arg(long, default_value = "0.1")]
    max_isi: f64,
    /// The smallest gap before and after a burst (defaults to the maximum ISI)
    #[arg(long)]
    min_ibi: Option<f64>,
    /// The minimum number of spikes per burst
    #[arg(long, default_value = "2")]
    min_spikes: usize,
    /// The minimum burst duration
    #[arg(long, default_value = "0.0")]
    min_duration: f64,
    /// The maximum burst duration
    #[arg(long, default_value = "inf")]
    max_duration: f64,
    /// Keep the bursts cut by the borders of the recording
    #[arg(long)]
    no_trim: bool,
}

impl DetectArgs {
    fn channel_params(&self) -> Result<ChannelParams, BurstError> {
        if let Some(path) = &self.params {
            let file = std::fs::File::open(path)?;
            return Ok(serde_json::from_reader(std::io::BufReader::new(file))?);
        }

        let mut params = BurstParams::new(self.max_isi)
            .with_min_spikes(self.min_spikes)
            .with_duration(self.min_duration, self.max_duration)
            .with_trim(!self.no_trim);
        params.min_ibi = self.min_ibi;
        Ok(ChannelParams::new(params))
    }

    fn load(&self) -> Result<MultiChannelSpikeTrain, BurstError> {
        let spike_train = MultiChannelSpikeTrain::load_from(&self.input)?;
        log::info!(
            "Loaded {} spikes on {} channels from {}",
            spike_train.num_spikes(),
            spike_train.num_channels(),
            self.input.display()
        );
        Ok(spike_train)
    }

    fn detect(&self, spike_train: &MultiChannelSpikeTrain) -> Result<Vec<ChannelBursts>, BurstError> {
        detect_all(spike_train, &self.channel_params()?)
    }

    fn load_and_detect(&self) -> Result<(MultiChannelSpikeTrain, Vec<ChannelBursts>), BurstError> {
        let spike_train = self.load()?;
        let bursts = self.detect(&spike_train)?;
        Ok((spike_train, bursts))
    }
}

/// The actogram of a recording, either with a fixed period or on the cycles of a reference channel.
/// Bursts are only detected for the latter.
fn actogram_plot(
    detect: &DetectArgs,
    spike_train: &MultiChannelSpikeTrain,
    period: Option<f64>,
    origin: f64,
    reference: Option<&str>,
    double: bool,
) -> Result<ActogramPlot, BurstError> {
    let events = spike_times(spike_train);
    match (period, reference) {
        (Some(period), _) => ActogramPlot::fixed_period(&events, period, origin, double),
        (None, Some(reference)) => {
            let reference = reference_index(spike_train, reference)?;
            let bursts = detect.detect(spike_train)?;
            let table = BurstTable::align(&bursts, reference)?;
            Ok(ActogramPlot::variable_period(&events, &table, double))
        }
        (None, None) => Err(BurstError::InvalidParameter(
            "Either a period or a reference channel is required".to_string(),
        )),
    }
}

fn init_logging(log_file: Option<&Path>, verbose: bool) -> Result<(), BurstError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let encoder = || Box::new(PatternEncoder::new("{l} - {m}\n"));

    let appender = match log_file {
        Some(path) => {
            let logfile = FileAppender::builder()
                .encoder(encoder())
                .build(path)
                .map_err(|e| BurstError::IOError(e.to_string()))?;
            Appender::builder().build("log", Box::new(logfile))
        }
        None => {
            let console = ConsoleAppender::builder()
                .target(log4rs::append::console::Target::Stderr)
                .encoder(encoder())
                .build();
            Appender::builder().build("log", Box::new(console))
        }
    };

    let config = Config::builder()
        .appender(appender)
        .build(Root::builder().appender("log").build(level))
        .map_err(|e| BurstError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| BurstError::IOError(e.to_string()))?;
    Ok(())
}

/// The index of the first channel matching the reference pattern.
fn reference_index(spike_train: &MultiChannelSpikeTrain, pattern: &str) -> Result<usize, BurstError> {
    select_channels(spike_train, &[pattern])
        .first()
        .copied()
        .ok_or_else(|| {
            BurstError::InvalidChannel(format!(
                "no channel matches {} among {:?}",
                pattern,
                spike_train.names()
            ))
        })
}

fn spike_times(spike_train: &MultiChannelSpikeTrain) -> Vec<(String, Vec<f64>)> {
    spike_train
        .iter()
        .map(|c| (c.name.clone(), c.times.clone()))
        .collect()
}

fn pyloric_templates() -> Vec<BurstTemplate> {
    [("PD", 0.0, 0.3), ("LP", 0.4, 0.25), ("PY", 0.7, 0.25)]
        .iter()
        .map(|&(name, phase, duty_cycle)| BurstTemplate {
            name: name.to_string(),
            phase,
            duty_cycle,
            spike_rate: 30.0,
        })
        .collect()
}

fn main() -> Result<(), BurstError> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), cli.verbose)?;
    log::debug!("{:?}", cli);

    match cli.command {
        Command::Bursts(detect) => {
            let (_, bursts) = detect.load_and_detect()?;
            println!("{}", serde_json::to_string_pretty(&bursts)?);
        }
        Command::Stats { detect, reference } => {
            let (spike_train, bursts) = detect.load_and_detect()?;
            let reference = reference_index(&spike_train, &reference)?;
            let stats = phase_stats(&bursts, reference)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Actogram {
            detect,
            output,
            period,
            origin,
            reference,
            double,
        } => {
            let spike_train = detect.load()?;
            let plot = actogram_plot(
                &detect,
                &spike_train,
                period,
                origin,
                reference.as_deref(),
                double,
            )?;
            plot.render(&output)?;
        }
        Command::Phase {
            detect,
            reference,
            output,
        } => {
            let (spike_train, bursts) = detect.load_and_detect()?;
            let reference = reference_index(&spike_train, &reference)?;
            let stats = phase_stats(&bursts, reference)?;
            PhasePlot::new(&stats).render(&output)?;
        }
        Command::Sample {
            output,
            seed,
            period,
            num_cycles,
            jitter_std,
        } => {
            let config = BurstingConfig {
                templates: pyloric_templates(),
                period,
                num_cycles,
                jitter_std,
            };
            let mut rng = StdRng::seed_from_u64(seed);
            let spike_train = rand_bursting(&config, &mut rng)?;
            spike_train.save_to(&output)?;
            log::info!(
                "Sampled {} spikes over {} cycles, saved to {}",
                spike_train.num_spikes(),
                num_cycles,
                output.display()
            );
        }
    }

    Ok(())
}
