//! Phase diagrams, i.e., the mean burst of every channel drawn on a single normalized cycle.
use std::path::Path;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use super::{plot_error, FIGURE_SIZE};
use crate::error::BurstError;
use crate::phase::PhaseStats;

/// The mean burst of a channel, in fractions of the cycle period.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PhaseBar {
    pub name: String,
    /// Mean onset phase.
    pub onset: f64,
    /// Mean offset phase.
    pub offset: f64,
    /// Mean phase of the median spike.
    pub phase: f64,
    /// Standard deviation of the phase of the median spike.
    pub phase_std: f64,
}

/// Build the phase bars of every channel with at least one aligned burst.
pub fn phase_diagram(stats: &PhaseStats) -> Vec<PhaseBar> {
    stats
        .channels
        .iter()
        .filter(|c| c.phase.count > 0)
        .map(|c| PhaseBar {
            name: c.name.clone(),
            onset: c.onset_phase.mean,
            offset: c.offset_phase.mean,
            phase: c.phase.mean,
            phase_std: c.phase.std,
        })
        .collect()
}

/// A phase diagram, one row per channel from top to bottom.
#[derive(Debug, PartialEq, Clone)]
pub struct PhasePlot {
    pub title: String,
    pub bars: Vec<PhaseBar>,
}

impl PhasePlot {
    pub fn new(stats: &PhaseStats) -> Self {
        PhasePlot {
            title: format!(
                "Phase diagram (reference {}, {} cycles)",
                stats.reference, stats.num_cycles
            ),
            bars: phase_diagram(stats),
        }
    }

    /// The horizontal extent of the diagram, covering at least one full cycle.
    pub fn phase_range(&self) -> (f64, f64) {
        self.bars.iter().fold((0.0, 1.0), |(min_x, max_x), bar| {
            (
                min_x.min(bar.onset).min(bar.phase - bar.phase_std),
                max_x.max(bar.offset).max(bar.phase + bar.phase_std),
            )
        })
    }

    /// Render the phase diagram to an SVG file.
    /// Each channel is drawn as a bar from its mean onset to its mean offset,
    /// with the mean median phase and its standard deviation on top.
    pub fn render<P: AsRef<Path>>(&self, path: P) -> Result<(), BurstError> {
        let num_rows = self.bars.len().max(1);
        let (min_x, max_x) = self.phase_range();
        // the first channel is on top
        let row_y = |row: usize| (num_rows - 1 - row) as f64;

        let root = SVGBackend::new(path.as_ref(), FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(min_x..max_x, -0.5..num_rows as f64 - 0.5)
            .map_err(plot_error)?;

        let names: Vec<&str> = self.bars.iter().map(|bar| bar.name.as_str()).collect();
        let label = |y: &f64| {
            let row = num_rows as f64 - 1.0 - y.round();
            if (y - y.round()).abs() > 1e-6 || row < 0.0 {
                return String::new();
            }
            names.get(row as usize).map(|s| s.to_string()).unwrap_or_default()
        };

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc("phase")
            .y_labels(num_rows)
            .y_label_formatter(&label)
            .draw()
            .map_err(plot_error)?;

        for (row, bar) in self.bars.iter().enumerate() {
            let color = Palette99::pick(row).to_rgba();
            let y = row_y(row);

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(bar.onset, y - 0.3), (bar.offset, y + 0.3)],
                    color.mix(0.6).filled(),
                )))
                .map_err(plot_error)?;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(bar.phase - bar.phase_std, y), (bar.phase + bar.phase_std, y)],
                    BLACK.stroke_width(2),
                )))
                .map_err(plot_error)?;
            chart
                .draw_series(std::iter::once(Circle::new(
                    (bar.phase, y),
                    4,
                    BLACK.filled(),
                )))
                .map_err(plot_error)?;
        }

        root.present().map_err(plot_error)?;
        log::info!("Phase diagram saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::phase::ChannelStats;
    use crate::utils::Summary;

    fn summary(mean: f64, std: f64, count: usize) -> Summary {
        Summary { mean, std, count }
    }

    fn stats() -> PhaseStats {
        let channel = |name: &str, onset: f64, offset: f64, count: usize| ChannelStats {
            name: name.to_string(),
            phase: summary((onset + offset) / 2.0, 0.05, count),
            onset_phase: summary(onset, 0.02, count),
            offset_phase: summary(offset, 0.02, count),
            duty_cycle: summary(offset - onset, 0.01, count),
            period: summary(1.0, 0.1, count),
        };
        PhaseStats {
            reference: "PD".to_string(),
            num_cycles: 10,
            cycle_period: summary(1.0, 0.1, 10),
            channels: vec![
                channel("PD", -0.1, 0.1, 10),
                channel("LP", 0.4, 0.7, 9),
                channel("PY", 0.7, 1.1, 10),
                ChannelStats {
                    name: "silent".to_string(),
                    phase: summary(f64::NAN, f64::NAN, 0),
                    onset_phase: summary(f64::NAN, f64::NAN, 0),
                    offset_phase: summary(f64::NAN, f64::NAN, 0),
                    duty_cycle: summary(f64::NAN, f64::NAN, 0),
                    period: summary(f64::NAN, f64::NAN, 0),
                },
            ],
        }
    }

    #[test]
    fn test_phase_diagram() {
        let bars = phase_diagram(&stats());
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].name, "LP");
        assert_eq!(bars[1].onset, 0.4);
        assert_eq!(bars[1].offset, 0.7);
        assert_relative_eq!(bars[1].phase, 0.55);
        assert_eq!(bars[1].phase_std, 0.05);
    }

    #[test]
    fn test_phase_range() {
        let plot = PhasePlot::new(&stats());
        let (min_x, max_x) = plot.phase_range();
        assert_relative_eq!(min_x, -0.1);
        assert_relative_eq!(max_x, 1.1);

        let plot = PhasePlot {
            title: String::new(),
            bars: vec![],
        };
        assert_eq!(plot.phase_range(), (0.0, 1.0));
    }

    #[test]
    fn test_phase_plot_render() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("phase.svg");
        PhasePlot::new(&stats()).render(&path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }
}
