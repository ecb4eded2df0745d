//! Actograms, i.e., event times folded modulo a period and stacked by cycle.
use std::path::Path;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use super::{plot_error, FIGURE_SIZE};
use crate::error::BurstError;
use crate::phase::BurstTable;

/// The position of an event in an actogram.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Marker {
    /// Time within the cycle.
    pub x: f64,
    /// Cycle number.
    pub cycle: i64,
}

/// Fold the events modulo the period, starting from the origin.
/// Events before the origin get negative cycle numbers.
///
/// # Examples
///
/// ```rust
/// use rusty_bursts::plot::actogram::{actogram, Marker};
///
/// let markers = actogram(&[0.5, 2.25, -0.5], 2.0, 0.0).unwrap();
/// assert_eq!(markers[0], Marker { x: 0.5, cycle: 0 });
/// assert_eq!(markers[1], Marker { x: 0.25, cycle: 1 });
/// assert_eq!(markers[2], Marker { x: 1.5, cycle: -1 });
/// ```
pub fn actogram(events: &[f64], period: f64, origin: f64) -> Result<Vec<Marker>, BurstError> {
    if !(period.is_finite() && period > 0.0) {
        return Err(BurstError::InvalidParameter(
            "Invalid period value: must be positive".to_string(),
        ));
    }

    Ok(events
        .iter()
        .map(|t| {
            let dt = t - origin;
            let mut cycle = (dt / period).floor();
            let mut x = dt - cycle * period;
            // rounding can push x just outside [0, period)
            if x < 0.0 {
                cycle -= 1.0;
                x += period;
            }
            if x >= period {
                cycle += 1.0;
                x = 0.0;
            }
            Marker {
                x,
                cycle: cycle as i64,
            }
        })
        .collect())
}

/// Fold the events on the cycles of a reference channel.
/// Within cycle `k`, an event is placed at its delay from the cycle start, normalized by the cycle period.
/// Events outside every cycle are dropped.
pub fn actogram_period(events: &[f64], table: &BurstTable) -> Vec<Marker> {
    events
        .iter()
        .filter_map(|&t| {
            let k = table.cycle_of(t)?;
            Some(Marker {
                x: (t - table.cycle_starts[k]) / table.periods[k],
                cycle: k as i64,
            })
        })
        .collect()
}

/// Double the markers so that two consecutive cycles are shown side by side.
/// Every marker is repeated one period to the right, on the previous cycle.
pub fn double_plot(markers: &[Marker], period: f64) -> Vec<Marker> {
    markers
        .iter()
        .flat_map(|m| {
            [
                *m,
                Marker {
                    x: m.x + period,
                    cycle: m.cycle - 1,
                },
            ]
        })
        .collect()
}

/// An actogram of several channels.
#[derive(Debug, PartialEq, Clone)]
pub struct ActogramPlot {
    pub title: String,
    pub x_desc: String,
    /// The length of a cycle on the horizontal axis.
    pub period: f64,
    pub double_plotted: bool,
    /// One series of markers per channel.
    pub series: Vec<(String, Vec<Marker>)>,
}

impl ActogramPlot {
    /// Actogram for a fixed period.
    pub fn fixed_period<S: AsRef<str>>(
        events: &[(S, Vec<f64>)],
        period: f64,
        origin: f64,
        double_plotted: bool,
    ) -> Result<Self, BurstError> {
        let series = events
            .iter()
            .map(|(name, times)| {
                let markers = actogram(times, period, origin)?;
                Ok((name.as_ref().to_string(), markers))
            })
            .collect::<Result<Vec<_>, BurstError>>()?;

        Ok(ActogramPlot {
            title: format!("Actogram (period {})", period),
            x_desc: "time within cycle".to_string(),
            period,
            double_plotted,
            series,
        }
        .doubled())
    }

    /// Actogram on the cycles of a reference channel, with a normalized period.
    pub fn variable_period<S: AsRef<str>>(
        events: &[(S, Vec<f64>)],
        table: &BurstTable,
        double_plotted: bool,
    ) -> Self {
        let series = events
            .iter()
            .map(|(name, times)| (name.as_ref().to_string(), actogram_period(times, table)))
            .collect();

        ActogramPlot {
            title: format!("Actogram (reference {})", table.reference_name()),
            x_desc: "phase".to_string(),
            period: 1.0,
            double_plotted,
            series,
        }
        .doubled()
    }

    fn doubled(mut self) -> Self {
        if self.double_plotted {
            for (_, markers) in self.series.iter_mut() {
                *markers = double_plot(markers, self.period);
            }
        }
        self
    }

    /// The smallest and largest cycles among the markers, if any.
    pub fn cycle_range(&self) -> Option<(i64, i64)> {
        self.series
            .iter()
            .flat_map(|(_, markers)| markers.iter().map(|m| m.cycle))
            .fold(None, |range, c| match range {
                None => Some((c, c)),
                Some((min_c, max_c)) => Some((min_c.min(c), max_c.max(c))),
            })
    }

    /// Render the actogram to an SVG file.
    /// Cycles run from top to bottom, each channel has its own colour.
    pub fn render<P: AsRef<Path>>(&self, path: P) -> Result<(), BurstError> {
        let (min_cycle, max_cycle) = self.cycle_range().unwrap_or((0, 0));
        let x_max = if self.double_plotted {
            2.0 * self.period
        } else {
            self.period
        };

        let root = SVGBackend::new(path.as_ref(), FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        // cycles are drawn downward, at y = -cycle
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(
                0.0..x_max,
                -(max_cycle as f64) - 0.5..-(min_cycle as f64) + 0.5,
            )
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(self.x_desc.as_str())
            .y_desc("cycle")
            .y_label_formatter(&|y| format!("{:.0}", -y + 0.0))
            .draw()
            .map_err(plot_error)?;

        for (i, (name, markers)) in self.series.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(markers.iter().map(|m| {
                    let y = -(m.cycle as f64);
                    PathElement::new(vec![(m.x, y - 0.4), (m.x, y + 0.4)], color.stroke_width(1))
                }))
                .map_err(plot_error)?
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_error)?;

        root.present().map_err(plot_error)?;
        log::info!("Actogram saved to {}", path.as_ref().display());
        Ok(())
    }
}
