//! Plotting module, rendering actograms and phase diagrams to SVG files.
//!
//! - [`actogram`]: Event times folded modulo a (fixed or reference-defined) period, stacked by cycle
//! - [`phase_plot`]: Mean burst phases of every channel relative to a reference
pub mod actogram;
pub mod phase_plot;

use std::fmt::Display;

use crate::error::BurstError;

/// The default size of the rendered figures, in pixels.
pub const FIGURE_SIZE: (u32, u32) = (1000, 700);

fn plot_error<E: Display>(e: E) -> BurstError {
    BurstError::PlotError(e.to_string())
}
