//! Inherited coloring for doji bars
//!
//! A doji (open == close within [`DOJI_EPSILON`]) has no direction of its own.
//! It takes the up or down palette of the nearest *earlier* non-doji bar, and
//! the up palette when there is none. Later bars are never consulted.

use crate::styles::ColorScheme;
use crate::types::OneMinuteBar;

pub const DOJI_EPSILON: f64 = 1e-4;

pub fn is_doji(bar: &OneMinuteBar) -> bool {
    (bar.open - bar.close).abs() < DOJI_EPSILON
}

/// Color every doji in an ascending series. Non-doji bars are left as is.
pub fn resolve_doji_colors(bars: &mut [OneMinuteBar], scheme: &ColorScheme) {
    let mut last_direction: Option<bool> = None;

    for bar in bars.iter_mut() {
        if is_doji(bar) {
            bar.colors = Some(scheme.colors_for(last_direction.unwrap_or(true)));
        } else {
            last_direction = Some(bar.is_up());
        }
    }
}

/// Color a transient bar that is not part of `completed`.
///
/// Only completed bars stamped before `bar.time` are looked at.
pub fn color_forming_bar(bar: &mut OneMinuteBar, completed: &[OneMinuteBar], scheme: &ColorScheme) {
    if !is_doji(bar) {
        return;
    }

    let inherited = completed
        .iter()
        .rev()
        .filter(|prev| prev.time < bar.time)
        .find(|prev| !is_doji(prev))
        .map(OneMinuteBar::is_up)
        .unwrap_or(true);

    bar.colors = Some(scheme.colors_for(inherited));
}
