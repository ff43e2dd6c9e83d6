//! Color schemes handed to the chart widget

use serde::{Deserialize, Serialize};

use crate::types::BarColors;

/// Color scheme for candlestick rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    /// Color for bullish (up) bars
    pub up: String,
    /// Color for bearish (down) bars
    pub down: String,
    pub background: String,
    pub text: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::traditional()
    }
}

impl ColorScheme {
    /// Teal/red on white
    pub fn traditional() -> Self {
        Self {
            up: "#26a69a".to_string(),
            down: "#ef5350".to_string(),
            background: "white".to_string(),
            text: "#333".to_string(),
        }
    }

    /// Dark theme color scheme
    pub fn dark() -> Self {
        Self {
            up: "#00c853".to_string(),
            down: "#ff4d4d".to_string(),
            background: "#151719".to_string(),
            text: "#d0d2d6".to_string(),
        }
    }

    /// Body, border and wick all in the up color
    pub fn up_colors(&self) -> BarColors {
        Self::solid(&self.up)
    }

    /// Body, border and wick all in the down color
    pub fn down_colors(&self) -> BarColors {
        Self::solid(&self.down)
    }

    pub fn colors_for(&self, is_up: bool) -> BarColors {
        if is_up {
            self.up_colors()
        } else {
            self.down_colors()
        }
    }

    fn solid(color: &str) -> BarColors {
        BarColors {
            color: color.to_string(),
            border_color: color.to_string(),
            wick_color: color.to_string(),
        }
    }
}

/// Price axis formatting for the chart widget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFormat {
    pub precision: u32,
    pub min_move: f64,
}

impl PriceFormat {
    /// Integral tapes move in whole units, otherwise in `10^-precision`.
    pub fn for_decimal_places(decimal_places: u32) -> Self {
        let min_move = if decimal_places == 0 {
            1.0
        } else {
            10f64.powi(-(decimal_places as i32))
        };
        Self {
            precision: decimal_places,
            min_move,
        }
    }
}
