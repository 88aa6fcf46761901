use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const TABLEAU10: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub background: String,
    /// Darkening steps applied to a node's fill for its outline.
    pub node_stroke_darken: f64,
    /// One color per column when the column has no palette of its own.
    pub palette: Vec<String>,
    /// Shades indexed by a node's color id, keyed by column.
    pub column_palettes: BTreeMap<String, Vec<String>>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 10.0,
            text_color: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            node_stroke_darken: 2.0,
            palette: CATEGORY10.iter().map(|c| c.to_string()).collect(),
            column_palettes: BTreeMap::new(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
            node_stroke_darken: 1.0,
            palette: TABLEAU10.iter().map(|c| c.to_string()).collect(),
            column_palettes: BTreeMap::new(),
        }
    }

    /// Fill for a node of `column` ranked `color_id` within it.
    pub fn node_color(&self, column: &str, column_index: usize, color_id: usize) -> String {
        if let Some(shades) = self.column_palettes.get(column).filter(|s| !s.is_empty()) {
            return shades[color_id % shades.len()].clone();
        }
        if self.palette.is_empty() {
            return "#cccccc".to_string();
        }
        self.palette[column_index % self.palette.len()].clone()
    }
}

/// Scales each RGB channel by `0.7^k`. Colors that are not `#rgb` or
/// `#rrggbb` are returned unchanged.
pub fn darken(color: &str, k: f64) -> String {
    let Some((r, g, b)) = parse_hex(color) else {
        return color.to_string();
    };
    let factor = 0.7f64.powf(k);
    let scale = |c: u8| (c as f64 * factor).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", scale(r), scale(g), scale(b))
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        6 => {
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some((pair(0)?, pair(2)?, pair(4)?))
        }
        _ => None,
    }
}
