use crate::layout::ColumnMatch;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMatchMode {
    Category,
    Prefix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_padding: f64,
    pub width: f64,
    pub height: f64,
    pub iterations: usize,
    pub curvature: f64,
    pub column_match: ColumnMatchMode,
    pub separator: char,
    /// Overrides the column order carried by the input when non-empty.
    pub columns: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 24.0,
            node_padding: 8.0,
            width: 960.0,
            height: 500.0,
            iterations: 32,
            curvature: 0.5,
            column_match: ColumnMatchMode::Category,
            separator: '-',
            columns: Vec::new(),
        }
    }
}

impl LayoutConfig {
    pub fn column_match(&self) -> ColumnMatch {
        match self.column_match {
            ColumnMatchMode::Category => ColumnMatch::Category {
                separator: self.separator,
            },
            ColumnMatchMode::Prefix => ColumnMatch::Prefix,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub link_opacity: f64,
    pub min_link_width: f64,
    pub label_gap: f64,
    /// Fallback canvas size used when rasterizing.
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin_top: 50.0,
            margin_right: 50.0,
            margin_bottom: 150.0,
            margin_left: 50.0,
            link_opacity: 0.4,
            min_link_width: 1.0,
            label_gap: 6.0,
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::classic(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    sankey: Option<SankeyConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    text_color: Option<String>,
    background: Option<String>,
    node_stroke_darken: Option<f64>,
    palette: Option<Vec<String>>,
    column_palettes: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SankeyConfigFile {
    node_width: Option<f64>,
    node_padding: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    iterations: Option<usize>,
    curvature: Option<f64>,
    column_match: Option<ColumnMatchMode>,
    separator: Option<char>,
    columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    margin_top: Option<f64>,
    margin_right: Option<f64>,
    margin_bottom: Option<f64>,
    margin_left: Option<f64>,
    link_opacity: Option<f64>,
    min_link_width: Option<f64>,
    label_gap: Option<f64>,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(_) => json5::from_str(&contents)?,
    };
    apply_config_file(&mut config, parsed);
    Ok(config)
}

/// Merges an inline `%%{init: ...}%%` object over an existing config.
pub fn merge_init_config(mut config: Config, init: serde_json::Value) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_value(init)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size.as_ref().and_then(NumberOrString::as_f32) {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.node_stroke_darken {
            config.theme.node_stroke_darken = v;
        }
        if let Some(v) = vars.palette {
            if !v.is_empty() {
                config.theme.palette = v;
            }
        }
        if let Some(v) = vars.column_palettes {
            config.theme.column_palettes.extend(v);
        }
    }

    if let Some(sankey) = parsed.sankey {
        if let Some(v) = sankey.node_width {
            config.layout.node_width = v;
        }
        if let Some(v) = sankey.node_padding {
            config.layout.node_padding = v;
        }
        if let Some(v) = sankey.width {
            config.layout.width = v;
        }
        if let Some(v) = sankey.height {
            config.layout.height = v;
        }
        if let Some(v) = sankey.iterations {
            config.layout.iterations = v;
        }
        if let Some(v) = sankey.curvature {
            config.layout.curvature = v;
        }
        if let Some(v) = sankey.column_match {
            config.layout.column_match = v;
        }
        if let Some(v) = sankey.separator {
            config.layout.separator = v;
        }
        if let Some(v) = sankey.columns {
            config.layout.columns = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.margin_top {
            config.render.margin_top = v;
        }
        if let Some(v) = render.margin_right {
            config.render.margin_right = v;
        }
        if let Some(v) = render.margin_bottom {
            config.render.margin_bottom = v;
        }
        if let Some(v) = render.margin_left {
            config.render.margin_left = v;
        }
        if let Some(v) = render.link_opacity {
            config.render.link_opacity = v;
        }
        if let Some(v) = render.min_link_width {
            config.render.min_link_width = v;
        }
        if let Some(v) = render.label_gap {
            config.render.label_gap = v;
        }
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }
}
