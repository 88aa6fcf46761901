#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig};
pub use ir::{FlowGraph, LinkSpec, NodeRef, NodeSpec};
pub use layout::{ColumnMatch, LayoutError, LinkPath, Sankey, SankeyGraph};
pub use parser::{InputFormat, RecordOptions, parse_input};
pub use render::render_svg;
pub use theme::Theme;

/// Lays out a parsed graph with the configured engine settings. Columns come
/// from the config when it names any, then from the graph, and are inferred
/// from link depth as a last resort.
pub fn compute_layout(graph: &mut FlowGraph, config: &LayoutConfig) -> anyhow::Result<SankeyGraph> {
    if !config.columns.is_empty() {
        graph.columns = config.columns.clone();
    } else if graph.columns.is_empty() {
        parser::infer_columns(graph)?;
    }
    let layout = Sankey::from_config(config).layout(graph, config.iterations)?;
    Ok(layout)
}

/// Parses `input` and renders it to an SVG document in one step.
pub fn render(input: &str, format: InputFormat, config: &Config) -> anyhow::Result<String> {
    let options = RecordOptions {
        separator: config.layout.separator,
        ..RecordOptions::default()
    };
    let parsed = parse_input(input, format, &options)?;
    let config = match parsed.init_config {
        Some(init) => crate::config::merge_init_config(config.clone(), init)?,
        None => config.clone(),
    };
    let mut graph = parsed.graph;
    let layout = compute_layout(&mut graph, &config.layout)?;
    Ok(render_svg(&layout, &config.theme, &config.layout, &config.render))
}
