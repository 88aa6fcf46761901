use crate::config::{LayoutConfig, RenderConfig};
use crate::layout::{LinkPath, SankeyGraph};
use crate::theme::{Theme, darken};
use anyhow::Result;
use std::path::Path;

/// Resolved fill for every node, in node order.
pub fn node_colors(graph: &SankeyGraph, theme: &Theme) -> Vec<String> {
    graph
        .nodes()
        .iter()
        .map(|node| {
            let column = &graph.columns()[node.category_column];
            theme.node_color(column, node.category_column, node.color_id)
        })
        .collect()
}

pub fn render_svg(
    graph: &SankeyGraph,
    theme: &Theme,
    layout: &LayoutConfig,
    render: &RenderConfig,
) -> String {
    let mut svg = String::new();
    let width = graph.width() + render.margin_left + render.margin_right;
    let height = graph.height() + render.margin_top + render.margin_bottom;
    let colors = node_colors(graph, theme);
    let path = LinkPath::new().curvature(layout.curvature);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str(&format!(
        "<g transform=\"translate({},{})\">",
        render.margin_left, render.margin_top
    ));

    svg.push_str("<g class=\"links\" fill=\"none\">");
    for id in graph.link_ids() {
        let link = graph.link(id);
        let source = graph.node(link.source);
        let target = graph.node(link.target);
        let share = if source.value > 0.0 {
            link.value / source.value * 100.0
        } else {
            0.0
        };
        svg.push_str(&format!(
            "<path class=\"link\" d=\"{}\" stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"{:.2}\"><title>{} → {}: {} ({:.2}%)</title></path>",
            path.path(graph, id),
            colors[link.source.0],
            render.link_opacity,
            link.dy.max(render.min_link_width),
            escape_xml(&source.name),
            escape_xml(&target.name),
            link.value,
            share
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for (idx, node) in graph.nodes().iter().enumerate() {
        let fill = &colors[idx];
        svg.push_str(&format!(
            "<g class=\"node\" transform=\"translate({:.2},{:.2})\">",
            node.x, node.y
        ));
        svg.push_str(&format!(
            "<rect width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\"><title>{}</title></rect>",
            node.dx,
            node.dy,
            fill,
            darken(fill, theme.node_stroke_darken),
            escape_xml(&node.name)
        ));
        let (label_x, anchor) = if node.x < graph.width() / 2.0 {
            (node.dx + render.label_gap, "start")
        } else {
            (-render.label_gap, "end")
        };
        svg.push_str(&format!(
            "<text x=\"{label_x:.2}\" y=\"{:.2}\" dy=\".35em\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            node.dy / 2.0,
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.text_color,
            escape_xml(&node.label)
        ));
        svg.push_str("</g>");
    }
    svg.push_str("</g>");

    svg.push_str("</g></svg>");
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
