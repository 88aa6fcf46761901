use crate::layout::{LinkPath, SankeyGraph};
use crate::render::node_colors;
use crate::theme::Theme;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    pub ky: f64,
    pub columns: Vec<String>,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub name: String,
    pub label: String,
    pub column: usize,
    pub category_column: usize,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub value: f64,
    pub color_id: usize,
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct LinkDump {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub sy: f64,
    pub ty: f64,
    pub dy: f64,
    pub path: String,
}

impl LayoutDump {
    pub fn from_layout(graph: &SankeyGraph, theme: &Theme, path: &LinkPath) -> Self {
        let colors = node_colors(graph, theme);
        let nodes = graph
            .nodes()
            .iter()
            .zip(colors)
            .map(|(node, color)| NodeDump {
                name: node.name.clone(),
                label: node.label.clone(),
                column: node.column,
                category_column: node.category_column,
                x: node.x,
                y: node.y,
                dx: node.dx,
                dy: node.dy,
                value: node.value,
                color_id: node.color_id,
                color,
            })
            .collect();

        let links = graph
            .link_ids()
            .map(|id| {
                let link = graph.link(id);
                LinkDump {
                    source: graph.node(link.source).name.clone(),
                    target: graph.node(link.target).name.clone(),
                    value: link.value,
                    sy: link.sy,
                    ty: link.ty,
                    dy: link.dy,
                    path: path.path(graph, id),
                }
            })
            .collect();

        LayoutDump {
            width: graph.width(),
            height: graph.height(),
            node_width: graph.node_width(),
            ky: graph.ky(),
            columns: graph.columns().to_vec(),
            nodes,
            links,
        }
    }
}

pub fn write_layout_dump<W: Write>(writer: W, dump: &LayoutDump) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, dump)?;
    Ok(())
}
