//! Column-ordered Sankey layout.
//!
//! Nodes are bucketed into an explicit, ordered list of columns, sized by
//! the flow passing through them and then spread vertically by iterative
//! relaxation toward the weighted centers of their neighbors. The graph is
//! an arena: links refer to nodes by [`NodeId`], nodes list their links by
//! [`LinkId`].

mod error;
mod path;

pub use error::LayoutError;
pub use path::{LinkCurve, LinkPath};

use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, NodeRef, NodeSpec};

const ALPHA_DECAY: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

/// How a node without an explicit category is matched to a column key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatch {
    /// The name is the key itself or the key followed by `separator`
    /// (`"safety-high"` belongs to `"safety"`, `"safetyX-high"` does not).
    Category { separator: char },
    /// The name starts with the key. The longest matching key wins.
    Prefix,
}

impl Default for ColumnMatch {
    fn default() -> Self {
        ColumnMatch::Category { separator: '-' }
    }
}

impl ColumnMatch {
    fn column_of(&self, node: &NodeSpec, columns: &[String]) -> Option<usize> {
        if let Some(category) = node.category.as_deref() {
            return columns.iter().position(|key| key == category);
        }
        let name = node.name.as_str();
        match *self {
            ColumnMatch::Category { separator } => longest_match(columns, |key| {
                name == key
                    || name
                        .strip_prefix(key)
                        .is_some_and(|rest| rest.starts_with(separator))
            }),
            ColumnMatch::Prefix => longest_match(columns, |key| name.starts_with(key)),
        }
    }
}

fn longest_match(columns: &[String], matches: impl Fn(&str) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, key) in columns.iter().enumerate() {
        if !matches(key) {
            continue;
        }
        if best.is_none_or(|current| key.len() > columns[current].len()) {
            best = Some(idx);
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub label: String,
    /// Column the node's name or category matched.
    pub category_column: usize,
    /// Column the node is drawn in; sinks are moved to the last one.
    pub column: usize,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub value: f64,
    pub source_links: Vec<LinkId>,
    pub target_links: Vec<LinkId>,
    /// Rank by vertical position among nodes of the same category column.
    pub color_id: usize,
}

impl Node {
    pub fn center(&self) -> f64 {
        self.y + self.dy / 2.0
    }

    pub fn is_sink(&self) -> bool {
        self.source_links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub value: f64,
    /// Offset of this link's band within the source node's outgoing stack.
    pub sy: f64,
    /// Offset of this link's band within the target node's incoming stack.
    pub ty: f64,
    /// Band thickness.
    pub dy: f64,
}

/// A laid-out diagram. Produced by [`Sankey::layout`]; positions may be
/// edited afterwards (see [`SankeyGraph::move_node`]) and link stacks
/// refreshed with [`Sankey::relayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyGraph {
    columns: Vec<String>,
    nodes: Vec<Node>,
    links: Vec<Link>,
    width: f64,
    height: f64,
    node_width: f64,
    node_padding: f64,
    ky: f64,
}

impl SankeyGraph {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        (0..self.links.len()).map(LinkId)
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.name == name).map(NodeId)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn node_width(&self) -> f64 {
        self.node_width
    }

    pub fn node_padding(&self) -> f64 {
        self.node_padding
    }

    /// Pixels per unit of flow.
    pub fn ky(&self) -> f64 {
        self.ky
    }

    /// Moves a node, clamped to the layout box. Link stacks are not updated
    /// until [`Sankey::relayout`] runs.
    pub fn move_node(&mut self, id: NodeId, x: f64, y: f64) {
        let max_x = (self.width - self.node_width).max(0.0);
        let max_y = self.height.max(0.0);
        let node = &mut self.nodes[id.0];
        node.x = x.clamp(0.0, max_x);
        node.y = y.clamp(0.0, max_y);
    }

    /// Sum over links of the squared vertical distance between the band's
    /// midpoint at the source and at the target.
    pub fn link_bend(&self) -> f64 {
        self.links
            .iter()
            .map(|link| {
                let start = self.nodes[link.source.0].y + link.sy + link.dy / 2.0;
                let end = self.nodes[link.target.0].y + link.ty + link.dy / 2.0;
                (end - start).powi(2)
            })
            .sum()
    }

    fn relax_right_to_left(&mut self, by_column: &[Vec<NodeId>], alpha: f64) {
        for column in by_column.iter().rev() {
            for &id in column {
                let node = &self.nodes[id.0];
                if node.source_links.is_empty() {
                    continue;
                }
                let (weighted, total) =
                    node.source_links
                        .iter()
                        .fold((0.0, 0.0), |(weighted, total), &link_id| {
                            let link = &self.links[link_id.0];
                            let target = &self.nodes[link.target.0];
                            (weighted + target.center() * link.value, total + link.value)
                        });
                if total <= 0.0 {
                    continue;
                }
                let shift = (weighted / total - node.center()) * alpha;
                self.nodes[id.0].y += shift;
            }
        }
    }

    fn relax_left_to_right(&mut self, by_column: &[Vec<NodeId>], alpha: f64) {
        for column in by_column {
            for &id in column {
                let node = &self.nodes[id.0];
                if node.target_links.is_empty() {
                    continue;
                }
                let (weighted, total) =
                    node.target_links
                        .iter()
                        .fold((0.0, 0.0), |(weighted, total), &link_id| {
                            let link = &self.links[link_id.0];
                            let source = &self.nodes[link.source.0];
                            (weighted + source.center() * link.value, total + link.value)
                        });
                if total <= 0.0 {
                    continue;
                }
                let shift = (weighted / total - node.center()) * alpha;
                self.nodes[id.0].y += shift;
            }
        }
    }

    /// Pushes overlapping nodes apart, then back up if the column spills
    /// past the bottom edge. Columns are left sorted by depth.
    fn resolve_collisions(&mut self, by_column: &mut [Vec<NodeId>]) {
        let padding = self.node_padding;
        let height = self.height;
        for column in by_column.iter_mut() {
            if column.is_empty() {
                continue;
            }
            column.sort_by(|a, b| f64_cmp(self.nodes[a.0].y, self.nodes[b.0].y));

            let mut y0 = 0.0;
            for &id in column.iter() {
                let node = &mut self.nodes[id.0];
                let dy = y0 - node.y;
                if dy > 0.0 {
                    node.y += dy;
                }
                y0 = node.y + node.dy + padding;
            }

            let overflow = y0 - padding - height;
            if overflow <= 0.0 {
                continue;
            }
            let last = column[column.len() - 1];
            self.nodes[last.0].y -= overflow;
            let mut y0 = self.nodes[last.0].y;
            for &id in column.iter().rev().skip(1) {
                let node = &mut self.nodes[id.0];
                let dy = node.y + node.dy + padding - y0;
                if dy > 0.0 {
                    node.y -= dy;
                }
                y0 = node.y;
            }
        }
    }

    fn compute_link_depths(&mut self) {
        let ys: Vec<f64> = self.nodes.iter().map(|node| node.y).collect();
        let links = &self.links;
        for node in &mut self.nodes {
            node.source_links
                .sort_by(|a, b| f64_cmp(ys[links[a.0].target.0], ys[links[b.0].target.0]));
            node.target_links
                .sort_by(|a, b| f64_cmp(ys[links[a.0].source.0], ys[links[b.0].source.0]));
        }

        let links = &mut self.links;
        for node in self.nodes.iter() {
            let mut sy = 0.0;
            for &id in &node.source_links {
                let link = &mut links[id.0];
                link.sy = sy;
                sy += link.dy;
            }
            let mut ty = 0.0;
            for &id in &node.target_links {
                let link = &mut links[id.0];
                link.ty = ty;
                ty += link.dy;
            }
        }
    }

    fn compute_color_ids(&mut self) {
        for column in 0..self.columns.len() {
            let mut members: Vec<usize> = (0..self.nodes.len())
                .filter(|&idx| self.nodes[idx].category_column == column)
                .collect();
            members.sort_by(|a, b| f64_cmp(self.nodes[*a].y, self.nodes[*b].y));
            for (rank, idx) in members.into_iter().enumerate() {
                self.nodes[idx].color_id = rank;
            }
        }
    }
}

/// The layout engine: configuration plus the `layout`, `relayout` and
/// `link` operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Sankey {
    node_width: f64,
    node_padding: f64,
    size: (f64, f64),
    columns: Vec<String>,
    column_match: ColumnMatch,
}

impl Default for Sankey {
    fn default() -> Self {
        Self {
            node_width: 24.0,
            node_padding: 8.0,
            size: (1.0, 1.0),
            columns: Vec::new(),
            column_match: ColumnMatch::default(),
        }
    }
}

impl Sankey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            node_width: config.node_width,
            node_padding: config.node_padding,
            size: (config.width, config.height),
            columns: config.columns.clone(),
            column_match: config.column_match(),
        }
    }

    pub fn node_width(mut self, node_width: f64) -> Self {
        self.node_width = node_width;
        self
    }

    pub fn node_padding(mut self, node_padding: f64) -> Self {
        self.node_padding = node_padding;
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }

    /// Column order used instead of the graph's own `columns`.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn column_match(mut self, column_match: ColumnMatch) -> Self {
        self.column_match = column_match;
        self
    }

    pub fn get_node_width(&self) -> f64 {
        self.node_width
    }

    pub fn get_node_padding(&self) -> f64 {
        self.node_padding
    }

    pub fn get_size(&self) -> (f64, f64) {
        self.size
    }

    /// Link path generator with the default curvature.
    pub fn link(&self) -> LinkPath {
        LinkPath::default()
    }

    /// Recomputes link stacking from the current node positions. Node
    /// positions and columns are left untouched.
    pub fn relayout(&self, graph: &mut SankeyGraph) {
        graph.compute_link_depths();
    }

    /// Lays out `input` from scratch. Fails before producing any geometry
    /// if a link value is invalid, a link endpoint is unknown, a node has no
    /// column, or a column cannot be scaled to the layout height.
    pub fn layout(&self, input: &FlowGraph, iterations: usize) -> Result<SankeyGraph, LayoutError> {
        let columns = if self.columns.is_empty() {
            input.columns.clone()
        } else {
            self.columns.clone()
        };
        debug!(
            nodes = input.nodes.len(),
            links = input.links.len(),
            columns = columns.len(),
            iterations,
            "computing sankey layout"
        );

        let mut graph = self.build_graph(input, columns)?;
        graph.compute_node_values();
        graph.compute_node_breadths();
        let mut by_column = graph.nodes_by_column();
        graph.ky = graph.scale_factor(&by_column)?;
        graph.initialize_node_depths(&by_column);

        graph.resolve_collisions(&mut by_column);
        let mut alpha = 1.0;
        for pass in 0..iterations {
            alpha *= ALPHA_DECAY;
            trace!(pass, alpha, "relaxation pass");
            graph.relax_right_to_left(&by_column, alpha);
            graph.resolve_collisions(&mut by_column);
            graph.relax_left_to_right(&by_column, alpha);
            graph.resolve_collisions(&mut by_column);
        }

        graph.compute_link_depths();
        graph.compute_color_ids();
        debug!(ky = graph.ky, "sankey layout done");
        Ok(graph)
    }

    fn build_graph(&self, input: &FlowGraph, columns: Vec<String>) -> Result<SankeyGraph, LayoutError> {
        for (idx, link) in input.links.iter().enumerate() {
            if !link.value.is_finite() || link.value < 0.0 {
                return Err(LayoutError::InvalidValue {
                    link: idx,
                    value: link.value,
                });
            }
        }

        let by_name = input.name_index();
        let resolve = |link: usize, node: &NodeRef| -> Result<NodeId, LayoutError> {
            let idx = match node {
                NodeRef::Index(idx) => (*idx < input.nodes.len()).then_some(*idx),
                NodeRef::Name(name) => by_name.get(name.as_str()).copied(),
            };
            idx.map(NodeId).ok_or_else(|| LayoutError::MissingReference {
                link,
                node: node.clone(),
            })
        };
        let mut links = Vec::with_capacity(input.links.len());
        for (idx, link) in input.links.iter().enumerate() {
            links.push(Link {
                source: resolve(idx, &link.source)?,
                target: resolve(idx, &link.target)?,
                value: link.value,
                sy: 0.0,
                ty: 0.0,
                dy: 0.0,
            });
        }

        let mut nodes = Vec::with_capacity(input.nodes.len());
        for spec in &input.nodes {
            let column = self.column_match.column_of(spec, &columns).ok_or_else(|| {
                LayoutError::ColumnUnassigned {
                    name: spec.name.clone(),
                }
            })?;
            nodes.push(Node {
                name: spec.name.clone(),
                label: spec.label.clone().unwrap_or_else(|| spec.name.clone()),
                category_column: column,
                column,
                x: 0.0,
                y: 0.0,
                dx: self.node_width,
                dy: 0.0,
                value: 0.0,
                source_links: Vec::new(),
                target_links: Vec::new(),
                color_id: 0,
            });
        }
        for (idx, link) in links.iter().enumerate() {
            nodes[link.source.0].source_links.push(LinkId(idx));
            nodes[link.target.0].target_links.push(LinkId(idx));
        }

        Ok(SankeyGraph {
            columns,
            nodes,
            links,
            width: self.size.0,
            height: self.size.1,
            node_width: self.node_width,
            node_padding: self.node_padding,
            ky: 0.0,
        })
    }
}

impl SankeyGraph {
    fn compute_node_values(&mut self) {
        let links = &self.links;
        for node in &mut self.nodes {
            let outgoing: f64 = node.source_links.iter().map(|id| links[id.0].value).sum();
            let incoming: f64 = node.target_links.iter().map(|id| links[id.0].value).sum();
            node.value = outgoing.max(incoming);
        }
    }

    fn compute_node_breadths(&mut self) {
        let last = self.columns.len().saturating_sub(1);
        let kx = if last > 0 {
            (self.width - self.node_width) / last as f64
        } else {
            0.0
        };
        for node in &mut self.nodes {
            if node.is_sink() {
                node.column = last;
            }
            node.x = node.column as f64 * kx;
            node.dx = self.node_width;
        }
    }

    fn nodes_by_column(&self) -> Vec<Vec<NodeId>> {
        let mut by_column = vec![Vec::new(); self.columns.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            by_column[node.column].push(NodeId(idx));
        }
        by_column
    }

    /// The largest scale at which every column, padding included, fits the
    /// layout height.
    fn scale_factor(&self, by_column: &[Vec<NodeId>]) -> Result<f64, LayoutError> {
        let mut ky = f64::INFINITY;
        for (column, members) in by_column.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let total: f64 = members.iter().map(|id| self.nodes[id.0].value).sum();
            if total <= 0.0 {
                return Err(LayoutError::DegenerateColumn {
                    column: self.columns[column].clone(),
                });
            }
            let padding = (members.len() - 1) as f64 * self.node_padding;
            let available = self.height - padding;
            if available < 0.0 {
                return Err(LayoutError::ColumnOverflow {
                    column: self.columns[column].clone(),
                    required: padding,
                    available: self.height,
                });
            }
            ky = ky.min(available / total);
        }
        Ok(if ky.is_finite() { ky } else { 0.0 })
    }

    fn initialize_node_depths(&mut self, by_column: &[Vec<NodeId>]) {
        for members in by_column {
            for (idx, id) in members.iter().enumerate() {
                let node = &mut self.nodes[id.0];
                node.y = idx as f64;
                node.dy = node.value * self.ky;
            }
        }
        for link in &mut self.links {
            link.dy = link.value * self.ky;
        }
    }
}

fn f64_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::LinkSpec;

    const EPS: f64 = 1e-9;

    fn graph(columns: &[&str], nodes: &[&str], links: &[(usize, usize, f64)]) -> FlowGraph {
        FlowGraph {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            nodes: nodes.iter().map(|n| NodeSpec::new(*n)).collect(),
            links: links
                .iter()
                .map(|&(source, target, value)| LinkSpec::new(source, target, value))
                .collect(),
        }
    }

    fn node<'a>(layout: &'a SankeyGraph, name: &str) -> &'a Node {
        layout.node(layout.find_node(name).unwrap())
    }

    fn assert_no_overlap(layout: &SankeyGraph) {
        for column in 0..layout.columns().len() {
            let mut members: Vec<&Node> =
                layout.nodes().iter().filter(|n| n.column == column).collect();
            members.sort_by(|a, b| f64_cmp(a.y, b.y));
            for pair in members.windows(2) {
                assert!(
                    pair[0].y + pair[0].dy + layout.node_padding() <= pair[1].y + EPS,
                    "{} overlaps {}",
                    pair[0].name,
                    pair[1].name
                );
            }
            for n in members {
                assert!(n.y >= -EPS, "{} above the top edge", n.name);
                assert!(n.y + n.dy <= layout.height() + EPS, "{} below the bottom edge", n.name);
            }
        }
    }

    #[test]
    fn prefix_matching_example() {
        let input = graph(&["A", "B"], &["A0", "B0", "B1"], &[(0, 1, 10.0), (0, 2, 5.0)]);
        let layout = Sankey::new()
            .size(100.0, 100.0)
            .column_match(ColumnMatch::Prefix)
            .layout(&input, 32)
            .unwrap();

        let a0 = node(&layout, "A0");
        assert_eq!((a0.value, a0.column), (15.0, 0));
        let b0 = node(&layout, "B0");
        let b1 = node(&layout, "B1");
        assert_eq!((b0.value, b0.column), (10.0, 1));
        assert_eq!((b1.value, b1.column), (5.0, 1));

        assert!((layout.ky() - 92.0 / 15.0).abs() < EPS);
        let thick = layout.links()[0].dy;
        let thin = layout.links()[1].dy;
        assert!((thick / thin - 2.0).abs() < EPS);
        assert_eq!(b1.x, 100.0 - 24.0);
        assert_no_overlap(&layout);
    }

    #[test]
    fn explicit_categories_override_names() {
        let mut input = graph(&["first", "second"], &["x", "y"], &[(0, 1, 1.0)]);
        input.nodes[0] = NodeSpec::new("x").with_category("first");
        input.nodes[1] = NodeSpec::new("y").with_category("second");
        let layout = Sankey::new().size(50.0, 50.0).layout(&input, 4).unwrap();
        assert_eq!(node(&layout, "x").column, 0);
        assert_eq!(node(&layout, "y").column, 1);
    }

    #[test]
    fn from_config_copies_engine_settings() {
        let config = LayoutConfig {
            node_width: 12.0,
            node_padding: 3.0,
            width: 640.0,
            height: 320.0,
            ..LayoutConfig::default()
        };
        let sankey = Sankey::from_config(&config);
        assert_eq!(sankey.get_node_width(), 12.0);
        assert_eq!(sankey.get_node_padding(), 3.0);
        assert_eq!(sankey.get_size(), (640.0, 320.0));
        assert_eq!(Sankey::new().get_size(), (1.0, 1.0));
    }

    #[test]
    fn category_matching_requires_separator() {
        let columns = ["safety".to_string(), "safetyX".to_string()];
        let category = ColumnMatch::default();
        assert_eq!(category.column_of(&NodeSpec::new("safety-high"), &columns), Some(0));
        assert_eq!(category.column_of(&NodeSpec::new("safetyX-high"), &columns), Some(1));
        assert_eq!(category.column_of(&NodeSpec::new("safetyY-high"), &columns), None);
        assert_eq!(ColumnMatch::Prefix.column_of(&NodeSpec::new("safetyX1"), &columns), Some(1));
        assert_eq!(ColumnMatch::Prefix.column_of(&NodeSpec::new("safetyY"), &columns), Some(0));
    }

    #[test]
    fn missing_reference_is_rejected() {
        let input = graph(&["A", "B"], &["A-0", "B-0"], &[(0, 1, 1.0), (0, 7, 1.0)]);
        let err = Sankey::new().size(10.0, 10.0).layout(&input, 1).unwrap_err();
        assert_eq!(
            err,
            LayoutError::MissingReference {
                link: 1,
                node: NodeRef::Index(7)
            }
        );

        let mut input = graph(&["A", "B"], &["A-0", "B-0"], &[]);
        input.links.push(LinkSpec::named("A-0", "B-9", 1.0));
        let err = Sankey::new().layout(&input, 1).unwrap_err();
        assert!(matches!(err, LayoutError::MissingReference { link: 0, .. }));
    }

    #[test]
    fn unmatched_node_is_rejected() {
        let input = graph(&["A", "B"], &["A-0", "C-0"], &[(0, 1, 1.0)]);
        let err = Sankey::new().layout(&input, 1).unwrap_err();
        assert_eq!(
            err,
            LayoutError::ColumnUnassigned {
                name: "C-0".to_string()
            }
        );
    }

    #[test]
    fn zero_flow_column_is_rejected() {
        let input = graph(&["A", "B"], &["A-0", "B-0"], &[(0, 1, 0.0)]);
        let err = Sankey::new().size(10.0, 10.0).layout(&input, 1).unwrap_err();
        assert_eq!(
            err,
            LayoutError::DegenerateColumn {
                column: "A".to_string()
            }
        );
    }

    #[test]
    fn negative_and_nan_values_are_rejected() {
        let input = graph(&["A", "B"], &["A-0", "B-0"], &[(0, 1, -1.0)]);
        assert!(matches!(
            Sankey::new().layout(&input, 1),
            Err(LayoutError::InvalidValue { link: 0, .. })
        ));
        let input = graph(&["A", "B"], &["A-0", "B-0"], &[(0, 1, f64::NAN)]);
        assert!(matches!(
            Sankey::new().layout(&input, 1),
            Err(LayoutError::InvalidValue { link: 0, .. })
        ));
    }

    #[test]
    fn padding_taller_than_layout_is_rejected() {
        let input = graph(
            &["A", "B"],
            &["A-0", "B-0", "B-1", "B-2"],
            &[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)],
        );
        let err = Sankey::new()
            .node_padding(60.0)
            .size(100.0, 100.0)
            .layout(&input, 1)
            .unwrap_err();
        assert!(matches!(err, LayoutError::ColumnOverflow { ref column, .. } if column == "B"));
    }

    #[test]
    fn node_value_is_max_of_inflow_and_outflow() {
        let input = graph(
            &["A", "B", "C"],
            &["A-0", "B-0", "C-0", "C-1"],
            &[(0, 1, 2.0), (1, 2, 3.0), (1, 3, 2.0)],
        );
        let layout = Sankey::new().size(300.0, 200.0).layout(&input, 8).unwrap();
        assert_eq!(node(&layout, "B-0").value, 5.0);
        assert_eq!(node(&layout, "A-0").value, 2.0);
        assert_no_overlap(&layout);
    }

    #[test]
    fn sinks_move_to_last_column_but_keep_color_group() {
        let input = graph(
            &["A", "B", "C"],
            &["A-0", "A-1", "B-0", "B-1", "C-0"],
            &[(0, 2, 2.0), (2, 4, 2.0), (1, 3, 1.0)],
        );
        let layout = Sankey::new().size(224.0, 100.0).layout(&input, 16).unwrap();
        let b1 = node(&layout, "B-1");
        assert_eq!(b1.category_column, 1);
        assert_eq!(b1.column, 2);
        assert_eq!(b1.x, 200.0);
        assert_eq!(node(&layout, "B-0").x, 100.0);

        let mut b_ids: Vec<usize> = [node(&layout, "B-0"), b1].iter().map(|n| n.color_id).collect();
        b_ids.sort();
        assert_eq!(b_ids, vec![0, 1]);
        assert_eq!(node(&layout, "C-0").color_id, 0);
    }

    #[test]
    fn color_ids_follow_vertical_order() {
        let input = graph(
            &["A", "B"],
            &["A-0", "A-1", "A-2", "B-0"],
            &[(0, 3, 1.0), (1, 3, 1.0), (2, 3, 1.0)],
        );
        let layout = Sankey::new().size(100.0, 100.0).layout(&input, 8).unwrap();
        let mut column_a: Vec<&Node> = layout.nodes().iter().filter(|n| n.column == 0).collect();
        column_a.sort_by(|a, b| f64_cmp(a.y, b.y));
        let ids: Vec<usize> = column_a.iter().map(|n| n.color_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn single_column_stays_at_origin() {
        let input = graph(&["A"], &["A-0", "A-1"], &[(0, 1, 1.0)]);
        let layout = Sankey::new().size(100.0, 100.0).layout(&input, 2).unwrap();
        assert!(layout.nodes().iter().all(|n| n.x == 0.0));
        assert_no_overlap(&layout);
    }

    fn crossing() -> FlowGraph {
        graph(
            &["A", "B"],
            &["A-0", "A-1", "B-0", "B-1"],
            &[(0, 3, 3.0), (1, 2, 1.0)],
        )
    }

    #[test]
    fn relaxation_uncrosses_links() {
        let sankey = Sankey::new().node_padding(10.0).size(100.0, 100.0);
        let initial = sankey.layout(&crossing(), 0).unwrap();
        assert!((initial.ky() - 22.5).abs() < EPS);
        assert!((node(&initial, "A-0").y - 0.0).abs() < EPS);
        assert!((node(&initial, "A-1").y - 77.5).abs() < EPS);
        assert!((initial.link_bend() - 7062.5).abs() < 1e-6);

        let relaxed = sankey.layout(&crossing(), 1).unwrap();
        assert!((node(&relaxed, "A-1").y - 0.0).abs() < 1e-6);
        assert!((node(&relaxed, "A-0").y - 32.5).abs() < 1e-6);
        assert!((node(&relaxed, "B-0").y - 0.0).abs() < 1e-6);
        assert!((node(&relaxed, "B-1").y - 32.5).abs() < 1e-6);
        assert!(relaxed.link_bend() < 1e-6);

        let more = sankey.layout(&crossing(), 32).unwrap();
        assert!(more.link_bend() <= relaxed.link_bend() + 1e-6);
        assert_no_overlap(&more);
    }

    #[test]
    fn repeated_layouts_are_identical() {
        let input = graph(
            &["A", "B", "C"],
            &["A-0", "A-1", "B-0", "B-1", "B-2", "C-0", "C-1"],
            &[
                (0, 2, 4.0),
                (0, 3, 1.0),
                (1, 3, 2.0),
                (1, 4, 6.0),
                (2, 5, 3.0),
                (3, 6, 3.0),
                (4, 5, 2.0),
                (4, 6, 4.0),
            ],
        );
        let sankey = Sankey::new().size(600.0, 400.0);
        let first = sankey.layout(&input, 32).unwrap();
        let second = sankey.layout(&input, 32).unwrap();
        assert_eq!(first, second);
        assert_no_overlap(&first);
    }

    #[test]
    fn relayout_only_restacks_links() {
        let input = graph(&["A", "B"], &["A-0", "B-0", "B-1"], &[(0, 1, 1.0), (0, 2, 1.0)]);
        let sankey = Sankey::new().node_padding(10.0).size(100.0, 100.0);
        let mut layout = sankey.layout(&input, 0).unwrap();
        assert_eq!(layout.links()[0].sy, 0.0);
        assert_eq!(layout.links()[1].sy, 45.0);

        let b0 = layout.find_node("B-0").unwrap();
        let b1 = layout.find_node("B-1").unwrap();
        layout.move_node(b1, 76.0, 0.0);
        layout.move_node(b0, 76.0, 55.0);
        let moved: Vec<Node> = layout.nodes().to_vec();

        sankey.relayout(&mut layout);
        assert_eq!(layout.links()[1].sy, 0.0);
        assert_eq!(layout.links()[0].sy, 45.0);
        let positions = |nodes: &[Node]| -> Vec<(f64, f64, usize)> {
            nodes.iter().map(|n| (n.x, n.y, n.column)).collect()
        };
        assert_eq!(positions(layout.nodes()), positions(&moved));
    }

    #[test]
    fn move_node_clamps_to_bounds() {
        let input = graph(&["A", "B"], &["A-0", "B-0"], &[(0, 1, 1.0)]);
        let mut layout = Sankey::new().size(100.0, 80.0).layout(&input, 0).unwrap();
        let id = layout.find_node("B-0").unwrap();
        layout.move_node(id, 500.0, -3.0);
        assert_eq!((layout.node(id).x, layout.node(id).y), (76.0, 0.0));
    }

    #[test]
    fn link_stacks_fill_node_height() {
        let input = graph(
            &["A", "B"],
            &["A-0", "A-1", "B-0", "B-1"],
            &[(0, 2, 3.0), (0, 3, 2.0), (1, 2, 1.0)],
        );
        let layout = Sankey::new().size(200.0, 120.0).layout(&input, 8).unwrap();
        for n in layout.nodes() {
            let out: f64 = n.source_links.iter().map(|&id| layout.link(id).dy).sum();
            let inc: f64 = n.target_links.iter().map(|&id| layout.link(id).dy).sum();
            assert!(out <= n.dy + EPS && inc <= n.dy + EPS, "{}", n.name);
            assert!((out.max(inc) - n.dy).abs() < EPS, "{}", n.name);
        }
    }
}
