use super::{LinkId, SankeyGraph};

/// Endpoints and control-point abscissae of one link's cubic curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkCurve {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// First control point is `(c0, y0)`.
    pub c0: f64,
    /// Second control point is `(c1, y1)`.
    pub c1: f64,
}

impl LinkCurve {
    pub fn to_path(&self) -> String {
        format!(
            "M{},{}C{},{} {},{} {},{}",
            self.x0, self.y0, self.c0, self.y0, self.c1, self.y1, self.x1, self.y1
        )
    }
}

/// Generates horizontal cubic paths from a link's slot on the source node's
/// right edge to its slot on the target node's left edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPath {
    curvature: f64,
}

impl Default for LinkPath {
    fn default() -> Self {
        Self { curvature: 0.5 }
    }
}

impl LinkPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn curvature(mut self, curvature: f64) -> Self {
        self.curvature = curvature;
        self
    }

    pub fn get_curvature(&self) -> f64 {
        self.curvature
    }

    pub fn curve(&self, graph: &SankeyGraph, id: LinkId) -> LinkCurve {
        let link = graph.link(id);
        let source = graph.node(link.source);
        let target = graph.node(link.target);
        let x0 = source.x + source.dx;
        let x1 = target.x;
        LinkCurve {
            x0,
            y0: source.y + link.sy + link.dy / 2.0,
            x1,
            y1: target.y + link.ty + link.dy / 2.0,
            c0: interpolate(x0, x1, self.curvature),
            c1: interpolate(x0, x1, 1.0 - self.curvature),
        }
    }

    /// SVG path data (`d` attribute) for the link.
    pub fn path(&self, graph: &SankeyGraph, id: LinkId) -> String {
        self.curve(graph, id).to_path()
    }
}

fn interpolate(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FlowGraph, LinkSpec, NodeSpec};
    use crate::layout::Sankey;

    fn two_node_graph() -> SankeyGraph {
        let graph = FlowGraph {
            columns: vec!["a".to_string(), "b".to_string()],
            nodes: vec![NodeSpec::new("a-x"), NodeSpec::new("b-y")],
            links: vec![LinkSpec::new(0, 1, 4.0)],
        };
        Sankey::new()
            .node_width(10.0)
            .node_padding(0.0)
            .size(110.0, 40.0)
            .layout(&graph, 0)
            .unwrap()
    }

    #[test]
    fn default_curvature_puts_controls_at_midpoint() {
        let graph = two_node_graph();
        let path = LinkPath::new().path(&graph, LinkId(0));
        assert_eq!(path, "M10,20C55,20 55,20 100,20");
    }

    #[test]
    fn zero_curvature_degenerates_to_endpoints() {
        let graph = two_node_graph();
        let path = LinkPath::new().curvature(0.0);
        assert_eq!(path.get_curvature(), 0.0);
        assert_eq!(Sankey::new().link().get_curvature(), 0.5);
        let curve = path.curve(&graph, LinkId(0));
        assert_eq!(curve.c0, curve.x0);
        assert_eq!(curve.c1, curve.x1);
    }
}
