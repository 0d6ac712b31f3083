//! SVG output of a graph and the transient editing state on top of it.

use std::fmt::Write as FmtWrite;

use anyhow::Result;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::edge::EdgeCreation;
use crate::geometry::Side;
use crate::graph::{NodeGraph, NodeId};
use crate::utils::escape_xml;

const EMPTY_CANVAS: Rect = Rect::new(-240.0, -160.0, 240.0, 160.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RenderOptions {
    pub background: String,
    pub node_radius: f64,
    pub stub_radius: f64,
    pub margin: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: "white".to_string(),
            node_radius: 25.0,
            stub_radius: 6.0,
            margin: 40.0,
        }
    }
}

/// Transient state drawn over the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overlay {
    pub edge: EdgeCreation,
    pub pending_edge: Option<(Point, Point)>,
    pub dragged: Option<NodeId>,
}

/// Flips world coordinates (y up) into SVG coordinates (y down).
struct Frame {
    bounds: Rect,
}

impl Frame {
    fn to_screen(&self, point: Point) -> Point {
        Point::new(point.x - self.bounds.x0, self.bounds.y1 - point.y)
    }
}

fn stub_direction(side: Side) -> Vec2 {
    match side {
        Side::Left => Vec2::new(-0.6, -0.8),
        Side::Right => Vec2::new(0.6, -0.8),
    }
}

fn stub_center(node: Point, side: Side, options: &RenderOptions) -> Point {
    node + stub_direction(side) * (options.node_radius + options.stub_radius + 4.0)
}

fn content_bounds(graph: &NodeGraph, overlay: &Overlay, options: &RenderOptions) -> Rect {
    let mut points = graph.nodes().map(|node| node.position()).peekable();
    let Some(first) = points.peek().copied() else {
        return EMPTY_CANVAS;
    };
    let mut bounds = Rect::from_points(first, first);
    for point in points {
        bounds = bounds.union_pt(point);
    }
    if let Some((from, to)) = overlay.pending_edge {
        bounds = bounds.union_pt(from).union_pt(to);
    }
    let reach = options.node_radius + 2.0 * options.stub_radius + 4.0 + options.margin;
    bounds.inflate(reach, reach)
}

pub fn render_svg(graph: &NodeGraph, overlay: &Overlay, options: &RenderOptions) -> Result<String> {
    let frame = Frame {
        bounds: content_bounds(graph, overlay, options),
    };
    let width = frame.bounds.width();
    let height = frame.bounds.height();

    let mut svg = String::new();
    write!(
        svg,
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="Inter, system-ui, sans-serif">
  <rect width="100%" height="100%" fill="{}" />
"##,
        width,
        height,
        width,
        height,
        escape_xml(&options.background)
    )?;

    for node in graph.nodes() {
        for side in Side::ALL {
            let Some(child) = node.child(side).and_then(|id| graph.get(id)) else {
                continue;
            };
            let a = frame.to_screen(node.position());
            let b = frame.to_screen(child.position());
            writeln!(
                svg,
                "  <line class=\"edge\" data-parent=\"{}\" data-child=\"{}\" data-side=\"{}\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#2d3748\" stroke-width=\"2\" />",
                node.id, child.id, side, a.x, a.y, b.x, b.y
            )?;
        }
    }

    if let Some((from, to)) = overlay.pending_edge {
        let a = frame.to_screen(from);
        let b = frame.to_screen(to);
        writeln!(
            svg,
            "  <line class=\"edge-in-creation\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#718096\" stroke-width=\"2\" stroke-dasharray=\"6 4\" />",
            a.x, a.y, b.x, b.y
        )?;
    }

    for node in graph.nodes() {
        let center = frame.to_screen(node.position());
        let stroke = if overlay.dragged == Some(node.id) {
            "#3182ce"
        } else {
            "#2d3748"
        };
        writeln!(
            svg,
            "  <g class=\"node\" data-id=\"{}\">\n    <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"#edf2f7\" stroke=\"{}\" stroke-width=\"2\" />",
            node.id, center.x, center.y, options.node_radius, stroke
        )?;
        if !node.data.is_empty() {
            writeln!(
                svg,
                "    <text x=\"{:.1}\" y=\"{:.1}\" fill=\"#1a202c\" font-size=\"14\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
                center.x,
                center.y,
                escape_xml(&node.data)
            )?;
        }
        svg.push_str("  </g>\n");

        if overlay.dragged.is_some() {
            continue;
        }
        for side in Side::ALL {
            if !overlay.edge.stub_visible(graph, node.id, side) {
                continue;
            }
            let stub = frame.to_screen(stub_center(node.position(), side, options));
            writeln!(
                svg,
                "  <circle class=\"stub\" data-id=\"{}\" data-side=\"{}\" cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"#cbd5e0\" />",
                node.id, side, stub.x, stub.y, options.stub_radius
            )?;
        }
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> NodeGraph {
        let mut graph = NodeGraph::new();
        graph.create_node(Point::new(0.0, 0.0));
        graph.create_node(Point::new(-60.0, -80.0));
        graph.set_child(0, Side::Left, Some(1)).unwrap();
        graph.set_data(1, "<3").unwrap();
        graph
    }

    #[test]
    fn renders_edges_nodes_and_stubs() {
        let svg = render_svg(&tree(), &Overlay::default(), &RenderOptions::default()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("class=\"edge\" data-parent=\"0\" data-child=\"1\" data-side=\"left\""));
        assert!(svg.contains("&lt;3"));
        assert!(svg.contains("class=\"stub\" data-id=\"0\" data-side=\"right\""));
        assert!(!svg.contains("class=\"stub\" data-id=\"0\" data-side=\"left\""));
        assert_eq!(svg.matches("class=\"stub\"").count(), 3);
    }

    #[test]
    fn child_is_drawn_below_parent() {
        let graph = tree();
        let options = RenderOptions::default();
        let overlay = Overlay::default();
        let frame = Frame {
            bounds: content_bounds(&graph, &overlay, &options),
        };
        let parent = frame.to_screen(graph.get(0).unwrap().position());
        let child = frame.to_screen(graph.get(1).unwrap().position());
        assert!(child.y > parent.y);
        assert!(parent.x > 0.0 && parent.y > 0.0);
    }

    #[test]
    fn pending_edge_and_drag_overlay() {
        let graph = tree();
        let overlay = Overlay {
            edge: EdgeCreation::Selecting {
                source: 0,
                side: Side::Right,
            },
            pending_edge: Some((Point::ZERO, Point::new(50.0, -60.0))),
            dragged: None,
        };
        let svg = render_svg(&graph, &overlay, &RenderOptions::default()).unwrap();
        assert!(svg.contains("edge-in-creation"));
        assert!(!svg.contains("data-id=\"0\" data-side=\"right\""));

        let dragging = Overlay {
            dragged: Some(1),
            ..Overlay::default()
        };
        let svg = render_svg(&graph, &dragging, &RenderOptions::default()).unwrap();
        assert!(!svg.contains("class=\"stub\""));
    }

    #[test]
    fn empty_graph_still_renders_canvas() {
        let svg = render_svg(&NodeGraph::new(), &Overlay::default(), &RenderOptions::default())
            .unwrap();
        assert!(svg.contains("width=\"480\" height=\"320\""));
    }
}
