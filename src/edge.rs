//! The two-click gesture that connects a parent stub to a root node.

use kurbo::Point;
use serde::Serialize;

use crate::geometry::{Side, Solver};
use crate::graph::{GraphError, NodeGraph, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EdgeCreation {
    #[default]
    Idle,
    Selecting { source: NodeId, side: Side },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCommit {
    pub parent: NodeId,
    pub child: NodeId,
    pub side: Side,
    /// Where the solver wants the child to end up.
    pub target: Point,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotRoot,
    InvalidPlacement,
    TargetMissing,
    SourceMissing,
    Structural(GraphError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeOutcome {
    Committed(EdgeCommit),
    Rejected(Rejection),
    Ignored,
}

impl EdgeCreation {
    pub fn is_selecting(&self) -> bool {
        matches!(self, EdgeCreation::Selecting { .. })
    }

    pub fn selection(&self) -> Option<(NodeId, Side)> {
        match *self {
            EdgeCreation::Idle => None,
            EdgeCreation::Selecting { source, side } => Some((source, side)),
        }
    }

    /// A stub is offered for an empty slot unless it is the one being connected.
    pub fn stub_visible(&self, graph: &NodeGraph, id: NodeId, side: Side) -> bool {
        let Some(node) = graph.get(id) else {
            return false;
        };
        node.child(side).is_none() && self.selection() != Some((id, side))
    }

    pub fn select_stub(&mut self, graph: &NodeGraph, id: NodeId, side: Side) -> bool {
        if !self.stub_visible(graph, id, side) {
            return false;
        }
        *self = EdgeCreation::Selecting { source: id, side };
        tracing::debug!(source = id, %side, "edge gesture started");
        true
    }

    pub fn cancel(&mut self) {
        *self = EdgeCreation::Idle;
    }

    /// Handles a click on `target` while a gesture may be in progress.
    pub fn click_node(
        &mut self,
        graph: &mut NodeGraph,
        solver: &Solver,
        target: NodeId,
    ) -> EdgeOutcome {
        let Some((source, side)) = self.selection() else {
            return EdgeOutcome::Ignored;
        };
        let Some(parent) = graph.get(source).map(|node| node.position()) else {
            self.cancel();
            return EdgeOutcome::Rejected(Rejection::SourceMissing);
        };
        let Some(child) = graph.get(target).map(|node| node.position()) else {
            return EdgeOutcome::Rejected(Rejection::TargetMissing);
        };

        if !graph.is_root(target) {
            return EdgeOutcome::Rejected(Rejection::NotRoot);
        }
        let placement = solver.constrain(child, parent, side);
        if !placement.is_valid {
            return EdgeOutcome::Rejected(Rejection::InvalidPlacement);
        }
        if let Err(err) = graph.set_child(source, side, Some(target)) {
            return EdgeOutcome::Rejected(Rejection::Structural(err));
        }

        self.cancel();
        tracing::debug!(parent = source, child = target, %side, "edge committed");
        EdgeOutcome::Committed(EdgeCommit {
            parent: source,
            child: target,
            side,
            target: placement.position,
        })
    }

    /// The segment drawn while connecting: source position to the constrained pointer.
    pub fn preview(
        &self,
        graph: &NodeGraph,
        solver: &Solver,
        pointer: Point,
    ) -> Option<(Point, Point)> {
        let (source, side) = self.selection()?;
        let parent = graph.get(source)?.position();
        Some((parent, solver.constrain(pointer, parent, side).position))
    }
}
