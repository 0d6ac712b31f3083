//! The editor session: one owner for the graph and every transient gesture.

use anyhow::Result;
use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::animate::{Animator, Convergence};
use crate::config::EditorConfig;
use crate::drag::DragSession;
use crate::edge::{EdgeCreation, EdgeOutcome};
use crate::geometry::{Side, Solver};
use crate::graph::{NodeGraph, NodeId};
use crate::input::{Key, apply_key};
use crate::render::{Overlay, render_svg};
use crate::share;

/// Raw input forwarded by a front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditorEvent {
    DoubleClickBackground { x: f64, y: f64 },
    ClickBackground,
    ClickStub { node: NodeId, side: Side },
    ClickNode { node: NodeId },
    ClickEdge { parent: NodeId, side: Side },
    PointerDown { node: NodeId, x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    KeyDown { node: NodeId, key: Key },
    DeleteNode { node: NodeId },
    Tick,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    config: EditorConfig,
    solver: Solver,
    graph: NodeGraph,
    edge: EdgeCreation,
    drag: DragSession,
    animator: Animator,
    pointer: Option<Point>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_graph(config, NodeGraph::new())
    }

    pub fn with_graph(config: EditorConfig, graph: NodeGraph) -> Self {
        Self {
            solver: Solver::new(config.geometry),
            animator: Animator::new(config.animation.step),
            config,
            graph,
            edge: EdgeCreation::Idle,
            drag: DragSession::default(),
            pointer: None,
        }
    }

    /// Opens a share link; unusable links start an empty diagram.
    pub fn from_link(config: EditorConfig, link: &str) -> Self {
        Self::with_graph(config, share::graph_from_link_or_empty(link))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// A snapshot that later edits will not affect.
    pub fn snapshot(&self) -> NodeGraph {
        self.graph.clone()
    }

    pub fn edge_state(&self) -> EdgeCreation {
        self.edge
    }

    pub fn dragged(&self) -> Option<NodeId> {
        self.drag.dragged()
    }

    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    pub fn is_animating(&self) -> bool {
        !self.animator.is_idle()
    }

    /// Replaces the diagram, dropping every gesture in flight.
    pub fn load_graph(&mut self, graph: NodeGraph) {
        self.graph = graph;
        self.edge.cancel();
        self.drag.end();
        self.animator.clear();
    }

    pub fn load_link(&mut self, link: &str) {
        self.load_graph(share::graph_from_link_or_empty(link));
    }

    pub fn share_link(&self, base: &str) -> String {
        share::share_link(base, &self.graph)
    }

    pub fn apply(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::DoubleClickBackground { x, y } => {
                self.double_click_background(Point::new(x, y));
            }
            EditorEvent::ClickBackground => self.click_background(),
            EditorEvent::ClickStub { node, side } => {
                self.click_stub(node, side);
            }
            EditorEvent::ClickNode { node } => {
                self.click_node(node);
            }
            EditorEvent::ClickEdge { parent, side } => {
                self.click_edge(parent, side);
            }
            EditorEvent::PointerDown { node, x, y } => {
                self.pointer_down(node, Point::new(x, y));
            }
            EditorEvent::PointerMove { x, y } => self.pointer_move(Point::new(x, y)),
            EditorEvent::PointerUp => self.pointer_up(),
            EditorEvent::KeyDown { node, key } => {
                self.key_down(node, key);
            }
            EditorEvent::DeleteNode { node } => {
                self.delete_node(node);
            }
            EditorEvent::Tick => {
                self.tick();
            }
        }
    }

    pub fn double_click_background(&mut self, at: Point) -> Option<NodeId> {
        self.graph.try_create_node(at)
    }

    pub fn click_background(&mut self) {
        self.edge.cancel();
    }

    pub fn click_stub(&mut self, node: NodeId, side: Side) -> bool {
        self.edge.select_stub(&self.graph, node, side)
    }

    /// Completes a pending edge at `node`; a committed edge starts converging.
    pub fn click_node(&mut self, node: NodeId) -> EdgeOutcome {
        let outcome = self.edge.click_node(&mut self.graph, &self.solver, node);
        if let EdgeOutcome::Committed(commit) = &outcome {
            if let Some(child) = self.graph.get(commit.child) {
                self.animator
                    .start(Convergence::new(commit.child, child.position(), commit.target));
            }
        }
        outcome
    }

    /// Detaches the `side` child of `parent`, leaving it as a root in place.
    pub fn click_edge(&mut self, parent: NodeId, side: Side) -> Option<NodeId> {
        if self.edge.is_selecting() {
            return None;
        }
        self.graph.remove_child_link(parent, side)
    }

    pub fn pointer_down(&mut self, node: NodeId, at: Point) -> bool {
        if self.edge.is_selecting() || !at.is_finite() {
            return false;
        }
        self.pointer = Some(at);
        self.drag.begin(&self.graph, node, at)
    }

    pub fn pointer_move(&mut self, at: Point) {
        if !at.is_finite() {
            return;
        }
        self.pointer = Some(at);
        self.drag.update(&mut self.graph, &self.solver, at);
    }

    pub fn pointer_up(&mut self) {
        self.drag.end();
    }

    pub fn key_down(&mut self, node: NodeId, key: Key) -> bool {
        let Some(current) = self.graph.get(node).map(|n| n.data.as_str()) else {
            return false;
        };
        match apply_key(current, key) {
            Some(next) => self.graph.set_data(node, next).is_ok(),
            None => false,
        }
    }

    /// Deletes `node`. Its children stay where they are, so their animations stop too.
    pub fn delete_node(&mut self, node: NodeId) -> bool {
        let Some(removed) = self.graph.delete_node(node) else {
            return false;
        };
        self.animator.cancel(node);
        for child in Side::ALL.into_iter().filter_map(|side| removed.child(side)) {
            self.animator.cancel(child);
        }
        if self.edge.selection().is_some_and(|(source, _)| source == node) {
            self.edge.cancel();
        }
        if self.drag.dragged() == Some(node) {
            self.drag.end();
        }
        true
    }

    /// One animation frame. Returns how many convergences are still running.
    pub fn tick(&mut self) -> usize {
        self.animator.tick(&mut self.graph)
    }

    /// Ticks until every animation has finished or the configured bound is hit.
    pub fn settle(&mut self) -> usize {
        let mut ticks = 0;
        while self.is_animating() && ticks < self.config.animation.max_settle_ticks {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn preview_edge(&self) -> Option<(Point, Point)> {
        self.edge.preview(&self.graph, &self.solver, self.pointer?)
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            edge: self.edge,
            pending_edge: self.preview_edge(),
            dragged: self.drag.dragged(),
        }
    }

    pub fn render_svg(&self) -> Result<String> {
        render_svg(&self.graph, &self.overlay(), &self.config.render)
    }
}
