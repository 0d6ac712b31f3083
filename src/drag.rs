use kurbo::{Point, Vec2};

use crate::geometry::Solver;
use crate::graph::{NodeGraph, NodeId};

/// Pointer-driven translation of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragSession {
    dragged: Option<NodeId>,
    grab_offset: Vec2,
}

impl DragSession {
    pub fn dragged(&self) -> Option<NodeId> {
        self.dragged
    }

    pub fn grab_offset(&self) -> Vec2 {
        self.grab_offset
    }

    /// Grabs `id` so that it keeps its offset from the pointer while moving.
    pub fn begin(&mut self, graph: &NodeGraph, id: NodeId, pointer: Point) -> bool {
        let Some(node) = graph.get(id) else {
            return false;
        };
        self.dragged = Some(id);
        self.grab_offset = node.position() - pointer;
        tracing::debug!(id, "drag started");
        true
    }

    /// Moves the dragged subtree after the pointer, returning where its root landed.
    ///
    /// An attached node is kept inside its parent's cone.
    pub fn update(&mut self, graph: &mut NodeGraph, solver: &Solver, pointer: Point) -> Option<Point> {
        let id = self.dragged?;
        if !graph.contains(id) {
            self.end();
            return None;
        }

        let mut position = pointer + self.grab_offset;
        if let Some((parent, side)) = graph.parent_of(id) {
            if let Some(parent) = graph.get(parent) {
                position = solver.constrain(position, parent.position(), side).position;
            }
        }

        graph.reposition(id, position);
        Some(position)
    }

    pub fn end(&mut self) -> Option<NodeId> {
        self.grab_offset = Vec2::ZERO;
        self.dragged.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Side;

    #[test]
    fn root_follows_pointer_with_grab_offset() {
        let mut graph = NodeGraph::new();
        let id = graph.create_node(Point::new(100.0, 100.0));
        let mut drag = DragSession::default();
        assert!(drag.begin(&graph, id, Point::new(110.0, 95.0)));
        assert_eq!(drag.grab_offset(), Vec2::new(-10.0, 5.0));

        let landed = drag.update(&mut graph, &Solver::default(), Point::new(210.0, 195.0));
        assert_eq!(landed, Some(Point::new(200.0, 200.0)));
        assert_eq!(graph.get(id).unwrap().position(), Point::new(200.0, 200.0));
    }

    #[test]
    fn attached_node_is_clamped_to_parent_cone() {
        let mut graph = NodeGraph::new();
        let parent = graph.create_node(Point::new(0.0, 0.0));
        let child = graph.create_node(Point::new(-100.0, -100.0));
        let grandchild = graph.create_node(Point::new(-150.0, -200.0));
        graph.set_child(parent, Side::Left, Some(child)).unwrap();
        graph.set_child(child, Side::Left, Some(grandchild)).unwrap();

        let solver = Solver::default();
        let mut drag = DragSession::default();
        drag.begin(&graph, child, Point::new(-100.0, -100.0));
        let landed = drag.update(&mut graph, &solver, Point::new(100.0, 50.0)).unwrap();

        assert!(solver.is_valid(landed, Point::ZERO, Side::Left));
        let child_pos = graph.get(child).unwrap().position();
        let grandchild_pos = graph.get(grandchild).unwrap().position();
        assert_eq!(child_pos, landed);
        assert!(((grandchild_pos - child_pos) - Vec2::new(-50.0, -100.0)).hypot() < 1e-9);
    }

    #[test]
    fn vanished_node_ends_drag() {
        let mut graph = NodeGraph::new();
        let id = graph.create_node(Point::ZERO);
        let mut drag = DragSession::default();
        drag.begin(&graph, id, Point::ZERO);
        graph.delete_node(id);

        assert_eq!(drag.update(&mut graph, &Solver::default(), Point::new(5.0, 5.0)), None);
        assert_eq!(drag.dragged(), None);
    }

    #[test]
    fn update_without_drag_does_nothing() {
        let mut graph = NodeGraph::new();
        graph.create_node(Point::ZERO);
        let mut drag = DragSession::default();
        assert_eq!(drag.update(&mut graph, &Solver::default(), Point::new(1.0, 1.0)), None);
        assert_eq!(drag.end(), None);
    }
}
