use std::sync::Arc;

use kurbo::{Point, Vec2};

use crate::graph::{NodeGraph, NodeId};

impl NodeGraph {
    /// Rigidly translates the subtree rooted at `root` so that `root` lands on `target`.
    ///
    /// Returns `false` without touching the graph when `root` no longer exists
    /// or `target` is not finite.
    pub fn reposition(&mut self, root: NodeId, target: Point) -> bool {
        if !target.is_finite() {
            return false;
        }
        let Some(node) = self.get(root) else {
            return false;
        };
        let delta = target - node.position();
        if delta == Vec2::ZERO {
            return true;
        }

        let ids = self.subtree_ids(root);
        let nodes = Arc::make_mut(&mut self.nodes);
        for id in ids {
            let Some(node) = nodes.get_mut(&id) else {
                continue;
            };
            if id == root {
                node.move_to(target);
            } else {
                node.move_to(node.position() + delta);
            }
        }
        true
    }

    /// Translates the subtree rooted at `root` by `delta`.
    pub fn translate_subtree(&mut self, root: NodeId, delta: Vec2) -> bool {
        match self.get(root) {
            Some(node) => {
                let target = node.position() + delta;
                self.reposition(root, target)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Vec2};

    use crate::geometry::Side;
    use crate::graph::NodeGraph;

    fn small_tree() -> NodeGraph {
        let mut graph = NodeGraph::new();
        let root = graph.create_node(Point::new(100.0, 100.0));
        let left = graph.create_node(Point::new(50.0, 40.0));
        let right = graph.create_node(Point::new(150.0, 40.0));
        let stray = graph.create_node(Point::new(500.0, 500.0));
        graph.set_child(root, Side::Left, Some(left)).unwrap();
        graph.set_child(root, Side::Right, Some(right)).unwrap();
        assert_eq!(stray, 3);
        graph
    }

    #[test]
    fn moves_whole_subtree_by_same_delta() {
        let mut graph = small_tree();
        assert!(graph.reposition(0, Point::new(130.0, 90.0)));

        assert_eq!(graph.get(0).unwrap().position(), Point::new(130.0, 90.0));
        assert_eq!(graph.get(1).unwrap().position(), Point::new(80.0, 30.0));
        assert_eq!(graph.get(2).unwrap().position(), Point::new(180.0, 30.0));
        assert_eq!(graph.get(3).unwrap().position(), Point::new(500.0, 500.0));
    }

    #[test]
    fn moving_a_child_leaves_parent_alone() {
        let mut graph = small_tree();
        assert!(graph.reposition(1, Point::new(20.0, 0.0)));
        assert_eq!(graph.get(0).unwrap().position(), Point::new(100.0, 100.0));
        assert_eq!(graph.get(1).unwrap().position(), Point::new(20.0, 0.0));
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let mut graph = small_tree();
        let before = graph.clone();
        assert!(graph.reposition(0, Point::new(100.0, 100.0)));
        assert_eq!(graph, before);
    }

    #[test]
    fn missing_root_is_reported() {
        let mut graph = small_tree();
        let before = graph.clone();
        assert!(!graph.reposition(9, Point::ZERO));
        assert!(!graph.translate_subtree(9, Vec2::new(1.0, 1.0)));
        assert_eq!(graph, before);
    }

    #[test]
    fn non_finite_target_is_refused() {
        let mut graph = small_tree();
        let before = graph.clone();
        assert!(!graph.reposition(0, Point::new(f64::NAN, 0.0)));
        assert!(!graph.translate_subtree(1, Vec2::new(0.0, f64::INFINITY)));
        assert_eq!(graph, before);
    }

    #[test]
    fn translate_subtree_shifts_by_delta() {
        let mut graph = small_tree();
        assert!(graph.translate_subtree(0, Vec2::new(-10.0, 5.0)));
        assert_eq!(graph.get(2).unwrap().position(), Point::new(140.0, 45.0));
    }
}
