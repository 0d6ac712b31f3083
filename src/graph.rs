use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Side;

pub type NodeId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub data: String,
    pub x: f64,
    pub y: f64,
    pub left_child_id: Option<NodeId>,
    pub right_child_id: Option<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, position: Point) -> Self {
        Self {
            id,
            data: String::new(),
            x: position.x,
            y: position.y,
            left_child_id: None,
            right_child_id: None,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left_child_id,
            Side::Right => self.right_child_id,
        }
    }

    fn child_slot(&mut self, side: Side) -> &mut Option<NodeId> {
        match side {
            Side::Left => &mut self.left_child_id,
            Side::Right => &mut self.right_child_id,
        }
    }

    pub(crate) fn move_to(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0} appears more than once")]
    DuplicateNode(NodeId),
    #[error("node {child} is already the {side} child of node {parent}")]
    AlreadyAttached {
        child: NodeId,
        parent: NodeId,
        side: Side,
    },
    #[error("linking node {child} under node {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },
    #[error("node {0} has a non-finite position")]
    NonFinitePosition(NodeId),
}

/// Mapping from id to node with copy-on-write storage.
///
/// Cloning is a cheap snapshot: every mutating operation copies the shared map
/// at most once, so snapshots taken earlier never observe later changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeGraph {
    pub(crate) nodes: Arc<BTreeMap<NodeId, Node>>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from loose records, checking every structural invariant.
    pub fn from_nodes(records: impl IntoIterator<Item = Node>) -> Result<Self, GraphError> {
        let mut nodes = BTreeMap::new();
        for node in records {
            if !node.position().is_finite() {
                return Err(GraphError::NonFinitePosition(node.id));
            }
            let id = node.id;
            if nodes.insert(id, node).is_some() {
                return Err(GraphError::DuplicateNode(id));
            }
        }

        let mut parents: BTreeMap<NodeId, (NodeId, Side)> = BTreeMap::new();
        for node in nodes.values() {
            for side in Side::ALL {
                let Some(child) = node.child(side) else {
                    continue;
                };
                if !nodes.contains_key(&child) {
                    return Err(GraphError::UnknownNode(child));
                }
                if child == node.id {
                    return Err(GraphError::WouldCycle {
                        parent: node.id,
                        child,
                    });
                }
                if let Some(&(parent, side)) = parents.get(&child) {
                    return Err(GraphError::AlreadyAttached {
                        child,
                        parent,
                        side,
                    });
                }
                parents.insert(child, (node.id, side));
            }
        }

        // With single parents, a cycle is exactly a loop with no root above it.
        let graph = Self {
            nodes: Arc::new(nodes),
        };
        let mut reached = BTreeSet::new();
        for root in graph.roots() {
            reached.extend(graph.subtree_ids(root));
        }
        if let Some(&id) = graph.nodes.keys().find(|id| !reached.contains(*id)) {
            let parent = parents.get(&id).map(|&(parent, _)| parent).unwrap_or(id);
            return Err(GraphError::WouldCycle { parent, child: id });
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    fn next_free_id(&self) -> NodeId {
        let mut candidate = 0;
        for &id in self.nodes.keys() {
            if id != candidate {
                break;
            }
            candidate += 1;
        }
        candidate
    }

    /// Inserts an empty node at `position` under the smallest unused id.
    ///
    /// `position` must be finite; shared snapshots cannot carry anything else.
    /// Use [`NodeGraph::try_create_node`] for unchecked input.
    pub fn create_node(&mut self, position: Point) -> NodeId {
        debug_assert!(position.is_finite(), "node position must be finite");
        let id = self.next_free_id();
        Arc::make_mut(&mut self.nodes).insert(id, Node::new(id, position));
        tracing::debug!(id, x = position.x, y = position.y, "created node");
        id
    }

    /// [`NodeGraph::create_node`], or `None` when `position` is not finite.
    pub fn try_create_node(&mut self, position: Point) -> Option<NodeId> {
        position.is_finite().then(|| self.create_node(position))
    }

    pub fn set_data(&mut self, id: NodeId, data: impl Into<String>) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id));
        }
        if let Some(node) = Arc::make_mut(&mut self.nodes).get_mut(&id) {
            node.data = data.into();
        }
        Ok(())
    }

    /// Sets or clears the `side` child of `parent`.
    ///
    /// A new child must currently be detached (or already sit in this very slot)
    /// and must not be an ancestor of `parent`. A displaced child becomes a root.
    pub fn set_child(
        &mut self,
        parent: NodeId,
        side: Side,
        child: Option<NodeId>,
    ) -> Result<(), GraphError> {
        let current = self
            .get(parent)
            .ok_or(GraphError::UnknownNode(parent))?
            .child(side);
        if current == child {
            return Ok(());
        }

        if let Some(child) = child {
            if !self.contains(child) {
                return Err(GraphError::UnknownNode(child));
            }
            if let Some((existing, existing_side)) = self.parent_of(child) {
                return Err(GraphError::AlreadyAttached {
                    child,
                    parent: existing,
                    side: existing_side,
                });
            }
            if child == parent || self.subtree_ids(child).contains(&parent) {
                return Err(GraphError::WouldCycle { parent, child });
            }
        }

        if let Some(node) = Arc::make_mut(&mut self.nodes).get_mut(&parent) {
            *node.child_slot(side) = child;
        }
        tracing::debug!(parent, %side, ?child, "updated child link");
        Ok(())
    }

    /// Removes the `side` link of `parent`, returning the detached child.
    pub fn remove_child_link(&mut self, parent: NodeId, side: Side) -> Option<NodeId> {
        let child = self.get(parent)?.child(side)?;
        self.set_child(parent, side, None).ok()?;
        Some(child)
    }

    /// Removes `id` and clears every reference to it. Descendants stay in place as roots.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.contains(id) {
            return None;
        }
        let nodes = Arc::make_mut(&mut self.nodes);
        let removed = nodes.remove(&id)?;
        for node in nodes.values_mut() {
            for side in Side::ALL {
                let slot = node.child_slot(side);
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
        tracing::debug!(id, "deleted node");
        Some(removed)
    }

    /// Pre-order ids of the subtree rooted at `root`: root, left subtree, right subtree.
    ///
    /// Empty when `root` is missing. Each id is visited at most once.
    pub fn subtree_ids(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(node.right_child_id);
            stack.extend(node.left_child_id);
        }
        order
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.parent_of(id).is_none()
    }

    /// The node holding `id` as a child, and in which slot.
    pub fn parent_of(&self, id: NodeId) -> Option<(NodeId, Side)> {
        self.nodes.values().find_map(|node| {
            Side::ALL
                .into_iter()
                .find(|&side| node.child(side) == Some(id))
                .map(|side| (node.id, side))
        })
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.ids().filter(|&id| self.is_root(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(positions: &[(f64, f64)]) -> NodeGraph {
        let mut graph = NodeGraph::new();
        for &(x, y) in positions {
            graph.create_node(Point::new(x, y));
        }
        graph
    }

    #[test]
    fn ids_are_allocated_smallest_first() {
        let mut graph = graph_with(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![0, 1, 2]);

        graph.delete_node(1);
        assert_eq!(graph.create_node(Point::ZERO), 1);
        assert_eq!(graph.create_node(Point::ZERO), 3);
    }

    #[test]
    fn non_finite_positions_are_not_created() {
        let mut graph = NodeGraph::new();
        assert_eq!(graph.try_create_node(Point::new(f64::NAN, 1.0)), None);
        assert_eq!(graph.try_create_node(Point::new(0.0, f64::NEG_INFINITY)), None);
        assert!(graph.is_empty());
        assert_eq!(graph.try_create_node(Point::new(3.0, 4.0)), Some(0));
    }

    #[test]
    fn new_nodes_are_empty_roots() {
        let mut graph = NodeGraph::new();
        let id = graph.create_node(Point::new(4.0, 5.0));
        let node = graph.get(id).unwrap();
        assert_eq!(node.data, "");
        assert_eq!(node.position(), Point::new(4.0, 5.0));
        assert_eq!(node.left_child_id, None);
        assert_eq!(node.right_child_id, None);
        assert!(graph.is_root(id));
    }

    #[test]
    fn set_data_replaces_string() {
        let mut graph = graph_with(&[(0.0, 0.0)]);
        graph.set_data(0, "-1.5").unwrap();
        assert_eq!(graph.get(0).unwrap().data, "-1.5");
        assert_eq!(graph.set_data(9, "1"), Err(GraphError::UnknownNode(9)));
    }

    #[test]
    fn deleting_child_clears_parent_link_and_keeps_grandchildren() {
        let mut graph = graph_with(&[(0.0, 0.0), (-50.0, -50.0), (-90.0, -120.0)]);
        graph.set_child(0, Side::Left, Some(1)).unwrap();
        graph.set_child(1, Side::Left, Some(2)).unwrap();

        let removed = graph.delete_node(1).unwrap();
        assert_eq!(removed.id, 1);
        assert_eq!(graph.get(0).unwrap().left_child_id, None);
        assert_eq!(graph.get(2).unwrap().position(), Point::new(-90.0, -120.0));
        assert!(graph.is_root(2));
        assert!(graph.delete_node(1).is_none());
    }

    #[test]
    fn subtree_is_pre_order() {
        let mut graph = graph_with(&[(0.0, 0.0); 5]);
        graph.set_child(0, Side::Left, Some(1)).unwrap();
        graph.set_child(0, Side::Right, Some(2)).unwrap();
        graph.set_child(1, Side::Right, Some(3)).unwrap();
        graph.set_child(2, Side::Left, Some(4)).unwrap();

        assert_eq!(graph.subtree_ids(0), vec![0, 1, 3, 2, 4]);
        assert_eq!(graph.subtree_ids(2), vec![2, 4]);
        assert!(graph.subtree_ids(42).is_empty());
    }

    #[test]
    fn set_child_rejects_second_parent() {
        let mut graph = graph_with(&[(0.0, 0.0); 3]);
        graph.set_child(0, Side::Left, Some(2)).unwrap();
        assert_eq!(
            graph.set_child(1, Side::Right, Some(2)),
            Err(GraphError::AlreadyAttached {
                child: 2,
                parent: 0,
                side: Side::Left,
            })
        );
        assert_eq!(
            graph.set_child(0, Side::Right, Some(2)),
            Err(GraphError::AlreadyAttached {
                child: 2,
                parent: 0,
                side: Side::Left,
            })
        );
    }

    #[test]
    fn set_child_rejects_cycles() {
        let mut graph = graph_with(&[(0.0, 0.0); 3]);
        graph.set_child(0, Side::Left, Some(1)).unwrap();
        graph.set_child(1, Side::Left, Some(2)).unwrap();
        assert_eq!(
            graph.set_child(2, Side::Right, Some(0)),
            Err(GraphError::WouldCycle {
                parent: 2,
                child: 0
            })
        );
        assert_eq!(
            graph.set_child(1, Side::Right, Some(1)),
            Err(GraphError::WouldCycle {
                parent: 1,
                child: 1
            })
        );
    }

    #[test]
    fn replacing_a_child_detaches_the_old_one() {
        let mut graph = graph_with(&[(0.0, 0.0); 3]);
        graph.set_child(0, Side::Left, Some(1)).unwrap();
        graph.set_child(0, Side::Left, Some(2)).unwrap();
        assert!(graph.is_root(1));
        assert_eq!(graph.parent_of(2), Some((0, Side::Left)));
        assert_eq!(graph.remove_child_link(0, Side::Left), Some(2));
        assert!(graph.is_root(2));
        assert_eq!(graph.remove_child_link(0, Side::Left), None);
    }

    #[test]
    fn snapshots_are_untouched_by_later_mutations() {
        let mut graph = graph_with(&[(0.0, 0.0), (1.0, 1.0)]);
        let before = graph.clone();
        graph.set_data(0, "7").unwrap();
        graph.set_child(0, Side::Right, Some(1)).unwrap();

        assert_eq!(before.get(0).unwrap().data, "");
        assert_eq!(before.get(0).unwrap().right_child_id, None);
        assert_eq!(graph.get(0).unwrap().data, "7");
    }

    #[test]
    fn from_nodes_validates_structure() {
        let mut a = Node::new(0, Point::ZERO);
        let b = Node::new(1, Point::ZERO);
        a.left_child_id = Some(1);
        let graph = NodeGraph::from_nodes([a.clone(), b.clone()]).unwrap();
        assert_eq!(graph.roots(), vec![0]);

        let mut dangling = a.clone();
        dangling.right_child_id = Some(7);
        assert_eq!(
            NodeGraph::from_nodes([dangling, b.clone()]),
            Err(GraphError::UnknownNode(7))
        );

        let mut looped = b.clone();
        looped.left_child_id = Some(0);
        assert!(matches!(
            NodeGraph::from_nodes([a.clone(), looped]),
            Err(GraphError::WouldCycle { .. })
        ));

        assert_eq!(
            NodeGraph::from_nodes([b.clone(), b]),
            Err(GraphError::DuplicateNode(1))
        );
    }
}
