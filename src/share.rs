//! Shareable snapshots: the whole graph as compact JSON, base64url-encoded into a link.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{GraphError, Node, NodeGraph, NodeId};
use crate::input::is_well_formed;
use crate::utils::{query_param, with_query_param};

pub const SHARE_PARAM: &str = "tree";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("snapshot payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("snapshot payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
    #[error("snapshot describes an invalid tree: {0}")]
    Graph(#[from] GraphError),
    #[error("node {0} carries data that cannot be typed into a node")]
    Data(NodeId),
    #[error("link has no 'tree' query parameter")]
    MissingParam,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    v: u32,
    n: Vec<WireNode>,
}

/// `[id, data, x, y, left, right]`
#[derive(Debug, Serialize, Deserialize)]
struct WireNode(NodeId, String, f64, f64, Option<NodeId>, Option<NodeId>);

impl From<&Node> for WireNode {
    fn from(node: &Node) -> Self {
        WireNode(
            node.id,
            node.data.clone(),
            node.x,
            node.y,
            node.left_child_id,
            node.right_child_id,
        )
    }
}

impl From<WireNode> for Node {
    fn from(WireNode(id, data, x, y, left_child_id, right_child_id): WireNode) -> Self {
        Node {
            id,
            data,
            x,
            y,
            left_child_id,
            right_child_id,
        }
    }
}

pub fn encode(graph: &NodeGraph) -> String {
    let snapshot = Snapshot {
        v: SNAPSHOT_VERSION,
        n: graph.nodes().map(WireNode::from).collect(),
    };
    // Positions are finite (`create_node`, `reposition`), so this cannot fail.
    let json = serde_json::to_vec(&snapshot).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode(payload: &str) -> Result<NodeGraph, ShareError> {
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim())?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.v != SNAPSHOT_VERSION {
        return Err(ShareError::Version(snapshot.v));
    }
    if let Some(bad) = snapshot.n.iter().find(|node| !is_well_formed(&node.1)) {
        return Err(ShareError::Data(bad.0));
    }
    Ok(NodeGraph::from_nodes(snapshot.n.into_iter().map(Node::from))?)
}

/// [`decode`], degrading to an empty graph when the payload is unusable.
pub fn decode_or_empty(payload: &str) -> NodeGraph {
    decode(payload).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "discarding malformed snapshot");
        NodeGraph::new()
    })
}

pub fn share_link(base: &str, graph: &NodeGraph) -> String {
    with_query_param(base, SHARE_PARAM, &encode(graph))
}

/// Decodes a full share link, or a bare payload when no query string is present.
pub fn graph_from_link(link: &str) -> Result<NodeGraph, ShareError> {
    let link = link.trim();
    if !link.contains('?') {
        return decode(link);
    }
    let payload = query_param(link, SHARE_PARAM).ok_or(ShareError::MissingParam)?;
    decode(payload)
}

pub fn graph_from_link_or_empty(link: &str) -> NodeGraph {
    graph_from_link(link).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "discarding malformed share link");
        NodeGraph::new()
    })
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::geometry::Side;

    fn sample() -> NodeGraph {
        let mut graph = NodeGraph::new();
        let root = graph.create_node(Point::new(120.5, 300.0));
        let left = graph.create_node(Point::new(60.25, 180.0));
        let right = graph.create_node(Point::new(0.1 + 0.2, -1e-7));
        graph.set_data(root, "-1.5").unwrap();
        graph.set_data(left, "42").unwrap();
        graph.set_child(root, Side::Left, Some(left)).unwrap();
        graph.set_child(root, Side::Right, Some(right)).unwrap();
        graph
    }

    #[test]
    fn snapshot_round_trips() {
        let graph = sample();
        assert_eq!(decode(&encode(&graph)).unwrap(), graph);
    }

    #[test]
    fn empty_graph_round_trips() {
        let graph = NodeGraph::new();
        assert!(decode(&encode(&graph)).unwrap().is_empty());
    }

    #[test]
    fn payload_is_url_safe() {
        let payload = encode(&sample());
        assert!(
            payload
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        );
    }

    #[test]
    fn link_round_trips() {
        let graph = sample();
        let link = share_link("https://trees.example/edit", &graph);
        assert!(link.starts_with("https://trees.example/edit?tree="));
        assert_eq!(graph_from_link(&link).unwrap(), graph);
        assert_eq!(graph_from_link(&encode(&graph)).unwrap(), graph);
    }

    #[test]
    fn malformed_payloads_fall_back_to_empty() {
        assert!(matches!(decode("***"), Err(ShareError::Base64(_))));
        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(matches!(decode(&not_json), Err(ShareError::Json(_))));
        let future = URL_SAFE_NO_PAD.encode(r#"{"v":9,"n":[]}"#);
        assert!(matches!(decode(&future), Err(ShareError::Version(9))));
        let dangling = URL_SAFE_NO_PAD.encode(r#"{"v":1,"n":[[0,"",0.0,0.0,5,null]]}"#);
        assert!(matches!(
            decode(&dangling),
            Err(ShareError::Graph(GraphError::UnknownNode(5)))
        ));
        let wordy = URL_SAFE_NO_PAD.encode(r#"{"v":1,"n":[[0,"hello world",0.0,0.0,null,null]]}"#);
        assert!(matches!(decode(&wordy), Err(ShareError::Data(0))));
        let long = URL_SAFE_NO_PAD.encode(r#"{"v":1,"n":[[0,"12",0.0,0.0,null,null],[3,"12345",1.0,1.0,null,null]]}"#);
        assert!(matches!(decode(&long), Err(ShareError::Data(3))));
        assert!(decode_or_empty(&wordy).is_empty());
        assert!(decode_or_empty("!!").is_empty());
        assert!(graph_from_link_or_empty("https://x/?other=1").is_empty());
    }
}
