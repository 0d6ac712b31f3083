//! Editing engine for binary-tree diagrams: nodes on a canvas, left/right links
//! constrained to a cone below the parent, subtree dragging, animated snapping and
//! shareable links.

pub mod animate;
pub mod config;
pub mod drag;
pub mod edge;
pub mod geometry;
pub mod graph;
pub mod input;
pub mod render;
mod reposition;
#[cfg(feature = "server")]
pub mod serve;
pub mod session;
pub mod share;
pub mod utils;

pub use kurbo::{Point, Vec2};

pub use animate::{Animator, Convergence, StepOutcome};
pub use config::{AnimationConfig, ConfigError, EditorConfig};
pub use drag::DragSession;
pub use edge::{EdgeCommit, EdgeCreation, EdgeOutcome, Rejection};
pub use geometry::{GeometryConfig, Placement, Side, Solver, constrain};
pub use graph::{GraphError, Node, NodeGraph, NodeId};
pub use input::{Key, apply_key, is_well_formed};
pub use render::{Overlay, RenderOptions, render_svg};
pub use session::{EditorEvent, EditorSession};
pub use share::{ShareError, decode, decode_or_empty, encode, graph_from_link, share_link};
