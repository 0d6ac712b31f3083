use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use clap::Parser;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;

use crate::config::EditorConfig;
use crate::edge::EdgeCreation;
use crate::geometry::Side;
use crate::graph::{Node, NodeId};
use crate::session::{EditorEvent, EditorSession};

/// Arguments for running the treedraw editor server
#[derive(Debug, Clone, Parser)]
#[command(name = "treedraw serve", about = "Start the treedraw editor server.")]
pub struct ServeArgs {
    /// Share link (or bare snapshot payload) to open on startup.
    #[arg(short = 'l', long = "link")]
    pub link: Option<String>,

    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5151)]
    pub port: u16,

    /// Background color for rendered SVG previews.
    #[arg(long = "background-color")]
    pub background_color: Option<String>,

    /// Base URL for generated share links (defaults to the server address).
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// JSON file with geometry, animation and render settings.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

struct ServeState {
    session: Mutex<EditorSession>,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreePayload {
    nodes: Vec<Node>,
    edges: Vec<EdgePayload>,
    roots: Vec<NodeId>,
    stubs: Vec<StubPayload>,
    edge_in_progress: EdgeCreation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_edge: Option<[Point; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dragged: Option<NodeId>,
    animating: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgePayload {
    parent: NodeId,
    child: NodeId,
    side: Side,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StubPayload {
    node: NodeId,
    side: Side,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SharePayload {
    link: String,
}

impl TreePayload {
    pub fn from_session(session: &EditorSession) -> Self {
        let graph = session.graph();
        let edge = session.edge_state();

        let mut edges = Vec::new();
        let mut stubs = Vec::new();
        for node in graph.nodes() {
            for side in Side::ALL {
                if let Some(child) = node.child(side) {
                    edges.push(EdgePayload {
                        parent: node.id,
                        child,
                        side,
                    });
                } else if session.dragged().is_none() && edge.stub_visible(graph, node.id, side) {
                    stubs.push(StubPayload {
                        node: node.id,
                        side,
                    });
                }
            }
        }

        Self {
            nodes: graph.nodes().cloned().collect(),
            edges,
            roots: graph.roots(),
            stubs,
            edge_in_progress: edge,
            pending_edge: session.preview_edge().map(|(from, to)| [from, to]),
            dragged: session.dragged(),
            animating: session.is_animating(),
        }
    }
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = EditorConfig::load_optional(args.config.as_deref())?;
    if let Some(background) = &args.background_color {
        config.render.background = background.clone();
    }
    let frame_interval = Duration::from_millis(config.animation.frame_interval_ms);

    let session = match &args.link {
        Some(link) => EditorSession::from_link(config, link),
        None => EditorSession::new(config),
    };

    let addr = format!("{}:{}", args.host, args.port);
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| format!("http://{addr}/"));

    let state = Arc::new(ServeState {
        session: Mutex::new(session),
        base_url,
    });

    let ticker = spawn_tick_driver(state.clone(), frame_interval);

    let app = Router::new()
        .route("/api/tree", get(get_tree))
        .route("/api/tree/svg", get(get_svg))
        .route("/api/tree/nodes/:id", delete(delete_node))
        .route("/api/events", post(post_event))
        .route("/api/share", get(get_share).put(put_share))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {addr}"))?;

    tracing::info!(%addr, "editor server listening");
    println!("treedraw server listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server error");

    ticker.abort();
    served
}

/// Steps in-flight animations once per frame; each step runs under the session lock.
fn spawn_tick_driver(state: Arc<ServeState>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let mut session = state.session.lock().await;
            if session.is_animating() {
                session.tick();
            }
        }
    })
}

async fn get_tree(State(state): State<Arc<ServeState>>) -> Json<TreePayload> {
    let session = state.session.lock().await;
    Json(TreePayload::from_session(&session))
}

async fn get_svg(State(state): State<Arc<ServeState>>) -> Result<Response, (StatusCode, String)> {
    let svg = state
        .session
        .lock()
        .await
        .render_svg()
        .map_err(internal_error)?;

    let mut response = Response::new(svg.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("image/svg+xml"),
    );
    Ok(response)
}

async fn post_event(
    State(state): State<Arc<ServeState>>,
    Json(event): Json<EditorEvent>,
) -> Json<TreePayload> {
    let mut session = state.session.lock().await;
    tracing::trace!(?event, "applying event");
    session.apply(event);
    Json(TreePayload::from_session(&session))
}

async fn delete_node(
    State(state): State<Arc<ServeState>>,
    AxumPath(node_id): AxumPath<NodeId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if state.session.lock().await.delete_node(node_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("node '{node_id}' not found")))
    }
}

async fn get_share(State(state): State<Arc<ServeState>>) -> Json<SharePayload> {
    let link = state.session.lock().await.share_link(&state.base_url);
    Json(SharePayload { link })
}

async fn put_share(
    State(state): State<Arc<ServeState>>,
    Json(payload): Json<SharePayload>,
) -> Json<TreePayload> {
    let mut session = state.session.lock().await;
    session.load_link(&payload.link);
    Json(TreePayload::from_session(&session))
}

fn internal_error(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_lists_edges_stubs_and_pending_edge() {
        let mut session = EditorSession::default();
        let a = session.double_click_background(Point::new(0.0, 0.0)).unwrap();
        let b = session.double_click_background(Point::new(-100.0, -100.0)).unwrap();
        session.click_stub(a, Side::Left);
        session.click_node(b);
        session.click_stub(a, Side::Right);
        session.pointer_move(Point::new(80.0, -90.0));

        let payload = TreePayload::from_session(&session);
        assert_eq!(payload.nodes.len(), 2);
        assert_eq!(payload.edges.len(), 1);
        assert_eq!(payload.roots, vec![a]);
        assert_eq!(payload.stubs.len(), 2);
        assert!(payload.pending_edge.is_some());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["edgeInProgress"]["state"], "selecting");
        assert_eq!(json["edges"][0]["side"], "left");
        assert_eq!(json["nodes"][1]["x"], -100.0);
    }
}
