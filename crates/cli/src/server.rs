//! Client-facing WebSocket server.
//!
//! Accepts UI connections and hands each upgraded socket to its own session
//! task. Sessions share nothing mutable; the only shared state is the
//! launcher, the HTTP client used for target discovery, and the fixed launch
//! options.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use cdp_bridge_runtime::{LaunchOptions, Launcher};
use tokio::net::TcpListener;
use tracing::info;

use crate::session;

/// Immutable bundle shared by all sessions.
pub struct BridgeState {
	pub(crate) launcher: Arc<dyn Launcher>,
	pub(crate) http: reqwest::Client,
	pub(crate) launch_options: LaunchOptions,
	next_session: AtomicU64,
}

impl BridgeState {
	pub fn new(launcher: Arc<dyn Launcher>, launch_options: LaunchOptions) -> Self {
		Self {
			launcher,
			http: reqwest::Client::new(),
			launch_options,
			next_session: AtomicU64::new(1),
		}
	}

	pub(crate) fn next_session_id(&self) -> u64 {
		self.next_session.fetch_add(1, Ordering::Relaxed)
	}
}

pub fn router(state: Arc<BridgeState>) -> Router {
	Router::new().route("/", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<BridgeState>>) -> Response {
	ws.on_upgrade(move |socket| session::handle(state, socket))
}

/// Bind the listening socket and serve until the process exits.
pub async fn run(host: &str, port: u16, state: Arc<BridgeState>) -> Result<()> {
	let addr: SocketAddr = format!("{host}:{port}")
		.parse()
		.with_context(|| format!("Invalid host/port combination: {host}:{port}"))?;

	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind bridge server to {addr}"))?;

	info!(target = "bridge", %addr, "bridge listening");

	serve(listener, state).await
}

/// Serve on an already-bound listener. Split out so tests can bind port 0.
pub async fn serve(listener: TcpListener, state: Arc<BridgeState>) -> Result<()> {
	axum::serve(listener, router(state).into_make_service())
		.await
		.context("Bridge server error")
}
