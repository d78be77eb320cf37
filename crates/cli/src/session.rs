//! Per-connection session controller.
//!
//! Drives one client connection through
//! `Launching → Resolving → Connecting → Relaying → Closed`. Every failure
//! edge lands in `Closed`, whose teardown is idempotent: each owned handle
//! (client socket, browser-debug socket, browser process) is released at most
//! once, and duplicate triggers are harmless.

use std::sync::Arc;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use cdp_bridge_runtime::{BrowserHandle, Error, resolve};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as BrowserMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::relay;
use crate::server::BridgeState;

/// Reserved sentinel id carried by the ready notification. CDP request ids
/// are positive, so the UI can always tell this frame from relayed traffic.
pub(crate) const READY_SENTINEL_ID: i64 = -1;

pub(crate) type ClientSink = SplitSink<WebSocket, ClientMessage>;
pub(crate) type ClientStream = SplitStream<WebSocket>;
pub(crate) type BrowserSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type BrowserSink = SplitSink<BrowserSocket, BrowserMessage>;
pub(crate) type BrowserStream = SplitStream<BrowserSocket>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
	Launching,
	Resolving,
	Connecting,
	Relaying,
	Closed,
}

/// Handles owned by one session, released exactly once by [`close`].
///
/// Everything is an `Option` so that teardown can run from any state and
/// tolerate handles that were never acquired or are already gone.
///
/// [`close`]: SessionGuard::close
pub(crate) struct SessionGuard {
	pub(crate) client_tx: Option<ClientSink>,
	pub(crate) browser_tx: Option<BrowserSink>,
	pub(crate) browser: Option<Box<dyn BrowserHandle>>,
}

impl SessionGuard {
	async fn close(&mut self) {
		if let Some(mut tx) = self.client_tx.take() {
			let _ = tx.close().await;
		}
		if let Some(mut tx) = self.browser_tx.take() {
			let _ = tx.close().await;
		}
		if let Some(mut browser) = self.browser.take() {
			if let Err(err) = browser.terminate().await {
				warn!(target = "bridge.session", error = %err, "terminating browser failed");
			}
		}
	}
}

struct Session {
	id: u64,
	state: SessionState,
	guard: SessionGuard,
}

/// Entry point for one accepted client socket.
pub(crate) async fn handle(bridge: Arc<BridgeState>, socket: WebSocket) {
	let id = bridge.next_session_id();
	info!(target = "bridge.session", session = id, "client connected");

	let (client_tx, mut client_rx) = socket.split();
	let mut session = Session::new(id, client_tx);

	let outcome = session.run(&bridge, &mut client_rx).await;
	if outcome.is_disconnect() {
		info!(target = "bridge.session", session = id, "peer disconnected");
	} else {
		warn!(target = "bridge.session", session = id, error = %outcome, "session failed");
	}

	session.close().await;
	info!(target = "bridge.session", session = id, "session closed");
}

impl Session {
	fn new(id: u64, client_tx: ClientSink) -> Self {
		Self {
			id,
			state: SessionState::Launching,
			guard: SessionGuard {
				client_tx: Some(client_tx),
				browser_tx: None,
				browser: None,
			},
		}
	}

	fn transition(&mut self, next: SessionState) {
		debug!(
			target = "bridge.session",
			session = self.id,
			from = ?self.state,
			to = ?next,
			"state transition"
		);
		self.state = next;
	}

	/// Run the session to completion. The returned error is the close
	/// trigger; a plain [`Error::PeerClosed`] is a normal disconnect.
	async fn run(&mut self, bridge: &BridgeState, client_rx: &mut ClientStream) -> Error {
		let browser_ws = match self.establish(bridge, client_rx).await {
			Ok(ws) => ws,
			Err(err) => return err,
		};

		let (browser_tx, mut browser_rx) = browser_ws.split();
		self.guard.browser_tx = Some(browser_tx);

		if let Err(err) = self.send_ready().await {
			return err;
		}

		self.transition(SessionState::Relaying);
		relay::pump(self.id, &mut self.guard, client_rx, &mut browser_rx).await
	}

	/// Launch the browser, resolve its page target, and open the debug
	/// socket, watching the client socket throughout: a client close or
	/// error cancels setup, and frames arriving before the relay is live are
	/// dropped silently.
	async fn establish(
		&mut self,
		bridge: &BridgeState,
		client_rx: &mut ClientStream,
	) -> Result<BrowserSocket, Error> {
		let id = self.id;
		let setup = async {
			let handle = bridge.launcher.launch(&bridge.launch_options).await?;
			let endpoint = handle.debug_endpoint().clone();
			self.guard.browser = Some(handle);

			self.transition(SessionState::Resolving);
			let ws_url = resolve(&bridge.http, &endpoint).await?;

			self.transition(SessionState::Connecting);
			debug!(
				target = "bridge.session",
				session = id,
				url = %ws_url,
				"connecting to page target"
			);
			let (ws, _) = connect_async(ws_url.as_str())
				.await
				.map_err(|e| Error::ConnectFailed(e.to_string()))?;
			Ok(ws)
		};
		tokio::pin!(setup);

		loop {
			tokio::select! {
				result = &mut setup => return result,
				frame = client_rx.next() => match frame {
					Some(Ok(ClientMessage::Close(_))) | None => return Err(Error::PeerClosed),
					Some(Ok(_)) => {
						debug!(
							target = "bridge.session",
							session = id,
							"dropping client frame received before relay is live"
						);
					}
					Some(Err(err)) => return Err(Error::PeerError(err.to_string())),
				},
			}
		}
	}

	/// Tell the client the bridge is live before any relayed traffic.
	async fn send_ready(&mut self) -> Result<(), Error> {
		let payload = serde_json::json!({ "id": READY_SENTINEL_ID }).to_string();
		if let Some(tx) = self.guard.client_tx.as_mut() {
			tx.send(ClientMessage::Text(payload.into()))
				.await
				.map_err(|e| Error::PeerError(e.to_string()))?;
		}
		Ok(())
	}

	async fn close(&mut self) {
		self.transition(SessionState::Closed);
		self.guard.close().await;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use cdp_bridge_runtime::Result;
	use url::Url;

	use super::*;

	struct CountingHandle {
		endpoint: Url,
		terminated: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl BrowserHandle for CountingHandle {
		fn debug_endpoint(&self) -> &Url {
			&self.endpoint
		}

		async fn terminate(&mut self) -> Result<()> {
			self.terminated.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	fn counting_handle(terminated: Arc<AtomicUsize>) -> Box<dyn BrowserHandle> {
		Box::new(CountingHandle {
			endpoint: Url::parse("http://127.0.0.1:0/").unwrap(),
			terminated,
		})
	}

	#[tokio::test]
	async fn teardown_terminates_browser_exactly_once() {
		let terminated = Arc::new(AtomicUsize::new(0));
		let mut guard = SessionGuard {
			client_tx: None,
			browser_tx: None,
			browser: Some(counting_handle(terminated.clone())),
		};

		guard.close().await;
		guard.close().await;

		assert_eq!(terminated.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn teardown_with_nothing_acquired_is_a_no_op() {
		let mut guard = SessionGuard {
			client_tx: None,
			browser_tx: None,
			browser: None,
		};

		guard.close().await;
		guard.close().await;
	}

	#[test]
	fn ready_sentinel_is_outside_cdp_id_space() {
		assert!(READY_SENTINEL_ID < 0);
		let payload = serde_json::json!({ "id": READY_SENTINEL_ID }).to_string();
		assert_eq!(payload, r#"{"id":-1}"#);
	}
}
