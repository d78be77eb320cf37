//! Bidirectional frame relay.
//!
//! Once both sockets are live, frames cross verbatim in both directions with
//! only the type-level conversion between the server-side and client-side
//! WebSocket crates. Per-direction ordering is whatever the transport
//! delivers; the bridge never buffers beyond the frame in flight and imposes
//! no size limit.

use axum::extract::ws::Message as ClientMessage;
use cdp_bridge_runtime::Error;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as BrowserMessage;
use tracing::debug;

use crate::session::{BrowserStream, ClientStream, SessionGuard};

/// Forward frames between the two peers until either side closes or errors.
///
/// The return value is the close trigger; the caller owns teardown. A frame
/// whose destination socket is already gone is dropped silently.
pub(crate) async fn pump(
	session_id: u64,
	guard: &mut SessionGuard,
	client_rx: &mut ClientStream,
	browser_rx: &mut BrowserStream,
) -> Error {
	loop {
		tokio::select! {
			frame = client_rx.next() => match frame {
				Some(Ok(ClientMessage::Close(_))) | None => return Error::PeerClosed,
				Some(Ok(msg)) => {
					if let Some(out) = client_to_browser(msg) {
						debug!(
							target = "bridge.relay",
							session = session_id,
							bytes = out.len(),
							"ui -> cdp"
						);
						if let Some(tx) = guard.browser_tx.as_mut() {
							if let Err(err) = tx.send(out).await {
								return Error::PeerError(format!("browser send: {err}"));
							}
						}
					}
				}
				Some(Err(err)) => return Error::PeerError(err.to_string()),
			},
			frame = browser_rx.next() => match frame {
				Some(Ok(BrowserMessage::Close(_))) | None => return Error::PeerClosed,
				Some(Ok(msg)) => {
					if let Some(out) = browser_to_client(msg) {
						debug!(
							target = "bridge.relay",
							session = session_id,
							"cdp -> ui"
						);
						if let Some(tx) = guard.client_tx.as_mut() {
							if let Err(err) = tx.send(out).await {
								return Error::PeerError(format!("client send: {err}"));
							}
						}
					}
				}
				Some(Err(err)) => return Error::PeerError(err.to_string()),
			},
		}
	}
}

/// Client frame to browser frame. Ping/pong stay with their own transport;
/// close frames are handled by the pump loop.
fn client_to_browser(msg: ClientMessage) -> Option<BrowserMessage> {
	match msg {
		ClientMessage::Text(text) => Some(BrowserMessage::Text(text.as_str().to_owned())),
		ClientMessage::Binary(data) => Some(BrowserMessage::Binary(data.to_vec())),
		ClientMessage::Ping(_) | ClientMessage::Pong(_) | ClientMessage::Close(_) => None,
	}
}

fn browser_to_client(msg: BrowserMessage) -> Option<ClientMessage> {
	match msg {
		BrowserMessage::Text(text) => Some(ClientMessage::Text(text.into())),
		BrowserMessage::Binary(data) => Some(ClientMessage::Binary(data.into())),
		BrowserMessage::Ping(_)
		| BrowserMessage::Pong(_)
		| BrowserMessage::Close(_)
		| BrowserMessage::Frame(_) => None,
	}
}
