//! DevTools target discovery.
//!
//! One `GET {endpoint}/json` against the browser's debug HTTP endpoint, then
//! the first page-type target wins. No retry: the endpoint is expected to be
//! reachable as soon as the launcher has seen the DevTools banner.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// One record from the debug endpoint's target list.
#[derive(Debug, Deserialize)]
pub struct Target {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: Option<String>,
}

/// Resolve the debug WebSocket URL of the browser's page target.
///
/// Fails with [`Error::EndpointUnreachable`] when the request does not
/// succeed or the response cannot be read, and with [`Error::NoPageTarget`]
/// when no page-type target with a debugger URL is advertised.
pub async fn resolve(client: &reqwest::Client, endpoint: &Url) -> Result<Url> {
	let url = endpoint
		.join("json")
		.map_err(|e| Error::EndpointUnreachable(format!("invalid endpoint {endpoint}: {e}")))?;

	let response = client
		.get(url)
		.send()
		.await
		.map_err(|e| Error::EndpointUnreachable(e.to_string()))?
		.error_for_status()
		.map_err(|e| Error::EndpointUnreachable(e.to_string()))?;

	let targets: Vec<Target> = response
		.json()
		.await
		.map_err(|e| Error::EndpointUnreachable(format!("malformed target list: {e}")))?;

	debug!(target = "bridge.resolver", count = targets.len(), "target list fetched");

	let ws_url = targets
		.into_iter()
		.filter(|t| t.kind == "page")
		.find_map(|t| t.web_socket_debugger_url)
		.ok_or(Error::NoPageTarget)?;

	Url::parse(&ws_url)
		.map_err(|e| Error::EndpointUnreachable(format!("invalid debugger url {ws_url}: {e}")))
}

#[cfg(test)]
mod tests {
	use axum::http::StatusCode;
	use axum::routing::get;
	use axum::{Json, Router};

	use super::*;

	async fn serve(app: Router) -> Url {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		Url::parse(&format!("http://{addr}/")).unwrap()
	}

	#[tokio::test]
	async fn selects_first_page_target() {
		let app = Router::new().route(
			"/json",
			get(|| async {
				Json(serde_json::json!([
					{
						"type": "background_page",
						"webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/BG"
					},
					{
						"type": "page",
						"title": "first",
						"webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/AAA"
					},
					{
						"type": "page",
						"title": "second",
						"webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/BBB"
					}
				]))
			}),
		);
		let endpoint = serve(app).await;

		let ws_url = resolve(&reqwest::Client::new(), &endpoint).await.unwrap();
		assert_eq!(ws_url.as_str(), "ws://127.0.0.1:9222/devtools/page/AAA");
	}

	#[tokio::test]
	async fn missing_page_target_fails() {
		let app = Router::new().route(
			"/json",
			get(|| async {
				Json(serde_json::json!([
					{
						"type": "service_worker",
						"webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/SW"
					}
				]))
			}),
		);
		let endpoint = serve(app).await;

		let err = resolve(&reqwest::Client::new(), &endpoint).await.unwrap_err();
		assert!(matches!(err, Error::NoPageTarget));
	}

	#[tokio::test]
	async fn server_error_is_endpoint_unreachable() {
		let app = Router::new().route(
			"/json",
			get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
		);
		let endpoint = serve(app).await;

		let err = resolve(&reqwest::Client::new(), &endpoint).await.unwrap_err();
		assert!(matches!(err, Error::EndpointUnreachable(_)));
	}

	#[tokio::test]
	async fn dead_endpoint_is_unreachable() {
		// Bind then drop, so the port is known-closed.
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);
		let endpoint = Url::parse(&format!("http://{addr}/")).unwrap();

		let err = resolve(&reqwest::Client::new(), &endpoint).await.unwrap_err();
		assert!(matches!(err, Error::EndpointUnreachable(_)));
	}
}
