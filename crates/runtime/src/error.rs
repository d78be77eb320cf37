//! Error types for the bridge runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or running one bridge session.
///
/// All of these are local to a single session; none of them crosses session
/// boundaries or takes down the listening process.
#[derive(Debug, Error)]
pub enum Error {
	/// The browser process could not be started.
	#[error("failed to launch browser: {0}")]
	LaunchFailed(String),

	/// The debug HTTP endpoint could not be queried, or answered with a
	/// non-success status.
	#[error("debug endpoint unreachable: {0}")]
	EndpointUnreachable(String),

	/// The browser advertised no page-type target.
	#[error("browser advertised no page target")]
	NoPageTarget,

	/// The page target's debug WebSocket could not be opened.
	#[error("failed to connect to page target: {0}")]
	ConnectFailed(String),

	/// Either peer closed its connection normally.
	#[error("peer closed the connection")]
	PeerClosed,

	/// Either peer's transport raised an error.
	#[error("peer transport error: {0}")]
	PeerError(String),
}

impl Error {
	/// Returns true for a normal peer disconnect, as opposed to a fault.
	pub fn is_disconnect(&self) -> bool {
		matches!(self, Error::PeerClosed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_peer_closed_is_a_normal_disconnect() {
		assert!(Error::PeerClosed.is_disconnect());
		assert!(!Error::NoPageTarget.is_disconnect());
		assert!(!Error::PeerError("reset".to_string()).is_disconnect());
	}
}
