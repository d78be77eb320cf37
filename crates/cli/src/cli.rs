use std::path::PathBuf;

use clap::Parser;

/// Default client-facing port, matching the UI's expectation.
pub const DEFAULT_PORT: u16 = 8081;

/// WebSocket bridge exposing a per-client Chromium DevTools session.
#[derive(Parser, Debug)]
#[command(name = "cdp-bridge")]
#[command(about = "Bridge a UI client to a freshly launched Chromium over CDP")]
#[command(version)]
pub struct Cli {
	/// Port for the client-facing WebSocket server.
	#[arg(short, long, default_value_t = DEFAULT_PORT)]
	pub port: u16,

	/// Interface to bind.
	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Path to a Chromium executable (falls back to $CHROME_PATH, then PATH).
	#[arg(long, value_name = "PATH")]
	pub chrome_path: Option<PathBuf>,

	/// Run the browser with a visible window instead of headless.
	#[arg(long)]
	pub headed: bool,

	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	#[test]
	fn defaults() {
		let cli = Cli::parse_from(["cdp-bridge"]);
		assert_eq!(cli.port, DEFAULT_PORT);
		assert_eq!(cli.host, "127.0.0.1");
		assert!(cli.chrome_path.is_none());
		assert!(!cli.headed);
	}

	#[test]
	fn overrides() {
		let cli = Cli::parse_from([
			"cdp-bridge",
			"--port",
			"9000",
			"--chrome-path",
			"/opt/chromium/chrome",
			"--headed",
			"-vv",
		]);
		assert_eq!(cli.port, 9000);
		assert_eq!(
			cli.chrome_path,
			Some(std::path::PathBuf::from("/opt/chromium/chrome"))
		);
		assert!(cli.headed);
		assert_eq!(cli.verbose, 2);
	}
}
