//! Chromium process management.
//!
//! Spawns an isolated browser with an ephemeral remote-debugging port and
//! reads the advertised DevTools endpoint from its stderr banner. The
//! [`Launcher`] and [`BrowserHandle`] traits keep the process a capability
//! (`launch`, `terminate`) rather than a concrete dependency, so sessions can
//! be tested against fakes.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

const DEVTOOLS_BANNER: &str = "DevTools listening on ";

/// Binary names probed on PATH when no executable is configured.
const CHROMIUM_BINARIES: &[&str] = &[
	"chromium",
	"chromium-browser",
	"google-chrome-stable",
	"google-chrome",
	"chrome",
];

/// Options applied to every browser launch.
///
/// The sandbox flags are fixed: the bridge is expected to run inside
/// containers where the Chromium sandbox cannot initialize.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit browser executable. When unset, well-known Chromium binary
	/// names are probed on PATH.
	pub executable: Option<PathBuf>,
	/// Run without a visible window (the default).
	pub headless: bool,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
		}
	}
}

impl LaunchOptions {
	/// Command-line arguments for the browser process.
	pub fn args(&self) -> Vec<&'static str> {
		let mut args = Vec::new();
		if self.headless {
			args.push("--headless=new");
		}
		args.extend([
			"--no-sandbox",
			"--disable-setuid-sandbox",
			"--disable-dev-shm-usage",
			"--remote-debugging-port=0",
			"about:blank",
		]);
		args
	}
}

/// Starts an isolated, remotely debuggable browser process.
#[async_trait]
pub trait Launcher: Send + Sync {
	async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>>;
}

/// Management handle for one launched browser process.
///
/// A handle is owned by exactly one session and never reused. `terminate` is
/// idempotent; calling it on an already-dead process is a no-op.
#[async_trait]
pub trait BrowserHandle: Send {
	/// Base HTTP URL of the browser's debug endpoint.
	fn debug_endpoint(&self) -> &Url;

	/// Kill the browser process and reap it.
	async fn terminate(&mut self) -> Result<()>;
}

/// Launches a real Chromium via [`tokio::process`].
pub struct ChromiumLauncher;

#[async_trait]
impl Launcher for ChromiumLauncher {
	async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>> {
		let executable = find_executable(options)?;
		debug!(
			target = "bridge.launcher",
			executable = %executable.display(),
			headless = options.headless,
			"spawning browser"
		);

		let mut child = Command::new(&executable)
			.args(options.args())
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| {
				Error::LaunchFailed(format!("failed to spawn {}: {e}", executable.display()))
			})?;

		let stderr = child
			.stderr
			.take()
			.ok_or_else(|| Error::LaunchFailed("browser stderr was not captured".to_string()))?;

		let mut lines = BufReader::new(stderr).lines();
		while let Some(line) = lines
			.next_line()
			.await
			.map_err(|e| Error::LaunchFailed(format!("reading browser stderr: {e}")))?
		{
			let Some(ws_url) = parse_devtools_banner(&line) else {
				continue;
			};
			let endpoint = http_endpoint_from_ws(ws_url)?;
			info!(target = "bridge.launcher", endpoint = %endpoint, "browser ready");

			// Keep draining stderr so the browser never blocks on a full pipe.
			tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });

			return Ok(Box::new(ChromiumHandle {
				child: Some(child),
				endpoint,
			}));
		}

		// stderr hit EOF without a banner: the process is dead or dying.
		let _ = child.start_kill();
		let _ = child.wait().await;
		Err(Error::LaunchFailed(
			"browser exited before advertising a DevTools endpoint".to_string(),
		))
	}
}

/// Handle for a Chromium process spawned by [`ChromiumLauncher`].
pub struct ChromiumHandle {
	child: Option<Child>,
	endpoint: Url,
}

#[async_trait]
impl BrowserHandle for ChromiumHandle {
	fn debug_endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn terminate(&mut self) -> Result<()> {
		if let Some(mut child) = self.child.take() {
			match child.start_kill() {
				Ok(()) => {
					let _ = child.wait().await;
					debug!(target = "bridge.launcher", "browser terminated");
				}
				Err(err) => {
					debug!(target = "bridge.launcher", error = %err, "browser process already gone");
				}
			}
		}
		Ok(())
	}
}

fn find_executable(options: &LaunchOptions) -> Result<PathBuf> {
	if let Some(path) = &options.executable {
		if path.exists() {
			return Ok(path.clone());
		}
		return Err(Error::LaunchFailed(format!(
			"browser executable not found: {}",
			path.display()
		)));
	}

	for name in CHROMIUM_BINARIES {
		if let Ok(path) = which::which(name) {
			return Ok(path);
		}
	}

	Err(Error::LaunchFailed(
		"no chromium executable found on PATH; set --chrome-path or CHROME_PATH".to_string(),
	))
}

/// Extract the WebSocket URL from Chromium's `DevTools listening on ws://…`
/// stderr line.
fn parse_devtools_banner(line: &str) -> Option<&str> {
	let rest = line.trim().strip_prefix(DEVTOOLS_BANNER)?.trim();
	rest.starts_with("ws://").then_some(rest)
}

/// Derive the debug HTTP base URL from the advertised browser WebSocket URL.
fn http_endpoint_from_ws(ws_url: &str) -> Result<Url> {
	let parsed = Url::parse(ws_url)
		.map_err(|e| Error::LaunchFailed(format!("invalid DevTools url {ws_url}: {e}")))?;
	let host = parsed
		.host_str()
		.ok_or_else(|| Error::LaunchFailed(format!("DevTools url has no host: {ws_url}")))?;
	let port = parsed
		.port_or_known_default()
		.ok_or_else(|| Error::LaunchFailed(format!("DevTools url has no port: {ws_url}")))?;
	Url::parse(&format!("http://{host}:{port}/"))
		.map_err(|e| Error::LaunchFailed(format!("deriving debug endpoint: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn banner_line_yields_ws_url() {
		let line = "DevTools listening on ws://127.0.0.1:33412/devtools/browser/abc-def";
		assert_eq!(
			parse_devtools_banner(line),
			Some("ws://127.0.0.1:33412/devtools/browser/abc-def")
		);
	}

	#[test]
	fn unrelated_stderr_lines_are_skipped() {
		assert_eq!(parse_devtools_banner(""), None);
		assert_eq!(parse_devtools_banner("[WARNING] dbus not available"), None);
		assert_eq!(parse_devtools_banner("DevTools listening on http://nope"), None);
	}

	#[test]
	fn http_endpoint_derived_from_ws_url() {
		let endpoint =
			http_endpoint_from_ws("ws://127.0.0.1:33412/devtools/browser/abc-def").unwrap();
		assert_eq!(endpoint.as_str(), "http://127.0.0.1:33412/");
	}

	#[test]
	fn headless_args_include_sandbox_and_debug_flags() {
		let args = LaunchOptions::default().args();
		assert!(args.contains(&"--headless=new"));
		assert!(args.contains(&"--no-sandbox"));
		assert!(args.contains(&"--disable-setuid-sandbox"));
		assert!(args.contains(&"--disable-dev-shm-usage"));
		assert!(args.contains(&"--remote-debugging-port=0"));
	}

	#[test]
	fn headed_mode_drops_headless_flag() {
		let options = LaunchOptions {
			headless: false,
			..LaunchOptions::default()
		};
		assert!(!options.args().contains(&"--headless=new"));
	}

	#[test]
	fn missing_explicit_executable_is_a_launch_failure() {
		let options = LaunchOptions {
			executable: Some(PathBuf::from("/nonexistent/chromium-for-test")),
			..LaunchOptions::default()
		};
		let err = find_executable(&options).unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)));
	}
}
