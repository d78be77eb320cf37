//! Browser process lifecycle and DevTools target discovery.
//!
//! This crate owns everything that happens before a relay can start: spawning
//! an isolated Chromium with remote debugging enabled, and asking its debug
//! HTTP endpoint for the page target's WebSocket URL. The launcher is a trait
//! so the bridge can be driven by a fake in tests, without a browser binary.

pub mod error;
pub mod launcher;
pub mod resolver;

pub use error::{Error, Result};
pub use launcher::{BrowserHandle, ChromiumLauncher, LaunchOptions, Launcher};
pub use resolver::resolve;
