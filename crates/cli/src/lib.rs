//! cdp-bridge: a WebSocket bridge between a UI client and Chromium DevTools.
//!
//! Every accepted client connection gets its own freshly launched browser;
//! the bridge discovers the page target, connects to its debug WebSocket, and
//! relays frames verbatim in both directions until either side goes away.

pub mod cli;
pub mod logging;
pub mod server;

mod relay;
mod session;
