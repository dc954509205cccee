//! Client-side pieces of kowctl:
//! - HTTP transport to the kowalski backend
//! - the interactive TUI front end
//!
//! The one-shot front end lives in `main.rs` and shares the transport,
//! dispatcher, and render tree with the TUI.

pub mod http;
pub mod tui;

pub use http::ApiClient;
pub use tui::run_tui;
