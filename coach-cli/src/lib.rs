//! # coach-cli
//!
//! The `coach` binary and the pieces it is built from:
//!
//! - [`config::AppConfig`] - flags and environment, and the components built from them
//! - [`commands`] - `build-index`, `eval`, `dashboard`
//! - [`session::SessionContext`] - one user's profile, history and active view
//! - [`repl`] - terminal chat
//! - [`server`] - HTTP API and HTML dashboard

pub mod commands;
pub mod config;
pub mod error;
pub mod repl;
pub mod server;
pub mod session;

pub use config::AppConfig;
pub use error::SessionError;
pub use server::{AppState, ServerConfig, app_router, run_server};
pub use session::{CoachStore, SessionContext, SessionManager, Tab};
