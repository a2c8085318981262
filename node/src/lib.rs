//! Orchestration layer for the concord governance core.
//!
//! The engines in `concord-ledger` and `concord-consensus` are synchronous
//! state machines; this crate is the process around them:
//! - constructs everything once and hands out a [`ValidatorService`] handle
//! - runs one timer-driven checker task per pending item
//! - publishes status transitions on an outbound broadcast channel
//! - loads TOML configuration and initialises structured logging
//! - coordinates graceful shutdown

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod service;
pub mod shutdown;

pub use config::ServiceConfig;
pub use error::NodeError;
pub use events::{EventHub, StatusEvent};
pub use logging::{init_logging, LogFormat};
pub use service::ValidatorService;
pub use shutdown::ShutdownController;
