//! Shared types for the concord governance core.
//!
//! Everything here is deliberately small: opaque identifiers handed out by
//! external collaborators (accounts) or by the core itself (delegations,
//! items, decisions), and the Unix-seconds timestamp every operation
//! receives as an explicit parameter.

pub mod account;
pub mod id;
pub mod time;

pub use account::AccountId;
pub use id::{DecisionId, DelegationId, ItemId};
pub use time::{Clock, SystemClock, Timestamp};
