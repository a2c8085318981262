//! Abstract storage traits for the concord governance core.
//!
//! Persistence is an injected collaborator: every backend (a database, an
//! in-memory double for testing) implements these traits, and the engines
//! depend only on the traits. Records cross the boundary as serialized
//! bytes so the storage layer stays ignorant of domain types.

pub mod cache;
pub mod delegation;
pub mod error;
pub mod meta;
pub mod validation;

pub use cache::ReadCache;
pub use delegation::DelegationStore;
pub use error::StoreError;
pub use meta::MetaStore;
pub use validation::ValidationStore;
