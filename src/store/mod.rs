//! Persistence layer: profile documents keyed by uid.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlProfileStore;
pub use memory::InMemoryProfileStore;
pub use traits::{ProfilePatch, ProfileStore, UserProfile};
