/// slotkit: named, typed slots for SQLite-backed records
///
/// Attaches dynamically named key/value fields to any model through a
/// many-to-many reference table, with a per-record name-indexed cache and a
/// query helper for loading slots together with their hosts.

// Core configuration and setup
pub mod config;

// Domain errors raised through anyhow
pub mod error;

// SQLite pool creation
pub mod database;

// Slot layer - slot rows, persistence, host relations and their registry
pub mod slot;

// Host record layer - SlotHost trait, transient cache and accessors
pub mod record;

// SELECT builder with slot joins
pub mod query;

// Manager wiring storage, registry and configuration together
pub mod manager;

// Re-export commonly used types for external consumers
pub use error::SlotError;
pub use manager::SlotManager;
pub use query::SelectQuery;
pub use record::{SlotAccessor, SlotHost, SlotState};
pub use slot::{Slot, SlotRef, SlotRelation, SlotType};
