/// Slot Layer
///
/// Slot rows, their persistence, and the many-to-many relations that attach
/// them to host tables:
/// - Type definitions (Slot, SlotType, NewSlot)
/// - SQLite persistence with sqlx
/// - Relation naming/DDL and the ArcSwap registry of installed relations

// Core slot type definitions
pub mod types;

// SQLite persistence for slot rows and reference rows
pub mod storage;

// Host <-> slot reference table definition
pub mod relation;

// Installed relations, keyed by host table
pub mod registry;

// Re-export commonly used types
pub use registry::SlotSchema;
pub use relation::SlotRelation;
pub use storage::SlotStorage;
pub use types::{NewSlot, Slot, SlotRef, SlotType};
