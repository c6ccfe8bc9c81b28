/// Host record layer
///
/// The per-record side of slots: the `SlotHost` trait models implement, the
/// transient cache they carry, and the accessors that read and write through it.

pub mod accessor;
pub mod filter;
pub mod host;

pub use accessor::SlotAccessor;
pub use host::{SlotHost, SlotState};
