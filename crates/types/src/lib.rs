// crates/types/src/lib.rs
//! Shared value types for rcview.
//!
//! Everything here is plain data: the daemon's wire shapes and the immutable
//! status snapshots the job engine hands to observers.

pub mod daemon;
pub mod job;
pub mod listing;

pub use daemon::*;
pub use job::*;
pub use listing::*;
