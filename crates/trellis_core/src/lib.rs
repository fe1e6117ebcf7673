//! Trellis Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! Everything here is shared by the planner and the command-line front end.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hash;
pub mod id;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use hash::{Hash, HashError};
pub use id::{EntityId, EntityKind};
