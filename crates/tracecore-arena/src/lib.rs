//! File-backed shared region crossing the agent/collector process boundary.
//!
//! Everything inside the arena is addressed by byte offset from its base,
//! never by pointer — offsets are the only thing that mean the same thing in
//! both processes. [`Arena`] owns the mapping; [`layout`] defines the fixed
//! control header every mapping starts with; [`clock`] provides the
//! cross-process-comparable monotonic clock used to timestamp every record
//! that flows through the arena.

pub mod clock;
mod error;
mod layout;

mod arena;

pub use arena::Arena;
pub use error::ArenaError;
pub use layout::{ControlHeader, CONTROL_HEADER_SIZE, MAGIC, VERSION};
