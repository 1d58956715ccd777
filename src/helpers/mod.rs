//! Fetch helpers
//!
//! - **acquire**: per-type handlers, cache resolution, hash verification
//! - **internal**: hashing, archives, atomic file writes, VCS commands

pub mod acquire;
pub mod internal;
