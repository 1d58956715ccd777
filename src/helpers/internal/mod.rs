//! Internal utility modules
//!
//! Shared by the acquire handlers; none of these know about directives.

pub mod archive;
pub mod cmd;
pub mod fs_utils;
pub mod hash;
