//! Core infrastructure shared by the parser, handlers and binaries

pub mod config;
pub mod error;
pub mod interrupt;
pub mod output;
