//! Shared building blocks for the garage workspace: logging bootstrap and
//! the small response types every binary exposes.

pub mod types;
pub mod utils;
