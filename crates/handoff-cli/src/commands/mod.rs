//! CLI command implementations for Handoff.

pub mod keys;
pub mod serve;
pub mod token;
