//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod migrate;
pub mod restore;
pub mod validate;
