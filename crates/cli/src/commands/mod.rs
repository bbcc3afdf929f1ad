//! CLI command implementations

pub mod optimize;
pub mod summary;
