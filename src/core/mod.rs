//! Business logic: migration engine, snapshots, post-run analysis

pub mod analyze;
pub mod migrate;
pub mod snapshot;
