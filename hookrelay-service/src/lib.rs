//! Process plumbing shared by the `listener` and `listener-retry` binaries:
//! configuration, CLI conventions, subscriber setup, and the concrete
//! broker and store implementations behind the core seams.

pub mod cli;
pub mod config;
pub mod kafka;
pub mod redis_store;
pub mod telemetry;
