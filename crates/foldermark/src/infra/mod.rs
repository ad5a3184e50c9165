//! Infrastructure adapters for storage, config, logging, and filesystem events.

pub mod config;
pub mod logging;
pub mod vault;
pub mod watch;
