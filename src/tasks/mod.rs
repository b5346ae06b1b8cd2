//! Background Tasks Module
//!
//! - TTL Cleanup: purges expired responses from the in-memory store

mod cleanup;

pub use cleanup::spawn_cleanup_task;
