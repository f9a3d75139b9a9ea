//! Infrastructure adapters and runtime bootstrap.

pub mod cache;
pub mod db;
pub mod error;
pub mod events;
pub mod http;
pub mod memory;
pub mod telemetry;
