//! Ports and use-case orchestration.

pub mod cache;
pub mod clients;
pub mod error;
pub mod events;
pub mod repos;
