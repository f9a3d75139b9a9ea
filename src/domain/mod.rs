//! Core client types shared by every layer.

pub mod clients;
pub mod entities;
pub mod error;
