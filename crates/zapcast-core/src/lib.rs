//! # zapcast-core
//!
//! Core types, traits, configuration, and error handling for the zapcast bridge.

pub mod campaign;
pub mod config;
pub mod error;
pub mod logbuf;
pub mod phone;
pub mod traits;
