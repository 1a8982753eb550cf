//! Shared types for stat-mixer

pub mod error;

pub use error::{ErrorCode, MixerError, Result};
