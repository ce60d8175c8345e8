//! # Breathe Common Library
//!
//! Shared code for the Breathe pollution-reporting services:
//! - Error taxonomy (`Error` enum)
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
