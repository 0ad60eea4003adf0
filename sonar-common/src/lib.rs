//! # Sonar Common Library
//!
//! Shared code for the sonar services:
//! - Error and result types
//! - TOML configuration model and loading
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
