//! # Flora Common Library
//!
//! Shared code for the flora services:
//! - Error type used across crates
//! - TOML bootstrap configuration and compiled defaults
//! - API request/response types shared with clients

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
