//! Core types and shared functionality for prodex.
//!
//! This crate provides:
//! - The canonical product record and extraction request
//! - Product cache with SQLite backend
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod record;

pub use cache::{CacheDb, ProductStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use record::{ExtractionRequest, ProductRecord};
