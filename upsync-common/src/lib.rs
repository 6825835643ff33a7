//! # Upsync Common Library
//!
//! Shared code for the upsync client crates:
//! - Record and request/response wire types
//! - Event types (UpsyncEvent enum) and the EventBus
//! - Configuration loading
//! - Timestamp helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use api::Record;
pub use config::ClientConfig;
pub use error::{Error, Result};
