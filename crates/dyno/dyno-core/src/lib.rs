//! # dyno-core
//!
//! Core types for the dynotui DynamoDB client.
//! Native value model, table descriptors, the shared error taxonomy,
//! configuration, and the tracing bootstrap.

pub mod config;
pub mod constants;
pub mod errors;
pub mod table;
pub mod telemetry;
pub mod value;

pub use config::DynoConfig;
pub use errors::{ConfigError, RemoteCallError, ValueError};
pub use table::{KeyAttribute, KeyType, TableDescriptor};
pub use value::{Item, Number, Value};
