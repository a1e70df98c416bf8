//! # dyno-storage
//!
//! Store access for dynotui.
//! Attribute codec, the remote store seam, scan pagination, chunked batch
//! submission, and an in-memory store for tests and offline use.

pub mod api;
pub mod batch;
pub mod client;
pub mod codec;
pub mod memory;
pub mod pagination;

pub use api::DynamoApi;
pub use batch::{BatchOutcome, StatementFailure};
pub use client::StoreClient;
pub use codec::{AttributeValue, CodecError, WireItem};
pub use memory::MemoryStore;
pub use pagination::{ContinuationToken, ScanPage};
