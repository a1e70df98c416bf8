//! # dyno-session
//!
//! The session adapter for dynotui. Owns the table list, the browsed item
//! list and the single workflow slot, and runs the workflow's remote effects
//! against the store and the planner.

pub mod error;
pub mod items;
pub mod session;

pub use error::SessionError;
pub use items::{Entry, ItemList};
pub use session::{Notice, Session};
