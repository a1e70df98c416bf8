//! Batch write submission: ordered chunks of at most 25 statements with
//! per-statement outcomes.

pub mod outcome;
pub mod writer;

pub use outcome::{BatchOutcome, StatementFailure};
pub use writer::{chunk_ranges, submit_in_chunks};
