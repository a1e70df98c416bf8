//! Chunked batch submission.
//! Statements go out in order, at most `MAX_BATCH_STATEMENTS` per round-trip,
//! one chunk at a time.

use std::ops::Range;
use std::time::Duration;

use dyno_core::constants::MAX_BATCH_STATEMENTS;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::outcome::BatchOutcome;
use crate::api::DynamoApi;

const NO_RESPONSE: &str = "no response returned for statement";
const NOT_SUBMITTED: &str = "not submitted: batch stopped after an earlier chunk timed out";

/// Contiguous index ranges of at most `chunk_size` statements.
pub fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let size = chunk_size.clamp(1, MAX_BATCH_STATEMENTS);
    (0..total)
        .step_by(size)
        .map(|start| start..(start + size).min(total))
        .collect()
}

/// Submit `statements` in chunks and collect a per-statement outcome.
///
/// A chunk-level service error fails every statement in that chunk and moves
/// on to the next chunk. A chunk that times out is reported as outcome
/// unknown, and the statements after it are not submitted.
pub async fn submit_in_chunks<A: DynamoApi + ?Sized>(
    api: &A,
    statements: &[String],
    chunk_size: usize,
    chunk_timeout: Duration,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::new(statements.len());
    let ranges = chunk_ranges(statements.len(), chunk_size);
    let chunk_count = ranges.len();

    for (chunk_no, range) in ranges.into_iter().enumerate() {
        let chunk = &statements[range.clone()];
        debug!(chunk = chunk_no + 1, of = chunk_count, size = chunk.len(), "submitting batch chunk");

        match timeout(chunk_timeout, api.batch_execute_statement(chunk)).await {
            Ok(Ok(responses)) => {
                outcome.chunks_submitted += 1;
                if responses.len() != chunk.len() {
                    warn!(
                        expected = chunk.len(),
                        received = responses.len(),
                        "batch response count mismatch"
                    );
                }
                for (offset, index) in range.enumerate() {
                    match responses.get(offset) {
                        Some(resp) => match &resp.error {
                            Some(err) => outcome
                                .record_failure(index, format!("{} - {}", err.code, err.message)),
                            None => outcome.record_success(index),
                        },
                        None => outcome.record_failure(index, NO_RESPONSE),
                    }
                }
            }
            Ok(Err(err)) => {
                warn!(chunk = chunk_no + 1, error = %err, "batch chunk failed");
                let message = err.to_string();
                for index in range {
                    outcome.record_failure(index, message.clone());
                }
            }
            Err(_) => {
                let after_ms = chunk_timeout.as_millis();
                warn!(chunk = chunk_no + 1, after_ms, "batch chunk timed out; stopping");
                let unknown = format!("outcome unknown: batch call timed out after {after_ms}ms");
                for index in range.clone() {
                    outcome.record_failure(index, unknown.clone());
                }
                for index in range.end..statements.len() {
                    outcome.record_failure(index, NOT_SUBMITTED);
                }
                break;
            }
        }
    }

    info!(
        total = outcome.total,
        succeeded = outcome.success_count(),
        failed = outcome.failure_count(),
        chunks = outcome.chunks_submitted,
        "batch submission finished"
    );
    outcome
}
