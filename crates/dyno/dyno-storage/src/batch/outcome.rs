//! Per-statement results of a chunked batch submission.

use std::fmt;

/// A statement that did not succeed. `index` is zero-based in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for StatementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Statement {} failed: {}", self.index + 1, self.message)
    }
}

/// Result of submitting a list of write statements.
///
/// Every submitted index lands in exactly one of `succeeded` or `failures`,
/// both kept in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: Vec<usize>,
    pub failures: Vec<StatementFailure>,
    /// Round-trips that returned a response.
    pub chunks_submitted: usize,
}

impl BatchOutcome {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record_success(&mut self, index: usize) {
        self.succeeded.push(index);
    }

    pub(crate) fn record_failure(&mut self, index: usize, message: impl Into<String>) {
        self.failures.push(StatementFailure {
            index,
            message: message.into(),
        });
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.succeeded.len() == self.total
    }

    /// `"<ok>/<total> statements succeeded"`.
    pub fn summary(&self) -> String {
        format!("{}/{} statements succeeded", self.success_count(), self.total)
    }

    /// The first `limit` failures, rendered for display.
    pub fn failure_preview(&self, limit: usize) -> Vec<String> {
        self.failures
            .iter()
            .take(limit)
            .map(ToString::to_string)
            .collect()
    }

    /// Summary followed by the failure preview, one per line.
    pub fn report(&self, preview: usize) -> String {
        let mut lines = vec![self.summary()];
        lines.extend(self.failure_preview(preview));
        let hidden = self.failure_count().saturating_sub(preview);
        if hidden > 0 {
            lines.push(format!("... and {hidden} more failures"));
        }
        lines.join("\n")
    }
}
