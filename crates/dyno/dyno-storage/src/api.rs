//! The remote store seam.
//!
//! [`DynamoApi`] mirrors the handful of store operations the client needs, in
//! wire form. A production build plugs in an SDK-backed implementation; tests
//! and offline use plug in [`crate::memory::MemoryStore`]. Timeouts are not the
//! implementor's concern: [`crate::client::StoreClient`] applies them.

use std::sync::Arc;

use async_trait::async_trait;
use dyno_core::{RemoteCallError, TableDescriptor};

use crate::codec::WireItem;

/// One page of table names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableNamesPage {
    pub names: Vec<String>,
    /// Name to resume after, when more names remain.
    pub last_evaluated: Option<String>,
}

/// One page of a statement's result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementPage {
    pub items: Vec<WireItem>,
    pub next_token: Option<String>,
}

/// Per-statement error inside a batch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStatementError {
    pub code: String,
    pub message: String,
}

/// Per-statement response inside a batch response, positionally aligned
/// with the submitted statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStatementResponse {
    pub error: Option<BatchStatementError>,
    pub item: Option<WireItem>,
}

impl BatchStatementResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(BatchStatementError {
                code: code.into(),
                message: message.into(),
            }),
            item: None,
        }
    }
}

/// One sub-page of a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    pub items: Vec<WireItem>,
    pub last_evaluated_key: Option<WireItem>,
}

#[async_trait]
pub trait DynamoApi: Send + Sync {
    async fn list_tables(
        &self,
        exclusive_start: Option<String>,
        limit: usize,
    ) -> Result<TableNamesPage, RemoteCallError>;

    async fn describe_table(&self, name: &str) -> Result<TableDescriptor, RemoteCallError>;

    async fn execute_statement(
        &self,
        statement: &str,
        next_token: Option<String>,
    ) -> Result<StatementPage, RemoteCallError>;

    /// Submit up to 25 statements in one round-trip.
    async fn batch_execute_statement(
        &self,
        statements: &[String],
    ) -> Result<Vec<BatchStatementResponse>, RemoteCallError>;

    /// Return at most `limit` items; the store may return fewer.
    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<WireItem>,
        limit: usize,
    ) -> Result<ScanOutput, RemoteCallError>;

    async fn get_item(&self, table: &str, key: WireItem)
        -> Result<Option<WireItem>, RemoteCallError>;

    async fn put_item(&self, table: &str, item: WireItem) -> Result<(), RemoteCallError>;

    async fn delete_item(&self, table: &str, key: WireItem) -> Result<(), RemoteCallError>;
}

#[async_trait]
impl<A: DynamoApi + ?Sized> DynamoApi for Arc<A> {
    async fn list_tables(
        &self,
        exclusive_start: Option<String>,
        limit: usize,
    ) -> Result<TableNamesPage, RemoteCallError> {
        (**self).list_tables(exclusive_start, limit).await
    }

    async fn describe_table(&self, name: &str) -> Result<TableDescriptor, RemoteCallError> {
        (**self).describe_table(name).await
    }

    async fn execute_statement(
        &self,
        statement: &str,
        next_token: Option<String>,
    ) -> Result<StatementPage, RemoteCallError> {
        (**self).execute_statement(statement, next_token).await
    }

    async fn batch_execute_statement(
        &self,
        statements: &[String],
    ) -> Result<Vec<BatchStatementResponse>, RemoteCallError> {
        (**self).batch_execute_statement(statements).await
    }

    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<WireItem>,
        limit: usize,
    ) -> Result<ScanOutput, RemoteCallError> {
        (**self).scan(table, exclusive_start_key, limit).await
    }

    async fn get_item(
        &self,
        table: &str,
        key: WireItem,
    ) -> Result<Option<WireItem>, RemoteCallError> {
        (**self).get_item(table, key).await
    }

    async fn put_item(&self, table: &str, item: WireItem) -> Result<(), RemoteCallError> {
        (**self).put_item(table, item).await
    }

    async fn delete_item(&self, table: &str, key: WireItem) -> Result<(), RemoteCallError> {
        (**self).delete_item(table, key).await
    }
}
