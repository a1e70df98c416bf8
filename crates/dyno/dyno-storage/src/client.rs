//! Store client: the store operations the application uses, in native values,
//! each bounded by its configured timeout.

use std::future::Future;
use std::time::Duration;

use dyno_core::config::{BatchConfig, ScanConfig, TimeoutConfig};
use dyno_core::constants::LIST_TABLES_PAGE_SIZE;
use dyno_core::{DynoConfig, Item, RemoteCallError, TableDescriptor};
use tracing::{debug, info, warn};

use crate::api::DynamoApi;
use crate::batch::{submit_in_chunks, BatchOutcome};
use crate::codec::{decode_item, encode_item};
use crate::pagination::{scan_page, ContinuationToken, ScanPage};

/// Typed, timeout-bounded access to a [`DynamoApi`].
pub struct StoreClient<A> {
    api: A,
    timeouts: TimeoutConfig,
    batch: BatchConfig,
    scan: ScanConfig,
}

async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, RemoteCallError>
where
    F: Future<Output = Result<T, RemoteCallError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, after_ms = limit.as_millis() as u64, "store call timed out");
            Err(RemoteCallError::Timeout {
                operation: operation.to_string(),
                after_ms: limit.as_millis() as u64,
            })
        }
    }
}

impl<A: DynamoApi> StoreClient<A> {
    pub fn new(api: A, config: &DynoConfig) -> Self {
        Self {
            api,
            timeouts: config.timeouts.clone(),
            batch: config.batch.clone(),
            scan: config.scan.clone(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Every table name, following pagination to the end.
    pub async fn list_table_names(&self) -> Result<Vec<String>, RemoteCallError> {
        bounded("list_tables", self.timeouts.metadata(), async {
            let mut names = Vec::new();
            let mut start = None;
            loop {
                let page = self.api.list_tables(start, LIST_TABLES_PAGE_SIZE).await?;
                names.extend(page.names);
                match page.last_evaluated {
                    Some(last) => start = Some(last),
                    None => break,
                }
            }
            Ok(names)
        })
        .await
    }

    pub async fn describe_table(&self, name: &str) -> Result<TableDescriptor, RemoteCallError> {
        bounded(
            "describe_table",
            self.timeouts.metadata(),
            self.api.describe_table(name),
        )
        .await
    }

    /// All tables with their key schemas. A table that fails to describe is
    /// skipped and logged rather than failing the listing.
    pub async fn list_tables_with_details(&self) -> Result<Vec<TableDescriptor>, RemoteCallError> {
        let names = self.list_table_names().await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            match self.describe_table(&name).await {
                Ok(descriptor) => tables.push(descriptor),
                Err(err) => warn!(table = %name, error = %err, "skipping table that failed to describe"),
            }
        }
        info!(count = tables.len(), "loaded tables");
        Ok(tables)
    }

    /// Run one statement and collect every page of its result set.
    pub async fn execute_statement(&self, statement: &str) -> Result<Vec<Item>, RemoteCallError> {
        debug!(statement, "executing statement");
        bounded("execute_statement", self.timeouts.statement(), async {
            let mut items = Vec::new();
            let mut token = None;
            loop {
                let page = self.api.execute_statement(statement, token).await?;
                items.extend(page.items.iter().map(decode_item));
                match page.next_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
            Ok(items)
        })
        .await
    }

    /// Submit write statements in ordered chunks; see [`submit_in_chunks`].
    pub async fn submit_batch(&self, statements: &[String]) -> BatchOutcome {
        submit_in_chunks(
            &self.api,
            statements,
            self.batch.chunk_size,
            self.timeouts.batch_chunk(),
        )
        .await
    }

    /// One logical browsing page; pass the previous page's token to continue.
    pub async fn scan_page(
        &self,
        table: &str,
        start: Option<ContinuationToken>,
    ) -> Result<ScanPage, RemoteCallError> {
        bounded(
            "scan",
            self.timeouts.scan(),
            scan_page(&self.api, table, start, self.scan.page_cap),
        )
        .await
    }

    pub async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, RemoteCallError> {
        let found = bounded(
            "get_item",
            self.timeouts.single_item(),
            self.api.get_item(table, encode_item(key)),
        )
        .await?;
        Ok(found.as_ref().map(decode_item))
    }

    pub async fn put_item(&self, table: &str, item: &Item) -> Result<(), RemoteCallError> {
        bounded(
            "put_item",
            self.timeouts.single_item(),
            self.api.put_item(table, encode_item(item)),
        )
        .await
    }

    pub async fn delete_item(&self, table: &str, key: &Item) -> Result<(), RemoteCallError> {
        bounded(
            "delete_item",
            self.timeouts.single_item(),
            self.api.delete_item(table, encode_item(key)),
        )
        .await
    }
}
