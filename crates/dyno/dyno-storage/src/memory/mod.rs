//! In-memory store implementing [`DynamoApi`].
//!
//! Backs the test suites and offline use. Rows are kept in key order so scans
//! are deterministic and resumable. The store records every call it receives
//! and supports fault injection: failing statements by substring, failing the
//! next call of an operation, and delaying an operation.

pub mod partiql;

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use dyno_core::{Item, KeyType, RemoteCallError, TableDescriptor, Value};
use tracing::trace;

use crate::api::{
    BatchStatementResponse, DynamoApi, ScanOutput, StatementPage, TableNamesPage,
};
use crate::codec::{decode_item, encode_item, AttributeValue, WireItem};
use partiql::{Condition, Projection, Statement};

/// Sortable primary key: partition part, then optional sort part.
type RowKey = (KeyPart, Option<KeyPart>);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Str(String),
    /// Canonical plain decimal text.
    Num(String),
    Bin(String),
}

#[derive(Debug, Clone)]
struct MemTable {
    descriptor: TableDescriptor,
    rows: BTreeMap<RowKey, Item>,
}

#[derive(Debug, Clone)]
struct StatementFault {
    pattern: String,
    code: String,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, MemTable>,
    calls: Vec<String>,
    batch_sizes: Vec<usize>,
    statements: Vec<String>,
    statement_faults: Vec<StatementFault>,
    call_faults: HashMap<String, Vec<RemoteCallError>>,
    delays: HashMap<String, Duration>,
    cursors: HashMap<String, Vec<Item>>,
    next_cursor: u64,
}

/// A thread-safe, in-process table store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    max_scan_page: usize,
    statement_page_size: usize,
    region: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn service(operation: &str, code: &str, message: impl Into<String>) -> RemoteCallError {
    RemoteCallError::service(operation, code, message)
}

fn validation(operation: &str, message: impl Into<String>) -> RemoteCallError {
    service(operation, "ValidationException", message)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_scan_page: usize::MAX,
            statement_page_size: usize::MAX,
            region: "local".to_string(),
        }
    }

    /// Cap each scan sub-page, the way the service caps responses by size.
    pub fn with_max_scan_page(mut self, size: usize) -> Self {
        self.max_scan_page = size.max(1);
        self
    }

    /// Split statement results into pages of this size.
    pub fn with_statement_page_size(mut self, size: usize) -> Self {
        self.statement_page_size = size.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create_table(&self, descriptor: TableDescriptor) {
        let mut descriptor = descriptor;
        if descriptor.region.is_empty() {
            descriptor.region = self.region.clone();
        }
        self.lock().tables.insert(
            descriptor.name.clone(),
            MemTable {
                descriptor,
                rows: BTreeMap::new(),
            },
        );
    }

    /// Seed or overwrite an item directly, bypassing call accounting.
    pub fn insert(&self, table: &str, item: Item) -> Result<(), RemoteCallError> {
        let mut state = self.lock();
        let mem = table_mut(&mut state, "put_item", table)?;
        let key = row_key(&mem.descriptor, &item, "put_item")?;
        mem.rows.insert(key, item);
        Ok(())
    }

    /// All items in key order.
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, table: &str, key: &Item) -> Option<Item> {
        let state = self.lock();
        let mem = state.tables.get(table)?;
        let key = row_key(&mem.descriptor, key, "get_item").ok()?;
        mem.rows.get(&key).cloned()
    }

    pub fn len(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, |t| t.rows.len())
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Every call received, in order, by operation name.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn calls_of(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Sizes of the batch requests received, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    /// Statement texts received through either statement operation.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Fail any statement whose text contains `pattern`.
    pub fn fail_statements_containing(&self, pattern: &str, code: &str, message: &str) {
        self.lock().statement_faults.push(StatementFault {
            pattern: pattern.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    /// Fail the next call of `operation` with `error`. Queued errors are used in order.
    pub fn fail_next_call(&self, operation: &str, error: RemoteCallError) {
        self.lock()
            .call_faults
            .entry(operation.to_string())
            .or_default()
            .push(error);
    }

    /// Sleep before answering every call of `operation`.
    pub fn delay(&self, operation: &str, by: Duration) {
        self.lock().delays.insert(operation.to_string(), by);
    }

    /// Record the call, then apply any delay or queued fault.
    async fn enter(&self, operation: &str) -> Result<(), RemoteCallError> {
        let (delay, fault) = {
            let mut state = self.lock();
            state.calls.push(operation.to_string());
            let fault = state
                .call_faults
                .get_mut(operation)
                .filter(|q| !q.is_empty())
                .map(|q| q.remove(0));
            (state.delays.get(operation).copied(), fault)
        };
        trace!(operation, "memory store call");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn statement_fault(state: &State, text: &str) -> Option<(String, String)> {
        state
            .statement_faults
            .iter()
            .find(|f| text.contains(&f.pattern))
            .map(|f| (f.code.clone(), f.message.clone()))
    }
}

fn table_mut<'a>(
    state: &'a mut State,
    operation: &str,
    table: &str,
) -> Result<&'a mut MemTable, RemoteCallError> {
    state.tables.get_mut(table).ok_or_else(|| {
        service(
            operation,
            "ResourceNotFoundException",
            format!("Requested resource not found: Table: {table} not found"),
        )
    })
}

fn key_part(
    value: Option<&Value>,
    key_type: KeyType,
    name: &str,
    operation: &str,
) -> Result<KeyPart, RemoteCallError> {
    match (key_type, value) {
        (KeyType::String, Some(Value::String(s))) => Ok(KeyPart::Str(s.clone())),
        (KeyType::Number, Some(Value::Number(n))) => Ok(KeyPart::Num(n.to_plain_decimal())),
        (KeyType::Binary, Some(Value::String(b))) => Ok(KeyPart::Bin(b.clone())),
        (_, None) | (_, Some(Value::Null)) => Err(validation(
            operation,
            format!("One of the required keys was not given a value: {name}"),
        )),
        (expected, Some(other)) => Err(validation(
            operation,
            format!(
                "Type mismatch for key {name}: expected {expected}, got {}",
                other.type_name()
            ),
        )),
    }
}

fn row_key(
    descriptor: &TableDescriptor,
    item: &Item,
    operation: &str,
) -> Result<RowKey, RemoteCallError> {
    let pk = &descriptor.partition_key;
    let partition = key_part(item.get(&pk.name), pk.key_type, &pk.name, operation)?;
    let sort = match &descriptor.sort_key {
        Some(sk) => Some(key_part(item.get(&sk.name), sk.key_type, &sk.name, operation)?),
        None => None,
    };
    Ok((partition, sort))
}

/// The full key named by equality conditions, as statements on single items require.
fn key_from_conditions(
    descriptor: &TableDescriptor,
    conditions: &[Condition],
    operation: &str,
) -> Result<RowKey, RemoteCallError> {
    let mut key = Item::new();
    for name in descriptor.key_names() {
        let value = conditions
            .iter()
            .filter_map(Condition::equality)
            .find(|(attr, _)| *attr == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                validation(
                    operation,
                    "Where clause does not contain a mandatory equality on all key attributes",
                )
            })?;
        key.insert(name.to_string(), value);
    }
    row_key(descriptor, &key, operation)
}

fn project(item: &Item, projection: &Projection) -> Item {
    match projection {
        Projection::All => item.clone(),
        Projection::Attributes(names) => names
            .iter()
            .filter_map(|n| item.get(n).map(|v| (n.clone(), v.clone())))
            .collect(),
    }
}

fn conditional_failed(operation: &str) -> RemoteCallError {
    service(
        operation,
        "ConditionalCheckFailedException",
        "The conditional request failed",
    )
}

/// Execute one parsed statement. Selects return matching items in key order.
fn execute(
    state: &mut State,
    statement: Statement,
    operation: &str,
) -> Result<Vec<Item>, RemoteCallError> {
    let mem = table_mut(state, operation, statement.table())?;
    match statement {
        Statement::Select {
            projection,
            conditions,
            ..
        } => Ok(mem
            .rows
            .values()
            .filter(|row| conditions.iter().all(|c| c.matches(row)))
            .map(|row| project(row, &projection))
            .collect()),
        Statement::Insert { item, .. } => {
            let key = row_key(&mem.descriptor, &item, operation)?;
            if mem.rows.contains_key(&key) {
                return Err(service(
                    operation,
                    "DuplicateItemException",
                    "Duplicate primary key exists in table",
                ));
            }
            mem.rows.insert(key, item);
            Ok(Vec::new())
        }
        Statement::Update {
            set,
            remove,
            conditions,
            ..
        } => {
            let key = key_from_conditions(&mem.descriptor, &conditions, operation)?;
            let key_names: Vec<String> =
                mem.descriptor.key_names().into_iter().map(String::from).collect();
            if let Some(name) = set
                .iter()
                .map(|(n, _)| n)
                .chain(remove.iter())
                .find(|n| key_names.contains(n))
            {
                return Err(validation(
                    operation,
                    format!("Cannot update attribute {name}. This attribute is part of the key"),
                ));
            }
            let row = mem
                .rows
                .get_mut(&key)
                .filter(|row| conditions.iter().all(|c| c.matches(row)))
                .ok_or_else(|| conditional_failed(operation))?;
            for (name, value) in set {
                row.insert(name, value);
            }
            for name in remove {
                row.remove(&name);
            }
            Ok(Vec::new())
        }
        Statement::Delete { conditions, .. } => {
            let key = key_from_conditions(&mem.descriptor, &conditions, operation)?;
            match mem.rows.get(&key) {
                None => Ok(Vec::new()),
                Some(row) if conditions.iter().all(|c| c.matches(row)) => {
                    mem.rows.remove(&key);
                    Ok(Vec::new())
                }
                Some(_) => Err(conditional_failed(operation)),
            }
        }
    }
}

fn run_text(state: &mut State, text: &str, operation: &str) -> Result<Vec<Item>, RemoteCallError> {
    state.statements.push(text.to_string());
    if let Some((code, message)) = MemoryStore::statement_fault(state, text) {
        return Err(service(operation, &code, message));
    }
    let statement = partiql::parse(text)
        .map_err(|e| validation(operation, format!("Statement wasn't well formed: {e}")))?;
    execute(state, statement, operation)
}

#[async_trait]
impl DynamoApi for MemoryStore {
    async fn list_tables(
        &self,
        exclusive_start: Option<String>,
        limit: usize,
    ) -> Result<TableNamesPage, RemoteCallError> {
        self.enter("list_tables").await?;
        let state = self.lock();
        let lower = match &exclusive_start {
            Some(name) => Bound::Excluded(name.clone()),
            None => Bound::Unbounded,
        };
        let mut remaining = state.tables.range((lower, Bound::Unbounded)).map(|(n, _)| n);
        let names: Vec<String> = remaining.by_ref().take(limit.max(1)).cloned().collect();
        let more = remaining.next().is_some();
        Ok(TableNamesPage {
            last_evaluated: if more { names.last().cloned() } else { None },
            names,
        })
    }

    async fn describe_table(&self, name: &str) -> Result<TableDescriptor, RemoteCallError> {
        self.enter("describe_table").await?;
        let mut state = self.lock();
        let mem = table_mut(&mut state, "describe_table", name)?;
        let mut descriptor = mem.descriptor.clone();
        descriptor.approx_item_count = mem.rows.len() as u64;
        Ok(descriptor)
    }

    async fn execute_statement(
        &self,
        statement: &str,
        next_token: Option<String>,
    ) -> Result<StatementPage, RemoteCallError> {
        self.enter("execute_statement").await?;
        let mut state = self.lock();
        // A continuation reads from the snapshot taken when the statement first ran.
        let items = match next_token {
            None => run_text(&mut state, statement, "execute_statement")?,
            Some(token) => state
                .cursors
                .remove(&token)
                .ok_or_else(|| validation("execute_statement", "Invalid NextToken"))?,
        };

        let page_len = self.statement_page_size.min(items.len());
        let mut items = items.into_iter();
        let page = items.by_ref().take(page_len).map(|row| encode_item(&row)).collect();
        let rest: Vec<Item> = items.collect();
        let next_token = if rest.is_empty() {
            None
        } else {
            state.next_cursor += 1;
            let token = format!("cursor-{}", state.next_cursor);
            state.cursors.insert(token.clone(), rest);
            Some(token)
        };
        Ok(StatementPage {
            items: page,
            next_token,
        })
    }

    async fn batch_execute_statement(
        &self,
        statements: &[String],
    ) -> Result<Vec<BatchStatementResponse>, RemoteCallError> {
        self.enter("batch_execute_statement").await?;
        let mut state = self.lock();
        state.batch_sizes.push(statements.len());
        if statements.len() > dyno_core::constants::MAX_BATCH_STATEMENTS {
            return Err(validation(
                "batch_execute_statement",
                "Member must have length less than or equal to 25",
            ));
        }
        Ok(statements
            .iter()
            .map(|text| match run_text(&mut state, text, "batch_execute_statement") {
                Ok(items) => BatchStatementResponse {
                    error: None,
                    item: items.first().map(encode_item),
                },
                Err(RemoteCallError::Service { code, message, .. }) => {
                    BatchStatementResponse::failed(code, message)
                }
                Err(other) => BatchStatementResponse::failed("InternalServerError", other.to_string()),
            })
            .collect())
    }

    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<WireItem>,
        limit: usize,
    ) -> Result<ScanOutput, RemoteCallError> {
        self.enter("scan").await?;
        let mut state = self.lock();
        let mem = table_mut(&mut state, "scan", table)?;
        let lower = match exclusive_start_key {
            Some(start) => Bound::Excluded(row_key(&mem.descriptor, &decode_item(&start), "scan")?),
            None => Bound::Unbounded,
        };
        let take = limit.max(1).min(self.max_scan_page);
        let mut rows = mem.rows.range((lower, Bound::Unbounded));
        let page: Vec<&Item> = rows.by_ref().take(take).map(|(_, row)| row).collect();
        let more = rows.next().is_some();

        let last_evaluated_key = if more {
            page.last()
                .and_then(|row| mem.descriptor.key_of(row))
                .map(|key| encode_item(&key))
        } else {
            None
        };
        Ok(ScanOutput {
            items: page.into_iter().map(encode_item).collect(),
            last_evaluated_key,
        })
    }

    async fn get_item(
        &self,
        table: &str,
        key: WireItem,
    ) -> Result<Option<WireItem>, RemoteCallError> {
        self.enter("get_item").await?;
        let mut state = self.lock();
        let mem = table_mut(&mut state, "get_item", table)?;
        let key = row_key(&mem.descriptor, &decode_item(&key), "get_item")?;
        Ok(mem.rows.get(&key).map(encode_item))
    }

    async fn put_item(&self, table: &str, item: WireItem) -> Result<(), RemoteCallError> {
        self.enter("put_item").await?;
        let mut state = self.lock();
        let mem = table_mut(&mut state, "put_item", table)?;
        if item.values().any(|v| matches!(v, AttributeValue::Unknown(_))) {
            return Err(validation("put_item", "Supplied AttributeValue is empty"));
        }
        let item = decode_item(&item);
        let key = row_key(&mem.descriptor, &item, "put_item")?;
        mem.rows.insert(key, item);
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: WireItem) -> Result<(), RemoteCallError> {
        self.enter("delete_item").await?;
        let mut state = self.lock();
        let mem = table_mut(&mut state, "delete_item", table)?;
        let key = row_key(&mem.descriptor, &decode_item(&key), "delete_item")?;
        mem.rows.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::value::item;
    use dyno_core::KeyAttribute;

    fn users() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table(TableDescriptor::new(
            "users",
            KeyAttribute::new("id", KeyType::Number),
            Some(KeyAttribute::new("age", KeyType::Number)),
        ));
        for (id, age, name) in [(1, 30, "a"), (2, 40, "b"), (3, 50, "c")] {
            store
                .insert(
                    "users",
                    item([
                        ("id", Value::from(id)),
                        ("age", Value::from(age)),
                        ("name", Value::from(name)),
                    ]),
                )
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_select_filters_and_projects() {
        let store = users();
        let page = store
            .execute_statement(r#"SELECT "id", "age" FROM "users" WHERE "age" > 35"#, None)
            .await
            .unwrap();
        let items: Vec<Item> = page.items.iter().map(decode_item).collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.contains_key("name")));
    }

    #[tokio::test]
    async fn test_statement_results_are_paged() {
        let store = users().with_statement_page_size(2);
        let first = store
            .execute_statement(r#"SELECT * FROM "users""#, None)
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        let second = store
            .execute_statement(r#"SELECT * FROM "users""#, first.next_token)
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_statement_continuation_uses_first_snapshot() {
        let store = users().with_statement_page_size(2);
        let text = r#"SELECT * FROM "users""#;
        let first = store.execute_statement(text, None).await.unwrap();
        let token = first.next_token.clone().unwrap();

        store
            .insert(
                "users",
                item([("id", Value::from(0)), ("age", Value::from(1))]),
            )
            .unwrap();
        let second = store.execute_statement(text, Some(token.clone())).await.unwrap();
        let ids: Vec<Item> = second.items.iter().map(decode_item).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].get("id"), Some(&Value::from(3)));
        assert_eq!(store.statements(), vec![text.to_string()]);

        let err = store.execute_statement(text, Some(token)).await.unwrap_err();
        assert!(matches!(err, RemoteCallError::Service { ref code, .. } if code == "ValidationException"));
    }

    #[tokio::test]
    async fn test_scan_pages_follow_key_order() {
        let store = users().with_max_scan_page(2);
        let first = store.scan("users", None, 10).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let start = first.last_evaluated_key.clone().unwrap();
        assert_eq!(decode_item(&start).get("id"), Some(&Value::from(2)));

        let second = store.scan("users", Some(start), 10).await.unwrap();
        let rows: Vec<Item> = second.items.iter().map(decode_item).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("c")));
        assert!(second.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_update_requires_full_key() {
        let store = users();
        let err = store
            .execute_statement(r#"UPDATE "users" SET "name" = 'z' WHERE "id" = 1"#, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteCallError::Service { ref code, .. } if code == "ValidationException"));
    }

    #[tokio::test]
    async fn test_update_missing_item_fails_condition() {
        let store = users();
        let responses = store
            .batch_execute_statement(&[
                r#"UPDATE "users" SET "name" = 'z' WHERE "id" = 1 AND "age" = 30"#.to_string(),
                r#"UPDATE "users" SET "name" = 'z' WHERE "id" = 9 AND "age" = 30"#.to_string(),
            ])
            .await
            .unwrap();
        assert!(responses[0].error.is_none());
        assert_eq!(
            responses[1].error.as_ref().map(|e| e.code.as_str()),
            Some("ConditionalCheckFailedException")
        );
        let key = item([("id", Value::from(1)), ("age", Value::from(30))]);
        assert_eq!(store.get("users", &key).unwrap()["name"], Value::from("z"));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = users();
        let err = store
            .execute_statement(r#"INSERT INTO "users" VALUE {'id': 1, 'age': 30}"#, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteCallError::Service { ref code, .. } if code == "DuplicateItemException"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = users();
        let text = r#"DELETE FROM "users" WHERE "id" = 2 AND "age" = 40"#;
        store.execute_statement(text, None).await.unwrap();
        store.execute_statement(text, None).await.unwrap();
        assert_eq!(store.len("users"), 2);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let store = users();
        let statements = vec![r#"SELECT * FROM "users""#.to_string(); 26];
        assert!(store.batch_execute_statement(&statements).await.is_err());
    }

    #[tokio::test]
    async fn test_list_tables_pages() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store.create_table(TableDescriptor::new(
                name,
                KeyAttribute::new("id", KeyType::String),
                None,
            ));
        }
        let first = store.list_tables(None, 2).await.unwrap();
        assert_eq!(first.names, vec!["a", "b"]);
        let second = store.list_tables(first.last_evaluated, 2).await.unwrap();
        assert_eq!(second.names, vec!["c"]);
        assert!(second.last_evaluated.is_none());
    }

    #[tokio::test]
    async fn test_queued_fault_applies_once() {
        let store = users();
        store.fail_next_call("get_item", RemoteCallError::service("get_item", "InternalServerError", "boom"));
        let key = encode_item(&item([("id", Value::from(1)), ("age", Value::from(30))]));
        assert!(store.get_item("users", key.clone()).await.is_err());
        assert!(store.get_item("users", key).await.unwrap().is_some());
        assert_eq!(store.calls_of("get_item"), 2);
    }
}
