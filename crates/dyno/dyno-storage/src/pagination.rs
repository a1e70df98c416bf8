//! Scan pagination with an opaque continuation token.
//!
//! The store returns scan results in sub-pages. One logical page aggregates
//! sub-pages until the page cap is reached or the table is exhausted. Each
//! sub-page asks for at most `cap - collected` items and nothing is truncated,
//! so the continuation token always sits exactly after the last returned item.

use dyno_core::{Item, RemoteCallError};
use tracing::debug;

use crate::api::DynamoApi;
use crate::codec::{decode_item, WireItem};

/// Opaque resume point for a scan. Only the store layer can read it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(WireItem);

impl ContinuationToken {
    pub(crate) fn into_wire(self) -> WireItem {
        self.0
    }
}

/// One logical page of a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// `None` when the table is exhausted.
    pub next: Option<ContinuationToken>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Fetch one logical page of at most `cap` items, resuming from `start`.
pub async fn scan_page<A: DynamoApi + ?Sized>(
    api: &A,
    table: &str,
    start: Option<ContinuationToken>,
    cap: usize,
) -> Result<ScanPage, RemoteCallError> {
    let cap = cap.max(1);
    let mut items = Vec::new();
    let mut cursor = start.map(ContinuationToken::into_wire);
    let mut sub_pages = 0usize;

    loop {
        let remaining = cap - items.len();
        let out = api.scan(table, cursor.take(), remaining).await?;
        sub_pages += 1;
        items.extend(out.items.iter().map(decode_item));
        cursor = out.last_evaluated_key;

        if items.len() >= cap || cursor.is_none() {
            break;
        }
    }

    debug!(table, items = items.len(), sub_pages, more = cursor.is_some(), "scan page");
    Ok(ScanPage {
        items,
        next: cursor.map(ContinuationToken),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use dyno_core::value::item;
    use dyno_core::{KeyAttribute, KeyType, TableDescriptor, Value};

    fn seeded(count: i64, sub_page: usize) -> MemoryStore {
        let store = MemoryStore::new().with_max_scan_page(sub_page);
        store.create_table(TableDescriptor::new(
            "orders",
            KeyAttribute::new("id", KeyType::Number),
            None,
        ));
        for i in 0..count {
            store
                .insert("orders", item([("id", Value::from(i))]))
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_page_aggregates_sub_pages_to_cap() {
        let store = seeded(2500, 300);
        let page = scan_page(&store, "orders", None, 1000).await.unwrap();
        assert_eq!(page.items.len(), 1000);
        assert!(!page.is_last());
        // 300 + 300 + 300 + 100
        assert_eq!(store.calls_of("scan"), 4);
    }

    #[tokio::test]
    async fn test_pages_cover_table_without_overlap() {
        let store = seeded(2500, 300);
        let mut seen = Vec::new();
        let mut token = None;
        let mut sizes = Vec::new();
        loop {
            let page = scan_page(&store, "orders", token, 1000).await.unwrap();
            sizes.push(page.items.len());
            seen.extend(page.items.iter().map(|i| i["id"].clone()));
            token = page.next;
            if token.is_none() {
                break;
            }
        }
        assert_eq!(sizes, vec![1000, 1000, 500]);
        let unique: std::collections::BTreeSet<String> = seen
            .iter()
            .filter_map(|v| v.as_number().map(|n| n.to_plain_decimal()))
            .collect();
        assert_eq!(seen.len(), 2500);
        assert_eq!(unique.len(), 2500);
    }

    #[tokio::test]
    async fn test_empty_table_is_last_page() {
        let store = seeded(0, 100);
        let page = scan_page(&store, "orders", None, 1000).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }
}
