//! The browsed item list: loaded items, a cursor, and per-item sync flags.

use dyno_core::value::render_item;
use dyno_core::{Item, TableDescriptor};

/// One loaded item.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub item: Item,
    /// The in-memory copy differs from the remote copy.
    pub dirty: bool,
    /// Created locally and never saved.
    pub new: bool,
}

impl Entry {
    fn loaded(item: Item) -> Self {
        Self {
            item,
            dirty: false,
            new: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemList {
    entries: Vec<Entry>,
    cursor: usize,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Entry> {
        self.entries.get(self.cursor)
    }

    /// Drop everything and reset the cursor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Append a freshly loaded page. The cursor stays where it is.
    pub fn extend_loaded(&mut self, items: impl IntoIterator<Item = Item>) {
        self.entries.extend(items.into_iter().map(Entry::loaded));
    }

    /// Move the cursor, clamped to the list.
    pub fn select(&mut self, index: usize) {
        self.cursor = index.min(self.entries.len().saturating_sub(1));
    }

    pub fn move_down(&mut self) {
        self.select(self.cursor.saturating_add(1));
    }

    pub fn move_up(&mut self) {
        self.select(self.cursor.saturating_sub(1));
    }

    /// Replace the current item with an edited copy. Returns `false` with
    /// nothing selected.
    pub fn edit_current(&mut self, item: Item) -> bool {
        match self.entries.get_mut(self.cursor) {
            Some(entry) => {
                if entry.item != item {
                    entry.item = item;
                    entry.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Append a locally created item and select it.
    pub fn add_new(&mut self, item: Item) {
        self.entries.push(Entry {
            item,
            dirty: true,
            new: true,
        });
        self.cursor = self.entries.len() - 1;
    }

    /// Record a successful save of the current item. Any other entry with
    /// the same full key is now stale and is removed.
    pub fn mark_current_saved(&mut self, table: &TableDescriptor) {
        let Some(saved) = self.entries.get_mut(self.cursor) else {
            return;
        };
        saved.dirty = false;
        saved.new = false;
        let saved_item = saved.item.clone();

        let cursor = self.cursor;
        let mut kept_before_cursor = 0;
        let mut index = 0;
        self.entries.retain(|entry| {
            let keep = index == cursor || !table.same_key(&entry.item, &saved_item);
            if keep && index < cursor {
                kept_before_cursor += 1;
            }
            index += 1;
            keep
        });
        self.cursor = kept_before_cursor;
    }

    /// Remove the current entry and clamp the cursor.
    pub fn remove_current(&mut self) -> Option<Entry> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(self.cursor);
        self.select(self.cursor);
        Some(removed)
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.iter().filter(|e| e.dirty).count()
    }

    /// Pretty JSON of the current item with sorted keys.
    pub fn render_current(&self) -> Option<String> {
        self.current().map(|e| render_item(&e.item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyno_core::value::item;
    use dyno_core::{KeyAttribute, KeyType, Value};

    fn table() -> TableDescriptor {
        TableDescriptor::new("T", KeyAttribute::new("id", KeyType::Number), None)
    }

    fn row(id: i64, name: &str) -> Item {
        item([("id", Value::from(id)), ("name", Value::from(name))])
    }

    fn loaded(n: i64) -> ItemList {
        let mut list = ItemList::new();
        list.extend_loaded((1..=n).map(|i| row(i, "x")));
        list
    }

    #[test]
    fn test_cursor_clamps() {
        let mut list = loaded(3);
        list.select(10);
        assert_eq!(list.cursor(), 2);
        list.move_down();
        assert_eq!(list.cursor(), 2);
        list.select(0);
        list.move_up();
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn test_edit_marks_dirty_only_on_change() {
        let mut list = loaded(2);
        assert!(list.edit_current(row(1, "x")));
        assert_eq!(list.dirty_count(), 0);
        assert!(list.edit_current(row(1, "y")));
        assert!(list.current().unwrap().dirty);
        assert!(!ItemList::new().edit_current(row(1, "y")));
    }

    #[test]
    fn test_add_new_selects_and_flags() {
        let mut list = loaded(2);
        list.add_new(row(9, "n"));
        let entry = list.current().unwrap();
        assert!(entry.new && entry.dirty);
        assert_eq!(list.cursor(), 2);
    }

    #[test]
    fn test_save_removes_other_entries_with_same_key() {
        let mut list = loaded(3);
        list.add_new(row(2, "replacement"));
        list.mark_current_saved(&table());

        assert_eq!(list.len(), 3);
        assert_eq!(list.cursor(), 2);
        let current = list.current().unwrap();
        assert_eq!(current.item.get("name"), Some(&Value::from("replacement")));
        assert!(!current.dirty && !current.new);
    }

    #[test]
    fn test_remove_current_clamps_cursor() {
        let mut list = loaded(3);
        list.select(2);
        let removed = list.remove_current().unwrap();
        assert_eq!(removed.item.get("id"), Some(&Value::from(3)));
        assert_eq!(list.cursor(), 1);

        list.remove_current();
        list.remove_current();
        assert!(list.is_empty());
        assert_eq!(list.cursor(), 0);
        assert!(list.remove_current().is_none());
    }

    #[test]
    fn test_render_current_sorted() {
        let list = loaded(1);
        let text = list.render_current().unwrap();
        assert!(text.find("\"id\"").unwrap() < text.find("\"name\"").unwrap());
    }
}
