//! Nested outline built from a flat TOC.

use super::TocEntry;
use serde::{Deserialize, Serialize};

/// Document outline (bookmark tree).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Top-level outline items
    pub items: Vec<OutlineItem>,
}

impl Outline {
    /// Build a tree from a flat, ordered entry list.
    ///
    /// Each entry becomes a child of the nearest preceding entry with a lower
    /// level. Entries with an unresolved page are left out since a bookmark
    /// needs a destination.
    pub fn from_entries(entries: &[TocEntry]) -> Self {
        let mut roots = Vec::new();
        let mut open: Vec<OutlineItem> = Vec::new();

        for entry in entries {
            let Ok(page) = u32::try_from(entry.page) else {
                continue;
            };
            if page == 0 {
                continue;
            }

            while open.last().is_some_and(|top| top.level >= entry.level) {
                close_top(&mut open, &mut roots);
            }
            open.push(OutlineItem::new(entry.title.clone(), page, entry.level));
        }
        while !open.is_empty() {
            close_top(&mut open, &mut roots);
        }

        Self { items: roots }
    }

    /// Check if the outline is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of items (including nested).
    pub fn total_items(&self) -> usize {
        fn count_items(items: &[OutlineItem]) -> usize {
            items
                .iter()
                .map(|item| 1 + count_items(&item.children))
                .sum()
        }
        count_items(&self.items)
    }

    /// Flatten back into entries, depth first.
    pub fn to_entries(&self) -> Vec<TocEntry> {
        fn walk(items: &[OutlineItem], out: &mut Vec<TocEntry>) {
            for item in items {
                out.push(TocEntry::new(
                    item.title.clone(),
                    i64::from(item.page),
                    item.level,
                ));
                walk(&item.children, out);
            }
        }
        let mut out = Vec::with_capacity(self.total_items());
        walk(&self.items, &mut out);
        out
    }
}

fn close_top(open: &mut Vec<OutlineItem>, roots: &mut Vec<OutlineItem>) {
    if let Some(item) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(item),
            None => roots.push(item),
        }
    }
}

/// A single outline item (bookmark).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Item title
    pub title: String,

    /// Target page number (1-indexed)
    pub page: u32,

    /// Level of the entry this item was built from
    pub level: u32,

    /// Child items
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    /// Create a new outline item.
    pub fn new(title: impl Into<String>, page: u32, level: u32) -> Self {
        Self {
            title: title.into(),
            page,
            level,
            children: Vec::new(),
        }
    }

    /// Number of descendants.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}
