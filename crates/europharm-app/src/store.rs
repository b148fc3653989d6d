// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::sync::Arc;

use crate::{Item, ItemId, ItemPatch, NewItem, SortDirection};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSortKey {
    CreatedAt,
}

impl ItemSortKey {
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemOrder {
    pub key: ItemSortKey,
    pub direction: SortDirection,
}

impl Default for ItemOrder {
    fn default() -> Self {
        Self {
            key: ItemSortKey::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// One page request: rows whose code or name contains `search`
/// (case-insensitive, empty matches everything), plus the exact match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub search: String,
    pub order: ItemOrder,
    pub offset: usize,
    pub limit: usize,
}

impl ItemQuery {
    pub fn for_page(search: &str, page: usize) -> Self {
        let page = page.max(1);
        Self {
            search: search.to_owned(),
            order: ItemOrder::default(),
            offset: (page - 1) * PAGE_SIZE,
            limit: PAGE_SIZE,
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        item.code.to_lowercase().contains(&needle) || item.name.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemPage {
    pub rows: Vec<Item>,
    pub total: usize,
}

/// Row storage the items table depends on. Authentication, connection
/// management and schema are the implementor's business.
pub trait ItemStore {
    fn query_items(&self, query: &ItemQuery) -> Result<ItemPage>;
    fn insert_item(&self, item: &NewItem) -> Result<ItemId>;
    fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<()>;
}

impl<T: ItemStore + ?Sized> ItemStore for &T {
    fn query_items(&self, query: &ItemQuery) -> Result<ItemPage> {
        (**self).query_items(query)
    }

    fn insert_item(&self, item: &NewItem) -> Result<ItemId> {
        (**self).insert_item(item)
    }

    fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<()> {
        (**self).update_item(id, patch)
    }
}

impl<T: ItemStore + ?Sized> ItemStore for Arc<T> {
    fn query_items(&self, query: &ItemQuery) -> Result<ItemPage> {
        (**self).query_items(query)
    }

    fn insert_item(&self, item: &NewItem) -> Result<ItemId> {
        (**self).insert_item(item)
    }

    fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<()> {
        (**self).update_item(id, patch)
    }
}
