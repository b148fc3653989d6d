// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use europharm_app::{Item, ItemId, ItemPage, ItemPatch, ItemQuery, ItemStore, NewItem};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use time::{Duration, OffsetDateTime};

#[derive(Default)]
struct Inner {
    rows: Vec<Item>,
    next_id: u64,
    clock: Option<OffsetDateTime>,
    query_failures: VecDeque<String>,
    insert_failures: VecDeque<String>,
    update_failures: VecDeque<String>,
    queries: Vec<ItemQuery>,
    inserts: Vec<NewItem>,
    updates: Vec<(ItemId, ItemPatch)>,
}

/// In-process `ItemStore` with call recording and scripted failures.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(rows: Vec<Item>) -> Self {
        let next_id = rows
            .iter()
            .filter_map(|row| row.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let clock = rows.iter().map(|row| row.created_at).max();
        Self {
            inner: Mutex::new(Inner {
                rows,
                next_id,
                clock,
                ..Inner::default()
            }),
        }
    }

    pub fn fail_next_query(&self, message: &str) {
        self.lock().query_failures.push_back(message.to_owned());
    }

    pub fn fail_next_insert(&self, message: &str) {
        self.lock().insert_failures.push_back(message.to_owned());
    }

    pub fn fail_next_update(&self, message: &str) {
        self.lock().update_failures.push_back(message.to_owned());
    }

    pub fn rows(&self) -> Vec<Item> {
        self.lock().rows.clone()
    }

    pub fn row(&self, id: &ItemId) -> Option<Item> {
        self.lock().rows.iter().find(|row| &row.id == id).cloned()
    }

    pub fn queries(&self) -> Vec<ItemQuery> {
        self.lock().queries.clone()
    }

    pub fn inserts(&self) -> Vec<NewItem> {
        self.lock().inserts.clone()
    }

    pub fn updates(&self) -> Vec<(ItemId, ItemPatch)> {
        self.lock().updates.clone()
    }

    /// Drops rows directly, as another operator deleting items would.
    pub fn remove_where(&self, predicate: impl Fn(&Item) -> bool) {
        self.lock().rows.retain(|row| !predicate(row));
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ItemStore for MemoryStore {
    fn query_items(&self, query: &ItemQuery) -> Result<ItemPage> {
        let mut inner = self.lock();
        inner.queries.push(query.clone());
        if let Some(message) = inner.query_failures.pop_front() {
            bail!("{message}");
        }

        let mut matched: Vec<&Item> = inner.rows.iter().filter(|row| query.matches(row)).collect();
        matched.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        let total = matched.len();
        let rows = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Ok(ItemPage { rows, total })
    }

    fn insert_item(&self, item: &NewItem) -> Result<ItemId> {
        let mut inner = self.lock();
        inner.inserts.push(item.clone());
        if let Some(message) = inner.insert_failures.pop_front() {
            bail!("{message}");
        }

        inner.next_id += 1;
        let id = ItemId::new(inner.next_id.to_string());
        let created_at = inner
            .clock
            .map_or(OffsetDateTime::UNIX_EPOCH, |clock| clock + Duration::seconds(1));
        inner.clock = Some(created_at);
        inner.rows.push(Item {
            id: id.clone(),
            code: item.code.clone(),
            name: item.name.clone(),
            alt_name: None,
            is_active: item.is_active,
            created_at,
            updated_at: created_at,
        });
        Ok(id)
    }

    fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<()> {
        let mut inner = self.lock();
        inner.updates.push((id.clone(), patch));
        if let Some(message) = inner.update_failures.pop_front() {
            bail!("{message}");
        }

        let row = inner
            .rows
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or_else(|| anyhow!("item {id} not found"))?;
        match patch {
            ItemPatch::IsActive(value) => row.is_active = value,
        }
        Ok(())
    }
}
