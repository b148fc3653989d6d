// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Items table state: search, pagination and the optimistic `is_active`
//! toggle.
//!
//! The controller never talks to a store itself. Each operation that needs
//! the store hands back a request value; the runtime executes it and feeds
//! the completion back through [`ItemListController::apply_fetch`] or
//! [`ItemListController::resolve_toggle`]. Queries carry a ticket so a slow
//! completion for a superseded search term or page cannot overwrite a newer
//! one.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    CreateItemForm, FormEvent, Item, ItemId, ItemPage, ItemPatch, ItemQuery, ItemStore,
    PAGE_SIZE, StaleResponseDiscarded, StoreError, StoreOperation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub query: ItemQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRequest {
    pub id: ItemId,
    pub patch: ItemPatch,
}

/// Per-row write lifecycle for the optimistic toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWrite {
    Clean,
    PendingWrite { previous: bool },
    Reverting { previous: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWriteEvent {
    Begin { current: bool },
    Confirmed,
    Failed,
    Reverted,
}

impl RowWrite {
    /// Returns `None` for transitions the lifecycle does not allow, which is
    /// how a second toggle on an in-flight row gets rejected.
    pub fn transition(self, event: RowWriteEvent) -> Option<Self> {
        match (self, event) {
            (Self::Clean, RowWriteEvent::Begin { current }) => {
                Some(Self::PendingWrite { previous: current })
            }
            (Self::PendingWrite { .. }, RowWriteEvent::Confirmed) => Some(Self::Clean),
            (Self::PendingWrite { previous }, RowWriteEvent::Failed) => {
                Some(Self::Reverting { previous })
            }
            (Self::Reverting { .. }, RowWriteEvent::Reverted) => Some(Self::Clean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEvent {
    RowsLoaded { page: usize, total: usize },
    PageClamped { from: usize, to: usize },
    Refetch(FetchRequest),
    ToggleConfirmed { id: ItemId, is_active: bool },
    ToggleReverted { id: ItemId, is_active: bool },
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListController {
    search: String,
    page: usize,
    total: usize,
    rows: Vec<Item>,
    writes: BTreeMap<ItemId, RowWrite>,
    latest_ticket: u64,
    loading: bool,
    last_error: Option<StoreError>,
}

impl Default for ItemListController {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            total: 0,
            rows: Vec::new(),
            writes: BTreeMap::new(),
            latest_ticket: 0,
            loading: false,
            last_error: None,
        }
    }
}

impl ItemListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(PAGE_SIZE)
    }

    pub fn rows(&self) -> &[Item] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    pub fn write_state(&self, id: &ItemId) -> RowWrite {
        self.writes.get(id).copied().unwrap_or(RowWrite::Clean)
    }

    pub fn is_updating(&self, id: &ItemId) -> bool {
        matches!(self.write_state(id), RowWrite::PendingWrite { .. })
    }

    /// 1-based inclusive bounds for a "showing X to Y of Z" footer.
    pub fn showing_range(&self) -> (usize, usize) {
        let first = ((self.page - 1) * PAGE_SIZE + 1).min(self.total);
        let last = (self.page * PAGE_SIZE).min(self.total);
        (first, last)
    }

    pub fn set_search_term(&mut self, text: &str) -> FetchRequest {
        self.search = text.to_owned();
        self.page = 1;
        self.fetch()
    }

    /// Clamps into `[1, total_pages]`; returns `None` when that lands on the
    /// current page.
    pub fn set_page(&mut self, page: usize) -> Option<FetchRequest> {
        let clamped = page.clamp(1, self.total_pages().max(1));
        if clamped == self.page {
            return None;
        }
        self.page = clamped;
        Some(self.fetch())
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn fetch(&mut self) -> FetchRequest {
        self.latest_ticket = self.latest_ticket.saturating_add(1);
        self.loading = true;
        FetchRequest {
            ticket: FetchTicket(self.latest_ticket),
            query: ItemQuery::for_page(&self.search, self.page),
        }
    }

    pub fn refresh(&mut self) -> FetchRequest {
        self.fetch()
    }

    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<ItemPage>,
    ) -> std::result::Result<Vec<ItemEvent>, StaleResponseDiscarded> {
        if ticket.get() != self.latest_ticket {
            let stale = StaleResponseDiscarded {
                ticket: ticket.get(),
                current: self.latest_ticket,
            };
            debug!(%stale, "items query superseded");
            return Err(stale);
        }
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                let error = StoreError::new(StoreOperation::Query, &error);
                warn!(%error, search = %self.search, page = self.page, "items query failed");
                self.last_error = Some(error.clone());
                return Ok(vec![ItemEvent::Failed(error)]);
            }
        };

        self.total = page.total;
        self.rows = page.rows;
        for row in &mut self.rows {
            if let Some(RowWrite::PendingWrite { previous }) = self.writes.get(&row.id) {
                row.is_active = !previous;
            }
        }
        self.last_error = None;

        let mut events = vec![ItemEvent::RowsLoaded {
            page: self.page,
            total: self.total,
        }];
        let last_page = self.total_pages().max(1);
        if self.page > last_page {
            let from = self.page;
            self.page = last_page;
            events.push(ItemEvent::PageClamped {
                from,
                to: last_page,
            });
            events.push(ItemEvent::Refetch(self.fetch()));
        }
        Ok(events)
    }

    /// Flips the cached flag before the write is confirmed. Returns `None`
    /// for rows not on the current page and for rows with a write in flight.
    pub fn toggle_active(&mut self, id: &ItemId) -> Option<ToggleRequest> {
        let row = self.rows.iter_mut().find(|row| &row.id == id)?;
        let current = row.is_active;
        let state = self.writes.get(id).copied().unwrap_or(RowWrite::Clean);
        let Some(next) = state.transition(RowWriteEvent::Begin { current }) else {
            debug!(id = %id, "toggle rejected while a write is in flight");
            return None;
        };

        row.is_active = !current;
        self.writes.insert(id.clone(), next);
        Some(ToggleRequest {
            id: id.clone(),
            patch: ItemPatch::IsActive(!current),
        })
    }

    pub fn resolve_toggle(&mut self, id: &ItemId, result: Result<()>) -> Vec<ItemEvent> {
        let RowWrite::PendingWrite { previous } = self.write_state(id) else {
            debug!(id = %id, "toggle completion without a pending write");
            return Vec::new();
        };

        match result {
            Ok(()) => {
                self.advance_write(id, RowWriteEvent::Confirmed);
                vec![ItemEvent::ToggleConfirmed {
                    id: id.clone(),
                    is_active: !previous,
                }]
            }
            Err(error) => {
                self.advance_write(id, RowWriteEvent::Failed);
                if let Some(row) = self.rows.iter_mut().find(|row| &row.id == id) {
                    row.is_active = previous;
                }
                self.advance_write(id, RowWriteEvent::Reverted);

                let error = StoreError::new(StoreOperation::Update, &error);
                warn!(%error, id = %id, "item status update failed; reverted");
                vec![
                    ItemEvent::ToggleReverted {
                        id: id.clone(),
                        is_active: previous,
                    },
                    ItemEvent::Failed(error),
                ]
            }
        }
    }

    /// Moves the row's write state along `event`; reaching `Clean` drops
    /// the entry.
    fn advance_write(&mut self, id: &ItemId, event: RowWriteEvent) {
        let current = self.write_state(id);
        match current.transition(event) {
            Some(RowWrite::Clean) => {
                self.writes.remove(id);
            }
            Some(next) => {
                self.writes.insert(id.clone(), next);
            }
            None => {
                warn!(id = %id, ?current, ?event, "illegal row write transition");
                self.writes.remove(id);
            }
        }
    }
}

/// Runs a fetch to completion against `store`, following clamp refetches.
pub fn run_fetch<S: ItemStore + ?Sized>(
    controller: &mut ItemListController,
    store: &S,
    request: FetchRequest,
) -> Vec<ItemEvent> {
    let mut events = Vec::new();
    let mut next = Some(request);
    while let Some(request) = next.take() {
        let result = store.query_items(&request.query);
        let Ok(applied) = controller.apply_fetch(request.ticket, result) else {
            break;
        };
        for event in applied {
            match event {
                ItemEvent::Refetch(request) => next = Some(request),
                other => events.push(other),
            }
        }
    }
    events
}

pub fn run_toggle<S: ItemStore + ?Sized>(
    controller: &mut ItemListController,
    store: &S,
    id: &ItemId,
) -> Vec<ItemEvent> {
    let Some(request) = controller.toggle_active(id) else {
        return Vec::new();
    };
    let result = store.update_item(&request.id, request.patch);
    controller.resolve_toggle(&request.id, result)
}

/// The items page: the list plus its create dialog.
#[derive(Debug, Clone, Default)]
pub struct ItemsScreen {
    pub list: ItemListController,
    pub create: CreateItemForm,
}

impl ItemsScreen {
    /// Feeds an insert completion to the form; a successful create yields
    /// exactly one refresh of the list.
    pub fn complete_create(&mut self, result: Result<ItemId>) -> (FormEvent, Option<FetchRequest>) {
        let event = self.create.finish_submit(result);
        let refresh = match event {
            FormEvent::Created(_) => Some(self.list.refresh()),
            FormEvent::Rejected(_) | FormEvent::Ignored => None,
        };
        (event, refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemEvent, ItemListController, RowWrite, RowWriteEvent};
    use crate::{Item, ItemId, ItemPage, ItemPatch};
    use anyhow::anyhow;
    use time::OffsetDateTime;

    fn item(id: &str, active: bool) -> Item {
        Item {
            id: ItemId::new(id),
            code: format!("C-{id}"),
            name: format!("Item {id}"),
            alt_name: None,
            is_active: active,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn loaded(rows: Vec<Item>, total: usize) -> ItemListController {
        let mut controller = ItemListController::new();
        let request = controller.fetch();
        controller
            .apply_fetch(request.ticket, Ok(ItemPage { rows, total }))
            .expect("latest ticket applies");
        controller
    }

    #[test]
    fn row_write_lifecycle_rejects_double_begin() {
        let pending = RowWrite::Clean
            .transition(RowWriteEvent::Begin { current: true })
            .expect("clean rows accept a write");
        assert_eq!(pending, RowWrite::PendingWrite { previous: true });
        assert_eq!(
            pending.transition(RowWriteEvent::Begin { current: false }),
            None
        );

        let reverting = pending
            .transition(RowWriteEvent::Failed)
            .expect("pending write can fail");
        assert_eq!(reverting, RowWrite::Reverting { previous: true });
        assert_eq!(
            reverting.transition(RowWriteEvent::Reverted),
            Some(RowWrite::Clean)
        );
        assert_eq!(RowWrite::Clean.transition(RowWriteEvent::Confirmed), None);
    }

    #[test]
    fn failed_write_passes_through_reverting() {
        let mut controller = loaded(vec![item("1", true)], 1);
        let id = ItemId::new("1");
        controller.toggle_active(&id).expect("toggle starts");

        controller.advance_write(&id, RowWriteEvent::Failed);
        assert_eq!(
            controller.write_state(&id),
            RowWrite::Reverting { previous: true }
        );
        assert!(!controller.is_updating(&id));
        assert!(controller.toggle_active(&id).is_none());

        controller.advance_write(&id, RowWriteEvent::Reverted);
        assert_eq!(controller.write_state(&id), RowWrite::Clean);
        assert!(controller.writes.is_empty());
    }

    #[test]
    fn resolved_toggles_leave_no_write_state() {
        let mut controller = loaded(vec![item("1", true), item("2", false)], 2);
        let first = ItemId::new("1");
        let second = ItemId::new("2");
        controller.toggle_active(&first).expect("toggle starts");
        controller.toggle_active(&second).expect("toggle starts");

        controller.resolve_toggle(&first, Ok(()));
        controller.resolve_toggle(&second, Err(anyhow!("offline")));
        assert!(controller.writes.is_empty());
        assert!(!controller.rows()[0].is_active);
        assert!(!controller.rows()[1].is_active);
        assert!(controller.resolve_toggle(&first, Ok(())).is_empty());
    }

    #[test]
    fn search_resets_page_to_first() {
        let mut controller = loaded(vec![item("1", true)], 30);
        controller.set_page(3).expect("page 3 exists");
        assert_eq!(controller.page(), 3);

        let request = controller.set_search_term("amox");
        assert_eq!(controller.page(), 1);
        assert_eq!(request.query.search, "amox");
        assert_eq!(request.query.offset, 0);
    }

    #[test]
    fn set_page_clamps_and_skips_no_op() {
        let mut controller = loaded(vec![item("1", true)], 23);
        assert_eq!(controller.total_pages(), 3);

        let request = controller.set_page(4).expect("clamped to last page");
        assert_eq!(controller.page(), 3);
        assert_eq!(request.query.offset, 20);

        assert!(controller.set_page(3).is_none());
        assert!(controller.set_page(99).is_none());
        assert!(controller.set_page(0).is_some());
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn shrinking_total_clamps_page_and_refetches() {
        let mut controller = loaded(vec![item("1", true)], 40);
        let request = controller.set_page(4).expect("page 4 exists");

        let events = controller
            .apply_fetch(
                request.ticket,
                Ok(ItemPage {
                    rows: Vec::new(),
                    total: 12,
                }),
            )
            .expect("latest ticket applies");
        assert_eq!(controller.page(), 2);
        assert!(events.contains(&ItemEvent::PageClamped { from: 4, to: 2 }));
        assert!(matches!(events.last(), Some(ItemEvent::Refetch(request)) if request.query.offset == 10));
    }

    #[test]
    fn failed_fetch_keeps_previous_rows() {
        let mut controller = loaded(vec![item("1", true), item("2", false)], 2);
        let request = controller.refresh();
        let events = controller
            .apply_fetch(request.ticket, Err(anyhow!("timeout")))
            .expect("latest ticket applies");

        assert_eq!(controller.rows().len(), 2);
        assert_eq!(controller.total(), 2);
        assert!(!controller.is_loading());
        assert!(matches!(events.as_slice(), [ItemEvent::Failed(_)]));
        assert!(controller.last_error().is_some());
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut controller = ItemListController::new();
        let first = controller.set_search_term("a");
        let second = controller.set_search_term("ab");

        controller
            .apply_fetch(
                second.ticket,
                Ok(ItemPage {
                    rows: vec![item("ab", true)],
                    total: 1,
                }),
            )
            .expect("latest ticket applies");
        let stale = controller
            .apply_fetch(
                first.ticket,
                Ok(ItemPage {
                    rows: vec![item("a1", true), item("a2", true)],
                    total: 2,
                }),
            )
            .expect_err("superseded ticket is dropped");

        assert_eq!(stale.ticket, first.ticket.get());
        assert_eq!(controller.rows().len(), 1);
        assert_eq!(controller.rows()[0].id, ItemId::new("ab"));
    }

    #[test]
    fn toggle_is_optimistic_and_locks_the_row() {
        let mut controller = loaded(vec![item("row-1", true)], 1);
        let id = ItemId::new("row-1");

        let request = controller.toggle_active(&id).expect("clean row toggles");
        assert_eq!(request.patch, ItemPatch::IsActive(false));
        assert!(!controller.rows()[0].is_active);
        assert!(controller.is_updating(&id));
        assert!(controller.toggle_active(&id).is_none());

        let events = controller.resolve_toggle(&id, Ok(()));
        assert_eq!(
            events,
            vec![ItemEvent::ToggleConfirmed {
                id: id.clone(),
                is_active: false,
            }]
        );
        assert!(!controller.is_updating(&id));
        assert!(controller.toggle_active(&id).is_some());
    }

    #[test]
    fn failed_toggle_reverts_and_reports_once() {
        let mut controller = loaded(vec![item("row-1", true)], 1);
        let id = ItemId::new("row-1");

        controller.toggle_active(&id).expect("clean row toggles");
        let events = controller.resolve_toggle(&id, Err(anyhow!("permission denied")));

        assert!(controller.rows()[0].is_active);
        assert_eq!(controller.write_state(&id), RowWrite::Clean);
        let failures = events
            .iter()
            .filter(|event| matches!(event, ItemEvent::Failed(_)))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn refetch_keeps_optimistic_flag_for_pending_rows() {
        let mut controller = loaded(vec![item("row-1", true)], 1);
        let id = ItemId::new("row-1");
        controller.toggle_active(&id).expect("clean row toggles");

        let request = controller.refresh();
        controller
            .apply_fetch(
                request.ticket,
                Ok(ItemPage {
                    rows: vec![item("row-1", true)],
                    total: 1,
                }),
            )
            .expect("latest ticket applies");
        assert!(!controller.rows()[0].is_active);
        assert!(controller.is_updating(&id));
    }

    #[test]
    fn toggle_on_unknown_row_is_a_no_op() {
        let mut controller = loaded(vec![item("row-1", true)], 1);
        assert!(controller.toggle_active(&ItemId::new("missing")).is_none());
        assert!(
            controller
                .resolve_toggle(&ItemId::new("missing"), Ok(()))
                .is_empty()
        );
    }

    #[test]
    fn showing_range_matches_footer() {
        let mut controller = loaded(vec![item("1", true)], 23);
        assert_eq!(controller.showing_range(), (1, 10));
        controller.set_page(3).expect("page 3 exists");
        assert_eq!(controller.showing_range(), (21, 23));
        assert_eq!(ItemListController::new().showing_range(), (0, 0));
    }
}
