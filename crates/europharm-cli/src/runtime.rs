// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use europharm_app::{
    Brochure, BrochureFormInput, BrochureId, Cycle, FetchRequest, ItemId, ItemPage, ItemPatch,
    ItemQuery, ItemStore, NewItem, ToggleRequest,
};
use europharm_db::Store;
use europharm_remote::Client;
use europharm_tui::{InternalEvent, send_internal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Brochures and cycles always live in the local database; items come from
/// it too unless a hosted endpoint is configured.
pub struct DbRuntime<'a> {
    store: &'a Store,
    remote: Option<Arc<Client>>,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            remote: None,
        }
    }

    pub fn with_remote(store: &'a Store, client: Client) -> Self {
        Self {
            store,
            remote: Some(Arc::new(client)),
        }
    }

    fn items(&self) -> &dyn ItemStore {
        match &self.remote {
            Some(client) => client.as_ref(),
            None => self.store,
        }
    }
}

impl europharm_tui::AppRuntime for DbRuntime<'_> {
    fn query_items(&mut self, query: &ItemQuery) -> Result<ItemPage> {
        self.items().query_items(query)
    }

    fn insert_item(&mut self, item: &NewItem) -> Result<ItemId> {
        self.items().insert_item(item)
    }

    fn update_item(&mut self, id: &ItemId, patch: ItemPatch) -> Result<()> {
        self.items().update_item(id, patch)
    }

    fn list_brochures(&mut self, search: &str) -> Result<Vec<Brochure>> {
        self.store.list_brochures(search)
    }

    fn create_brochure(&mut self, input: &BrochureFormInput) -> Result<BrochureId> {
        self.store.create_brochure(input)
    }

    fn update_brochure(&mut self, id: BrochureId, input: &BrochureFormInput) -> Result<()> {
        self.store.update_brochure(id, input)
    }

    fn delete_brochure(&mut self, id: BrochureId) -> Result<()> {
        self.store.delete_brochure(id)
    }

    fn attach_brochure(&mut self, id: BrochureId, path: &Path) -> Result<()> {
        self.store.attach_brochure_path(id, path)
    }

    fn extract_brochure(&mut self, id: BrochureId) -> Result<PathBuf> {
        self.store.extract_brochure(id)
    }

    fn list_cycles(&mut self) -> Result<Vec<Cycle>> {
        self.store.list_cycles()
    }

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let Some(client) = self.remote.clone() else {
            let result = self.store.query_items(&request.query);
            return send_internal(
                &tx,
                InternalEvent::Fetched {
                    ticket: request.ticket,
                    result,
                },
            );
        };
        debug!(ticket = request.ticket.get(), "spawning remote items query");
        thread::spawn(move || {
            let result = client.query_items(&request.query);
            let _ = tx.send(InternalEvent::Fetched {
                ticket: request.ticket,
                result,
            });
        });
        Ok(())
    }

    fn spawn_toggle(&mut self, request: ToggleRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let Some(client) = self.remote.clone() else {
            let result = self.store.update_item(&request.id, request.patch);
            return send_internal(
                &tx,
                InternalEvent::Toggled {
                    id: request.id,
                    result,
                },
            );
        };
        thread::spawn(move || {
            let result = client.update_item(&request.id, request.patch);
            let _ = tx.send(InternalEvent::Toggled {
                id: request.id,
                result,
            });
        });
        Ok(())
    }

    fn spawn_insert(&mut self, item: NewItem, tx: Sender<InternalEvent>) -> Result<()> {
        let Some(client) = self.remote.clone() else {
            let result = self.store.insert_item(&item);
            return send_internal(&tx, InternalEvent::Inserted { result });
        };
        thread::spawn(move || {
            let result = client.insert_item(&item);
            let _ = tx.send(InternalEvent::Inserted { result });
        });
        Ok(())
    }
}
