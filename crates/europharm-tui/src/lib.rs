// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use europharm_app::{
    AppCommand, AppEvent, AppMode, AppState, Brochure, BrochureFormInput, BrochureId,
    CreateItemForm, Cycle, CycleColumn, CycleFilters, FetchRequest, FetchTicket, FormEvent,
    FormField, FormKind, Item, ItemEvent, ItemId, ItemListController, ItemPage, ItemPatch,
    ItemQuery, ItemsScreen, NewItem, ReportKind, SectionKind, Session, SubmitOutcome,
    ToggleRequest,
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Everything the shell needs from the outside world. The `spawn_*` hooks
/// run synchronously by default and report through the channel; runtimes
/// backed by a network store override them to run on a worker thread.
pub trait AppRuntime {
    fn query_items(&mut self, query: &ItemQuery) -> Result<ItemPage>;
    fn insert_item(&mut self, item: &NewItem) -> Result<ItemId>;
    fn update_item(&mut self, id: &ItemId, patch: ItemPatch) -> Result<()>;
    fn list_brochures(&mut self, search: &str) -> Result<Vec<Brochure>>;
    fn create_brochure(&mut self, input: &BrochureFormInput) -> Result<BrochureId>;
    fn update_brochure(&mut self, id: BrochureId, input: &BrochureFormInput) -> Result<()>;
    fn delete_brochure(&mut self, id: BrochureId) -> Result<()>;
    fn attach_brochure(&mut self, id: BrochureId, path: &Path) -> Result<()>;
    fn extract_brochure(&mut self, id: BrochureId) -> Result<PathBuf>;
    fn list_cycles(&mut self) -> Result<Vec<Cycle>>;

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.query_items(&request.query);
        send_internal(
            &tx,
            InternalEvent::Fetched {
                ticket: request.ticket,
                result,
            },
        )
    }

    fn spawn_toggle(&mut self, request: ToggleRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.update_item(&request.id, request.patch);
        send_internal(
            &tx,
            InternalEvent::Toggled {
                id: request.id,
                result,
            },
        )
    }

    fn spawn_insert(&mut self, item: NewItem, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.insert_item(&item);
        send_internal(&tx, InternalEvent::Inserted { result })
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Fetched {
        ticket: FetchTicket,
        result: Result<ItemPage>,
    },
    Toggled {
        id: ItemId,
        result: Result<()>,
    },
    Inserted { result: Result<ItemId> },
}

pub fn send_internal(tx: &Sender<InternalEvent>, event: InternalEvent) -> Result<()> {
    tx.send(event)
        .map_err(|_| anyhow!("internal event channel closed"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LoginUiState {
    username: String,
    password: String,
    field: LoginField,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ItemFormField {
    #[default]
    Code,
    Name,
    Active,
}

impl ItemFormField {
    const ALL: [Self; 3] = [Self::Code, Self::Name, Self::Active];

    fn shift(self, delta: isize) -> Self {
        let index = Self::ALL.iter().position(|field| *field == self).unwrap_or(0) as isize;
        Self::ALL[(index + delta).rem_euclid(Self::ALL.len() as isize) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BrochureFormField {
    #[default]
    Title,
    Description,
    Category,
    File,
}

impl BrochureFormField {
    const ALL: [Self; 4] = [Self::Title, Self::Description, Self::Category, Self::File];

    fn shift(self, delta: isize) -> Self {
        let index = Self::ALL.iter().position(|field| *field == self).unwrap_or(0) as isize;
        Self::ALL[(index + delta).rem_euclid(Self::ALL.len() as isize) as usize]
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Category => "Category",
            Self::File => "File",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct BrochureFormUiState {
    editing: Option<BrochureId>,
    input: BrochureFormInput,
    file_path: String,
    field: BrochureFormField,
    error: Option<String>,
}

impl BrochureFormUiState {
    fn value_mut(&mut self) -> &mut String {
        match self.field {
            BrochureFormField::Title => &mut self.input.title,
            BrochureFormField::Description => &mut self.input.description,
            BrochureFormField::Category => &mut self.input.category,
            BrochureFormField::File => &mut self.file_path,
        }
    }

    fn value(&self, field: BrochureFormField) -> &str {
        match field {
            BrochureFormField::Title => &self.input.title,
            BrochureFormField::Description => &self.input.description,
            BrochureFormField::Category => &self.input.category,
            BrochureFormField::File => &self.file_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct BrochuresUiState {
    rows: Vec<Brochure>,
    search: String,
    cursor: usize,
    form: Option<BrochureFormUiState>,
    pending_delete: Option<BrochureId>,
}

impl BrochuresUiState {
    fn selected(&self) -> Option<&Brochure> {
        self.rows.get(self.cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct CyclesUiState {
    rows: Vec<Cycle>,
    filters: CycleFilters,
    column: usize,
    cursor: usize,
}

impl CyclesUiState {
    fn visible(&self) -> Vec<&Cycle> {
        self.rows
            .iter()
            .filter(|cycle| self.filters.matches(cycle))
            .collect()
    }

    fn selected_column(&self) -> CycleColumn {
        CycleColumn::ALL[self.column.min(CycleColumn::ALL.len() - 1)]
    }
}

#[derive(Debug, Default)]
struct ViewData {
    session: Option<Session>,
    login: LoginUiState,
    items: ItemsScreen,
    item_cursor: usize,
    item_field: ItemFormField,
    brochures: BrochuresUiState,
    cycles: CyclesUiState,
    report_cursor: usize,
    status_token: u64,
}

/// Runs the dashboard until the user quits. Without a session the login
/// screen comes first.
pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    session: Option<Session>,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        session,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    if view_data.session.is_some() {
        load_section(state, runtime, &mut view_data, &internal_tx);
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Fetched { ticket, result } => {
                let Ok(events) = view_data.items.list.apply_fetch(ticket, result) else {
                    continue;
                };
                handle_item_events(state, runtime, view_data, tx, events);
            }
            InternalEvent::Toggled { id, result } => {
                let events = view_data.items.list.resolve_toggle(&id, result);
                handle_item_events(state, runtime, view_data, tx, events);
            }
            InternalEvent::Inserted { result } => {
                let (event, refresh) = view_data.items.complete_create(result);
                if let FormEvent::Created(id) = &event {
                    info!(id = %id, "item created from dashboard");
                    view_data.item_field = ItemFormField::default();
                    if state.mode == AppMode::Form(FormKind::Item) {
                        state.dispatch(AppCommand::ExitToNav);
                    }
                    emit_status(state, view_data, tx, "item created");
                }
                if let Some(request) = refresh {
                    spawn_fetch(state, runtime, view_data, tx, request);
                }
            }
        }
    }
}

fn handle_item_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<ItemEvent>,
) {
    for event in events {
        match event {
            ItemEvent::RowsLoaded { .. } => {
                let rows = view_data.items.list.rows().len();
                view_data.item_cursor = view_data.item_cursor.min(rows.saturating_sub(1));
            }
            ItemEvent::PageClamped { from, to } => {
                debug!(from, to, "items page clamped after total shrank");
            }
            ItemEvent::Refetch(request) => spawn_fetch(state, runtime, view_data, tx, request),
            ItemEvent::ToggleConfirmed { id, is_active } => {
                let label = if is_active { "active" } else { "inactive" };
                let code = view_data
                    .items
                    .list
                    .rows()
                    .iter()
                    .find(|row| row.id == id)
                    .map_or_else(|| id.to_string(), |row| row.code.clone());
                emit_status(state, view_data, tx, format!("{code} marked {label}"));
            }
            ItemEvent::ToggleReverted { .. } => {}
            ItemEvent::Failed(error) => emit_status(state, view_data, tx, error.to_string()),
        }
    }
}

fn spawn_fetch<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request: FetchRequest,
) {
    if let Err(error) = runtime.spawn_fetch(request, tx.clone()) {
        emit_status(state, view_data, tx, format!("load failed: {error:#}"));
    }
}

fn load_section<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let result = match state.active_section {
        SectionKind::Items => {
            let request = view_data.items.list.fetch();
            runtime.spawn_fetch(request, tx.clone())
        }
        SectionKind::Brochures => reload_brochures(runtime, view_data),
        SectionKind::Cycles => runtime.list_cycles().map(|rows| {
            view_data.cycles.rows = rows;
            clamp_cycle_cursor(&mut view_data.cycles);
        }),
        SectionKind::Reports => Ok(()),
    };
    if let Err(error) = result {
        emit_status(state, view_data, tx, format!("load failed: {error:#}"));
    }
}

fn reload_brochures<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    let rows = runtime.list_brochures(&view_data.brochures.search)?;
    view_data.brochures.cursor = view_data
        .brochures
        .cursor
        .min(rows.len().saturating_sub(1));
    view_data.brochures.rows = rows;
    Ok(())
}

fn clamp_cycle_cursor(cycles: &mut CyclesUiState) {
    let visible = cycles.visible().len();
    cycles.cursor = cycles.cursor.min(visible.saturating_sub(1));
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::SectionChanged(_)))
    {
        load_section(state, runtime, view_data, internal_tx);
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.session.is_none() {
        handle_login_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match state.mode {
        AppMode::Form(FormKind::Item) => {
            handle_item_form_key(state, runtime, view_data, internal_tx, key);
        }
        AppMode::Form(FormKind::Brochure) => {
            handle_brochure_form_key(state, runtime, view_data, internal_tx, key);
        }
        AppMode::Search => handle_search_key(state, runtime, view_data, internal_tx, key),
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_login_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let login = &mut view_data.login;
    match key.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            login.field = match login.field {
                LoginField::Username => LoginField::Password,
                LoginField::Password => LoginField::Username,
            };
        }
        KeyCode::Backspace => {
            match login.field {
                LoginField::Username => login.username.pop(),
                LoginField::Password => login.password.pop(),
            };
        }
        KeyCode::Char(ch) => match login.field {
            LoginField::Username => login.username.push(ch),
            LoginField::Password => login.password.push(ch),
        },
        KeyCode::Enter => match Session::login(&login.username, &login.password) {
            Ok(session) => {
                info!(user = %session.name(), "signed in");
                let greeting = session.greeting();
                view_data.session = Some(session);
                view_data.login = LoginUiState::default();
                state.dispatch(AppCommand::ExitToNav);
                emit_status(state, view_data, internal_tx, greeting);
                load_section(state, runtime, view_data, internal_tx);
            }
            Err(error) => login.error = Some(error.to_string()),
        },
        _ => {}
    }
}

fn logout(state: &mut AppState, view_data: &mut ViewData) {
    if let Some(session) = view_data.session.take() {
        session.logout();
    }
    view_data.brochures.form = None;
    view_data.brochures.pending_delete = None;
    state.dispatch(AppCommand::ExitToNav);
    state.dispatch(AppCommand::ClearStatus);
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if let Some(id) = view_data.brochures.pending_delete.take() {
        if key.code == KeyCode::Char('y') {
            delete_brochure(state, runtime, view_data, internal_tx, id);
        } else {
            emit_status(state, view_data, internal_tx, "delete canceled");
        }
        return;
    }

    match key.code {
        KeyCode::Tab => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextSection, internal_tx);
            return;
        }
        KeyCode::BackTab => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::PrevSection, internal_tx);
            return;
        }
        KeyCode::Char(ch @ '1'..='4') => {
            let index = ch as usize - '1' as usize;
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::SelectSection(SectionKind::ALL[index]),
                internal_tx,
            );
            return;
        }
        KeyCode::Char('L') => {
            logout(state, view_data);
            return;
        }
        KeyCode::Char('/') if state.active_section != SectionKind::Reports => {
            state.dispatch(AppCommand::EnterSearch);
            return;
        }
        _ => {}
    }

    match state.active_section {
        SectionKind::Items => handle_items_nav_key(state, runtime, view_data, internal_tx, key),
        SectionKind::Brochures => {
            handle_brochures_nav_key(state, runtime, view_data, internal_tx, key);
        }
        SectionKind::Cycles => handle_cycles_nav_key(view_data, key),
        SectionKind::Reports => {
            handle_reports_nav_key(state, runtime, view_data, internal_tx, key);
        }
    }
}

fn handle_items_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let list = &mut view_data.items.list;
    let request = match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let last = list.rows().len().saturating_sub(1);
            view_data.item_cursor = (view_data.item_cursor + 1).min(last);
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.item_cursor = view_data.item_cursor.saturating_sub(1);
            None
        }
        KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => list.next_page(),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => list.prev_page(),
        KeyCode::Char('g') => list.set_page(1),
        KeyCode::Char('G') => list.set_page(usize::MAX),
        KeyCode::Char('r') => Some(list.refresh()),
        KeyCode::Char(' ') | KeyCode::Char('t') => {
            toggle_selected_item(state, runtime, view_data, internal_tx);
            None
        }
        KeyCode::Char('a') => {
            view_data.items.create.open();
            view_data.item_field = ItemFormField::default();
            state.dispatch(AppCommand::OpenForm(FormKind::Item));
            None
        }
        _ => None,
    };

    if let Some(request) = request {
        if key.code != KeyCode::Char('r') {
            view_data.item_cursor = 0;
        }
        spawn_fetch(state, runtime, view_data, internal_tx, request);
    }
}

fn toggle_selected_item<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(id) = view_data
        .items
        .list
        .rows()
        .get(view_data.item_cursor)
        .map(|item| item.id.clone())
    else {
        return;
    };
    let Some(request) = view_data.items.list.toggle_active(&id) else {
        emit_status(state, view_data, internal_tx, "update already in progress");
        return;
    };
    if let Err(error) = runtime.spawn_toggle(request, internal_tx.clone()) {
        let events = view_data.items.list.resolve_toggle(&id, Err(error));
        handle_item_events(state, runtime, view_data, internal_tx, events);
    }
}

fn handle_brochures_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let last = view_data.brochures.rows.len().saturating_sub(1);
            view_data.brochures.cursor = (view_data.brochures.cursor + 1).min(last);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.brochures.cursor = view_data.brochures.cursor.saturating_sub(1);
        }
        KeyCode::Char('a') => {
            if let Err(error) = require_supervisor(view_data, "adding brochures") {
                emit_status(state, view_data, internal_tx, error.to_string());
                return;
            }
            view_data.brochures.form = Some(BrochureFormUiState::default());
            state.dispatch(AppCommand::OpenForm(FormKind::Brochure));
        }
        KeyCode::Char('e') => {
            let Some(brochure) = view_data.brochures.selected().cloned() else {
                return;
            };
            if let Err(error) = require_supervisor(view_data, "editing brochures") {
                emit_status(state, view_data, internal_tx, error.to_string());
                return;
            }
            view_data.brochures.form = Some(BrochureFormUiState {
                editing: Some(brochure.id),
                input: BrochureFormInput {
                    title: brochure.title,
                    description: brochure.description,
                    category: brochure.category,
                },
                ..BrochureFormUiState::default()
            });
            state.dispatch(AppCommand::OpenForm(FormKind::Brochure));
        }
        KeyCode::Char('d') => {
            let Some(brochure) = view_data.brochures.selected().cloned() else {
                return;
            };
            if let Err(error) = require_supervisor(view_data, "deleting brochures") {
                emit_status(state, view_data, internal_tx, error.to_string());
                return;
            }
            view_data.brochures.pending_delete = Some(brochure.id);
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("delete {:?}? press y to confirm", brochure.title),
            );
        }
        KeyCode::Char('o') => {
            let Some(brochure) = view_data.brochures.selected().cloned() else {
                return;
            };
            let message = match runtime.extract_brochure(brochure.id) {
                Ok(path) => format!("saved to {}", path.display()),
                Err(error) => format!("download failed: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('r') => {
            if let Err(error) = reload_brochures(runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error:#}"));
            }
        }
        _ => {}
    }
}

fn require_supervisor(view_data: &ViewData, action: &str) -> Result<()> {
    view_data
        .session
        .as_ref()
        .ok_or_else(|| anyhow!("sign in before {action}"))?
        .require_supervisor(action)
}

fn delete_brochure<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: BrochureId,
) {
    let result = require_supervisor(view_data, "deleting brochures")
        .and_then(|()| runtime.delete_brochure(id))
        .and_then(|()| reload_brochures(runtime, view_data));
    let message = match result {
        Ok(()) => "brochure deleted".to_owned(),
        Err(error) => format!("delete failed: {error:#}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn handle_cycles_nav_key(view_data: &mut ViewData, key: KeyEvent) {
    let cycles = &mut view_data.cycles;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let last = cycles.visible().len().saturating_sub(1);
            cycles.cursor = (cycles.cursor + 1).min(last);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            cycles.cursor = cycles.cursor.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            cycles.column = (cycles.column + 1).min(CycleColumn::ALL.len() - 1);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            cycles.column = cycles.column.saturating_sub(1);
        }
        KeyCode::Char('x') => {
            let column = cycles.selected_column();
            cycles.filters.clear(column);
            clamp_cycle_cursor(cycles);
        }
        _ => {}
    }
}

fn handle_reports_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.report_cursor = (view_data.report_cursor + 1).min(ReportKind::ALL.len() - 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.report_cursor = view_data.report_cursor.saturating_sub(1);
        }
        KeyCode::Enter => {
            let kind = ReportKind::ALL[view_data.report_cursor.min(ReportKind::ALL.len() - 1)];
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::SelectReport(kind),
                internal_tx,
            );
        }
        _ => {}
    }
}

fn handle_search_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let edit = match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Backspace => None,
        KeyCode::Char(ch) => Some(ch),
        _ => return,
    };

    match state.active_section {
        SectionKind::Items => {
            let mut term = view_data.items.list.search_term().to_owned();
            match edit {
                Some(ch) => term.push(ch),
                None => {
                    if term.pop().is_none() {
                        return;
                    }
                }
            }
            view_data.item_cursor = 0;
            let request = view_data.items.list.set_search_term(&term);
            spawn_fetch(state, runtime, view_data, internal_tx, request);
        }
        SectionKind::Brochures => {
            apply_text_edit(&mut view_data.brochures.search, edit);
            if let Err(error) = reload_brochures(runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error:#}"));
            }
        }
        SectionKind::Cycles => {
            let cycles = &mut view_data.cycles;
            let column = cycles.selected_column();
            let mut value = cycles.filters.get(column).to_owned();
            apply_text_edit(&mut value, edit);
            cycles.filters.set(column, value);
            clamp_cycle_cursor(cycles);
        }
        SectionKind::Reports => {
            state.dispatch(AppCommand::ExitToNav);
        }
    }
}

fn apply_text_edit(value: &mut String, edit: Option<char>) {
    match edit {
        Some(ch) => value.push(ch),
        None => {
            value.pop();
        }
    }
}

fn handle_item_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let form = &mut view_data.items.create;
    match key.code {
        KeyCode::Esc => {
            if form.close() {
                view_data.item_field = ItemFormField::default();
                state.dispatch(AppCommand::ExitToNav);
            } else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "wait for the create request to finish",
                );
            }
        }
        KeyCode::Tab | KeyCode::Down => view_data.item_field = view_data.item_field.shift(1),
        KeyCode::BackTab | KeyCode::Up => view_data.item_field = view_data.item_field.shift(-1),
        KeyCode::Enter => match form.begin_submit() {
            SubmitOutcome::Ready(item) => {
                if let Err(error) = runtime.spawn_insert(item, internal_tx.clone()) {
                    let (_event, _refresh) = view_data.items.complete_create(Err(error));
                }
            }
            SubmitOutcome::Invalid(errors) => {
                if let Some(first) = errors.first() {
                    view_data.item_field = match first.field {
                        FormField::Code => ItemFormField::Code,
                        FormField::Name => ItemFormField::Name,
                    };
                }
            }
            SubmitOutcome::Blocked => {}
        },
        _ if form.is_submitting() => {}
        KeyCode::Char(' ') if view_data.item_field == ItemFormField::Active => {
            form.is_active = !form.is_active;
        }
        KeyCode::Char(ch) => match view_data.item_field {
            ItemFormField::Code => form.code.push(ch),
            ItemFormField::Name => form.name.push(ch),
            ItemFormField::Active => {}
        },
        KeyCode::Backspace => {
            match view_data.item_field {
                ItemFormField::Code => form.code.pop(),
                ItemFormField::Name => form.name.pop(),
                ItemFormField::Active => None,
            };
        }
        _ => {}
    }
}

fn handle_brochure_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.brochures.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.brochures.form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down => form.field = form.field.shift(1),
        KeyCode::BackTab | KeyCode::Up => form.field = form.field.shift(-1),
        KeyCode::Char(ch) => form.value_mut().push(ch),
        KeyCode::Backspace => {
            form.value_mut().pop();
        }
        KeyCode::Enter => {
            let form = form.clone();
            let saved = require_supervisor(view_data, "saving brochures")
                .and_then(|()| save_brochure(runtime, &form));
            match saved {
                Ok(id) => {
                    info!(id = %id, "brochure saved");
                    view_data.brochures.form = None;
                    state.dispatch(AppCommand::ExitToNav);
                    let message = match reload_brochures(runtime, view_data) {
                        Ok(()) => "brochure saved".to_owned(),
                        Err(error) => format!("brochure saved; reload failed: {error:#}"),
                    };
                    emit_status(state, view_data, internal_tx, message);
                }
                Err(error) => {
                    if let Some(open) = view_data.brochures.form.as_mut() {
                        open.error = Some(format!("{error:#}"));
                    }
                }
            }
        }
        _ => {}
    }
}

fn save_brochure<R: AppRuntime>(runtime: &mut R, form: &BrochureFormUiState) -> Result<BrochureId> {
    form.input.validate()?;
    let id = match form.editing {
        Some(id) => {
            runtime.update_brochure(id, &form.input)?;
            id
        }
        None => runtime.create_brochure(&form.input)?,
    };
    let path = form.file_path.trim();
    if !path.is_empty() {
        runtime
            .attach_brochure(id, Path::new(path))
            .with_context(|| format!("attach {path} to brochure {id}"))?;
    }
    Ok(id)
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let Some(session) = &view_data.session else {
        render_login(frame, &view_data.login);
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(session))
        .block(Block::default().title("EuroPharm").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(1)])
        .split(layout[1]);

    let sidebar = Paragraph::new(sidebar_lines(state.active_section))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(sidebar, body[0]);

    match state.active_section {
        SectionKind::Items => render_items(frame, body[1], view_data),
        SectionKind::Brochures => render_brochures(frame, body[1], view_data),
        SectionKind::Cycles => render_cycles(frame, body[1], &view_data.cycles),
        SectionKind::Reports => {
            let reports = Paragraph::new(reports_text(state.active_report, view_data.report_cursor))
                .block(Block::default().title("reports").borders(Borders::ALL));
            frame.render_widget(reports, body[1]);
        }
    }

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if state.mode == AppMode::Form(FormKind::Item) && view_data.items.create.is_open() {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let form = Paragraph::new(item_form_text(&view_data.items.create, view_data.item_field))
            .block(Block::default().title("new item").borders(Borders::ALL));
        frame.render_widget(form, area);
    }

    if state.mode == AppMode::Form(FormKind::Brochure)
        && let Some(form) = &view_data.brochures.form
    {
        let area = centered_rect(64, 50, frame.area());
        frame.render_widget(Clear, area);
        let title = if form.editing.is_some() {
            "edit brochure"
        } else {
            "new brochure"
        };
        let overlay = Paragraph::new(brochure_form_text(form))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }
}

fn render_login(frame: &mut ratatui::Frame<'_>, login: &LoginUiState) {
    let area = centered_rect(50, 40, frame.area());
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(login_text(login))
        .block(Block::default().title("EuroPharm sign in").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_items(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let list = &view_data.items.list;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let search = Paragraph::new(list.search_term().to_owned()).block(
        Block::default()
            .title("search code or name")
            .borders(Borders::ALL),
    );
    frame.render_widget(search, chunks[0]);

    let header = Row::new(
        ["Code", "Name", "Status", "Created"].map(|label| Cell::from(label).style(header_style())),
    );
    let rows = list.rows().iter().enumerate().map(|(index, item)| {
        let mut style = Style::default();
        if !item.is_active {
            style = style.fg(Color::DarkGray);
        }
        if list.is_updating(&item.id) {
            style = style.fg(Color::Yellow);
        }
        if index == view_data.item_cursor {
            style = style.bg(Color::Blue).fg(Color::White);
        }
        Row::new([
            Cell::from(item.code.clone()),
            Cell::from(item.name.clone()),
            Cell::from(item_status_cell(list, item)),
            Cell::from(item.created_at.date().to_string()),
        ])
        .style(style)
    });
    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(22),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title("items").borders(Borders::ALL));
    frame.render_widget(table, chunks[1]);

    frame.render_widget(Paragraph::new(items_footer_text(list)), chunks[2]);
}

fn render_brochures(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let brochures = &view_data.brochures;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search = Paragraph::new(brochures.search.clone()).block(
        Block::default()
            .title("search title, description or category")
            .borders(Borders::ALL),
    );
    frame.render_widget(search, chunks[0]);

    let header = Row::new(
        ["Title", "Category", "Description", "File", "Size"]
            .map(|label| Cell::from(label).style(header_style())),
    );
    let rows = brochures.rows.iter().enumerate().map(|(index, brochure)| {
        let style = if index == brochures.cursor {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        };
        Row::new([
            Cell::from(brochure.title.clone()),
            Cell::from(brochure.category.clone()),
            Cell::from(brochure.description.clone()),
            Cell::from(brochure.file_name.clone().unwrap_or_default()),
            Cell::from(brochure.size_label()),
        ])
        .style(style)
    });
    let widths = [
        Constraint::Length(28),
        Constraint::Length(14),
        Constraint::Min(20),
        Constraint::Length(18),
        Constraint::Length(9),
    ];
    let title = format!("brochures ({})", brochures.rows.len());
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, chunks[1]);
}

fn render_cycles(frame: &mut ratatui::Frame<'_>, area: Rect, cycles: &CyclesUiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let filters = Paragraph::new(cycle_filters_line(cycles))
        .block(Block::default().title("filters").borders(Borders::ALL));
    frame.render_widget(filters, chunks[0]);

    let selected_column = cycles.selected_column();
    let header = Row::new(CycleColumn::ALL.map(|column| {
        let mut style = header_style();
        if column == selected_column {
            style = style.fg(Color::Cyan);
        }
        Cell::from(column.label()).style(style)
    }));
    let visible = cycles.visible();
    let count = visible.len();
    let rows = visible.into_iter().enumerate().map(|(index, cycle)| {
        let style = if index == cycles.cursor {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        };
        Row::new(CycleColumn::ALL.map(|column| Cell::from(cycle.cell(column)))).style(style)
    });
    let widths = [Constraint::Min(6); 7];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(format!("cycles ({count} of {})", cycles.rows.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, chunks[1]);
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn header_text(session: &Session) -> String {
    format!("{} | L logout", session.greeting())
}

fn sidebar_lines(active: SectionKind) -> Vec<Line<'static>> {
    SectionKind::ALL
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let text = format!("{} {}", index + 1, section.label());
            if *section == active {
                Line::from(Span::styled(
                    format!("> {text}"),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {text}"))
            }
        })
        .collect()
}

fn item_status_cell(list: &ItemListController, item: &Item) -> String {
    if list.is_updating(&item.id) {
        format!("{} (updating...)", item.status_label())
    } else {
        item.status_label().to_owned()
    }
}

fn items_footer_text(list: &ItemListController) -> String {
    let mut text = if list.total() == 0 {
        if list.search_term().is_empty() {
            "No items yet".to_owned()
        } else {
            format!("No items match {:?}", list.search_term())
        }
    } else {
        let (first, last) = list.showing_range();
        format!(
            "Showing {first} to {last} of {} | page {} of {}",
            list.total(),
            list.page(),
            list.total_pages()
        )
    };
    if list.is_loading() {
        text.push_str(" | loading...");
    }
    if let Some(error) = list.last_error() {
        text.push_str(&format!(" | {error}"));
    }
    text
}

fn item_form_text(form: &CreateItemForm, field: ItemFormField) -> String {
    let marker = |current: ItemFormField| if current == field { ">" } else { " " };
    let mut lines = vec![format!("{} Code: {}", marker(ItemFormField::Code), form.code)];
    if let Some(error) = form.field_error(FormField::Code) {
        lines.push(format!("    {error}"));
    }
    lines.push(format!("{} Name: {}", marker(ItemFormField::Name), form.name));
    if let Some(error) = form.field_error(FormField::Name) {
        lines.push(format!("    {error}"));
    }
    let check = if form.is_active { "x" } else { " " };
    lines.push(format!("{} [{check}] Active", marker(ItemFormField::Active)));
    lines.push(String::new());
    if form.is_submitting() {
        lines.push("Creating...".to_owned());
    } else {
        lines.push("enter create | esc cancel".to_owned());
    }
    if let Some(error) = form.store_error() {
        lines.push(format!("Error: {error}"));
    }
    lines.join("\n")
}

fn brochure_form_text(form: &BrochureFormUiState) -> String {
    let mut lines: Vec<String> = BrochureFormField::ALL
        .iter()
        .map(|field| {
            let marker = if *field == form.field { ">" } else { " " };
            format!("{marker} {}: {}", field.label(), form.value(*field))
        })
        .collect();
    lines.push(String::new());
    lines.push("enter save | esc cancel".to_owned());
    if let Some(error) = &form.error {
        lines.push(format!("Error: {error}"));
    }
    lines.join("\n")
}

fn login_text(login: &LoginUiState) -> String {
    let marker = |field: LoginField| if field == login.field { ">" } else { " " };
    let mut lines = vec![
        format!("{} Username: {}", marker(LoginField::Username), login.username),
        format!(
            "{} Password: {}",
            marker(LoginField::Password),
            "*".repeat(login.password.chars().count())
        ),
        String::new(),
        "enter sign in | tab switch field | ctrl+q quit".to_owned(),
    ];
    if let Some(error) = &login.error {
        lines.push(format!("Error: {error}"));
    }
    lines.join("\n")
}

fn cycle_filters_line(cycles: &CyclesUiState) -> String {
    let selected = cycles.selected_column();
    CycleColumn::ALL
        .iter()
        .map(|column| {
            let text = format!("{}: {}", column.label(), cycles.filters.get(*column));
            if *column == selected {
                format!("[{text}]")
            } else {
                text
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn reports_text(active: Option<ReportKind>, cursor: usize) -> String {
    let mut lines: Vec<String> = ReportKind::ALL
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let marker = if index == cursor { ">" } else { " " };
            format!("{marker} {}", kind.title())
        })
        .collect();
    lines.push(String::new());
    match active {
        Some(kind) => lines.push(format!("{}: no report data available yet", kind.title())),
        None => lines.push("select a report with enter".to_owned()),
    }
    lines.join("\n")
}

fn key_hints(state: &AppState) -> &'static str {
    match state.mode {
        AppMode::Search => "type to filter | enter/esc done",
        AppMode::Form(_) => "tab next field | enter save | esc cancel",
        AppMode::Nav => match state.active_section {
            SectionKind::Items => "j/k row | h/l page | / search | space toggle | a add | r reload",
            SectionKind::Brochures => "j/k row | / search | a add | e edit | d delete | o download",
            SectionKind::Cycles => "j/k row | h/l column | / filter | x clear",
            SectionKind::Reports => "j/k report | enter select",
        },
    }
}

fn status_text(state: &AppState) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Form(_) => "FORM",
    };
    let hints = key_hints(state);
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints} | tab section | ctrl+q"),
        None => format!("{mode} | {hints} | tab section | ctrl+q"),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, ItemFormField, ViewData, handle_key_event, item_form_text,
        items_footer_text, process_internal_events, send_internal, status_text,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use europharm_app::{
        AppMode, AppState, Brochure, BrochureFormInput, BrochureId, Cycle, CycleColumn, CycleId,
        FetchRequest, FormKind, Item, ItemId, ItemPage, ItemPatch, ItemQuery, ItemStore, NewItem,
        SectionKind, Session,
    };
    use europharm_testkit::MemoryStore;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, Receiver, Sender};
    use time::{Date, Duration, Month, OffsetDateTime};

    struct TestRuntime {
        store: MemoryStore,
        brochures: Vec<Brochure>,
        cycles: Vec<Cycle>,
        parked: Option<Vec<FetchRequest>>,
        extracted: Vec<BrochureId>,
    }

    impl TestRuntime {
        fn new(rows: Vec<Item>) -> Self {
            Self {
                store: MemoryStore::with_items(rows),
                brochures: Vec::new(),
                cycles: Vec::new(),
                parked: None,
                extracted: Vec::new(),
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn query_items(&mut self, query: &ItemQuery) -> Result<ItemPage> {
            self.store.query_items(query)
        }

        fn insert_item(&mut self, item: &NewItem) -> Result<ItemId> {
            self.store.insert_item(item)
        }

        fn update_item(&mut self, id: &ItemId, patch: ItemPatch) -> Result<()> {
            self.store.update_item(id, patch)
        }

        fn list_brochures(&mut self, search: &str) -> Result<Vec<Brochure>> {
            Ok(self
                .brochures
                .iter()
                .filter(|brochure| brochure.matches(search))
                .cloned()
                .collect())
        }

        fn create_brochure(&mut self, input: &BrochureFormInput) -> Result<BrochureId> {
            let id = BrochureId::new(self.brochures.len() as i64 + 1);
            self.brochures.push(brochure(id.get(), &input.title, &input.category));
            Ok(id)
        }

        fn update_brochure(&mut self, id: BrochureId, input: &BrochureFormInput) -> Result<()> {
            let row = self
                .brochures
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| anyhow!("brochure {id} not found"))?;
            row.title = input.title.clone();
            Ok(())
        }

        fn delete_brochure(&mut self, id: BrochureId) -> Result<()> {
            self.brochures.retain(|row| row.id != id);
            Ok(())
        }

        fn attach_brochure(&mut self, _id: BrochureId, path: &Path) -> Result<()> {
            Err(anyhow!("no such file {}", path.display()))
        }

        fn extract_brochure(&mut self, id: BrochureId) -> Result<PathBuf> {
            self.extracted.push(id);
            Ok(PathBuf::from(format!("/cache/{id}.pdf")))
        }

        fn list_cycles(&mut self) -> Result<Vec<Cycle>> {
            Ok(self.cycles.clone())
        }

        fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
            if let Some(parked) = self.parked.as_mut() {
                parked.push(request);
                return Ok(());
            }
            let result = self.query_items(&request.query);
            send_internal(
                &tx,
                InternalEvent::Fetched {
                    ticket: request.ticket,
                    result,
                },
            )
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn signed_in(user: &str, runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                state: AppState::default(),
                runtime,
                view_data: ViewData {
                    session: Some(Session::login(user, "secret").expect("valid login")),
                    ..ViewData::default()
                },
                tx,
                rx,
            }
        }

        fn press(&mut self, code: KeyCode) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, KeyModifiers::NONE),
            );
            self.pump();
            quit
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn pump(&mut self) {
            process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
        }

        fn open_items(&mut self) {
            self.press(KeyCode::Char('r'));
        }
    }

    fn item(id: u32, code: &str, name: &str) -> Item {
        let created_at = OffsetDateTime::UNIX_EPOCH + Duration::minutes(i64::from(id));
        Item {
            id: ItemId::new(id.to_string()),
            code: code.to_owned(),
            name: name.to_owned(),
            alt_name: None,
            is_active: true,
            created_at,
            updated_at: created_at,
        }
    }

    fn catalog() -> Vec<Item> {
        vec![
            item(1, "AMX-500", "Amoxicillin Capsules"),
            item(2, "AZM-250", "Azithromycin Tablets"),
            item(3, "IBU-400", "Ibuprofen Tablets"),
        ]
    }

    fn brochure(id: i64, title: &str, category: &str) -> Brochure {
        Brochure {
            id: BrochureId::new(id),
            title: title.to_owned(),
            description: format!("{title} overview"),
            category: category.to_owned(),
            file_name: None,
            size_bytes: 0,
            checksum_sha256: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn cycle(id: i64, name: &str, month: Month) -> Cycle {
        let date_from = Date::from_calendar_date(2026, month, 1).expect("valid date");
        Cycle {
            id: CycleId::new(id),
            name: name.to_owned(),
            alt_name: format!("CY-{id}"),
            coefficient: 2,
            date_from,
            date_to: date_from + Duration::days(27),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn reload_key_fills_items_table_and_footer() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(catalog()));
        harness.open_items();

        let list = &harness.view_data.items.list;
        assert_eq!(list.rows().len(), 3);
        assert_eq!(list.rows()[0].code, "IBU-400");
        assert_eq!(
            items_footer_text(list),
            "Showing 1 to 3 of 3 | page 1 of 1"
        );
    }

    #[test]
    fn search_keystrokes_ignore_superseded_responses() {
        let mut runtime = TestRuntime::new(catalog());
        runtime.parked = Some(Vec::new());
        let mut harness = Harness::signed_in("maria", runtime);

        harness.press(KeyCode::Char('/'));
        assert_eq!(harness.state.mode, AppMode::Search);
        harness.type_text("az");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Nav);

        let parked = harness.runtime.parked.take().expect("requests parked");
        assert_eq!(parked.len(), 2);
        for request in parked.into_iter().rev() {
            let result = harness.runtime.query_items(&request.query);
            send_internal(
                &harness.tx,
                InternalEvent::Fetched {
                    ticket: request.ticket,
                    result,
                },
            )
            .expect("channel open");
        }
        harness.pump();

        let list = &harness.view_data.items.list;
        assert_eq!(list.search_term(), "az");
        assert_eq!(list.total(), 1);
        assert_eq!(list.rows()[0].code, "AZM-250");
    }

    #[test]
    fn toggle_key_flips_row_and_persists() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(catalog()));
        harness.open_items();

        harness.press(KeyCode::Char(' '));
        let id = ItemId::new("3");
        assert!(!harness.view_data.items.list.rows()[0].is_active);
        assert!(!harness.runtime.store.row(&id).expect("row").is_active);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("IBU-400 marked inactive")
        );
    }

    #[test]
    fn failed_toggle_reverts_with_one_notice() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(catalog()));
        harness.open_items();
        harness.runtime.store.fail_next_update("permission denied");

        let token_before = harness.view_data.status_token;
        harness.press(KeyCode::Char('t'));

        assert!(harness.view_data.items.list.rows()[0].is_active);
        assert_eq!(harness.view_data.status_token, token_before + 1);
        let status = harness.state.status_line.clone().unwrap_or_default();
        assert!(status.contains("permission denied"), "{status}");
    }

    #[test]
    fn create_form_blocks_blank_fields_then_creates_once() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(catalog()));
        harness.open_items();

        harness.press(KeyCode::Char('a'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Item));
        harness.type_text("NEW-1");
        harness.press(KeyCode::Enter);
        assert!(harness.runtime.store.inserts().is_empty());
        assert_eq!(harness.view_data.item_field, ItemFormField::Name);
        let text = item_form_text(&harness.view_data.items.create, harness.view_data.item_field);
        assert!(text.contains("Name is required"), "{text}");

        let queries_before = harness.runtime.store.queries().len();
        harness.type_text("New Item");
        harness.press(KeyCode::Enter);

        assert_eq!(harness.runtime.store.inserts().len(), 1);
        assert_eq!(harness.runtime.store.queries().len(), queries_before + 1);
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert!(!harness.view_data.items.create.is_open());
        assert_eq!(harness.view_data.items.list.total(), 4);
        assert_eq!(harness.view_data.items.list.rows()[0].code, "NEW-1");
    }

    #[test]
    fn rejected_create_keeps_form_open_with_message() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(catalog()));
        harness.press(KeyCode::Char('a'));
        harness.type_text("AMX-500");
        harness.press(KeyCode::Tab);
        harness.type_text("Duplicate");
        harness.runtime.store.fail_next_insert("duplicate code");
        harness.press(KeyCode::Enter);

        let form = &harness.view_data.items.create;
        assert!(form.is_open());
        assert_eq!(form.code, "AMX-500");
        assert_eq!(form.store_error(), Some("duplicate code"));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Item));

        harness.press(KeyCode::Esc);
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert!(!harness.view_data.items.create.is_open());
    }

    #[test]
    fn brochure_changes_require_supervisor() {
        let mut runtime = TestRuntime::new(Vec::new());
        runtime.brochures = vec![brochure(1, "Vaccine Information", "Immunization")];
        let mut harness = Harness::signed_in("maria", runtime);
        harness.press(KeyCode::Char('3'));
        assert_eq!(harness.state.active_section, SectionKind::Brochures);
        assert_eq!(harness.view_data.brochures.rows.len(), 1);

        harness.press(KeyCode::Char('d'));
        assert!(harness.view_data.brochures.pending_delete.is_none());
        let status = harness.state.status_line.clone().unwrap_or_default();
        assert!(status.contains("requires a supervisor"), "{status}");

        harness.press(KeyCode::Char('o'));
        assert_eq!(harness.runtime.extracted, vec![BrochureId::new(1)]);
    }

    #[test]
    fn supervisor_adds_and_deletes_brochures() {
        let mut harness = Harness::signed_in("admin", TestRuntime::new(Vec::new()));
        harness.press(KeyCode::Char('3'));

        harness.press(KeyCode::Char('a'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Brochure));
        harness.type_text("Statin Guide");
        harness.press(KeyCode::Enter);
        let error = harness
            .view_data
            .brochures
            .form
            .as_ref()
            .and_then(|form| form.error.clone())
            .unwrap_or_default();
        assert!(error.contains("description is required"), "{error}");

        harness.press(KeyCode::Tab);
        harness.type_text("Dosage tables");
        harness.press(KeyCode::Tab);
        harness.type_text("Cardiology");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.view_data.brochures.rows.len(), 1);

        harness.press(KeyCode::Char('d'));
        assert!(harness.view_data.brochures.pending_delete.is_some());
        harness.press(KeyCode::Char('y'));
        assert!(harness.runtime.brochures.is_empty());
        assert_eq!(harness.state.status_line.as_deref(), Some("brochure deleted"));
    }

    #[test]
    fn cycle_filters_narrow_visible_rows() {
        let mut runtime = TestRuntime::new(Vec::new());
        runtime.cycles = vec![
            cycle(1, "Antibiotic Cycle", Month::January),
            cycle(2, "Pain Management", Month::February),
        ];
        let mut harness = Harness::signed_in("maria", runtime);
        harness.press(KeyCode::Char('1'));
        assert_eq!(harness.view_data.cycles.rows.len(), 2);

        harness.press(KeyCode::Char('l'));
        assert_eq!(harness.view_data.cycles.selected_column(), CycleColumn::Name);
        harness.press(KeyCode::Char('/'));
        harness.type_text("pain");
        harness.press(KeyCode::Esc);
        assert_eq!(harness.view_data.cycles.visible().len(), 1);

        harness.press(KeyCode::Char('x'));
        assert_eq!(harness.view_data.cycles.visible().len(), 2);
    }

    #[test]
    fn report_selection_shows_notice() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(Vec::new()));
        harness.press(KeyCode::Char('4'));
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Enter);
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("Users Attendance report selected")
        );
        assert!(status_text(&harness.state).contains("Users Attendance report selected"));
    }

    #[test]
    fn login_screen_requires_credentials_and_logout_returns_to_it() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(catalog()));
        harness.press(KeyCode::Char('L'));
        assert!(harness.view_data.session.is_none());

        harness.press(KeyCode::Enter);
        assert!(harness.view_data.login.error.is_some());

        harness.type_text("admin");
        harness.press(KeyCode::Tab);
        harness.type_text("pw");
        harness.press(KeyCode::Enter);
        let session = harness.view_data.session.as_ref().expect("signed in");
        assert!(session.is_supervisor());
        assert_eq!(harness.state.status_line.as_deref(), Some("Welcome, admin"));
        assert_eq!(harness.view_data.items.list.total(), 3);
    }

    #[test]
    fn stale_clear_status_token_is_ignored() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(Vec::new()));
        harness.press(KeyCode::Char('4'));
        harness.press(KeyCode::Enter);
        let current = harness.view_data.status_token;

        send_internal(&harness.tx, InternalEvent::ClearStatus { token: current - 1 })
            .expect("channel open");
        harness.pump();
        assert!(harness.state.status_line.is_some());

        send_internal(&harness.tx, InternalEvent::ClearStatus { token: current })
            .expect("channel open");
        harness.pump();
        assert!(harness.state.status_line.is_none());
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::signed_in("maria", TestRuntime::new(Vec::new()));
        let quit = handle_key_event(
            &mut harness.state,
            &mut harness.runtime,
            &mut harness.view_data,
            &harness.tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        );
        assert!(quit);
    }
}
