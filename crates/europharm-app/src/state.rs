// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, ReportKind, SectionKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_section: SectionKind,
    pub active_report: Option<ReportKind>,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_section: SectionKind::Items,
            active_report: None,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextSection,
    PrevSection,
    SelectSection(SectionKind),
    EnterSearch,
    ExitToNav,
    OpenForm(FormKind),
    SelectReport(ReportKind),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    SectionChanged(SectionKind),
    ReportSelected(ReportKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn with_section(section: SectionKind) -> Self {
        Self {
            active_section: section,
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextSection => self.rotate_section(1),
            AppCommand::PrevSection => self.rotate_section(-1),
            AppCommand::SelectSection(section) => {
                if section == self.active_section {
                    return Vec::new();
                }
                self.active_section = section;
                self.mode = AppMode::Nav;
                vec![AppEvent::SectionChanged(section)]
            }
            AppCommand::EnterSearch => {
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SelectReport(kind) => {
                self.active_report = Some(kind);
                vec![
                    AppEvent::ReportSelected(kind),
                    self.set_status(&format!("{} report selected", kind.title())),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }

    fn rotate_section(&mut self, delta: isize) -> Vec<AppEvent> {
        let sections = SectionKind::ALL;
        let current = sections
            .iter()
            .position(|section| *section == self.active_section)
            .unwrap_or(0) as isize;
        let len = sections.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_section = sections[next];
        self.mode = AppMode::Nav;
        vec![AppEvent::SectionChanged(self.active_section)]
    }
}
