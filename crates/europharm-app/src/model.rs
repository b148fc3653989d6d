// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::ids::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub code: String,
    pub name: String,
    pub alt_name: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Item {
    pub const fn status_label(&self) -> &'static str {
        if self.is_active { "Active" } else { "Inactive" }
    }
}

/// Insert payload. Exactly the columns the create form owns; the store
/// assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

/// Single-field update. `is_active` is the only column the back-office mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemPatch {
    IsActive(bool),
}

impl ItemPatch {
    pub const fn column(self) -> &'static str {
        match self {
            Self::IsActive(_) => "is_active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brochure {
    pub id: BrochureId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub file_name: Option<String>,
    pub size_bytes: i64,
    pub checksum_sha256: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Brochure {
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.title, &self.description, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn size_label(&self) -> String {
        if self.file_name.is_none() {
            return String::new();
        }
        format_size(self.size_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub name: String,
    pub alt_name: String,
    pub coefficient: i64,
    pub date_from: Date,
    pub date_to: Date,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Cycle {
    /// Inclusive day span; zero when the range is inverted.
    pub fn days(&self) -> i64 {
        let span = (self.date_to - self.date_from).whole_days();
        if span < 0 { 0 } else { span + 1 }
    }

    pub fn cell(&self, column: CycleColumn) -> String {
        match column {
            CycleColumn::Id => self.id.get().to_string(),
            CycleColumn::Name => self.name.clone(),
            CycleColumn::AltName => self.alt_name.clone(),
            CycleColumn::Coefficient => self.coefficient.to_string(),
            CycleColumn::DateFrom => self.date_from.to_string(),
            CycleColumn::DateTo => self.date_to.to_string(),
            CycleColumn::Days => self.days().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCycle {
    pub name: String,
    pub alt_name: String,
    pub coefficient: i64,
    pub date_from: Date,
    pub date_to: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CycleColumn {
    Id,
    Name,
    AltName,
    Coefficient,
    DateFrom,
    DateTo,
    Days,
}

impl CycleColumn {
    pub const ALL: [Self; 7] = [
        Self::Id,
        Self::Name,
        Self::AltName,
        Self::Coefficient,
        Self::DateFrom,
        Self::DateTo,
        Self::Days,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Cycle Name",
            Self::AltName => "Cycle Alt Name",
            Self::Coefficient => "Coefficient Number",
            Self::DateFrom => "Date From",
            Self::DateTo => "Date To",
            Self::Days => "Cycle Days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleFilters {
    values: [String; 7],
}

impl CycleFilters {
    pub fn get(&self, column: CycleColumn) -> &str {
        &self.values[column as usize]
    }

    pub fn set(&mut self, column: CycleColumn, value: impl Into<String>) {
        self.values[column as usize] = value.into();
    }

    pub fn clear(&mut self, column: CycleColumn) {
        self.values[column as usize].clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|value| value.trim().is_empty())
    }

    pub fn matches(&self, cycle: &Cycle) -> bool {
        CycleColumn::ALL.iter().all(|column| {
            let needle = self.get(*column).trim().to_lowercase();
            needle.is_empty() || cycle.cell(*column).to_lowercase().contains(&needle)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    VisitTracking,
    UsersAttendance,
    CustomerCoverage,
    WeeklyReports,
}

impl ReportKind {
    pub const ALL: [Self; 4] = [
        Self::VisitTracking,
        Self::UsersAttendance,
        Self::CustomerCoverage,
        Self::WeeklyReports,
    ];

    pub const fn title(self) -> &'static str {
        match self {
            Self::VisitTracking => "Visit Tracking",
            Self::UsersAttendance => "Users Attendance",
            Self::CustomerCoverage => "Customer Coverage",
            Self::WeeklyReports => "Weekly Reports",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    Cycles,
    Items,
    Brochures,
    Reports,
}

impl SectionKind {
    pub const ALL: [Self; 4] = [Self::Cycles, Self::Items, Self::Brochures, Self::Reports];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Cycles => "cycles",
            Self::Items => "items",
            Self::Brochures => "brochures",
            Self::Reports => "reports",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cycles" => Some(Self::Cycles),
            "items" => Some(Self::Items),
            "brochures" => Some(Self::Brochures),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Item,
    Brochure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Form(FormKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

pub fn format_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let value = bytes.max(0) as f64;
    if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{} B", bytes.max(0))
    }
}
