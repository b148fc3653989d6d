// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use tracing::{debug, warn};

use crate::{FieldError, FormField, ItemId, NewItem, StoreError, StoreOperation};

pub const CODE_REQUIRED: &str = "Code is required";
pub const NAME_REQUIRED: &str = "Name is required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Valid input; the caller performs exactly one insert with this payload.
    Ready(NewItem),
    Invalid(Vec<FieldError>),
    /// A submit is already in flight.
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Created(ItemId),
    Rejected(String),
    Ignored,
}

/// Create-item dialog. Text fields are edited in place; `is_active` starts
/// on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemForm {
    pub code: String,
    pub name: String,
    pub is_active: bool,
    open: bool,
    submitting: bool,
    field_errors: Vec<FieldError>,
    store_error: Option<String>,
}

impl Default for CreateItemForm {
    fn default() -> Self {
        Self {
            code: String::new(),
            name: String::new(),
            is_active: true,
            open: false,
            submitting: false,
            field_errors: Vec::new(),
            store_error: None,
        }
    }
}

impl CreateItemForm {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn field_error(&self, field: FormField) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn store_error(&self) -> Option<&str> {
        self.store_error.as_deref()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Cancel. Ignored while a submit is in flight.
    pub fn close(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        *self = Self::default();
        true
    }

    pub fn validate(&self) -> std::result::Result<NewItem, Vec<FieldError>> {
        let code = self.code.trim();
        let name = self.name.trim();
        let mut errors = Vec::new();
        if code.is_empty() {
            errors.push(FieldError::required(FormField::Code, CODE_REQUIRED));
        }
        if name.is_empty() {
            errors.push(FieldError::required(FormField::Name, NAME_REQUIRED));
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewItem {
            code: code.to_owned(),
            name: name.to_owned(),
            is_active: self.is_active,
        })
    }

    pub fn begin_submit(&mut self) -> SubmitOutcome {
        if self.submitting {
            debug!("create item submit ignored; previous submit in flight");
            return SubmitOutcome::Blocked;
        }
        match self.validate() {
            Ok(item) => {
                self.field_errors.clear();
                self.store_error = None;
                self.submitting = true;
                SubmitOutcome::Ready(item)
            }
            Err(errors) => {
                self.field_errors = errors.clone();
                SubmitOutcome::Invalid(errors)
            }
        }
    }

    /// On success the form resets and closes. On failure it stays open with
    /// the user's input and the store's message verbatim.
    pub fn finish_submit(&mut self, result: Result<ItemId>) -> FormEvent {
        if !self.submitting {
            return FormEvent::Ignored;
        }
        self.submitting = false;
        match result {
            Ok(id) => {
                *self = Self::default();
                FormEvent::Created(id)
            }
            Err(error) => {
                let error = StoreError::new(StoreOperation::Insert, &error);
                warn!(%error, code = %self.code.trim(), "create item failed");
                self.store_error = Some(error.message.clone());
                FormEvent::Rejected(error.message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrochureFormInput {
    pub title: String,
    pub description: String,
    pub category: String,
}

impl BrochureFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("brochure title is required -- enter a title and retry");
        }
        if self.description.trim().is_empty() {
            bail!("brochure description is required -- enter a description and retry");
        }
        if self.category.trim().is_empty() {
            bail!("brochure category is required -- enter a category and retry");
        }
        Ok(())
    }

    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            category: self.category.trim().to_owned(),
        }
    }
}
