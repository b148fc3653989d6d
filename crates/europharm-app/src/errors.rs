// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Code,
    Name,
}

impl FormField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Name => "name",
        }
    }
}

/// Local, field-level rejection. Never reaches a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    pub fn required(field: FormField, message: &str) -> Self {
        Self {
            field,
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.label(), self.message)
    }
}

impl std::error::Error for FieldError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Query,
    Insert,
    Update,
}

impl StoreOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

/// A query or write the store rejected. Recoverable: the caller keeps its
/// last good state and may retry with the same action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub operation: StoreOperation,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: StoreOperation, error: &anyhow::Error) -> Self {
        Self {
            operation,
            message: format!("{error:#}"),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

/// A completion arrived for a query that is no longer the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleResponseDiscarded {
    pub ticket: u64,
    pub current: u64,
}

impl fmt::Display for StaleResponseDiscarded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discarded response for query {} (latest is {})",
            self.ticket, self.current
        )
    }
}

impl std::error::Error for StaleResponseDiscarded {}

#[cfg(test)]
mod tests {
    use super::{FieldError, FormField, StoreError, StoreOperation};
    use anyhow::{Context, anyhow};

    #[test]
    fn store_error_keeps_full_context_chain() {
        let error = Err::<(), _>(anyhow!("connection refused"))
            .context("query items")
            .expect_err("error expected");
        let store_error = StoreError::new(StoreOperation::Query, &error);
        assert_eq!(store_error.message, "query items: connection refused");
        assert_eq!(
            store_error.to_string(),
            "query failed: query items: connection refused"
        );
    }

    #[test]
    fn field_error_names_the_field() {
        let error = FieldError::required(FormField::Code, "Code is required");
        assert_eq!(error.to_string(), "code: Code is required");
    }
}
