// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

const SUPERVISOR_NAME: &str = "admin";

/// The signed-in back-office user. Credentials are not verified against
/// anything; any non-blank pair is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
}

impl Session {
    pub fn login(username: &str, password: &str) -> Result<Self> {
        let name = username.trim();
        if name.is_empty() {
            bail!("username is required -- enter a username and retry");
        }
        if password.is_empty() {
            bail!("password is required -- enter a password and retry");
        }
        Ok(Self {
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_supervisor(&self) -> bool {
        self.name == SUPERVISOR_NAME
    }

    pub fn greeting(&self) -> String {
        format!("Welcome, {}", self.name)
    }

    pub fn require_supervisor(&self, action: &str) -> Result<()> {
        if !self.is_supervisor() {
            bail!("{action} requires a supervisor -- sign in as {SUPERVISOR_NAME} and retry");
        }
        Ok(())
    }

    /// Consumes the session; callers fall back to the login screen.
    pub fn logout(self) {
        tracing::info!(user = %self.name, "signed out");
    }
}
