use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "list" => Ok(Self::List),
            other => Err(format!("unknown view mode '{other}'")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid admin credentials")]
    InvalidCredentials,
    #[error("admin sign-in required")]
    NotSignedIn,
}

/// Admin state for one client session.
///
/// Created at session start from injected credentials, read by whatever needs
/// the admin gate or the view preference, and cleared by [`AdminSession::sign_out`].
#[derive(Debug)]
pub struct AdminSession {
    credentials: AdminCredentials,
    signed_in_as: Option<String>,
    default_view: ViewMode,
    view_mode: ViewMode,
}

impl AdminSession {
    pub fn start(credentials: AdminCredentials, default_view: ViewMode) -> Self {
        Self {
            credentials,
            signed_in_as: None,
            default_view,
            view_mode: default_view,
        }
    }

    pub fn sign_in(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        if username != self.credentials.username || password != self.credentials.password {
            return Err(SessionError::InvalidCredentials);
        }
        info!(username, "admin signed in");
        self.signed_in_as = Some(username.to_string());
        Ok(())
    }

    pub fn sign_out(&mut self) {
        if let Some(username) = self.signed_in_as.take() {
            info!(%username, "admin signed out");
        }
        self.view_mode = self.default_view;
    }

    pub fn is_admin(&self) -> bool {
        self.signed_in_as.is_some()
    }

    pub fn require_admin(&self) -> Result<(), SessionError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(SessionError::NotSignedIn)
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }
}
