use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::{
    reconciler::ConsistencyPolicy,
    session::{AdminCredentials, ViewMode},
};

pub const DEFAULT_SETTINGS_FILE: &str = "storefront.toml";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: String,
    pub admin: AdminCredentials,
    pub view_mode: ViewMode,
    pub consistency: ConsistencyPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            admin: AdminCredentials {
                username: "admin".into(),
                password: "admin".into(),
            },
            view_mode: ViewMode::default(),
            consistency: ConsistencyPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    admin_username: Option<String>,
    admin_password: Option<String>,
    view_mode: Option<ViewMode>,
    consistency: Option<ConsistencyPolicy>,
}

/// Loads defaults, then the settings file, then `STOREFRONT__*` environment overrides.
///
/// A missing default file is fine; an explicitly named file must exist and parse.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_SETTINGS_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse settings file {}", path.display()))?;
            apply_file_settings(&mut settings, file_cfg);
        }
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read settings file {}", path.display()));
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.admin_username {
        settings.admin.username = v;
    }
    if let Some(v) = file_cfg.admin_password {
        settings.admin.password = v;
    }
    if let Some(v) = file_cfg.view_mode {
        settings.view_mode = v;
    }
    if let Some(v) = file_cfg.consistency {
        settings.consistency = v;
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("STOREFRONT__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("STOREFRONT__ADMIN_USERNAME") {
        settings.admin.username = v;
    }
    if let Some(v) = lookup("STOREFRONT__ADMIN_PASSWORD") {
        settings.admin.password = v;
    }
    if let Some(v) = lookup("STOREFRONT__VIEW_MODE") {
        match v.parse() {
            Ok(view_mode) => settings.view_mode = view_mode,
            Err(error) => warn!(%error, "ignoring STOREFRONT__VIEW_MODE"),
        }
    }
    if let Some(v) = lookup("STOREFRONT__CONSISTENCY") {
        match v.parse() {
            Ok(policy) => settings.consistency = policy,
            Err(error) => warn!(%error, "ignoring STOREFRONT__CONSISTENCY"),
        }
    }
}
