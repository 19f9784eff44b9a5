use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::env;
use crate::session::DuplicatePolicy;

/// Launcher settings. Accounts are never written here; they live only for the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Native program that performs the OAuth login and reports events on stdout.
    pub auth_helper: Option<PathBuf>,
    pub auth_helper_args: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
}

impl LauncherConfig {
    pub fn load() -> Self {
        Self::load_from(&env::config_path())
    }

    /// Read settings from `path`, falling back to defaults when absent or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("config: {} not found; using defaults", path.display());
                return Self::default();
            }
            Err(err) => {
                warn!("config: unable to read {}: {err}", path.display());
                return Self::default();
            }
        };
        match Self::parse(&raw) {
            Ok(config) => {
                info!("config: loaded {}", path.display());
                config
            }
            Err(err) => {
                warn!("config: {}: {err}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("invalid launcher config: {e}"))
    }

    /// Apply command-line flags on top of the file settings.
    pub fn with_overrides(mut self, auth_helper: Option<PathBuf>, merge_duplicates: bool) -> Self {
        if let Some(helper) = auth_helper {
            self.auth_helper = Some(helper);
        }
        if merge_duplicates {
            self.duplicate_policy = DuplicatePolicy::MergeByEmail;
        }
        self
    }
}
