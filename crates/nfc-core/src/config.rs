//! Context configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file named by
//! `NFC_CONFIG`, then the `NFC_DEVICE` and `NFC_AUTO_SCAN` environment variables.

use crate::connstring::ConnString;
use crate::error::{NfcError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_ENV: &str = "NFC_CONFIG";
pub const DEVICE_ENV: &str = "NFC_DEVICE";
pub const AUTO_SCAN_ENV: &str = "NFC_AUTO_SCAN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfig {
    /// User-defined device opened in place of auto-detection.
    pub device: Option<String>,
    /// Whether an empty connection string may probe for devices.
    pub allow_autoscan: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            device: None,
            allow_autoscan: true,
        }
    }
}

impl ContextConfig {
    /// Load the layered configuration from the process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NfcError::validation(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| NfcError::validation(format!("invalid config: {}", e)))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device) = lookup(DEVICE_ENV).filter(|d| !d.is_empty()) {
            self.device = Some(device);
        }
        if let Some(flag) = lookup(AUTO_SCAN_ENV).as_deref().and_then(parse_bool) {
            self.allow_autoscan = flag;
        }
    }

    /// The user-defined device as a bounded connection string, if any.
    pub fn device_connstring(&self) -> Result<Option<ConnString>> {
        self.device.as_deref().map(ConnString::new).transpose()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
