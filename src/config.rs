use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::label::LabelKind;
use crate::roles::SystemLabels;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Raw server path of the Inbox. Always a system label, never deletable.
    pub inbox: String,
    /// Personal namespace prefix (with trailing delimiter), e.g. "INBOX.".
    pub namespace: String,
    /// Where chosen system labels are persisted. Defaults next to the config.
    pub settings_path: Option<String>,
    pub refresh: RefreshConfig,
    pub system_labels: SystemLabels,
    pub names: SystemNames,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inbox: "INBOX".to_string(),
            namespace: String::new(),
            settings_path: None,
            refresh: RefreshConfig::default(),
            system_labels: SystemLabels::default(),
            names: SystemNames::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Refresh cadence
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RefreshConfig {
    /// Minimum seconds between two scheduled polls of the same label.
    pub cooldown_secs: i64,
    /// Most labels handed out per scheduler pass.
    pub batch_limit: usize,
    /// Seconds between scheduler passes.
    pub tick_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            batch_limit: 5,
            tick_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Display names for system labels
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SystemNames {
    pub inbox: String,
    pub sent: String,
    pub drafts: String,
    pub spam: String,
    pub trash: String,
    pub archive: String,
}

impl Default for SystemNames {
    fn default() -> Self {
        Self {
            inbox: "Inbox".to_string(),
            sent: "Sent".to_string(),
            drafts: "Drafts".to_string(),
            spam: "Spam".to_string(),
            trash: "Trash".to_string(),
            archive: "Archive".to_string(),
        }
    }
}

impl SystemNames {
    /// Display name for a system kind, `None` for user labels.
    pub fn name_for(&self, kind: LabelKind) -> Option<&str> {
        match kind {
            LabelKind::User => None,
            LabelKind::Inbox => Some(&self.inbox),
            LabelKind::Sent => Some(&self.sent),
            LabelKind::Drafts => Some(&self.drafts),
            LabelKind::Spam => Some(&self.spam),
            LabelKind::Trash => Some(&self.trash),
            LabelKind::Archive => Some(&self.archive),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load `$LABELTREE_CONFIG`, else `config.toml` from the first config
    /// directory that has one. Defaults when there is no file at all.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::locate() else {
            return Ok(Config::default());
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Path of the persisted system-label choices.
    pub fn effective_settings_path(&self) -> PathBuf {
        match self.settings_path {
            Some(ref p) => expand_tilde(p),
            None => config_dir().join("system_labels.toml"),
        }
    }

    /// First existing file among the override and each config directory.
    fn locate() -> Option<PathBuf> {
        let dirs = config_dirs(
            std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
            std::env::var("HOME").ok().as_deref(),
        );
        std::env::var("LABELTREE_CONFIG")
            .ok()
            .map(PathBuf::from)
            .into_iter()
            .chain(dirs.into_iter().map(|d| d.join("config.toml")))
            .find(|p| p.is_file())
    }
}

/// labeltree directories under `$XDG_CONFIG_HOME` and `~/.config`, in lookup order.
fn config_dirs(xdg: Option<&str>, home: Option<&str>) -> Vec<PathBuf> {
    let xdg = xdg.map(PathBuf::from);
    let home = home.map(|h| PathBuf::from(h).join(".config"));
    xdg.into_iter()
        .chain(home)
        .map(|base| base.join("labeltree"))
        .collect()
}

/// Where labeltree keeps its own files when nothing is configured.
fn config_dir() -> PathBuf {
    config_dirs(
        std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
        std::env::var("HOME").ok().as_deref(),
    )
    .into_iter()
    .next()
    .unwrap_or_else(|| PathBuf::from("."))
}

fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
