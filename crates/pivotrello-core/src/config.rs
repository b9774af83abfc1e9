use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::DEFAULT_CHECKLIST_NAME;
use crate::error::ErrorCode;
use crate::model::{LabelColor, StoryKind, StoryState, TrelloId};
use crate::retry::RetryPolicy;

/// Value that means "do not import" / "do not create this label" in presets.
const NONE_VALUE: &str = "none";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Preferred output mode: `pretty`, `text` or `json`.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub pivotal: PivotalConfig,
    #[serde(default)]
    pub trello: TrelloConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    /// Kind names, `tracker_labels` and `estimate`, each to a color or `none`.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotalConfig {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrelloConfig {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_checklist_name")]
    pub checklist_name: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            checklist_name: default_checklist_name(),
        }
    }
}

/// Preset list ids keyed by state name and by kind name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListsConfig {
    #[serde(default)]
    pub state: BTreeMap<String, String>,
    #[serde(default)]
    pub kind: BTreeMap<String, String>,
}

/// Answers taken from the config file instead of prompting.
///
/// The inner `Option` is the answer itself: `None` means the operator chose
/// not to import (lists) or not to create the label (colors).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presets {
    pub states: BTreeMap<StoryState, Option<TrelloId>>,
    pub kinds: BTreeMap<StoryKind, Option<TrelloId>>,
    pub kind_colors: BTreeMap<StoryKind, Option<LabelColor>>,
    pub tracker_labels: Option<Option<LabelColor>>,
    pub estimate: Option<Option<LabelColor>>,
}

impl Config {
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_secs(self.retry.base_delay_secs),
        )
    }

    /// Interpret the `[lists]` and `[labels]` tables.
    ///
    /// # Errors
    ///
    /// Fails on an unknown state, kind, label key or color.
    pub fn presets(&self) -> Result<Presets> {
        let mut presets = Presets::default();

        for (state, list) in &self.lists.state {
            let state: StoryState = state.parse().context("Invalid key in [lists.state]")?;
            presets.states.insert(state, preset_list(list));
        }
        for (kind, list) in &self.lists.kind {
            let kind: StoryKind = kind.parse().context("Invalid key in [lists.kind]")?;
            presets.kinds.insert(kind, preset_list(list));
        }

        for (key, value) in &self.labels {
            let color = preset_color(value).with_context(|| format!("Invalid color for label `{key}`"))?;
            match key.as_str() {
                "tracker_labels" => presets.tracker_labels = Some(color),
                "estimate" => presets.estimate = Some(color),
                kind => {
                    let kind: StoryKind = kind.parse().context("Invalid key in [labels]")?;
                    presets.kind_colors.insert(kind, color);
                }
            }
        }

        Ok(presets)
    }
}

fn preset_list(value: &str) -> Option<TrelloId> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(NONE_VALUE) {
        None
    } else {
        Some(value.to_string())
    }
}

fn preset_color(value: &str) -> Result<Option<LabelColor>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(NONE_VALUE) {
        return Ok(None);
    }
    Ok(Some(value.parse()?))
}

/// `<config_dir>/pivotrello/config.toml`, if the platform has a config dir.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pivotrello/config.toml"))
}

/// Load `path`, or the default location when `None`.
///
/// A missing default file yields defaults; a missing explicit file is an
/// error.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content).map_err(|err| {
        anyhow::Error::new(ConfigParseError {
            path: path.clone(),
            message: err.to_string(),
        })
    })
}

/// The config file exists but is not valid.
#[derive(Debug, thiserror::Error)]
#[error("Failed to parse {}: {message}", path.display())]
pub struct ConfigParseError {
    pub path: PathBuf,
    pub message: String,
}

impl ConfigParseError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigParseError
    }
}

/// A credential was supplied by none of flag, environment or file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing {name}: pass {flag} or set {env}")]
pub struct MissingCredential {
    pub name: &'static str,
    pub flag: &'static str,
    pub env: &'static str,
}

impl MissingCredential {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MissingCredentials
    }
}

/// First non-blank of flag, environment and file values.
#[must_use]
pub fn resolve_secret(
    flag: Option<&str>,
    env: Option<&str>,
    file: Option<&str>,
) -> Option<String> {
    [flag, env, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// Like [`resolve_secret`], reading `env_var` from the process environment.
///
/// # Errors
///
/// Returns [`MissingCredential`] when no source has a value.
pub fn require_secret(
    flag: Option<&str>,
    file: Option<&str>,
    credential: MissingCredential,
) -> Result<String, MissingCredential> {
    let env = std::env::var(credential.env).ok();
    resolve_secret(flag, env.as_deref(), file).ok_or(credential)
}

const fn default_max_retries() -> u32 {
    7
}

const fn default_base_delay_secs() -> u64 {
    30
}

fn default_checklist_name() -> String {
    DEFAULT_CHECKLIST_NAME.to_string()
}
