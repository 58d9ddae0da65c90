//! Settings store backends.
//!
//! Both stores keep a flat JSON object keyed by the fixed storage
//! namespace; the user theme lives under
//! [`USER_THEME_STORAGE_KEY`](lector_orchestrator::settings::USER_THEME_STORAGE_KEY).
//! Malformed stored values never surface to callers: reads go through
//! [`normalize_user_theme`] and unreadable state degrades to defaults.

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use lector_orchestrator::settings::{
    normalize_user_theme, SettingsStore, UserTheme, USER_THEME_STORAGE_KEY,
};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

fn theme_from_values(values: &Map<String, Value>) -> Option<UserTheme> {
    values
        .get(USER_THEME_STORAGE_KEY)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn merged_theme(values: &Map<String, Value>, partial: UserTheme) -> Result<Value> {
    let mut theme = theme_from_values(values).unwrap_or_default();
    theme.merge(partial);
    serde_json::to_value(&theme).context("encoding user theme")
}

/// Volatile in-memory store, used in tests and one-off sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Map<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| anyhow!("settings store lock poisoned"))
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_user_theme(&self) -> Result<UserTheme> {
        let values = self.lock()?;
        Ok(normalize_user_theme(theme_from_values(&values)))
    }

    async fn merge_user_theme(&self, partial: UserTheme) -> Result<()> {
        let mut values = self.lock()?;
        let encoded = merged_theme(&values, partial)?;
        values.insert(USER_THEME_STORAGE_KEY.to_owned(), encoded);
        Ok(())
    }
}

/// Store persisting the settings object as a JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_values(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            // A corrupt settings file reads as empty rather than failing.
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_default()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(error) => Err(error).context("reading settings store"),
        }
    }

    async fn write_values(&self, values: &Map<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(values).context("encoding settings store")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .context("writing settings store")
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get_user_theme(&self) -> Result<UserTheme> {
        let values = self.read_values().await?;
        Ok(normalize_user_theme(theme_from_values(&values)))
    }

    async fn merge_user_theme(&self, partial: UserTheme) -> Result<()> {
        let mut values = self.read_values().await?;
        let encoded = merged_theme(&values, partial)?;
        values.insert(USER_THEME_STORAGE_KEY.to_owned(), encoded);
        self.write_values(&values).await
    }
}
