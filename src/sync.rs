//! Keeps the local reminder list in step with the reminder source.
//!
//! The source is fingerprinted (SHA-256) every cycle; the list is only re-fetched and
//! replaced when the fingerprint changes. Failures leave the current list in place and
//! are retried on the next cycle.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::reminder::{store, Reminder};

/// Where reminder definitions come from.
#[async_trait]
pub trait ReminderSource: Send + Sync {
    /// Content fingerprint of the current definition list.
    async fn fingerprint(&self) -> Result<Vec<u8>>;

    async fn fetch_reminders(&self) -> Result<Vec<Reminder>>;
}

pub fn fingerprint_bytes(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

fn parse_reminders(bytes: &[u8]) -> Result<Vec<Reminder>> {
    serde_json::from_slice(bytes).context("invalid reminder list JSON")
}

/// Drop later definitions that reuse an id; the first one wins.
fn dedup_by_id(reminders: Vec<Reminder>) -> Vec<Reminder> {
    let mut seen = HashSet::new();
    reminders
        .into_iter()
        .filter(|r| {
            let first = seen.insert(r.id.clone());
            if !first {
                tracing::warn!(id = %r.id, "duplicate reminder id, keeping the first definition");
            }
            first
        })
        .collect()
}

/// A reminder list in a local JSON file.
pub struct FileReminderSource {
    path: PathBuf,
}

impl FileReminderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))
    }
}

#[async_trait]
impl ReminderSource for FileReminderSource {
    async fn fingerprint(&self) -> Result<Vec<u8>> {
        Ok(fingerprint_bytes(&self.read().await?))
    }

    async fn fetch_reminders(&self) -> Result<Vec<Reminder>> {
        parse_reminders(&self.read().await?)
    }
}

/// A reminder list served over HTTP(S).
pub struct HttpReminderSource {
    client: reqwest::Client,
    url: String,
}

impl HttpReminderSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn get(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("HTTP request failed for {}", self.url))?;

        anyhow::ensure!(
            response.status().is_success(),
            "reminder fetch failed with HTTP {}",
            response.status()
        );

        let bytes = response.bytes().await.context("error reading response")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ReminderSource for HttpReminderSource {
    async fn fingerprint(&self) -> Result<Vec<u8>> {
        Ok(fingerprint_bytes(&self.get().await?))
    }

    async fn fetch_reminders(&self) -> Result<Vec<Reminder>> {
        parse_reminders(&self.get().await?)
    }
}

/// Build the source named by `sources.reminders`: an `http(s)://` URL or a file path.
pub fn source_from_config(location: &str) -> Result<Box<dyn ReminderSource>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpReminderSource::new(location)?))
    } else {
        Ok(Box::new(FileReminderSource::new(crate::config::expand_tilde(
            location,
        ))))
    }
}

/// Tracks the fingerprint of the last successfully applied list.
#[derive(Debug, Default)]
pub struct Synchronizer {
    last_fingerprint: Option<Vec<u8>>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a new list if the source changed. Returns the new list, already persisted,
    /// or `None` when nothing changed or the source could not be read.
    pub async fn sync(
        &mut self,
        source: &dyn ReminderSource,
        conn: &mut Connection,
    ) -> Option<Vec<Reminder>> {
        let fingerprint = match source.fingerprint().await {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(error = %e, "reminder source unavailable");
                return None;
            }
        };
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            return None;
        }

        let reminders = match source.fetch_reminders().await {
            Ok(list) => dedup_by_id(list),
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch reminders, keeping current list");
                return None;
            }
        };

        if let Err(e) = store::replace_reminders(conn, &reminders) {
            tracing::warn!(error = %e, "failed to persist reminder list");
        }

        tracing::info!(
            count = reminders.len(),
            fingerprint = %hex::encode(&fingerprint),
            "reminder list updated"
        );
        self.last_fingerprint = Some(fingerprint);
        Some(reminders)
    }
}
