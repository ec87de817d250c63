//! User location snapshots and location token matching.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Reserved location meaning "no fix available".
pub const UNKNOWN_LOCATION: &str = "UNKNOWN";

/// The user's current and previous named locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationSnapshot {
    #[serde(alias = "curr_location", alias = "Curr_location")]
    pub current: String,
    #[serde(alias = "prev_location", alias = "Prev_location")]
    pub previous: String,
}

impl LocationSnapshot {
    pub fn new(current: impl Into<String>, previous: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            previous: previous.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_LOCATION, UNKNOWN_LOCATION)
    }

    /// Current location, unless there is no fix.
    pub fn current_fix(&self) -> Option<&str> {
        known(&self.current)
    }

    pub fn previous_fix(&self) -> Option<&str> {
        known(&self.previous)
    }
}

fn known(location: &str) -> Option<&str> {
    (location != UNKNOWN_LOCATION).then_some(location)
}

/// Match a location token against an observed location.
///
/// A trailing `*` makes the rest of the token a prefix; otherwise the match is exact.
/// Sign prefixes (`+`/`-`) are not interpreted here.
pub fn matches_location(token: &str, observed: &str) -> bool {
    match token.strip_suffix('*') {
        Some(prefix) => observed.starts_with(prefix),
        None => token == observed,
    }
}

/// Source of location snapshots.
pub trait LocationProvider: Send + Sync {
    /// `None` when the locator has nothing to report.
    fn current(&self) -> Option<LocationSnapshot>;
}

/// Reads a snapshot from a JSON file maintained by the location tracker, e.g.
/// `{"curr_location": "Home", "prev_location": "Work"}`.
pub struct FileLocationProvider {
    path: PathBuf,
}

impl FileLocationProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<LocationSnapshot> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&contents).context("invalid location snapshot")
    }
}

impl LocationProvider for FileLocationProvider {
    fn current(&self) -> Option<LocationSnapshot> {
        match self.read() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::trace!(error = %e, "no location snapshot");
                None
            }
        }
    }
}
