//! Bounded, persisted command history.
//!
//! The store keeps an in-memory sequence of entries, most recent first, and
//! mirrors a redacted copy to a single JSON file so history survives across
//! sessions. Raw image payloads never reach disk: the redaction rule from
//! [`crate::protocol`] replaces them with a sentinel before every write. The
//! in-memory copy keeps the originals for the current session.

use crate::protocol::{redacted_fields, CommandResult, InputKind, REDACTED_SENTINEL};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Hard cap on retained entries.
pub const HISTORY_LIMIT: usize = 50;

/// An image payload decoded from a result and written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedImage {
    /// What the image shows, e.g. "hidden pixels" or "red channel".
    pub label: String,
    pub path: PathBuf,
}

/// One record of a past command invocation and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub command: String,
    pub input: String,
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saved: Vec<SavedImage>,
}

impl HistoryEntry {
    /// Start an entry for a dispatch happening now.
    pub fn new(command: impl Into<String>, input: impl Into<String>, kind: InputKind) -> Self {
        Self {
            command: command.into(),
            input: input.into(),
            time: Utc::now(),
            kind,
            result: None,
            error: None,
            saved: Vec::new(),
        }
    }
}

// `CommandResult` has no Deserialize of its own (the union is keyed by the
// command), so entries load through a raw mirror and re-key the payload.
#[derive(Deserialize)]
struct RawEntry {
    command: String,
    input: String,
    time: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: InputKind,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    saved: Vec<SavedImage>,
}

impl<'de> Deserialize<'de> for HistoryEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEntry::deserialize(deserializer)?;
        // Entries written by older builds or edited by hand may no longer
        // parse into a typed variant; keep the raw value for the dump view.
        let result = raw.result.map(|v| {
            CommandResult::from_wire(&raw.command, v.clone())
                .unwrap_or(CommandResult::Other(v))
        });
        Ok(HistoryEntry {
            command: raw.command,
            input: raw.input,
            time: raw.time,
            kind: raw.kind,
            result,
            error: raw.error,
            saved: raw.saved,
        })
    }
}

/// The optimistic placeholder shown at the head of the history while a
/// command is in flight. A single slot: the dispatcher is single-flight.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub command: String,
    pub input: String,
    pub time: DateTime<Utc>,
}

/// Owned, injectable history store. No globals: dispatch and rendering
/// receive a reference to this.
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    pending: Option<PendingEntry>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// The default persistent slot, `<data-dir>/kowctl/history.json`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|p| p.join("kowctl").join("history.json"))
            .context("Could not determine data directory")
    }

    /// A store with no persistence. Entries live for this process only.
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            pending: None,
            path: None,
        }
    }

    /// Load history from the persistent slot. A missing file yields an empty
    /// store; a corrupt file is logged, cleared, and also yields an empty
    /// store. Never fails.
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Err(_) => Vec::new(),
            Ok(contents) => match serde_json::from_str::<Vec<HistoryEntry>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding corrupt history at {}: {}", path.display(), e);
                    let _ = std::fs::remove_file(&path);
                    Vec::new()
                }
            },
        };

        Self {
            entries,
            pending: None,
            path: Some(path),
        }
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn pending(&self) -> Option<&PendingEntry> {
        self.pending.as_ref()
    }

    /// Put up the loading placeholder for a dispatch starting now.
    pub fn begin(&mut self, command: &str, input: &str) {
        self.pending = Some(PendingEntry {
            command: command.to_string(),
            input: input.to_string(),
            time: Utc::now(),
        });
    }

    /// Replace the placeholder with the resolved entry.
    pub fn complete(&mut self, entry: HistoryEntry) {
        self.pending = None;
        self.append(entry);
    }

    /// Insert at the head, truncate to the cap, and mirror to disk.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
        self.persist();
    }

    /// Empty both the in-memory sequence and the persistent slot. The caller
    /// must have obtained explicit user confirmation first.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
        if let Some(path) = &self.path {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove history file: {}", e);
                }
            }
        }
    }

    /// Write the redacted snapshot. A failed write resets the slot so a bad
    /// state never lingers; the in-memory history is untouched either way.
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let written = redacted_snapshot(&self.entries).and_then(|json| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))
        });

        if let Err(e) = written {
            warn!("Failed to save history, clearing the slot: {:#}", e);
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Serialize entries with the redaction rule applied: any result field named
/// by [`redacted_fields`] for the entry's command is replaced by the sentinel.
fn redacted_snapshot(entries: &[HistoryEntry]) -> Result<String> {
    let mut values = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut value = serde_json::to_value(entry)?;
        if let Some(fields) = redacted_fields(&entry.command) {
            if let Some(serde_json::Value::Object(result)) = value.get_mut("result") {
                for field in fields {
                    if result.contains_key(*field) {
                        result.insert((*field).to_string(), REDACTED_SENTINEL.into());
                    }
                }
            }
        }
        values.push(value);
    }
    Ok(serde_json::to_string(&values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HiddenResult, RgbResult, WordsResult};

    fn text_entry(n: usize) -> HistoryEntry {
        let mut entry = HistoryEntry::new("anagram", format!("word{n}"), InputKind::Text);
        entry.result = Some(CommandResult::Words(WordsResult {
            input: format!("word{n}"),
            result: vec!["drow".into()],
        }));
        entry
    }

    fn hidden_entry() -> HistoryEntry {
        let mut entry = HistoryEntry::new("hidden", "secret.png", InputKind::Image);
        entry.result = Some(CommandResult::Hidden(HiddenResult {
            image: "QkFTRTY0REFUQQ==".into(),
        }));
        entry
    }

    #[test]
    fn test_append_caps_at_limit() {
        let mut store = HistoryStore::in_memory();
        for n in 0..HISTORY_LIMIT + 10 {
            store.append(text_entry(n));
        }
        assert_eq!(store.entries().len(), HISTORY_LIMIT);
        // Most recent entry sits at the head.
        assert_eq!(store.entries()[0].input, "word59");
    }

    #[test]
    fn test_pending_lifecycle() {
        let mut store = HistoryStore::in_memory();
        store.begin("anagram", "listen");
        assert!(store.pending().is_some());
        store.complete(text_entry(0));
        assert!(store.pending().is_none());
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn test_persisted_history_is_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut store = HistoryStore::load(path.clone());

        store.append(hidden_entry());

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains(REDACTED_SENTINEL));
        assert!(!on_disk.contains("QkFTRTY0REFUQQ=="));

        // The in-memory copy keeps the payload for this session.
        match store.entries()[0].result.as_ref().unwrap() {
            CommandResult::Hidden(h) => assert_eq!(h.image, "QkFTRTY0REFUQQ=="),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_rgb_channels_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut store = HistoryStore::load(path.clone());

        let mut entry = HistoryEntry::new("rgb", "photo.png", InputKind::Image);
        entry.result = Some(CommandResult::Rgb(RgbResult {
            red: "UkVE".into(),
            green: "R1JFRU4=".into(),
            blue: "QkxVRQ==".into(),
        }));
        store.append(entry);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("UkVE"));
        assert!(!on_disk.contains("R1JFRU4="));
        assert_eq!(on_disk.matches(REDACTED_SENTINEL).count(), 3);
    }

    #[test]
    fn test_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        {
            let mut store = HistoryStore::load(path.clone());
            store.append(text_entry(1));
            store.append(hidden_entry());
        }

        let store = HistoryStore::load(path);
        assert_eq!(store.entries().len(), 2);
        assert_eq!(store.entries()[0].command, "hidden");
        match store.entries()[0].result.as_ref().unwrap() {
            CommandResult::Hidden(h) => assert_eq!(h.image, REDACTED_SENTINEL),
            other => panic!("unexpected variant: {:?}", other),
        }
        assert_eq!(store.entries()[1].command, "anagram");
    }

    #[test]
    fn test_corrupt_slot_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = HistoryStore::load(path.clone());
        assert!(store.entries().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_empties_both_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut store = HistoryStore::load(path.clone());
        store.append(text_entry(1));
        assert!(path.exists());

        store.clear();
        assert!(store.entries().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("absent.json"));
        assert!(store.entries().is_empty());
    }
}
