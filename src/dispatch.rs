//! Command dispatch: validation, request lifecycle, history recording.
//!
//! A dispatch is single-flight: the loading placeholder goes up before the
//! request is sent and is replaced by the resolved entry when it completes.
//! Validation failures block dispatch entirely and leave the history
//! untouched. Backend, transport, and parse failures are captured on the
//! entry instead of propagating: fail-visible, no retries.
//!
//! Both front ends share the same lifecycle. The one-shot helpers run all
//! three phases back to back; the TUI calls them separately so it can
//! repaint with the placeholder before awaiting the network.

use crate::client::ApiClient;
use crate::error::CommandError;
use crate::history::{HistoryEntry, HistoryStore, SavedImage};
use crate::protocol::{Command, CommandResult, InputKind};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// A validated command invocation, ready to send.
#[derive(Debug)]
pub struct Dispatch {
    pub command: String,
    /// Final input: modifier folded in for text, file name for images.
    pub input: String,
    kind: InputKind,
    bytes: Option<Vec<u8>>,
}

impl Dispatch {
    /// Validate a text invocation. Input must be non-empty once trimmed;
    /// `chunk` additionally requires sizes, which are prepended
    /// space-separated, matching what the backend parses off the front.
    pub fn text(
        command: &str,
        input: &str,
        chunk_sizes: Option<&str>,
    ) -> Result<Self, CommandError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CommandError::InvalidInput(
                "Please enter some text first".to_string(),
            ));
        }

        let final_input = if Command::from_str(command) == Ok(Command::Chunk) {
            let sizes = chunk_sizes.map(str::trim).unwrap_or_default();
            if sizes.is_empty() {
                return Err(CommandError::InvalidInput(
                    "Please enter chunk sizes (e.g. \"3\" or \"2 3 4\")".to_string(),
                ));
            }
            format!("{} {}", sizes, input)
        } else {
            input.to_string()
        };

        Ok(Self {
            command: command.to_string(),
            input: final_input,
            kind: InputKind::Text,
            bytes: None,
        })
    }

    /// Validate an image invocation. The file must exist and be readable
    /// before anything is sent.
    pub fn image(command: &str, path: &Path) -> Result<Self, CommandError> {
        let bytes = std::fs::read(path).map_err(|e| {
            CommandError::InvalidInput(format!("Cannot read image {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            command: command.to_string(),
            input: file_name,
            kind: InputKind::Image,
            bytes: Some(bytes),
        })
    }

    /// Put up the loading placeholder.
    pub fn begin(&self, history: &mut HistoryStore) {
        history.begin(&self.command, &self.input);
    }

    /// Send the request and replace the placeholder with the resolved
    /// entry. Never fails: errors land on the entry.
    pub async fn run(self, client: &ApiClient, history: &mut HistoryStore) {
        let outcome = match self.kind {
            InputKind::Text => client.command(&self.command, &self.input).await,
            InputKind::Image => {
                client
                    .image(&self.command, &self.input, self.bytes.unwrap_or_default())
                    .await
            }
        };

        let mut entry = HistoryEntry::new(self.command, self.input, self.kind);
        match outcome {
            Ok(result) => {
                entry.saved = save_result_images(&result, entry.time);
                entry.result = Some(result);
            }
            Err(e) => entry.error = Some(e.to_string()),
        }
        history.complete(entry);
    }
}

/// Validate and run a text command. `Err` only for validation failures,
/// which send nothing and record nothing.
pub async fn dispatch_text(
    client: &ApiClient,
    history: &mut HistoryStore,
    command: &str,
    input: &str,
    chunk_sizes: Option<&str>,
) -> Result<(), CommandError> {
    let dispatch = Dispatch::text(command, input, chunk_sizes)?;
    dispatch.begin(history);
    dispatch.run(client, history).await;
    Ok(())
}

/// Validate and run an image command.
pub async fn dispatch_image(
    client: &ApiClient,
    history: &mut HistoryStore,
    command: &str,
    path: &Path,
) -> Result<(), CommandError> {
    let dispatch = Dispatch::image(command, path)?;
    dispatch.begin(history);
    dispatch.run(client, history).await;
    Ok(())
}

/// Decode base64 image payloads to PNG files in the working directory.
/// A payload that fails to decode or write is skipped with a warning; the
/// entry still records the result itself.
fn save_result_images(result: &CommandResult, time: DateTime<Utc>) -> Vec<SavedImage> {
    let payloads: Vec<(&str, &str, &str)> = match result {
        CommandResult::Hidden(h) => vec![("Hidden pixels result", "hidden", h.image.as_str())],
        CommandResult::Rgb(rgb) => vec![
            ("Red channel", "rgb-red", rgb.red.as_str()),
            ("Green channel", "rgb-green", rgb.green.as_str()),
            ("Blue channel", "rgb-blue", rgb.blue.as_str()),
        ],
        _ => return Vec::new(),
    };

    let stamp = time.format("%Y%m%d-%H%M%S");
    payloads
        .into_iter()
        .filter_map(|(label, slug, data)| {
            use base64::Engine;
            let bytes = match base64::engine::general_purpose::STANDARD.decode(data) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to decode {} payload: {}", slug, e);
                    return None;
                }
            };
            let name = format!("kowalski-{}-{}.png", slug, stamp);
            if let Err(e) = std::fs::write(&name, bytes) {
                warn!("Failed to write {}: {}", name, e);
                return None;
            }
            Some(SavedImage {
                label: label.to_string(),
                path: name.into(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn offline_client() -> ApiClient {
        // Points at a closed port; only used on paths that must not send,
        // or to exercise the transport-failure path.
        ApiClient::new(&ServerConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: Some(1),
        })
        .unwrap()
    }

    #[test]
    fn test_empty_input_blocks_dispatch() {
        let err = Dispatch::text("anagram", "   ", None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_chunk_requires_sizes() {
        let err = Dispatch::text("chunk", "abcdef", None).unwrap_err();
        assert!(err.is_validation());
        let err = Dispatch::text("chunk", "abcdef", Some("  ")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_chunk_prepends_sizes() {
        let dispatch = Dispatch::text("chunk", "abcdef", Some("2 3")).unwrap();
        assert_eq!(dispatch.input, "2 3 abcdef");
    }

    #[test]
    fn test_other_commands_ignore_chunk_sizes() {
        let dispatch = Dispatch::text("anagram", " listen ", Some("2 3")).unwrap();
        assert_eq!(dispatch.input, "listen");
    }

    #[tokio::test]
    async fn test_validation_failure_records_nothing() {
        let client = offline_client();
        let mut history = HistoryStore::in_memory();

        let err = dispatch_text(&client, &mut history, "anagram", "", None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(history.entries().is_empty());
        assert!(history.pending().is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_lands_on_entry() {
        let client = offline_client();
        let mut history = HistoryStore::in_memory();

        dispatch_text(&client, &mut history, "anagram", "listen", None)
            .await
            .unwrap();
        assert!(history.pending().is_none());
        let entry = &history.entries()[0];
        assert_eq!(entry.command, "anagram");
        assert!(entry.error.is_some());
        assert!(entry.result.is_none());
    }

    #[tokio::test]
    async fn test_missing_image_blocks_dispatch() {
        let client = offline_client();
        let mut history = HistoryStore::in_memory();

        let err = dispatch_image(
            &client,
            &mut history,
            "hidden",
            Path::new("/no/such/file.png"),
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_placeholder_shows_final_input() {
        let mut history = HistoryStore::in_memory();
        let dispatch = Dispatch::text("chunk", "abcdef", Some("3")).unwrap();
        dispatch.begin(&mut history);
        assert_eq!(history.pending().unwrap().input, "3 abcdef");
    }
}
