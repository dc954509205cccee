//! HTTP transport for the kowalski API.
//!
//! Two endpoints, one envelope: `/api/command` takes JSON, `/api/image`
//! takes multipart form data, both answer `{success, result?, error?}`.
//! A single attempt per request, no retries; failures surface to the
//! dispatcher which records them on the history entry.

use crate::config::ServerConfig;
use crate::error::CommandError;
use crate::protocol::{ApiResponse, CommandRequest, CommandResult};
use anyhow::{Context, Result};
use tracing::debug;

/// Client for the kowalski backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the configured server. No timeout is applied
    /// unless the config asks for one.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let http = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a text command and return its typed result.
    pub async fn command(&self, command: &str, input: &str) -> Result<CommandResult, CommandError> {
        let url = format!("{}/api/command", self.base_url);
        debug!("POST {} command={}", url, command);

        let request = CommandRequest {
            command: command.to_string(),
            input: input.to_string(),
        };
        let response = self.http.post(&url).json(&request).send().await?;
        decode(command, response).await
    }

    /// Run an image command, sending the file as multipart form data.
    pub async fn image(
        &self,
        command: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<CommandResult, CommandError> {
        let url = format!("{}/api/image", self.base_url);
        debug!("POST {} command={} file={}", url, command, file_name);

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("command", command.to_string())
            .part("image", part);
        let response = self.http.post(&url).multipart(form).send().await?;
        decode(command, response).await
    }

    /// Startup probe: are the FST-backed commands usable on this server?
    pub async fn probe_fst(&self) -> bool {
        let outcome = self.command("fstanagram", "test").await;
        let available = fst_available(&outcome);
        debug!("FST probe: available={}", available);
        available
    }
}

async fn decode(command: &str, response: reqwest::Response) -> Result<CommandResult, CommandError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CommandError::Backend(format!(
            "{}: {}",
            status,
            body.trim()
        )));
    }

    let envelope: ApiResponse = response.json().await?;
    if envelope.success {
        let value = envelope.result.unwrap_or(serde_json::Value::Null);
        Ok(CommandResult::from_wire(command, value)?)
    } else {
        Err(CommandError::Backend(
            envelope
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

/// The FST decision from the probe outcome: the commands are hidden only
/// when the server explicitly reports the model as not loaded, or cannot
/// be reached at all.
pub fn fst_available(outcome: &Result<CommandResult, CommandError>) -> bool {
    match outcome {
        Ok(_) => true,
        Err(CommandError::Backend(message)) => !message.contains("FST model not loaded"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FstMatch, MatchesResult};

    #[test]
    fn test_base_url_is_trimmed() {
        let client = ApiClient::new(&ServerConfig {
            url: "http://localhost:8080/".to_string(),
            timeout_secs: None,
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_fst_available_on_success() {
        let outcome = Ok(CommandResult::Matches(MatchesResult {
            input: "test".to_string(),
            matches: vec![FstMatch {
                term: "test".to_string(),
                score: 1,
            }],
        }));
        assert!(fst_available(&outcome));
    }

    #[test]
    fn test_fst_unavailable_when_model_missing() {
        let outcome = Err(CommandError::Backend("FST model not loaded".to_string()));
        assert!(!fst_available(&outcome));
    }

    #[test]
    fn test_fst_available_on_other_backend_errors() {
        // Any other server-side complaint means the model is there.
        let outcome = Err(CommandError::Backend("invalid word: test!".to_string()));
        assert!(fst_available(&outcome));
    }

    #[test]
    fn test_fst_unavailable_on_parse_failure() {
        let parse_err = serde_json::from_str::<ApiResponse>("nope").unwrap_err();
        let outcome = Err(CommandError::Parse(parse_err));
        assert!(!fst_available(&outcome));
    }
}
