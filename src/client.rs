use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CHAT_PATH: &str = "/api/chat";

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: String,
}

/// Everything that can go wrong with a chat request.
///
/// The variants only matter for the log; the user always sees the same
/// fallback message.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("could not reach chat endpoint: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("chat endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed chat response: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: chat_endpoint(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the prompt and return the reply's `message` field.
    pub async fn send(&self, prompt: &str) -> Result<String, RequestFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { prompt })
            .send()
            .await
            .map_err(RequestFailure::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure::Status { status, body });
        }

        let body = response.text().await.map_err(RequestFailure::Transport)?;
        let reply: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| RequestFailure::Malformed(format!("{}: {}", e, body)))?;

        Ok(reply.message)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH)
}
