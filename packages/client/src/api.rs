// ABOUTME: HTTP client for the Ragline inference backend
// ABOUTME: Streaming chat, feedback submission, and document retrieval

use std::time::Duration;

use futures::stream::Stream;
use reqwest::Client;
use tracing::{error, info};
use url::Url;

use ragline_core::constants::{CHAT_PATH, FEEDBACK_PATH, GET_DOCUMENT_PATH};
use ragline_core::FeedbackSign;

use crate::error::{ClientError, ClientResult};

/// Client for the chat backend. One instance is shared across turns; each
/// chat request opens a single one-shot stream with no retry or reconnect.
pub struct LlmApiClient {
    client: Client,
    base_url: Url,
}

impl LlmApiClient {
    /// Connect timeout only. Streaming responses stay open for the length of
    /// a generation, so no overall request timeout is set.
    fn create_client() -> Client {
        Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client")
    }

    pub fn new(base_url: Url) -> Self {
        Self {
            client: Self::create_client(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Open the streaming chat endpoint for one user turn. Returns the
    /// server-assigned message id from the `x-message-id` header and a stream
    /// of raw text chunks for the parser to consume.
    pub async fn chat_stream(
        &self,
        user_query: &str,
        username: &str,
        session_id: &str,
    ) -> ClientResult<(
        Option<String>,
        impl Stream<Item = Result<String, ClientError>>,
    )> {
        let mut url = self.base_url.clone();
        url.set_path(CHAT_PATH);
        url.query_pairs_mut()
            .append_pair("user_query", user_query)
            .append_pair("username", username)
            .append_pair("session_id", session_id);

        info!(session_id, "opening chat stream");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("chat endpoint error: {} - {}", status, error_text);
            return Err(ClientError::ApiError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let stream = async_stream::stream! {
            use futures::StreamExt;
            let mut byte_stream = response.bytes_stream();
            while let Some(chunk) = byte_stream.next().await {
                match chunk {
                    Ok(bytes) => yield Ok(String::from_utf8_lossy(&bytes).into_owned()),
                    Err(e) => {
                        yield Err(ClientError::RequestFailed(e));
                        return;
                    }
                }
            }
        };

        Ok((message_id, stream))
    }

    /// Submit feedback for a server-assigned message id.
    pub async fn submit_feedback(
        &self,
        message_id: &str,
        sign: FeedbackSign,
        comment: Option<&str>,
    ) -> ClientResult<()> {
        let mut url = self.base_url.clone();
        url.set_path(FEEDBACK_PATH);

        let mut body = serde_json::json!({
            "message_id": message_id,
            "feedback_sign": sign.as_str(),
        });
        if let Some(text) = comment {
            body["feedback_text"] = serde_json::Value::String(text.to_string());
        }

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("feedback endpoint error: {} - {}", status, error_text);
            return Err(ClientError::ApiError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }
        Ok(())
    }

    /// Fetch raw document bytes for a citation preview or download.
    pub async fn fetch_document(&self, filepath: &str, filename: &str) -> ClientResult<Vec<u8>> {
        let mut url = self.base_url.clone();
        url.set_path(GET_DOCUMENT_PATH);
        url.query_pairs_mut()
            .append_pair("filepath", filepath)
            .append_pair("filename", filename);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::ApiError(format!(
                "document endpoint returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
