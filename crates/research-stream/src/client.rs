//! HTTP client for the research endpoint

use tracing::{debug, info, warn};

use crate::consumer::consume_stream;
use crate::error::ResearchError;
use crate::handler::StreamHandler;
use crate::types::{ConversationTurn, FileReference, ResearchRequest};

/// Path of the research function relative to the API base URL
pub const RESEARCH_PATH: &str = "/functions/legal-research";

#[derive(Debug, Clone)]
pub struct ResearchClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ResearchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), RESEARCH_PATH)
    }

    /// Send the conversation and stream the answer into `handler`
    ///
    /// Every failure is reported through a single `handler.on_error` call,
    /// except an exhausted research trial. That one is returned as
    /// [`ResearchError::TrialExhausted`] so the caller can offer an upgrade
    /// instead of showing an error.
    pub async fn stream_legal_research<H>(
        &self,
        messages: &[ConversationTurn],
        files: &[FileReference],
        handler: &mut H,
    ) -> Result<(), ResearchError>
    where
        H: StreamHandler + ?Sized,
    {
        match self.open_stream(messages, files).await {
            Ok(response) => {
                consume_stream(response.bytes_stream(), handler).await;
                Ok(())
            }
            Err(err) if err.is_trial_exhausted() => Err(err),
            Err(err) => {
                warn!(error = %err, "Research request failed");
                handler.on_error(&err.to_string());
                Ok(())
            }
        }
    }

    async fn open_stream(
        &self,
        messages: &[ConversationTurn],
        files: &[FileReference],
    ) -> Result<reqwest::Response, ResearchError> {
        let body = ResearchRequest {
            messages: messages.to_vec(),
            files: files.to_vec(),
        };

        let mut request = self.http.post(self.endpoint()).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        debug!(turns = messages.len(), files = files.len(), "Starting research request");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = ResearchError::from_response(status.as_u16(), &text);
            info!(status = status.as_u16(), error = %err, "Research request rejected");
            return Err(err);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transcript;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            ResearchClient::new("http://localhost:3001/").endpoint(),
            "http://localhost:3001/functions/legal-research"
        );
        assert_eq!(
            ResearchClient::new("https://api.legalcompass.app").endpoint(),
            "https://api.legalcompass.app/functions/legal-research"
        );
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unreachable_service_reports_through_on_error() {
        let client = ResearchClient::new(closed_port_url());
        let turns = [ConversationTurn::user("Can my landlord keep the deposit?")];
        let mut transcript = Transcript::default();

        let result = client
            .stream_legal_research(&turns, &[], &mut transcript)
            .await;

        assert_eq!(result, Ok(()));
        assert!(transcript.deltas.is_empty());
        assert_eq!(transcript.done_calls, 0);
        let message = transcript.error.expect("error callback fired");
        assert!(message.starts_with("Could not reach research service"));
    }
}
