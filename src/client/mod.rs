//! Remote service client for NeuroNarrative
//!
//! The [`ChatService`] trait describes every call the front end makes to the
//! remote chat/analytics service. [`HttpServiceClient`] implements it with
//! `reqwest` against the JSON API rooted at the configured base URL.

pub mod types;

pub use types::{
    Badge, Character, ChatRequest, ChatResponse, ChildProfile, CreateChildRequest,
    EngagementCheck, EngagementOption, EngagementPrompts, HealthStatus, ParentDashboard,
    ScaffoldRequest, SessionEndResponse, SessionId, SessionRecord, SessionStartRequest,
    SessionStartResponse, SummaryRequest, Theme, VoiceChatRequest, VoiceChatResponse,
};

use crate::config::ServiceConfig;
use crate::error::{NarrativeError, Result};
use crate::session::SessionContext;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use types::{
    CharactersEnvelope, ChildEnvelope, ChildrenEnvelope, ScaffoldResponse, SetThemeRequest,
    SummaryResponse, ThemesEnvelope,
};

/// Calls made by the front end against the remote service
///
/// Implementations must be cheap to share; the orchestrator and the session
/// cache hold the same instance behind an `Arc`.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus>;

    /// `GET /children`
    async fn list_children(&self) -> Result<Vec<ChildProfile>>;

    /// `POST /children`
    async fn create_child(&self, request: &CreateChildRequest) -> Result<ChildProfile>;

    /// `GET /children/{id}`
    async fn get_child(&self, child_id: i64) -> Result<ChildProfile>;

    /// `DELETE /children/{id}`
    async fn delete_child(&self, child_id: i64) -> Result<()>;

    /// `GET /characters`
    async fn list_characters(&self) -> Result<BTreeMap<String, Character>>;

    /// `POST /chat`
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// `POST /chat/voice`
    async fn send_voice(&self, request: VoiceChatRequest) -> Result<VoiceChatResponse>;

    /// `POST /session/start`
    async fn start_session(&self, request: &SessionStartRequest) -> Result<SessionStartResponse>;

    /// `POST /session/end`
    async fn end_session(&self, session_id: &SessionId) -> Result<SessionEndResponse>;

    /// `POST /antifreeze/check`
    async fn engagement_check(&self, session_id: &SessionId) -> Result<EngagementCheck>;

    /// `POST /antifreeze/select`
    async fn engagement_select(&self, session_id: &SessionId, option: EngagementOption)
        -> Result<()>;

    /// `POST /emoji/scaffold`
    async fn emoji_scaffold(&self, request: &ScaffoldRequest) -> Result<String>;

    /// `POST /summary/generate`
    async fn generate_summary(&self, request: &SummaryRequest) -> Result<String>;

    /// `POST /chat/sync`
    async fn sync_chat(&self, context: &SessionContext) -> Result<()>;

    /// `GET /analytics/parent/{child_id}`
    async fn parent_dashboard(&self, child_id: i64) -> Result<ParentDashboard>;

    /// `GET /themes`
    async fn list_themes(&self) -> Result<BTreeMap<String, Theme>>;

    /// `POST /themes/set`
    async fn set_theme(&self, child_id: i64, theme: &str) -> Result<()>;
}

/// HTTP implementation of [`ChatService`]
///
/// # Examples
///
/// ```
/// use neuronarrative::client::HttpServiceClient;
/// use neuronarrative::config::ServiceConfig;
///
/// let client = HttpServiceClient::new(&ServiceConfig::default()).unwrap();
/// assert_eq!(client.url("/health"), "http://127.0.0.1:5000/api/health");
/// ```
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    client: Client,
    base_url: String,
}

impl HttpServiceClient {
    /// Create a client for the configured service
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                NarrativeError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::info!("Initialized service client: base_url={}", base_url);

        Ok(Self { client, base_url })
    }

    /// Build the absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request {} {} failed: {}", method, url, e);
            NarrativeError::Unavailable(format!("{} {}: {}", method, path, e))
        })?;

        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        decode(response, path).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        decode(response, path).await
    }

    async fn post_ignore<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.send(Method::POST, path, Some(body)).await?;
        Ok(())
    }
}

/// Turn a non-success response into a [`NarrativeError::Service`]
///
/// The reference service reports failures as `{"error": "..."}`; anything
/// else is passed through as raw text.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);

    tracing::error!("Service returned error {}: {}", status, message);
    Err(NarrativeError::Service {
        status: status.as_u16(),
        message,
    }
    .into())
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
        tracing::error!("Failed to parse response from {}: {}", path, e);
        NarrativeError::Unavailable(format!("Malformed response from {}: {}", path, e)).into()
    })
}

#[async_trait]
impl ChatService for HttpServiceClient {
    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    async fn list_children(&self) -> Result<Vec<ChildProfile>> {
        let envelope: ChildrenEnvelope = self.get_json("/children").await?;
        Ok(envelope.children)
    }

    async fn create_child(&self, request: &CreateChildRequest) -> Result<ChildProfile> {
        let envelope: ChildEnvelope = self.post_json("/children", request).await?;
        tracing::info!("Created child profile {}", envelope.child.id);
        Ok(envelope.child)
    }

    async fn get_child(&self, child_id: i64) -> Result<ChildProfile> {
        let envelope: ChildEnvelope = self.get_json(&format!("/children/{}", child_id)).await?;
        Ok(envelope.child)
    }

    async fn delete_child(&self, child_id: i64) -> Result<()> {
        self.send::<()>(Method::DELETE, &format!("/children/{}", child_id), None)
            .await?;
        Ok(())
    }

    async fn list_characters(&self) -> Result<BTreeMap<String, Character>> {
        let envelope: CharactersEnvelope = self.get_json("/characters").await?;
        Ok(envelope.characters)
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.post_json("/chat", request).await
    }

    async fn send_voice(&self, request: VoiceChatRequest) -> Result<VoiceChatResponse> {
        let audio = reqwest::multipart::Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str("audio/webm")
            .map_err(|e| NarrativeError::Audio(format!("Invalid audio upload: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .part("audio", audio)
            .text("child_id", request.child_id.to_string())
            .text("character", request.character);
        if let Some(session_id) = request.session_id {
            form = form.text("session_id", session_id.to_string());
        }
        if let Some(emotion) = request.emotion {
            form = form.text("emotion", emotion);
        }

        let url = self.url("/chat/voice");
        tracing::debug!("POST {} (multipart)", url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NarrativeError::Unavailable(format!("POST /chat/voice: {}", e)))?;

        let response = check_status(response).await?;
        decode(response, "/chat/voice").await
    }

    async fn start_session(&self, request: &SessionStartRequest) -> Result<SessionStartResponse> {
        self.post_json("/session/start", request).await
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<SessionEndResponse> {
        self.post_json("/session/end", &json!({ "session_id": session_id }))
            .await
    }

    async fn engagement_check(&self, session_id: &SessionId) -> Result<EngagementCheck> {
        self.post_json("/antifreeze/check", &json!({ "session_id": session_id }))
            .await
    }

    async fn engagement_select(
        &self,
        session_id: &SessionId,
        option: EngagementOption,
    ) -> Result<()> {
        self.post_ignore(
            "/antifreeze/select",
            &json!({ "session_id": session_id, "option": option }),
        )
        .await
    }

    async fn emoji_scaffold(&self, request: &ScaffoldRequest) -> Result<String> {
        let response: ScaffoldResponse = self.post_json("/emoji/scaffold", request).await?;
        Ok(response.completion)
    }

    async fn generate_summary(&self, request: &SummaryRequest) -> Result<String> {
        let response: SummaryResponse = self.post_json("/summary/generate", request).await?;
        Ok(response.summary)
    }

    async fn sync_chat(&self, context: &SessionContext) -> Result<()> {
        self.post_ignore("/chat/sync", context).await
    }

    async fn parent_dashboard(&self, child_id: i64) -> Result<ParentDashboard> {
        self.get_json(&format!("/analytics/parent/{}", child_id))
            .await
    }

    async fn list_themes(&self) -> Result<BTreeMap<String, Theme>> {
        let envelope: ThemesEnvelope = self.get_json("/themes").await?;
        Ok(envelope.themes)
    }

    async fn set_theme(&self, child_id: i64, theme: &str) -> Result<()> {
        self.post_ignore("/themes/set", &SetThemeRequest { child_id, theme })
            .await
    }
}

/// Create the service client described by the configuration
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
pub fn create_client(config: &ServiceConfig) -> Result<Arc<dyn ChatService>> {
    Ok(Arc::new(HttpServiceClient::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let config = ServiceConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            ..Default::default()
        };
        let client = HttpServiceClient::new(&config).unwrap();
        assert_eq!(client.url("/chat"), "http://localhost:5000/api/chat");
    }

    #[test]
    fn test_create_client_succeeds_with_defaults() {
        assert!(create_client(&ServiceConfig::default()).is_ok());
    }
}
