//! HTTP client for interacting with the backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::{
    auth::AuthApi,
    chat::ConversationsApi,
    config::ClientConfig,
    error::{Error, Result},
    health::HealthApi,
    realtime::{Channel, ChannelKind, ChannelOptions},
    session::CredentialStore,
    storage::{FileStore, KeyValueStore, MemoryStore},
};

/// Sampling temperature sent with chat messages unless configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Client for the chat backend's REST API and real-time channels.
///
/// Every request carries the stored access credential as a bearer header
/// when one is present. Without one, requests are still sent and the
/// backend decides.
///
/// # Example
///
/// ```rust,no_run
/// use agent_chat_client::Client;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("http://localhost:8000/api/v1")?;
///
/// client.auth().login("alice", "secret").await?;
/// let outcome = client.conversations().send("Hello!", None).await?;
/// let history = client.conversations().history(&outcome.conversation_id).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    socket_url: Url,
    http: reqwest::Client,
    credentials: CredentialStore,
    temperature: f32,
    channel_options: ChannelOptions,
}

impl Client {
    /// Create a client with in-memory storage.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API base URL (e.g., "http://localhost:8000/api/v1")
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    /// Start building a client.
    pub fn builder(base_url: impl AsRef<str>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.as_ref().to_string(),
            socket_url: None,
            http: None,
            store: None,
            timeout: None,
            temperature: DEFAULT_TEMPERATURE,
            channel_options: ChannelOptions::default(),
        }
    }

    /// Build a client from loaded configuration, persisting state on disk.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let store = FileStore::open(&config.storage.path)?;
        let mut builder = Self::builder(&config.api.base_url)
            .store(Arc::new(store))
            .timeout(config.api.timeout())
            .temperature(config.api.temperature)
            .channel_options(config.realtime.channel_options());
        if let Some(url) = &config.realtime.base_url {
            builder = builder.socket_url(url);
        }
        builder.build()
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the real-time socket base URL.
    pub fn socket_url(&self) -> &Url {
        &self.socket_url
    }

    /// The shared credential store.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Durable storage behind the credentials; preferences live here too.
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.credentials.backing()
    }

    /// Options applied to channels opened by this client.
    pub fn channel_options(&self) -> ChannelOptions {
        self.channel_options
    }

    pub(crate) fn temperature(&self) -> f32 {
        self.temperature
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the Auth API.
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    /// Access the Conversations API.
    pub fn conversations(&self) -> ConversationsApi<'_> {
        ConversationsApi::new(self)
    }

    /// Access the Health API.
    pub fn health(&self) -> HealthApi<'_> {
        HealthApi::new(self)
    }

    /// Open a real-time channel with the current credential.
    pub fn open_channel(&self, kind: ChannelKind) -> Channel {
        let endpoint = self.channel_url(kind);
        let token = self.credentials.access_token();
        Channel::open(&endpoint, token.as_deref(), self.channel_options)
    }

    /// Socket URL of `kind`, without the credential.
    pub fn channel_url(&self, kind: ChannelKind) -> Url {
        let mut url = self.socket_url.clone();
        url.set_path(kind.path());
        url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// URL of `segments` below the API base; segments are percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Request builder with the bearer credential attached when present.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match self.credentials.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Map non-success statuses onto the error taxonomy.
    pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthenticated,
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Error::Validation(message)
            }
            StatusCode::SERVICE_UNAVAILABLE => Error::ServiceUnavailable,
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Pull a readable message out of an error body.
///
/// Handles `{"detail": "..."}`, `{"detail": [{"msg": "..."}]}` and plain text.
fn error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(trimmed) else {
        return Some(trimmed.to_string());
    };
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    socket_url: Option<String>,
    http: Option<reqwest::Client>,
    store: Option<Arc<dyn KeyValueStore>>,
    timeout: Option<Duration>,
    temperature: f32,
    channel_options: ChannelOptions,
}

impl ClientBuilder {
    /// Real-time socket base (e.g. "ws://localhost:8000").
    ///
    /// Defaults to the API origin with `http`/`https` swapped for `ws`/`wss`.
    #[must_use]
    pub fn socket_url(mut self, url: impl AsRef<str>) -> Self {
        self.socket_url = Some(url.as_ref().to_string());
        self
    }

    /// Use a custom reqwest client; `timeout` is then ignored.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Durable storage for credentials and preferences.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn channel_options(mut self, options: ChannelOptions) -> Self {
        self.channel_options = options;
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = Url::parse(&self.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API URL cannot be used as a base: {base_url}"
            )));
        }
        let socket_url = match self.socket_url {
            Some(url) => Url::parse(&url)?,
            None => derive_socket_url(&base_url)?,
        };
        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        Ok(Client {
            base_url,
            socket_url,
            http,
            credentials: CredentialStore::load(store),
            temperature: self.temperature,
            channel_options: self.channel_options,
        })
    }
}

/// `http://host:port/api/v1` becomes `ws://host:port`.
fn derive_socket_url(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let host = base
        .host_str()
        .ok_or_else(|| Error::Config(format!("API URL has no host: {base}")))?;
    let origin = match base.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    };
    Ok(Url::parse(&origin)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ACCESS_TOKEN_KEY;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = Client::new("http://localhost:8000/api/v1").unwrap();
        assert_eq!(
            client.endpoint(&["chat", "conversations"]).as_str(),
            "http://localhost:8000/api/v1/chat/conversations"
        );

        let client = Client::new("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(
            client.endpoint(&["auth", "me"]).as_str(),
            "http://localhost:8000/api/v1/auth/me"
        );
    }

    #[test]
    fn test_endpoint_encodes_identifiers() {
        let client = Client::new("http://localhost:8000/api/v1").unwrap();
        let url = client.endpoint(&["chat", "conversations", "a/b c", "history"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/chat/conversations/a%2Fb%20c/history"
        );
    }

    #[test]
    fn test_socket_url_is_derived_from_api_origin() {
        let client = Client::new("https://chat.example.com/api/v1").unwrap();
        assert_eq!(client.socket_url().as_str(), "wss://chat.example.com/");
        assert_eq!(
            client.channel_url(ChannelKind::Notifications).as_str(),
            "wss://chat.example.com/ws/notifications"
        );

        let client = Client::new("http://localhost:8000/api/v1").unwrap();
        assert_eq!(
            client.channel_url(ChannelKind::Data).as_str(),
            "ws://localhost:8000/ws/data"
        );
    }

    #[test]
    fn test_bearer_attached_only_when_stored() {
        let store = Arc::new(MemoryStore::new());
        let client = Client::builder("http://localhost:8000/api/v1")
            .store(store.clone())
            .build()
            .unwrap();

        let req = client.request(Method::GET, &["auth", "me"]).build().unwrap();
        assert!(req.headers().get("authorization").is_none());

        store.set(ACCESS_TOKEN_KEY, "tok").unwrap();
        let client = Client::builder("http://localhost:8000/api/v1")
            .store(store)
            .build()
            .unwrap();
        let req = client.request(Method::GET, &["auth", "me"]).build().unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer tok");
    }

    #[test]
    fn test_error_detail_shapes() {
        assert_eq!(
            error_detail(r#"{"detail":"Username already registered"}"#).as_deref(),
            Some("Username already registered")
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"msg":"field required"},{"msg":"too short"}]}"#)
                .as_deref(),
            Some("field required; too short")
        );
        assert_eq!(error_detail("plain failure").as_deref(), Some("plain failure"));
        assert_eq!(error_detail("  "), None);
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(Client::new("mailto:someone@example.com").is_err());
    }
}
