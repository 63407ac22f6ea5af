//! Wire types for the backend's REST API.
//!
//! These types mirror the server's DTOs. Fields the backend may omit are
//! optional or defaulted so older servers still deserialize.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::i18n;

// =============================================================================
// Content
// =============================================================================

/// Server-provided text, tagged at the boundary.
///
/// The backend signals some status conditions by sending a catalogue key in
/// place of literal text. Those values deserialize as `Localizable` and must
/// be resolved with [`i18n::resolve`] before display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Text to show as-is.
    Literal(String),
    /// A catalogue key to resolve in the active display language.
    Localizable(String),
}

impl Content {
    /// Tag a raw server string.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if i18n::is_status_key(&raw) {
            Self::Localizable(raw)
        } else {
            Self::Literal(raw)
        }
    }

    /// The string as it appeared on the wire.
    pub fn raw(&self) -> &str {
        match self {
            Self::Literal(s) | Self::Localizable(s) => s,
        }
    }

    /// Whether this is the backend's service-unavailable signal.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::Localizable(key) if key == "serviceUnavailable")
    }
}

impl From<&str> for Content {
    fn from(raw: &str) -> Self {
        Self::classify(raw)
    }
}

impl Serialize for Content {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.raw())
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::classify(raw))
    }
}

// =============================================================================
// Auth API Types
// =============================================================================

/// Token pair issued by `POST /auth/login`.
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// The authenticated user as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

impl UserRecord {
    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// New-account request for `POST /auth/signup`.
#[derive(Clone, Default, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SignupRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .finish()
    }
}

// =============================================================================
// Chat API Types
// =============================================================================

/// Request body for `POST /chat/message`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Conversation to append to; `None` asks the backend to start one.
    pub conversation_id: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response from `POST /chat/message`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: Content,
    pub conversation_id: String,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<u32>,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

/// Result of sending a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Conversation the message landed in (newly assigned if none was given).
    pub conversation_id: String,
    /// The assistant's reply, still tagged.
    pub reply: Content,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[serde(alias = "USER", alias = "User")]
    User,
    #[serde(alias = "ASSISTANT", alias = "Assistant")]
    Assistant,
    #[serde(alias = "SYSTEM", alias = "System")]
    System,
    #[serde(alias = "ERROR", alias = "Error")]
    Error,
}

/// One message in a conversation's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<i64>,
    pub content: Content,
    pub message_type: MessageType,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

/// Conversation metadata as listed by `GET /chat/conversations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ConversationSummary {
    /// Title for display; untitled conversations fall back to their id.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationHistory {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenameRequest<'a> {
    pub new_title: &'a str,
}

/// Models the backend can answer with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub available_models: Vec<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

// =============================================================================
// Health API Types
// =============================================================================

/// Response from `GET /health/`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub websocket_connections: u32,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Response from `GET /health/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub websocket_channels: HashMap<String, u32>,
    #[serde(default)]
    pub total_connections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_message_deserializes_uppercase_type() {
        let json = r#"{
            "id": 3,
            "content": "serviceUnavailable",
            "message_type": "ASSISTANT",
            "user_id": null,
            "timestamp": "2024-05-01T10:00:00.123456"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.message_type, MessageType::Assistant);
        assert!(msg.content.is_service_unavailable());
        assert!(msg.timestamp.is_some());
    }

    #[test]
    fn test_chat_request_keeps_null_conversation_id() {
        let req = ChatRequest {
            message: "hello".into(),
            conversation_id: None,
            temperature: 0.7,
            model: None,
            max_tokens: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value["conversation_id"].is_null());
        assert!(value.get("model").is_none());
    }

    #[test]
    fn test_display_fallbacks() {
        let user = UserRecord {
            username: "alice".into(),
            full_name: Some("  ".into()),
            email: None,
            disabled: None,
        };
        assert_eq!(user.display_name(), "alice");

        let conv: ConversationSummary =
            serde_json::from_str(r#"{"id":"c1","title":null}"#).unwrap();
        assert_eq!(conv.display_title(), "c1");
        assert!(conv.is_active);
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access_token":"secret-a","refresh_token":"secret-r"}"#)
                .unwrap();
        let dbg = format!("{pair:?}");
        assert!(!dbg.contains("secret"));
    }
}
