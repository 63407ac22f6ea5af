//! Display-language catalogue and the render-time lookup.
//!
//! The backend sometimes answers with a catalogue key instead of literal
//! text. Such values arrive as [`Content::Localizable`] and are turned into
//! display text here, in one place, via [`resolve`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Content;

/// Supported display languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    /// Language code as persisted (`en`, `es`).
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Name shown in a language picker.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Español",
        }
    }

    /// Every language with a catalogue.
    pub fn available() -> &'static [Language] {
        &[Language::Es, Language::En]
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::En => EN,
            Self::Es => ES,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            other => Err(format!("unsupported language code: {other}")),
        }
    }
}

/// Look up `key` for `language`.
///
/// Falls back to the Spanish catalogue, then to the key itself.
pub fn translate(key: &str, language: Language) -> &str {
    lookup(language.table(), key)
        .or_else(|| lookup(ES, key))
        .unwrap_or(key)
}

/// Keys the backend may send in place of literal text.
const SERVER_STATUS_KEYS: &[&str] = &["serviceUnavailable", "errorProcessing"];

/// Whether `raw` is a server status key rather than literal text.
pub fn is_status_key(raw: &str) -> bool {
    SERVER_STATUS_KEYS.contains(&raw)
}

/// Turn tagged content into display text.
pub fn resolve(content: &Content, language: Language) -> Cow<'_, str> {
    match content {
        Content::Literal(text) => Cow::Borrowed(text.as_str()),
        Content::Localizable(key) => Cow::Owned(translate(key, language).to_string()),
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

const EN: &[(&str, &str)] = &[
    // Auth
    ("login", "Login"),
    ("logout", "Logout"),
    ("register", "Register"),
    ("invalidCredentials", "Invalid credentials"),
    ("registrationSuccess", "User registered successfully. You can now log in."),
    ("registrationError", "Error registering user"),
    ("sessionExpired", "Your session has expired. Please log in again."),
    ("validationError", "The request contains invalid data."),
    // Chat
    ("writeMessage", "Write your message"),
    ("send", "Send"),
    ("sending", "Sending..."),
    ("thinking", "Thinking..."),
    ("aiAssistant", "AI Chat Assistant"),
    ("aiAssistantDesc", "Ask me anything and I'll help you!"),
    ("errorProcessing", "Sorry, there was an error processing your message. Please try again."),
    ("serviceUnavailable", "The service is currently unavailable."),
    ("networkError", "Could not reach the server. Please try again."),
    // Channels
    ("realtimeChat", "Real-time Chat (WebSocket)"),
    ("dataAnalysis", "Real-time Data Analysis"),
    ("notifications", "Real-time Notifications"),
    ("connected", "Connected"),
    ("disconnected", "Disconnected"),
    ("connecting", "Connecting..."),
    ("reconnecting", "Reconnecting..."),
    // Common
    ("welcome", "Welcome"),
    ("loading", "Loading..."),
    ("error", "Error"),
    ("light", "Light"),
    ("dark", "Dark"),
    ("theme", "Theme"),
    ("language", "Language"),
    // Conversations
    ("conversations", "Conversations"),
    ("newConversation", "New conversation"),
    ("rename", "Rename"),
    ("delete", "Delete"),
    ("deleteConfirm", "Delete conversation?"),
    ("noMessages", "No messages in this conversation."),
    ("noConversations", "No conversations yet."),
    ("conversationNotFound", "This conversation no longer exists."),
];

const ES: &[(&str, &str)] = &[
    // Auth
    ("login", "Iniciar sesión"),
    ("logout", "Cerrar sesión"),
    ("register", "Registrarse"),
    ("invalidCredentials", "Credenciales incorrectas"),
    ("registrationSuccess", "Usuario registrado exitosamente. Ahora puedes iniciar sesión."),
    ("registrationError", "Error al registrar usuario"),
    ("sessionExpired", "Tu sesión ha expirado. Inicia sesión de nuevo."),
    ("validationError", "La solicitud contiene datos no válidos."),
    // Chat
    ("writeMessage", "Escribe tu mensaje"),
    ("send", "Enviar"),
    ("sending", "Enviando..."),
    ("thinking", "Pensando..."),
    ("aiAssistant", "Asistente de IA"),
    ("aiAssistantDesc", "¡Hazme cualquier pregunta y te ayudaré!"),
    ("errorProcessing", "Lo siento, hubo un error procesando tu mensaje. Por favor, inténtalo de nuevo."),
    ("serviceUnavailable", "Por el momento el servicio no está disponible."),
    ("networkError", "No se pudo contactar con el servidor. Inténtalo de nuevo."),
    // Channels
    ("realtimeChat", "Chat en tiempo real (WebSocket)"),
    ("dataAnalysis", "Análisis de datos en tiempo real"),
    ("notifications", "Notificaciones en tiempo real"),
    ("connected", "Conectado"),
    ("disconnected", "Desconectado"),
    ("connecting", "Conectando..."),
    ("reconnecting", "Reconectando..."),
    // Common
    ("welcome", "Bienvenido"),
    ("loading", "Cargando..."),
    ("error", "Error"),
    ("light", "Claro"),
    ("dark", "Oscuro"),
    ("theme", "Tema"),
    ("language", "Idioma"),
    // Conversations
    ("conversations", "Conversaciones"),
    ("newConversation", "Nueva conversación"),
    ("rename", "Renombrar"),
    ("delete", "Eliminar"),
    ("deleteConfirm", "¿Eliminar conversación?"),
    ("noMessages", "No hay mensajes en esta conversación."),
    ("noConversations", "Todavía no hay conversaciones."),
    ("conversationNotFound", "Esta conversación ya no existe."),
];
