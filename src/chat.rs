//! Conversation list, history and messaging.

use reqwest::Method;
use tracing::{debug, info};

use crate::{
    client::Client,
    error::{Error, Result},
    types::{
        ChatRequest, ChatResponse, ConversationHistory, ConversationList, ConversationSummary,
        Message, ModelCatalog, RenameRequest, SendOutcome,
    },
};

/// A message to send, with optional generation settings.
#[derive(Debug, Clone)]
pub struct SendMessage {
    text: String,
    conversation_id: Option<String>,
    temperature: Option<f32>,
    model: Option<String>,
    max_tokens: Option<u32>,
}

impl SendMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            conversation_id: None,
            temperature: None,
            model: None,
            max_tokens: None,
        }
    }

    /// Append to an existing conversation instead of starting one.
    #[must_use]
    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Conversations API client.
///
/// Stateless: it does not track which conversation is selected. Callers
/// that delete the selected conversation must clear their own selection
/// (see [`ChatView::conversation_removed`](crate::app::ChatView::conversation_removed)).
#[derive(Debug)]
pub struct ConversationsApi<'a> {
    client: &'a Client,
}

impl<'a> ConversationsApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List conversations. An empty list is a valid result.
    pub async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let response = self
            .client
            .request(Method::GET, &["chat", "conversations"])
            .send()
            .await?;
        let list: ConversationList = Client::handle_response(response).await?;
        Ok(list.conversations)
    }

    /// Messages of one conversation in server order.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let response = self
            .client
            .request(
                Method::GET,
                &["chat", "conversations", conversation_id, "history"],
            )
            .send()
            .await?;
        let history: ConversationHistory = Client::handle_response(response).await?;
        Ok(history.messages)
    }

    /// Send `text`, starting a new conversation when `conversation_id` is
    /// `None`. The returned id must be used for follow-ups.
    pub async fn send(&self, text: &str, conversation_id: Option<&str>) -> Result<SendOutcome> {
        let mut message = SendMessage::new(text);
        if let Some(id) = conversation_id {
            message = message.in_conversation(id);
        }
        self.send_message(message).await
    }

    /// Send a message with explicit generation settings.
    ///
    /// The reply is tagged but not resolved; see [`crate::i18n::resolve`].
    pub async fn send_message(&self, message: SendMessage) -> Result<SendOutcome> {
        let text = message.text.trim();
        if text.is_empty() {
            return Err(Error::Validation("message must not be empty".into()));
        }

        let request = ChatRequest {
            message: text.to_string(),
            conversation_id: message.conversation_id,
            temperature: message
                .temperature
                .unwrap_or_else(|| self.client.temperature()),
            model: message.model,
            max_tokens: message.max_tokens,
        };
        let started_new = request.conversation_id.is_none();

        let response = self
            .client
            .request(Method::POST, &["chat", "message"])
            .json(&request)
            .send()
            .await?;
        let reply: ChatResponse = Client::handle_response(response).await?;

        if started_new {
            info!(
                name: "chat.conversation.created",
                conversation_id = %reply.conversation_id,
                "Conversation started"
            );
        }
        debug!(
            name: "chat.message.answered",
            conversation_id = %reply.conversation_id,
            model = reply.model_used.as_deref().unwrap_or("unknown"),
            localizable = matches!(reply.response, crate::types::Content::Localizable(_)),
            "Reply received"
        );

        Ok(SendOutcome {
            conversation_id: reply.conversation_id,
            reply: reply.response,
        })
    }

    /// Overwrite a conversation's title.
    pub async fn rename(&self, conversation_id: &str, new_title: &str) -> Result<()> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(Error::Validation("title must not be empty".into()));
        }
        let response = self
            .client
            .request(
                Method::PUT,
                &["chat", "conversations", conversation_id, "rename"],
            )
            .json(&RenameRequest { new_title })
            .send()
            .await?;
        Client::check_status(response).await?;
        info!(name: "chat.conversation.renamed", conversation_id = %conversation_id, "Conversation renamed");
        Ok(())
    }

    /// Remove a conversation.
    pub async fn delete(&self, conversation_id: &str) -> Result<()> {
        let response = self
            .client
            .request(Method::DELETE, &["chat", "conversations", conversation_id])
            .send()
            .await?;
        Client::check_status(response).await?;
        info!(name: "chat.conversation.deleted", conversation_id = %conversation_id, "Conversation deleted");
        Ok(())
    }

    /// Models the backend can answer with.
    pub async fn models(&self) -> Result<ModelCatalog> {
        let response = self
            .client
            .request(Method::GET, &["chat", "models"])
            .send()
            .await?;
        Client::handle_response(response).await
    }
}
