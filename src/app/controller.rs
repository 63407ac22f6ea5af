//! Drives a [`ChatView`] with calls to the conversations API.

use tracing::debug;

use crate::{
    app::view::ChatView,
    client::Client,
    error::{Error, Result},
    types::SendOutcome,
};

/// Couples a [`Client`] with the view state it feeds.
///
/// Every call takes a [`RequestToken`](crate::app::RequestToken) before it
/// awaits, so results that lose a race with a newer call are dropped
/// instead of overwriting fresher state.
#[derive(Debug)]
pub struct ChatController {
    client: Client,
    view: ChatView,
}

impl ChatController {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            view: ChatView::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// Reload the conversation list, then the selected history.
    pub async fn refresh(&mut self) -> Result<()> {
        let token = self.view.begin_list_load();
        match self.client.conversations().list().await {
            Ok(list) => {
                if !self.view.conversations_loaded(token, list) {
                    debug!(name: "chat.view.stale_list", "Dropped stale conversation list");
                }
            }
            Err(e) => {
                self.view.list_failed(token, &e);
                return Err(e);
            }
        }
        self.reload_history().await
    }

    /// Switch to a conversation and load its history.
    pub async fn select(&mut self, conversation_id: &str) -> Result<()> {
        self.view.select(conversation_id);
        self.reload_history().await
    }

    /// Start over with an empty pane. The next send opens a new conversation.
    pub fn new_conversation(&mut self) {
        self.view.new_conversation();
    }

    /// Send into the selected conversation, or a new one when none is
    /// selected. Refuses while a reply is pending.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome> {
        let Some(token) = self.view.begin_send() else {
            return Err(Error::Validation("a reply is still pending".into()));
        };
        let selected = self.view.selected().map(str::to_owned);
        let result = self
            .client
            .conversations()
            .send(text, selected.as_deref())
            .await;
        if !self.view.finish_send(token, result.as_ref()) {
            debug!(name: "chat.view.stale_send", "Dropped stale send completion");
        }
        let outcome = result?;
        // The list carries new titles and counts; history picks up both turns.
        self.refresh().await?;
        Ok(outcome)
    }

    pub async fn rename(&mut self, conversation_id: &str, title: &str) -> Result<()> {
        self.client
            .conversations()
            .rename(conversation_id, title)
            .await?;
        self.view.conversation_renamed(conversation_id, title);
        Ok(())
    }

    /// Delete a conversation. Deleting the selected one empties the pane.
    pub async fn delete(&mut self, conversation_id: &str) -> Result<()> {
        self.client.conversations().delete(conversation_id).await?;
        self.view.conversation_removed(conversation_id);
        self.refresh().await
    }

    async fn reload_history(&mut self) -> Result<()> {
        let Some((token, id)) = self.view.begin_history_load() else {
            return Ok(());
        };
        match self.client.conversations().history(&id).await {
            Ok(messages) => {
                if !self.view.history_loaded(token, messages) {
                    debug!(name: "chat.view.stale_history", conversation_id = %id, "Dropped stale history");
                }
                Ok(())
            }
            Err(e) => {
                self.view.history_failed(token, &e);
                Err(e)
            }
        }
    }
}
