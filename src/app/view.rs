//! State of the conversation pane.
//!
//! REST completions can arrive out of order: a history fetch for a
//! conversation the user already left may resolve after the fetch for the
//! one they are looking at now. Every load therefore starts by taking a
//! [`RequestToken`], and its result is applied only while that token is
//! still the newest one for its slot.

use crate::error::Error;
use crate::i18n::{self, Language};
use crate::types::{Content, ConversationSummary, Message, MessageType, SendOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    List,
    History,
    Send,
}

/// Ticket for one in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    slot: Slot,
    generation: u64,
}

/// Who a transcript line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
    System,
    /// The assistant is still working on a reply.
    Pending,
    /// A failure report for the user.
    Error,
    /// Placeholder text such as "no messages".
    Notice,
}

impl From<MessageType> for Speaker {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::User => Self::User,
            MessageType::Assistant => Self::Assistant,
            MessageType::System => Self::System,
            MessageType::Error => Self::Error,
        }
    }
}

/// One rendered line of the conversation pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptLine {
    fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// Conversation list, selection, history and the latest reply.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    conversations: Vec<ConversationSummary>,
    selected: Option<String>,
    history: Vec<Message>,
    pending: bool,
    reply: Option<Content>,
    error: Option<Content>,
    /// Set when the user asked for an empty pane; suppresses auto-selection.
    blank_slate: bool,
    list_generation: u64,
    history_generation: u64,
    send_generation: u64,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn reply(&self) -> Option<&Content> {
        self.reply.as_ref()
    }

    pub fn error(&self) -> Option<&Content> {
        self.error.as_ref()
    }

    // ── Conversation list ──────────────────────────────────────────────

    pub fn begin_list_load(&mut self) -> RequestToken {
        self.list_generation += 1;
        RequestToken {
            slot: Slot::List,
            generation: self.list_generation,
        }
    }

    /// Apply a list result. Returns `false` if the token is stale.
    ///
    /// When nothing is selected the first conversation becomes selected,
    /// unless the user explicitly cleared the pane.
    pub fn conversations_loaded(
        &mut self,
        token: RequestToken,
        conversations: Vec<ConversationSummary>,
    ) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.conversations = conversations;
        if self.selected.is_none() && !self.blank_slate {
            if let Some(first) = self.conversations.first() {
                let id = first.id.clone();
                self.select(id);
            }
        }
        true
    }

    pub fn list_failed(&mut self, token: RequestToken, error: &Error) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.error = Some(describe(error));
        true
    }

    // ── Selection and history ──────────────────────────────────────────

    /// Switch to `conversation_id`. Any in-flight history load is orphaned,
    /// and so is a pending send when the selection actually changes.
    pub fn select(&mut self, conversation_id: impl Into<String>) {
        let id = conversation_id.into();
        if self.selected.as_deref() != Some(id.as_str()) {
            self.history.clear();
            self.reply = None;
            self.orphan_send();
        }
        self.selected = Some(id);
        self.blank_slate = false;
        self.error = None;
        self.history_generation += 1;
    }

    /// Start a history load for the selected conversation.
    ///
    /// Returns `None` (and empties the history) when nothing is selected.
    pub fn begin_history_load(&mut self) -> Option<(RequestToken, String)> {
        self.history_generation += 1;
        let Some(id) = self.selected.clone() else {
            self.history.clear();
            return None;
        };
        let token = RequestToken {
            slot: Slot::History,
            generation: self.history_generation,
        };
        Some((token, id))
    }

    pub fn history_loaded(&mut self, token: RequestToken, messages: Vec<Message>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.history = messages;
        true
    }

    pub fn history_failed(&mut self, token: RequestToken, error: &Error) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.error = Some(describe(error));
        true
    }

    /// Empty the pane so the next send starts a new conversation.
    pub fn new_conversation(&mut self) {
        self.selected = None;
        self.history.clear();
        self.reply = None;
        self.error = None;
        self.blank_slate = true;
        self.history_generation += 1;
        self.orphan_send();
    }

    // ── Sending ────────────────────────────────────────────────────────

    /// Mark a send as pending. Returns `None` while another is pending.
    pub fn begin_send(&mut self) -> Option<RequestToken> {
        if self.pending {
            return None;
        }
        self.pending = true;
        self.error = None;
        self.send_generation += 1;
        Some(RequestToken {
            slot: Slot::Send,
            generation: self.send_generation,
        })
    }

    /// Record the outcome of a send.
    ///
    /// A new conversation id is adopted as the selection when nothing was
    /// selected.
    pub fn finish_send(
        &mut self,
        token: RequestToken,
        outcome: Result<&SendOutcome, &Error>,
    ) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.pending = false;
        match outcome {
            Ok(outcome) => {
                self.reply = Some(outcome.reply.clone());
                if self.selected.is_none() {
                    self.selected = Some(outcome.conversation_id.clone());
                    self.blank_slate = false;
                    self.history_generation += 1;
                }
            }
            Err(error) => {
                self.reply = None;
                self.error = Some(match error {
                    Error::Validation(detail) if !detail.is_empty() => {
                        Content::Literal(detail.clone())
                    }
                    Error::ServiceUnavailable => {
                        Content::Localizable("serviceUnavailable".into())
                    }
                    _ => Content::Localizable("errorProcessing".into()),
                });
            }
        }
        true
    }

    /// Drop the pending send so its completion no longer lands in the pane.
    fn orphan_send(&mut self) {
        self.pending = false;
        self.send_generation += 1;
    }

    // ── Rename / delete bookkeeping ────────────────────────────────────

    pub fn conversation_renamed(&mut self, conversation_id: &str, title: &str) {
        if let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conv.title = Some(title.trim().to_string());
        }
    }

    /// Forget a deleted conversation. If it was selected, the selection,
    /// history and reply are cleared and in-flight loads and sends orphaned.
    pub fn conversation_removed(&mut self, conversation_id: &str) {
        self.conversations.retain(|c| c.id != conversation_id);
        if self.selected.as_deref() == Some(conversation_id) {
            self.selected = None;
            self.history.clear();
            self.reply = None;
            self.error = None;
            self.blank_slate = true;
            self.history_generation += 1;
            self.orphan_send();
        }
    }

    // ── Rendering ──────────────────────────────────────────────────────

    /// Lines to show, with every server string resolved for `language`.
    pub fn transcript(&self, language: Language) -> Vec<TranscriptLine> {
        let mut lines: Vec<TranscriptLine> = self
            .history
            .iter()
            .map(|m| TranscriptLine::new(m.message_type.into(), i18n::resolve(&m.content, language)))
            .collect();

        if self.pending {
            lines.push(TranscriptLine::new(
                Speaker::Pending,
                i18n::translate("thinking", language),
            ));
        } else if let Some(reply) = &self.reply {
            let already_shown = self.history.last().is_some_and(|m| &m.content == reply);
            if !already_shown {
                lines.push(TranscriptLine::new(
                    Speaker::Assistant,
                    i18n::resolve(reply, language),
                ));
            }
        }

        if let Some(error) = &self.error {
            lines.push(TranscriptLine::new(
                Speaker::Error,
                i18n::resolve(error, language),
            ));
        }

        if lines.is_empty() {
            lines.push(TranscriptLine::new(
                Speaker::Notice,
                i18n::translate("noMessages", language),
            ));
        }
        lines
    }

    fn is_current(&self, token: RequestToken) -> bool {
        let latest = match token.slot {
            Slot::List => self.list_generation,
            Slot::History => self.history_generation,
            Slot::Send => self.send_generation,
        };
        token.generation == latest
    }
}

fn describe(error: &Error) -> Content {
    match error {
        Error::Validation(detail) if !detail.is_empty() => Content::Literal(detail.clone()),
        other => Content::Localizable(other.message_key().to_string()),
    }
}
