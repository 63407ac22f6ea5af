//! Real-time channels over WebSocket.
//!
//! Each [`Channel`] owns one logical stream (chat, notifications or data
//! analysis) with its own connection lifecycle. The bearer credential is
//! passed as the `token` query parameter; there is no header-based socket
//! auth.
//!
//! # State machine
//!
//! ```text
//! closed --open()--> connecting --handshake--> open --close--> closed
//!                        |                      |
//!                        +-------> error <------+  (transport failure)
//! ```
//!
//! With the default [`ReconnectPolicy::disabled`] a channel never leaves
//! `closed` or `error` on its own; open a new channel instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_chat_client::realtime::{Channel, ChannelKind, ChannelOptions, ConnectionState};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Url::parse("ws://localhost:8000")?.join(ChannelKind::Chat.path())?;
//! let channel = Channel::open(&endpoint, Some("token"), ChannelOptions::default());
//!
//! channel.wait_until(|s| s != ConnectionState::Connecting).await;
//! channel.send("hello");
//! # Ok(())
//! # }
//! ```

mod backoff;
mod channel;

pub use backoff::ReconnectPolicy;
pub use channel::Channel;

use std::fmt;

/// Frames kept per channel unless configured otherwise.
pub const DEFAULT_RETENTION: usize = 1000;

/// The logical real-time streams the backend offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Chat,
    Notifications,
    Data,
}

impl ChannelKind {
    /// Socket path relative to the socket base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "/ws/chat",
            Self::Notifications => "/ws/notifications",
            Self::Data => "/ws/data",
        }
    }

    /// Catalogue key for the channel's title.
    pub fn title_key(self) -> &'static str {
        match self {
            Self::Chat => "realtimeChat",
            Self::Notifications => "notifications",
            Self::Data => "dataAnalysis",
        }
    }

    /// Whether the channel is meant to carry client frames.
    ///
    /// Notifications are receive-only; sending on them is still allowed but
    /// the backend ignores the payload.
    pub fn accepts_input(self) -> bool {
        !matches!(self, Self::Notifications)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chat => "chat",
            Self::Notifications => "notifications",
            Self::Data => "data",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Connecting,
    Open,
    Error,
}

impl ConnectionState {
    /// Catalogue key for the status label.
    pub fn label_key(self) -> &'static str {
        match self {
            Self::Closed => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "connected",
            Self::Error => "error",
        }
    }
}

/// Per-channel tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Maximum frames kept; the oldest are evicted first. `None` keeps all.
    pub retention: Option<usize>,
    pub reconnect: ReconnectPolicy,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            retention: Some(DEFAULT_RETENTION),
            reconnect: ReconnectPolicy::disabled(),
        }
    }
}
