//! Agent Chat Client
//!
//! A thin client for an agent chat backend: authenticate, manage
//! conversations over REST and follow live updates over WebSocket.
//!
//! # Architecture
//!
//! - **Session**: credential pair cached in memory, written through to a
//!   durable key-value store, attached to every request and socket
//! - **REST**: typed accessors for auth, conversations and health
//! - **Realtime**: one [`realtime::Channel`] per logical stream with an
//!   observable connection state and a bounded inbox
//! - **App**: presentation state (user, preferences, conversation pane)
//!
//! # Modules
//!
//! - [`client`]: HTTP client and API accessors
//! - [`session`]: Credential storage
//! - [`realtime`]: WebSocket channels and reconnect policy
//! - [`app`]: View state and the controller that feeds it
//! - [`i18n`]: English/Spanish message catalogue

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod i18n;
pub mod realtime;
pub mod session;
pub mod storage;
pub mod types;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use types::*;
