//! Credential storage for the authenticated session.
//!
//! The credential pair is the only mutable state shared by every outbound
//! request and every socket connection. It lives in one
//! [`CredentialStore`], which caches it in memory and writes through to the
//! durable [`KeyValueStore`](crate::storage::KeyValueStore).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use agent_chat_client::session::{CredentialStore, Credentials};
//! use agent_chat_client::storage::MemoryStore;
//!
//! let store = CredentialStore::load(Arc::new(MemoryStore::new()));
//! assert!(!store.is_authenticated());
//!
//! store.store(Credentials::new("access", Some("refresh".into()))).unwrap();
//! assert_eq!(store.access_token().as_deref(), Some("access"));
//! ```

mod credentials;

pub use credentials::{CredentialStore, Credentials};
