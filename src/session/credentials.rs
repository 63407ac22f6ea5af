//! Bearer credential pair and its shared store.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::storage::{ACCESS_TOKEN_KEY, KeyValueStore, REFRESH_TOKEN_KEY};
use crate::types::TokenPair;

/// Access and refresh credentials, both opaque.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl From<TokenPair> for Credentials {
    fn from(pair: TokenPair) -> Self {
        Self::new(pair.access_token, pair.refresh_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Thread-safe holder of the current credential pair.
///
/// Cloning is cheap and every clone observes the same pair. Writers hold the
/// lock across the durable write, so readers see either the old pair or the
/// new one, never a mix.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<CredentialStoreInner>,
}

struct CredentialStoreInner {
    current: RwLock<Option<Credentials>>,
    backing: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .field("backing", &self.inner.backing)
            .finish()
    }
}

impl CredentialStore {
    /// Create a store, restoring any pair already persisted in `backing`.
    pub fn load(backing: Arc<dyn KeyValueStore>) -> Self {
        let current = backing
            .get(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(|access| Credentials::new(access, backing.get(REFRESH_TOKEN_KEY)));
        Self {
            inner: Arc::new(CredentialStoreInner {
                current: RwLock::new(current),
                backing,
            }),
        }
    }

    /// The durable store behind this credential store.
    pub fn backing(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.inner.backing)
    }

    /// Consistent snapshot of the current pair.
    pub fn snapshot(&self) -> Option<Credentials> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current access credential, if any.
    pub fn access_token(&self) -> Option<String> {
        self.snapshot().map(|c| c.access_token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the pair in memory and on disk.
    pub fn store(&self, credentials: Credentials) -> Result<()> {
        let mut guard = self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.backing.apply(&[
            (ACCESS_TOKEN_KEY, Some(credentials.access_token())),
            (REFRESH_TOKEN_KEY, credentials.refresh_token()),
        ])?;
        *guard = Some(credentials);
        Ok(())
    }

    /// Forget both credentials.
    ///
    /// Memory is cleared even if the durable write fails; the error is still
    /// reported.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        self.inner
            .backing
            .apply(&[(ACCESS_TOKEN_KEY, None), (REFRESH_TOKEN_KEY, None)])
    }
}
