//! Login, signup, identity and logout.

use reqwest::Method;
use tracing::{info, warn};

use crate::{
    client::Client,
    error::{Error, Result},
    session::Credentials,
    types::{SignupRequest, TokenPair, UserRecord},
};

/// Auth API client.
#[derive(Debug)]
pub struct AuthApi<'a> {
    client: &'a Client,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Exchange username/password for a credential pair and persist it.
    ///
    /// Rejected credentials yield [`Error::Auth`]; nothing is stored and
    /// nothing is retried.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        let response = self
            .client
            .request(Method::POST, &["auth", "login"])
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let pair: TokenPair = match Client::handle_response(response).await {
            Ok(pair) => pair,
            Err(Error::Unauthenticated) => {
                warn!(name: "auth.login.rejected", username = %username, "Login rejected");
                return Err(Error::Auth(format!("invalid credentials for {username}")));
            }
            Err(e) => return Err(e),
        };

        let credentials = Credentials::from(pair);
        self.client.credentials().store(credentials.clone())?;
        info!(name: "auth.login.succeeded", username = %username, "Logged in");
        Ok(credentials)
    }

    /// Create an account. Does not log in.
    ///
    /// Missing username or password is rejected before any request; server
    /// rejections carry the server's detail text.
    pub async fn register(&self, profile: &SignupRequest) -> Result<UserRecord> {
        if profile.username.trim().is_empty() {
            return Err(Error::Validation("username is required".into()));
        }
        if profile.password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }

        let response = self
            .client
            .request(Method::POST, &["auth", "signup"])
            .json(profile)
            .send()
            .await?;
        let user: UserRecord = Client::handle_response(response).await?;
        info!(name: "auth.signup.succeeded", username = %user.username, "Account created");
        Ok(user)
    }

    /// Resolve the identity behind the stored credential.
    pub async fn current_user(&self) -> Result<UserRecord> {
        if !self.client.credentials().is_authenticated() {
            return Err(Error::Unauthenticated);
        }
        let response = self
            .client
            .request(Method::GET, &["auth", "me"])
            .send()
            .await?;
        Client::handle_response(response).await
    }

    /// Forget both credentials. No server call is made.
    pub fn logout(&self) -> Result<()> {
        self.client.credentials().clear()?;
        info!(name: "auth.logout", "Logged out");
        Ok(())
    }
}
