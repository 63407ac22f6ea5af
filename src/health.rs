//! Backend health endpoints.

use reqwest::Method;

use crate::{
    client::Client,
    error::Result,
    types::{HealthReport, SystemStatus},
};

/// Health API client.
#[derive(Debug)]
pub struct HealthApi<'a> {
    client: &'a Client,
}

impl<'a> HealthApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// `GET /health/`
    pub async fn check(&self) -> Result<HealthReport> {
        // Trailing empty segment keeps the slash the route is mounted with.
        let response = self
            .client
            .request(Method::GET, &["health", ""])
            .send()
            .await?;
        Client::handle_response(response).await
    }

    /// Per-channel socket counts.
    pub async fn status(&self) -> Result<SystemStatus> {
        let response = self
            .client
            .request(Method::GET, &["health", "status"])
            .send()
            .await?;
        Client::handle_response(response).await
    }
}
