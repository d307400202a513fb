use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::time::Duration;

use crate::config::{Config, DEFAULT_ENDPOINT};

#[derive(Serialize)]
struct AskRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    response: String,
}

/// Client for the companion backend's chat endpoint
#[derive(Clone)]
pub struct CompanionClient {
    client: Client,
    base_url: String,
    endpoint: String,
}

impl CompanionClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, DEFAULT_ENDPOINT, Duration::from_secs(60))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_options(config.base_url(), config.endpoint(), config.timeout())
    }

    pub fn with_options(base_url: &str, endpoint: &str, timeout: Duration) -> Result<Self> {
        // Cookie store keeps the session from `login` for later `ask` calls
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one message and return the AI's reply
    pub async fn ask(&self, message: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, self.endpoint);
        tracing::debug!(%url, len = message.len(), "sending message");

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Companion request failed with status: {}",
                response.status()
            ));
        }

        let ask_response: AskResponse = response.json().await?;
        Ok(ask_response.response)
    }

    /// Log in with the backend's form login so `ask` carries a session cookie.
    ///
    /// A rejected login redirects back to the login page rather than
    /// returning an error status, so the final URL decides the outcome.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let url = format!("{}/login", self.base_url);

        let response = self
            .client
            .post(&url)
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Login failed with status: {}", response.status()));
        }

        if response.url().path().trim_end_matches('/') == "/login" {
            return Err(anyhow!("Login rejected for {}", email));
        }

        tracing::info!(%email, "logged in");
        Ok(())
    }
}
