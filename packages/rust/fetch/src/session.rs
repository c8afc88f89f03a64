//! Authenticated fetcher.
//!
//! Establishes a subscriber session once, up front, and reuses its cookies
//! for every post fetch. A logged-in session receives the full body of gated
//! posts, so this variant never reports [`FetchOutcome::Paywalled`].

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use substack2md_shared::{ArchiveError, AuthConfig, Result};

use crate::{FetchOutcome, PageFetcher, build_client, fetch_page_text};

/// Subscriber login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from the environment variables named in the
    /// configuration. The variable names live in config; the secrets do not.
    pub fn from_env(auth: &AuthConfig) -> Result<Self> {
        let email = std::env::var(&auth.email_env).map_err(|_| {
            ArchiveError::Authentication(format!("environment variable {} is not set", auth.email_env))
        })?;
        let password = std::env::var(&auth.password_env).map_err(|_| {
            ArchiveError::Authentication(format!(
                "environment variable {} is not set",
                auth.password_env
            ))
        })?;
        Ok(Self { email, password })
    }
}

/// Knobs for the login sequence.
pub struct LoginOptions {
    /// Base URL of the account portal.
    pub portal: Url,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum session-readiness probes before giving up.
    pub max_probes: u32,
    /// Delay between readiness probes.
    pub probe_interval: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            portal: Url::parse("https://substack.com").expect("portal url"),
            timeout_secs: 30,
            max_probes: 10,
            probe_interval: Duration::from_millis(500),
        }
    }
}

/// Fetches posts through a logged-in subscriber session.
#[derive(Debug)]
pub struct AuthenticatedFetcher {
    client: reqwest::Client,
}

impl AuthenticatedFetcher {
    /// Log in and wait until the session is usable.
    ///
    /// The sign-in page is loaded first so the jar holds the cookies the
    /// login endpoint expects. Readiness is confirmed by polling the account
    /// endpoint rather than waiting a fixed interval.
    pub async fn login(credentials: &Credentials, options: &LoginOptions) -> Result<Self> {
        let client = build_client(options.timeout_secs, true)?;
        let portal = options.portal.as_str().trim_end_matches('/');

        let sign_in = format!("{portal}/sign-in");
        fetch_page_text(&client, &Url::parse(&sign_in).map_err(|e| ArchiveError::parse(e.to_string()))?)
            .await?;

        let login_url = format!("{portal}/api/v1/login");
        let response = client
            .post(&login_url)
            .json(&serde_json::json!({
                "email": credentials.email,
                "password": credentials.password,
                "captcha_response": serde_json::Value::Null,
                "for_pub": "",
                "redirect": "/",
            }))
            .send()
            .await
            .map_err(|e| ArchiveError::Network(format!("{login_url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArchiveError::Network(format!("{login_url}: failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(ArchiveError::Authentication(format!(
                "login rejected with HTTP {status}"
            )));
        }
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(error) = json.get("error") {
                return Err(ArchiveError::Authentication(format!("login failed: {error}")));
            }
        }

        let fetcher = Self { client };
        fetcher.wait_until_ready(portal, options).await?;
        info!("subscriber session established");
        Ok(fetcher)
    }

    /// Poll the account endpoint until the session cookies are accepted.
    async fn wait_until_ready(&self, portal: &str, options: &LoginOptions) -> Result<()> {
        let probe_url = format!("{portal}/api/v1/user");
        for attempt in 1..=options.max_probes {
            match self.client.get(&probe_url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, "session ready");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(attempt, status = %response.status(), "session not ready yet");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "session probe failed");
                }
            }
            tokio::time::sleep(options.probe_interval).await;
        }
        Err(ArchiveError::timeout("subscriber session readiness"))
    }
}

#[async_trait]
impl PageFetcher for AuthenticatedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome> {
        let body = fetch_page_text(&self.client, url).await?;
        Ok(FetchOutcome::Page(Html::parse_document(&body)))
    }
}
