//! Authenticated PractiScore page fetcher.
//!
//! Owns the login session (one cookie-backed session reused per fetch
//! cycle) and the bounded anti-bot retry policy. The decision engine only
//! sees terminal `Result`s; no retry or backoff logic leaks upstream.

pub mod register;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use url::Url;

use registrar_engine::{required_env, ConfigError, FetchError, PageFetcher};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Anti-bot retry policy: maximum attempts with escalating fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    max_attempts: u32,
    backoff: [Duration; 2],
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: [Duration::from_secs(5), Duration::from_secs(15)],
        }
    }
}

/// Challenge interstitials are short; real listing and detail pages are not.
const MIN_PLAUSIBLE_BODY_LEN: usize = 1024;

const INTERSTITIAL_TITLE_MARKERS: &[&str] = &[
    "just a moment",
    "attention required",
    "verify you are human",
    "access denied",
];

/// PractiScore account credentials, loaded separately from the run
/// configuration so the engine never holds the password.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            username: required_env("PRACTISCORE_USERNAME")?,
            password: required_env("PRACTISCORE_PASSWORD")?,
        })
    }
}

/// HTTP client with a persistent authenticated session.
pub struct PractiscoreClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    retry: RetryPolicy,
    logged_in: Mutex<bool>,
}

impl PractiscoreClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        // Browser-like headers; bare client UAs get served interstitials.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.5".parse().unwrap(),
        );
        headers.insert(reqwest::header::CONNECTION, "keep-alive".parse().unwrap());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid base URL")?;

        Ok(Self {
            client,
            base_url,
            credentials,
            retry: RetryPolicy::default(),
            logged_in: Mutex::new(false),
        })
    }

    /// Collapse the backoff schedule so retry tests run instantly.
    #[cfg(test)]
    pub(crate) fn without_backoff(mut self) -> Self {
        self.retry.backoff = [Duration::ZERO, Duration::ZERO];
        self
    }

    pub(crate) fn absolute(&self, href: &str) -> String {
        self.base_url
            .join(href)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| href.to_string())
    }

    /// Log in once per client; the cookie store carries the session for
    /// every later fetch.
    pub(crate) async fn ensure_logged_in(&self) -> Result<(), FetchError> {
        let mut logged_in = self.logged_in.lock().await;
        if *logged_in {
            return Ok(());
        }

        let login_url = self.absolute("/login");
        let response = self
            .client
            .post(&login_url)
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|error| FetchError::Network {
                url: login_url.clone(),
                message: error.to_string(),
            })?;

        // A successful login redirects away from the login form.
        let landed_on = response.url().to_string();
        if landed_on.to_lowercase().contains("login") {
            tracing::warn!(url = %login_url, "Login rejected");
            return Err(FetchError::AuthRequired { url: login_url });
        }

        tracing::info!(username = %self.credentials.username, "Logged in to PractiScore");
        *logged_in = true;
        Ok(())
    }

    /// GET a page, retrying through anti-bot interstitials with the
    /// bounded backoff schedule.
    pub(crate) async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        for attempt in 1..=self.retry.max_attempts {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|error| FetchError::Network {
                    url: url.to_string(),
                    message: error.to_string(),
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|error| FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            })?;

            // 403s from challenge middleware look like blocks, not errors.
            let blocked = status.as_u16() == 403 || looks_like_interstitial(&body);
            if !blocked {
                if !status.is_success() {
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        message: format!("HTTP {status}"),
                    });
                }
                return Ok(body);
            }

            if attempt < self.retry.max_attempts {
                let backoff = self.retry.backoff[(attempt - 1) as usize];
                tracing::warn!(
                    url = %url,
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    "Anti-bot interstitial detected, backing off"
                );
                tokio::time::sleep(backoff).await;
            }
        }

        Err(FetchError::AntiBotBlocked {
            url: url.to_string(),
            attempts: self.retry.max_attempts,
        })
    }
}

#[async_trait]
impl PageFetcher for PractiscoreClient {
    async fn fetch(&self, url: &str, requires_auth: bool) -> Result<String, FetchError> {
        if requires_auth {
            self.ensure_logged_in().await?;
        }
        self.fetch_with_retry(url).await
    }
}

/// Heuristic interstitial detection: short page length or a telltale title.
pub(crate) fn looks_like_interstitial(body: &str) -> bool {
    if body.trim().len() < MIN_PLAUSIBLE_BODY_LEN {
        return true;
    }
    match page_title(body) {
        Some(title) => INTERSTITIAL_TITLE_MARKERS
            .iter()
            .any(|marker| title.contains(marker)),
        None => false,
    }
}

fn page_title(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_lowercase())
        .filter(|title| !title.is_empty())
}
