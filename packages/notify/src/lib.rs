//! Best-effort notification dispatcher.
//!
//! Fans a message out over the configured channels: Twilio SMS for
//! immediacy and a GitHub issue for record-keeping. Every channel failure
//! is logged and swallowed; a notification never fails the run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

use registrar_engine::{EventRecord, Notifier, NotifyKind};

/// Twilio SMS channel settings.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

/// GitHub issue channel settings.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: String,
    pub repo: String,
}

pub struct NotificationManager {
    client: reqwest::Client,
    /// Base URL prefixed onto relative detail URLs in message bodies.
    link_base: String,
    twilio: Option<TwilioConfig>,
    github: Option<GithubConfig>,
}

impl NotificationManager {
    pub fn new(
        link_base: String,
        twilio: Option<TwilioConfig>,
        github: Option<GithubConfig>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            link_base,
            twilio,
            github,
        }
    }

    /// Build a manager from environment variables. Channels with missing
    /// or blank settings are disabled, not errors; an unconfigured manager
    /// only logs.
    pub fn from_env() -> Self {
        let twilio = match (
            non_empty_env("TWILIO_ACCOUNT_SID"),
            non_empty_env("TWILIO_AUTH_TOKEN"),
            non_empty_env("TWILIO_FROM_NUMBER"),
            non_empty_env("PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number), Some(phone)) => {
                Some(TwilioConfig {
                    account_sid,
                    auth_token,
                    from_number,
                    to_number: format!("+1{phone}"),
                })
            }
            _ => {
                tracing::info!("Twilio SMS channel disabled (not configured)");
                None
            }
        };

        let github = match non_empty_env("GITHUB_TOKEN") {
            Some(token) => Some(GithubConfig {
                token,
                repo: std::env::var("GITHUB_REPO")
                    .unwrap_or_else(|_| "glocklol/match-reg".to_string()),
            }),
            None => {
                tracing::info!("GitHub issue channel disabled (not configured)");
                None
            }
        };

        let link_base = std::env::var("PRACTISCORE_BASE_URL")
            .unwrap_or_else(|_| "https://practiscore.com".to_string());

        Self::new(link_base, twilio, github)
    }

    async fn send_sms(&self, twilio: &TwilioConfig, body: &str) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            twilio.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&twilio.account_sid, Some(&twilio.auth_token))
            .form(&[
                ("To", twilio.to_number.as_str()),
                ("From", twilio.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .context("Twilio request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Twilio returned {status}: {error_body}");
        }
        tracing::info!("Twilio SMS sent");
        Ok(())
    }

    async fn create_github_issue(
        &self,
        github: &GithubConfig,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let url = format!("https://api.github.com/repos/{}/issues", github.repo);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", github.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "match-registration-watcher")
            .json(&serde_json::json!({
                "title": title,
                "body": body,
                "labels": ["match-notification", "automated"],
            }))
            .send()
            .await
            .context("GitHub request failed")?;

        let status = response.status();
        if status.as_u16() != 201 {
            anyhow::bail!("GitHub issue creation failed with {status}");
        }
        let issue_url = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("html_url")?.as_str().map(String::from))
            .unwrap_or_default();
        tracing::info!(issue_url = %issue_url, "GitHub issue created");
        Ok(())
    }
}

#[async_trait]
impl Notifier for NotificationManager {
    async fn notify(&self, record: &EventRecord, kind: NotifyKind) {
        let (subject, message) = compose(&self.link_base, record, kind);

        if let Some(twilio) = &self.twilio {
            if let Err(error) = self.send_sms(twilio, &format!("{subject}\n\n{message}")).await {
                tracing::warn!(error = %error, "SMS notification failed");
            }
        }

        if let Some(github) = &self.github {
            let body = format!(
                "## Match Details\n**Title:** {}\n**Kind:** {:?}\n\n{}\n\n**Time:** {}",
                record.title,
                kind,
                message,
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
            );
            if let Err(error) = self.create_github_issue(github, &subject, &body).await {
                tracing::warn!(error = %error, "GitHub issue notification failed");
            }
        }

        if self.twilio.is_none() && self.github.is_none() {
            tracing::info!(subject = %subject, message = %message, "Notification (no channels configured)");
        }
    }
}

/// Read an environment variable, treating blank values the same as unset
/// ones so an empty `TWILIO_ACCOUNT_SID=` line cannot half-enable a channel.
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Subject and message body for one notification.
pub(crate) fn compose(
    link_base: &str,
    record: &EventRecord,
    kind: NotifyKind,
) -> (String, String) {
    let link = if record.detail_url.starts_with("http") {
        record.detail_url.clone()
    } else {
        format!("{}{}", link_base.trim_end_matches('/'), record.detail_url)
    };

    match kind {
        NotifyKind::PaidFound => (
            "PAID USPSA Match Available".to_string(),
            format!(
                "Paid match requires manual registration:\n\n{}\n\n{link}",
                record.title
            ),
        ),
        NotifyKind::RegistrationAttempted => (
            "USPSA Match Registration Attempted".to_string(),
            format!(
                "Auto-registration attempted for:\n\n{}\n\n{link}",
                record.title
            ),
        ),
        NotifyKind::RegistrationSucceeded => (
            "USPSA Registration Successful!".to_string(),
            format!("Successfully registered for:\n\n{}\n\n{link}", record.title),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EventRecord {
        EventRecord::new("NSPS Run & Gun 07/28/25", "/register/1")
    }

    #[test]
    fn blank_channel_settings_disable_channels() {
        std::env::set_var("TWILIO_ACCOUNT_SID", "   ");
        std::env::set_var("TWILIO_AUTH_TOKEN", "token");
        std::env::set_var("TWILIO_FROM_NUMBER", "+15550001111");
        std::env::set_var("PHONE_NUMBER", "5550002222");
        std::env::set_var("GITHUB_TOKEN", "");

        let manager = NotificationManager::from_env();
        assert!(manager.twilio.is_none());
        assert!(manager.github.is_none());
    }

    #[test]
    fn paid_message_flags_manual_registration() {
        let (subject, message) =
            compose("https://practiscore.com", &record(), NotifyKind::PaidFound);
        assert!(subject.contains("PAID"));
        assert!(message.contains("manual registration"));
        assert!(message.contains("https://practiscore.com/register/1"));
    }

    #[test]
    fn success_message_names_the_match() {
        let (subject, message) = compose(
            "https://practiscore.com",
            &record(),
            NotifyKind::RegistrationSucceeded,
        );
        assert!(subject.contains("Successful"));
        assert!(message.contains("NSPS Run & Gun 07/28/25"));
    }

    #[test]
    fn absolute_detail_urls_pass_through() {
        let record = EventRecord::new("NSPS Run & Gun", "https://elsewhere.com/r/1");
        let (_, message) = compose(
            "https://practiscore.com",
            &record,
            NotifyKind::RegistrationAttempted,
        );
        assert!(message.contains("https://elsewhere.com/r/1"));
        assert!(!message.contains("practiscore.com/https"));
    }
}
