//! Registration form submission.

use async_trait::async_trait;
use scraper::{Html, Selector};

use registrar_engine::{
    EventRecord, FetchError, RegisterError, RegistrantIdentity, Registrar,
};

use crate::PractiscoreClient;

/// Markers in the post-submit page confirming the registration took.
const CONFIRMATION_MARKERS: &[&str] = &["registered", "confirmation"];

/// A located registration form: submit target plus hidden fields to
/// preserve (CSRF tokens, match ids).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RegistrationForm {
    pub action: String,
    pub hidden_fields: Vec<(String, String)>,
}

/// Find the registration form in detail-page markup: a form whose action
/// mentions registration, or one holding a Register button.
pub(crate) fn find_registration_form(markup: &str) -> Option<RegistrationForm> {
    let document = Html::parse_document(markup);
    let form_selector = Selector::parse("form").ok()?;
    let input_selector = Selector::parse("input").ok()?;
    let submit_selector = Selector::parse("button, input[type='submit']").ok()?;

    for form in document.select(&form_selector) {
        let action = form.value().attr("action").unwrap_or_default();

        let has_register_button = form.select(&submit_selector).any(|el| {
            el.text()
                .collect::<String>()
                .to_lowercase()
                .contains("register")
                || el
                    .value()
                    .attr("value")
                    .map(|v| v.to_lowercase().contains("register"))
                    .unwrap_or(false)
        });
        if !action.to_lowercase().contains("register") && !has_register_button {
            continue;
        }

        let hidden_fields = form
            .select(&input_selector)
            .filter(|input| input.value().attr("type") == Some("hidden"))
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        return Some(RegistrationForm {
            action: action.to_string(),
            hidden_fields,
        });
    }
    None
}

pub(crate) fn identity_fields(identity: &RegistrantIdentity) -> Vec<(String, String)> {
    vec![
        ("first_name".to_string(), identity.first_name.clone()),
        ("last_name".to_string(), identity.last_name.clone()),
        ("email".to_string(), identity.email.clone()),
        ("power_factor".to_string(), identity.power_factor.clone()),
    ]
}

pub(crate) fn submission_confirmed(markup: &str) -> bool {
    let markup = markup.to_lowercase();
    CONFIRMATION_MARKERS
        .iter()
        .any(|marker| markup.contains(marker))
}

#[async_trait]
impl Registrar for PractiscoreClient {
    async fn register(
        &self,
        record: &EventRecord,
        identity: &RegistrantIdentity,
    ) -> Result<(), RegisterError> {
        let url = self.absolute(&record.detail_url);
        tracing::info!(title = %record.title, url = %url, "Attempting registration");

        self.ensure_logged_in().await?;
        let markup = self.fetch_with_retry(&url).await?;

        let form = find_registration_form(&markup)
            .ok_or_else(|| RegisterError::FormNotFound { url: url.clone() })?;

        let submit_url = if form.action.is_empty() {
            url.clone()
        } else {
            self.absolute(&form.action)
        };

        let mut params = form.hidden_fields;
        params.extend(identity_fields(identity));

        let response = self
            .client
            .post(&submit_url)
            .form(&params)
            .send()
            .await
            .map_err(|error| {
                RegisterError::Fetch(FetchError::Network {
                    url: submit_url.clone(),
                    message: error.to_string(),
                })
            })?;
        let body = response.text().await.map_err(|error| {
            RegisterError::Fetch(FetchError::Network {
                url: submit_url.clone(),
                message: error.to_string(),
            })
        })?;

        if submission_confirmed(&body) {
            tracing::info!(title = %record.title, "Registration confirmed");
            Ok(())
        } else {
            Err(RegisterError::SubmitNotConfirmed { url })
        }
    }
}
