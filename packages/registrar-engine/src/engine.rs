//! Run-level decision policy.
//!
//! Records are processed strictly in extraction order, one fully decided
//! before the next is considered. All run state lives in an explicit
//! accumulator threaded through the call chain.

use std::collections::{HashMap, HashSet};

use scraper::Html;

use crate::classifier::{self, DetailOutcome};
use crate::config::RunConfig;
use crate::error::{ConfigError, FetchError};
use crate::extractor;
use crate::traits::{Notifier, PageFetcher, Registrar};
use crate::types::{
    ActionOutcome, EventRecord, NotifyKind, RegistrationStatus, RunReport,
};

/// Mutable state for one run: the report, the one-success latch, and the
/// per-record status cache populated by the pre-pass.
struct RunState {
    report: RunReport,
    registration_secured: bool,
    status_cache: HashMap<String, RegistrationStatus>,
}

/// One complete invocation: discovery, classification, decided actions,
/// final report. Never fails past configuration validation; fetch errors
/// degrade to a per-record `TransientError` status.
pub async fn run_once(
    config: &RunConfig,
    fetcher: &impl PageFetcher,
    registrar: &impl Registrar,
    notifier: &impl Notifier,
) -> Result<RunReport, ConfigError> {
    config.validate()?;

    let mut state = RunState {
        report: RunReport::new(),
        registration_secured: false,
        status_cache: HashMap::new(),
    };

    let records = discover_records(config, fetcher).await;
    tracing::info!(
        run_id = %state.report.run_id.0,
        count = records.len(),
        target = %config.target_match,
        "Discovered candidate events"
    );

    prescan_registrations(config, fetcher, &records, &mut state.status_cache).await;

    for record in &records {
        let status = resolve_status(config, fetcher, &state.status_cache, record).await;
        tracing::info!(title = %record.title, status = ?status, "Classified event");
        let outcome = apply_policy(config, registrar, notifier, &mut state, record, status).await;
        state.report.record(outcome);
    }

    let summary = state.report.summary();
    tracing::info!(
        run_id = %state.report.run_id.0,
        registered = summary.registered,
        notified = summary.notified,
        skipped = summary.skipped,
        "Run complete"
    );
    Ok(state.report)
}

/// Classify every discovered record without taking any action. Used by the
/// status-only CLI mode; shares the classifier with `run_once`.
pub async fn survey_statuses(
    config: &RunConfig,
    fetcher: &impl PageFetcher,
) -> Result<Vec<(EventRecord, RegistrationStatus)>, ConfigError> {
    config.validate()?;
    let records = discover_records(config, fetcher).await;
    let no_cache = HashMap::new();
    let mut statuses = Vec::with_capacity(records.len());
    for record in records {
        let status = resolve_status(config, fetcher, &no_cache, &record).await;
        statuses.push((record, status));
    }
    Ok(statuses)
}

/// Fetch the club listing and extract records matching the target keyword,
/// deduplicated by identity key, in document order.
pub async fn discover_records(
    config: &RunConfig,
    fetcher: &impl PageFetcher,
) -> Vec<EventRecord> {
    let club_url = config.club_url();
    let markup = match fetcher.fetch(&club_url, false).await {
        Ok(markup) => markup,
        Err(error) => {
            tracing::warn!(url = %club_url, error = %error, "Failed to fetch club listing");
            return Vec::new();
        }
    };

    let document = Html::parse_document(&markup);
    let target = config.target_match.to_lowercase();
    let mut seen = HashSet::new();
    extractor::extract_records(&document)
        .filter(|record| record.title.to_lowercase().contains(&target))
        .filter(|record| seen.insert(record.key()))
        .collect()
}

/// Pre-pass: classify every record with a register-capable URL and cache
/// the status by record key, so the main pass decides from the cache
/// without a second authenticated fetch. An optimization only; the main
/// pass re-fetches anything the pre-pass could not settle.
async fn prescan_registrations(
    config: &RunConfig,
    fetcher: &impl PageFetcher,
    records: &[EventRecord],
    status_cache: &mut HashMap<String, RegistrationStatus>,
) {
    let candidates = records.iter().filter(|record| {
        record.detail_url.contains("register")
            && !classifier::title_requires_payment(&record.title)
    });

    for record in candidates {
        let url = config.absolute_url(&record.detail_url);
        match fetcher.fetch(&url, true).await {
            Ok(markup) => {
                let status = classifier::classify_markup(&markup, &config.username);
                if status == RegistrationStatus::AlreadyRegistered {
                    tracing::info!(title = %record.title, "Already registered");
                }
                status_cache.insert(record.key(), status);
            }
            Err(error) => {
                tracing::debug!(
                    title = %record.title,
                    error = %error,
                    "Pre-scan fetch failed; status resolved in the main pass"
                );
            }
        }
    }

    let registered = status_cache
        .values()
        .filter(|status| **status == RegistrationStatus::AlreadyRegistered)
        .count();
    tracing::info!(
        cached = status_cache.len(),
        registered,
        "Pre-scan classified register-capable events"
    );
}

/// Resolve one record's status, reusing the pre-pass classification when
/// one was cached; only uncached records classify fresh markup.
async fn resolve_status(
    config: &RunConfig,
    fetcher: &impl PageFetcher,
    status_cache: &HashMap<String, RegistrationStatus>,
    record: &EventRecord,
) -> RegistrationStatus {
    if classifier::title_requires_payment(&record.title) {
        return RegistrationStatus::PaidMatchRequiresManualAction;
    }
    if let Some(status) = status_cache.get(&record.key()) {
        return *status;
    }
    if record.detail_url.is_empty() {
        tracing::debug!(title = %record.title, "Record has no detail URL");
        return RegistrationStatus::Unknown;
    }

    let url = config.absolute_url(&record.detail_url);
    let markup;
    let detail = match fetcher.fetch(&url, true).await {
        Ok(body) => {
            markup = body;
            DetailOutcome::Fetched(&markup)
        }
        Err(FetchError::AuthRequired { .. }) => {
            tracing::warn!(url = %url, "Login failed while checking event");
            DetailOutcome::LoginFailed
        }
        Err(error) => {
            tracing::warn!(url = %url, error = %error, "Detail fetch failed");
            DetailOutcome::Failed
        }
    };
    classifier::classify(&record.title, detail, &config.username)
}

/// Apply the per-status action policy and produce the terminal outcome.
async fn apply_policy(
    config: &RunConfig,
    registrar: &impl Registrar,
    notifier: &impl Notifier,
    state: &mut RunState,
    record: &EventRecord,
    status: RegistrationStatus,
) -> ActionOutcome {
    use RegistrationStatus::*;

    match status {
        AlreadyRegistered => {
            tracing::info!(title = %record.title, "Already registered, skipping");
            ActionOutcome::skipped(record.clone(), status)
        }
        PaidMatchRequiresManualAction => {
            tracing::info!(title = %record.title, "Paid match requires manual registration");
            notifier.notify(record, NotifyKind::PaidFound).await;
            ActionOutcome::notified(record.clone(), status)
        }
        Open if state.registration_secured => {
            // At most one registration per run; the latch is already set.
            tracing::info!(
                title = %record.title,
                "Registration already secured this run, not attempting another"
            );
            ActionOutcome::skipped(record.clone(), status)
        }
        Open => {
            tracing::info!(title = %record.title, "Registration open, attempting to register");
            match registrar.register(record, &config.identity).await {
                Ok(()) => {
                    tracing::info!(title = %record.title, "Registration successful");
                    state.registration_secured = true;
                    notifier.notify(record, NotifyKind::RegistrationSucceeded).await;
                    ActionOutcome::attempted(record.clone(), status, true)
                }
                Err(error) => {
                    tracing::warn!(title = %record.title, error = %error, "Registration attempt failed");
                    notifier.notify(record, NotifyKind::RegistrationAttempted).await;
                    ActionOutcome::attempted(record.clone(), status, false)
                }
            }
        }
        NotYetOpen => {
            tracing::info!(title = %record.title, "Registration not yet open");
            ActionOutcome::skipped(record.clone(), status)
        }
        Full => {
            tracing::info!(title = %record.title, "Match is full");
            ActionOutcome::skipped(record.clone(), status)
        }
        LoginFailed => {
            tracing::warn!(title = %record.title, "Skipping event after login failure");
            ActionOutcome::skipped(record.clone(), status)
        }
        Unknown => {
            // Never guess "open": no rule matched, so no action is taken.
            tracing::warn!(title = %record.title, "Could not determine registration status");
            ActionOutcome::skipped(record.clone(), status)
        }
        TransientError => {
            tracing::warn!(title = %record.title, "Transient fetch error, skipping this run");
            ActionOutcome::skipped(record.clone(), status)
        }
    }
}
