use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// One discovered candidate event from the club listing page.
///
/// Immutable once created; title and detail URL together identify the
/// record for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub detail_url: String,
}

impl EventRecord {
    pub fn new(title: impl Into<String>, detail_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail_url: detail_url.into(),
        }
    }

    /// Identity key for the run: title and detail URL together.
    pub fn key(&self) -> String {
        format!("{}|{}", self.title, self.detail_url)
    }
}

/// Registration status of one event, resolved once per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    AlreadyRegistered,
    PaidMatchRequiresManualAction,
    Open,
    NotYetOpen,
    Full,
    LoginFailed,
    Unknown,
    TransientError,
}

/// What the engine did with a record after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    Skipped,
    Notified,
    RegistrationAttempted,
}

/// Kind of message routed to the notification side-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    PaidFound,
    RegistrationAttempted,
    RegistrationSucceeded,
}

/// Terminal outcome for one processed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub record: EventRecord,
    pub status: RegistrationStatus,
    pub action: RecordAction,
    /// `Some` only when a registration was actually attempted.
    pub registration_succeeded: Option<bool>,
}

impl ActionOutcome {
    pub fn skipped(record: EventRecord, status: RegistrationStatus) -> Self {
        Self {
            record,
            status,
            action: RecordAction::Skipped,
            registration_succeeded: None,
        }
    }

    pub fn notified(record: EventRecord, status: RegistrationStatus) -> Self {
        Self {
            record,
            status,
            action: RecordAction::Notified,
            registration_succeeded: None,
        }
    }

    pub fn attempted(record: EventRecord, status: RegistrationStatus, succeeded: bool) -> Self {
        Self {
            record,
            status,
            action: RecordAction::RegistrationAttempted,
            registration_succeeded: Some(succeeded),
        }
    }
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub registered: usize,
    pub notified: usize,
    pub skipped: usize,
}

/// Ordered outcomes for a single invocation of the engine.
///
/// Pure accumulator with no external side effects. The caller owns
/// persistence across runs; `registered_titles` feeds its cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    outcomes: Vec<ActionOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ActionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ActionOutcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in &self.outcomes {
            match outcome.action {
                RecordAction::Skipped => summary.skipped += 1,
                RecordAction::Notified => summary.notified += 1,
                RecordAction::RegistrationAttempted => {
                    if outcome.registration_succeeded == Some(true) {
                        summary.registered += 1;
                    }
                }
            }
        }
        summary
    }

    /// Titles the user is known to be registered for after this run,
    /// whether found on a roster or registered just now.
    pub fn registered_titles(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| {
                o.status == RegistrationStatus::AlreadyRegistered
                    || o.registration_succeeded == Some(true)
            })
            .map(|o| o.record.title.as_str())
            .collect()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_by_action() {
        let mut report = RunReport::new();
        report.record(ActionOutcome::skipped(
            EventRecord::new("a", "/a"),
            RegistrationStatus::Full,
        ));
        report.record(ActionOutcome::notified(
            EventRecord::new("b", "/b"),
            RegistrationStatus::PaidMatchRequiresManualAction,
        ));
        report.record(ActionOutcome::attempted(
            EventRecord::new("c", "/c"),
            RegistrationStatus::Open,
            true,
        ));
        report.record(ActionOutcome::attempted(
            EventRecord::new("d", "/d"),
            RegistrationStatus::Open,
            false,
        ));

        let summary = report.summary();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.notified, 1);
        assert_eq!(summary.registered, 1);
    }

    #[test]
    fn registered_titles_includes_roster_and_new_registrations() {
        let mut report = RunReport::new();
        report.record(ActionOutcome::skipped(
            EventRecord::new("on roster", "/a"),
            RegistrationStatus::AlreadyRegistered,
        ));
        report.record(ActionOutcome::attempted(
            EventRecord::new("just registered", "/b"),
            RegistrationStatus::Open,
            true,
        ));
        report.record(ActionOutcome::attempted(
            EventRecord::new("failed", "/c"),
            RegistrationStatus::Open,
            false,
        ));

        assert_eq!(
            report.registered_titles(),
            vec!["on roster", "just registered"]
        );
    }
}
