//! Registration status classification.
//!
//! All of the control flow here is heuristic string matching, so the rules
//! live in one ordered table: first match wins, later rules are never
//! reached once an earlier one fires. Payment and already-registered
//! signals are checked before weaker textual signals of openness.

use crate::types::RegistrationStatus;

/// Title keywords marking a paid match. Checked before any detail fetch;
/// a hit short-circuits the whole classification.
pub const PAID_TITLE_KEYWORDS: &[&str] = &[
    "classifier",
    "classifiers",
    "uspsa classifier",
    "level ii",
    "level 2",
    "$",
    "fee",
    "cost",
    "sanctioned",
];

const ALREADY_REGISTERED_MARKERS: &[&str] = &[
    "already registered",
    "you are registered",
    "unregister",
    "withdraw",
    "cancel registration",
];

const PAID_PAGE_MARKERS: &[&str] = &[
    "payment",
    "credit card",
    "paypal",
    "stripe",
    "fee:",
    "cost:",
    "$",
];

/// What the engine managed to retrieve for an event's detail page.
#[derive(Debug, Clone, Copy)]
pub enum DetailOutcome<'a> {
    Fetched(&'a str),
    /// Authentication against the detail page failed.
    LoginFailed,
    /// Fetch failed after the fetcher's retry policy was exhausted.
    Failed,
}

enum Markers {
    /// Any listed marker present in the markup.
    Any(&'static [&'static str]),
    /// Every listed marker present in the markup.
    All(&'static [&'static str]),
    /// Any listed marker, or the authenticated username verbatim.
    /// The username check is a roster heuristic; short usernames can
    /// false-positive on unrelated page text.
    AnyOrUsername(&'static [&'static str]),
}

struct DetailRule {
    status: RegistrationStatus,
    markers: Markers,
}

impl DetailRule {
    fn matches(&self, markup: &str, username: &str) -> bool {
        match self.markers {
            Markers::Any(words) => words.iter().any(|w| markup.contains(w)),
            Markers::All(words) => words.iter().all(|w| markup.contains(w)),
            Markers::AnyOrUsername(words) => {
                words.iter().any(|w| markup.contains(w))
                    || (!username.is_empty() && markup.contains(username))
            }
        }
    }
}

/// Detail-page rules in priority order.
const DETAIL_RULES: &[DetailRule] = &[
    DetailRule {
        status: RegistrationStatus::AlreadyRegistered,
        markers: Markers::AnyOrUsername(ALREADY_REGISTERED_MARKERS),
    },
    DetailRule {
        status: RegistrationStatus::PaidMatchRequiresManualAction,
        markers: Markers::Any(PAID_PAGE_MARKERS),
    },
    DetailRule {
        status: RegistrationStatus::NotYetOpen,
        markers: Markers::Any(&["registration not open"]),
    },
    DetailRule {
        status: RegistrationStatus::Full,
        markers: Markers::Any(&["full", "roster full"]),
    },
    DetailRule {
        status: RegistrationStatus::Open,
        markers: Markers::All(&["register", "button"]),
    },
];

/// True when the title alone marks the match as paid, making a detail
/// fetch unnecessary.
pub fn title_requires_payment(title: &str) -> bool {
    let title = title.to_lowercase();
    PAID_TITLE_KEYWORDS
        .iter()
        .any(|keyword| title.contains(keyword))
}

/// Classify one record. Pure function of its inputs: identical inputs
/// always yield the identical status.
pub fn classify(title: &str, detail: DetailOutcome<'_>, username: &str) -> RegistrationStatus {
    if title_requires_payment(title) {
        return RegistrationStatus::PaidMatchRequiresManualAction;
    }
    match detail {
        DetailOutcome::LoginFailed => RegistrationStatus::LoginFailed,
        DetailOutcome::Failed => RegistrationStatus::TransientError,
        DetailOutcome::Fetched(markup) => classify_markup(markup, username),
    }
}

/// Walk the detail rule table against lower-cased markup.
pub fn classify_markup(markup: &str, username: &str) -> RegistrationStatus {
    let markup = markup.to_lowercase();
    let username = username.trim().to_lowercase();
    for rule in DETAIL_RULES {
        if rule.matches(&markup, &username) {
            return rule.status;
        }
    }
    RegistrationStatus::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use RegistrationStatus::*;

    const USER: &str = "shooter42";

    #[test]
    fn paid_title_dominates_detail_content() {
        // Even an obviously open detail page loses to a paid title.
        let status = classify(
            "USPSA Level II Classifier Match",
            DetailOutcome::Fetched("<button>Register</button>"),
            USER,
        );
        assert_eq!(status, PaidMatchRequiresManualAction);
    }

    #[test]
    fn paid_title_needs_no_detail_fetch() {
        let status = classify(
            "NSPS Run & Gun - with USPSA Classifiers 07/21/25",
            DetailOutcome::Failed,
            USER,
        );
        assert_eq!(status, PaidMatchRequiresManualAction);
    }

    #[test]
    fn already_registered_beats_open_markers() {
        let markup = "you are registered <button>Register</button>";
        assert_eq!(classify_markup(markup, USER), AlreadyRegistered);
    }

    #[test]
    fn username_on_roster_means_already_registered() {
        let markup = "Roster: Shooter42, J. Doe <button>Register</button>";
        assert_eq!(classify_markup(markup, USER), AlreadyRegistered);
        assert_eq!(classify_markup("nothing relevant", USER), Unknown);
    }

    #[test]
    fn empty_username_never_matches_roster() {
        assert_eq!(
            classify_markup("<button>Register</button>", ""),
            Open
        );
    }

    #[test]
    fn paid_page_markers_beat_open_markers() {
        let markup = "Entry fee: $25 via PayPal <button>Register</button>";
        assert_eq!(classify_markup(markup, USER), PaidMatchRequiresManualAction);
    }

    #[test]
    fn not_open_marker_beats_full_marker() {
        let markup = "registration not open; roster full";
        assert_eq!(classify_markup(markup, USER), NotYetOpen);
    }

    #[test]
    fn roster_full_scenario() {
        assert_eq!(classify_markup("roster full", USER), Full);
    }

    #[test]
    fn open_requires_both_register_and_button() {
        assert_eq!(
            classify_markup("<button>Register</button> for this event", USER),
            Open
        );
        assert_eq!(classify_markup("register here soon", USER), Unknown);
    }

    #[test]
    fn open_scenario_from_spec_markup() {
        let status = classify(
            "NSPS Run & Gun 07/28/25",
            DetailOutcome::Fetched("<div><button class=\"btn\">Register</button></div>"),
            USER,
        );
        assert_eq!(status, Open);
    }

    #[test]
    fn unmatched_markup_is_unknown_not_an_error() {
        assert_eq!(classify_markup("nothing to see here", USER), Unknown);
    }

    #[test]
    fn login_failure_and_fetch_failure_are_distinct() {
        assert_eq!(
            classify("NSPS Run & Gun", DetailOutcome::LoginFailed, USER),
            LoginFailed
        );
        assert_eq!(
            classify("NSPS Run & Gun", DetailOutcome::Failed, USER),
            TransientError
        );
    }

    #[test]
    fn classification_is_idempotent() {
        let markup = "Entry fee: $25 <button>Register</button>";
        let first = classify("NSPS Run & Gun", DetailOutcome::Fetched(markup), USER);
        let second = classify("NSPS Run & Gun", DetailOutcome::Fetched(markup), USER);
        assert_eq!(first, second);
    }
}
