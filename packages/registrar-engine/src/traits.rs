use async_trait::async_trait;

use crate::config::RegistrantIdentity;
use crate::error::{FetchError, RegisterError};
use crate::types::{EventRecord, NotifyKind};

/// Renders a URL (logging in first when required) and returns its markup.
///
/// Anti-bot retries and session state live behind this trait; the engine
/// only sees the terminal result.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, requires_auth: bool) -> Result<String, FetchError>;
}

/// Submits the registration form for one event.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// `Ok(())` means the site confirmed the submission.
    async fn register(
        &self,
        record: &EventRecord,
        identity: &RegistrantIdentity,
    ) -> Result<(), RegisterError>;
}

/// Best-effort notification side-channel. Implementations must swallow
/// delivery failures; a notification never fails the run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, record: &EventRecord, kind: NotifyKind);
}
