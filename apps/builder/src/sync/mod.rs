//! Optimistic local state with debounced writes to the Resume Store.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

pub mod debounce;
pub mod section;
pub mod singleton;
pub mod status;

pub use debounce::KeyedDebouncer;
pub use section::{EducationSync, ExperienceSync, ProjectsSync, SectionEntity, SectionSync};
pub use singleton::{PersonalInfoSync, SkillsSync};
pub use status::{SaveIndicator, SectionError, SyncErrorKind, SyncStatus};

/// A write handed to the debouncer. Boxed so a write can schedule a
/// follow-up of itself.
pub(crate) type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Quiet periods and notice lifetime for every synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub personal_info_delay: Duration,
    pub experience_delay: Duration,
    pub education_delay: Duration,
    pub projects_delay: Duration,
    pub skills_delay: Duration,
    /// How long a transient auto-save/delete error stays visible.
    pub notice_ttl: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            personal_info_delay: Duration::from_millis(1000),
            experience_delay: Duration::from_millis(1000),
            education_delay: Duration::from_millis(2000),
            projects_delay: Duration::from_millis(1000),
            skills_delay: Duration::from_millis(2000),
            notice_ttl: Duration::from_millis(3000),
        }
    }
}

impl SyncSettings {
    /// Same quiet period for every section.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            personal_info_delay: delay,
            experience_delay: delay,
            education_delay: delay,
            projects_delay: delay,
            skills_delay: delay,
            ..Self::default()
        }
    }
}

/// Broadcasts "something changed" to readers (wizard, preview).
///
/// Carries a version counter only; readers take a fresh snapshot when it moves.
#[derive(Clone, Debug)]
pub struct ChangeNotifier {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.tx.send_modify(|v| *v += 1);
    }

    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notifier_wakes_subscribers() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.bump();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
        assert_eq!(notifier.version(), 1);
    }

    #[test]
    fn test_uniform_settings_keep_notice_ttl() {
        let settings = SyncSettings::uniform(Duration::from_millis(50));
        assert_eq!(settings.skills_delay, Duration::from_millis(50));
        assert_eq!(settings.notice_ttl, SyncSettings::default().notice_ttl);
    }
}
