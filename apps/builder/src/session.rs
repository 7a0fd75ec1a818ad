//! One editing session: every synchronizer plus the change channel readers
//! subscribe to.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::{ResumeProfile, Section};
use crate::preview::{self, PreviewDocument};
use crate::store::ResumeStore;
use crate::sync::{
    ChangeNotifier, EducationSync, ExperienceSync, PersonalInfoSync, ProjectsSync, SectionError,
    SectionSync, SkillsSync, SyncErrorKind, SyncSettings, SyncStatus,
};

/// Result of the initial aggregate load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResume {
    /// Section name → percent complete, as reported by the store.
    pub progress: BTreeMap<String, f64>,
    /// Every section is already complete; open straight on the preview.
    pub preview_only: bool,
}

#[derive(Clone)]
pub struct ResumeSession {
    store: Arc<dyn ResumeStore>,
    notifier: ChangeNotifier,
    pub personal_info: PersonalInfoSync,
    pub experience: ExperienceSync,
    pub education: EducationSync,
    pub skills: SkillsSync,
    pub projects: ProjectsSync,
}

impl ResumeSession {
    pub fn new(store: Arc<dyn ResumeStore>, settings: &SyncSettings) -> Self {
        let notifier = ChangeNotifier::new();
        let ttl = settings.notice_ttl;
        Self {
            personal_info: PersonalInfoSync::new(
                Arc::clone(&store),
                settings.personal_info_delay,
                ttl,
                notifier.clone(),
            ),
            experience: SectionSync::new(
                Arc::clone(&store),
                settings.experience_delay,
                ttl,
                notifier.clone(),
            ),
            education: SectionSync::new(
                Arc::clone(&store),
                settings.education_delay,
                ttl,
                notifier.clone(),
            ),
            skills: SkillsSync::new(
                Arc::clone(&store),
                settings.skills_delay,
                ttl,
                notifier.clone(),
            ),
            projects: SectionSync::new(
                Arc::clone(&store),
                settings.projects_delay,
                ttl,
                notifier.clone(),
            ),
            store,
            notifier,
        }
    }

    /// Populates every section from the aggregate resume endpoint.
    ///
    /// On failure every section is left empty.
    pub async fn load(&self) -> Result<LoadedResume, SectionError> {
        match self.store.fetch_resume().await {
            Ok(response) => {
                let progress = response.progress.clone();
                let profile = response.into_profile();
                info!(
                    experience = profile.experience.len(),
                    education = profile.education.len(),
                    projects = profile.projects.len(),
                    skills = profile.skills.items.len(),
                    "resume loaded"
                );
                self.hydrate(profile);

                let preview_only =
                    !progress.is_empty() && progress.values().all(|percent| *percent >= 100.0);
                Ok(LoadedResume {
                    progress,
                    preview_only,
                })
            }
            Err(e) => {
                warn!(code = e.code(), "resume load failed: {}", e);
                self.hydrate(ResumeProfile::default());
                Err(SectionError::from_store(SyncErrorKind::Fetch, &e))
            }
        }
    }

    fn hydrate(&self, profile: ResumeProfile) {
        self.personal_info.hydrate(profile.personal_info);
        self.experience.hydrate(profile.experience);
        self.education.hydrate(profile.education);
        self.skills.hydrate(profile.skills);
        self.projects.hydrate(profile.projects);
    }

    /// Refreshes every section from its own endpoint. Failed sections come
    /// back empty and are listed in the error.
    pub async fn fetch_all(&self) -> Result<(), Vec<(Section, SectionError)>> {
        let (personal, experience, education, skills, projects) = tokio::join!(
            self.personal_info.fetch(),
            self.experience.fetch_all(),
            self.education.fetch_all(),
            self.skills.fetch(),
            self.projects.fetch_all(),
        );

        let failures: Vec<(Section, SectionError)> = [
            (Section::PersonalInfo, personal.err()),
            (Section::Experience, experience.err()),
            (Section::Education, education.err()),
            (Section::Skills, skills.err()),
            (Section::Projects, projects.err()),
        ]
        .into_iter()
        .filter_map(|(section, err)| err.map(|e| (section, e)))
        .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// Current state of every section, for read-only consumers.
    pub fn snapshot(&self) -> ResumeProfile {
        ResumeProfile {
            personal_info: self.personal_info.info(),
            experience: self.experience.entries(),
            education: self.education.entries(),
            skills: self.skills.skills(),
            projects: self.projects.entries(),
        }
    }

    pub fn preview(&self) -> PreviewDocument {
        preview::project(&self.snapshot())
    }

    /// Ticks whenever any section changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.notifier.version()
    }

    pub fn status(&self) -> Vec<(Section, SyncStatus)> {
        vec![
            (Section::PersonalInfo, self.personal_info.status()),
            (Section::Experience, self.experience.status()),
            (Section::Education, self.education.status()),
            (Section::Skills, self.skills.status()),
            (Section::Projects, self.projects.status()),
        ]
    }

    pub fn errors(&self) -> Vec<(Section, SectionError)> {
        self.status()
            .into_iter()
            .filter_map(|(section, status)| status.error.map(|e| (section, e)))
            .collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.status().iter().any(|(_, s)| s.unsaved)
    }

    /// Waits until no section has a write pending or in flight.
    pub async fn idle(&self) {
        tokio::join!(
            self.personal_info.idle(),
            self.experience.idle(),
            self.education.idle(),
            self.skills.idle(),
            self.projects.idle(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wire::PersonalInfoRecord;
    use crate::models::{ExperienceField, PersonalField};
    use crate::store::{CallKind, MemoryResumeStore};
    use crate::wizard::Wizard;
    use serde_json::json;
    use std::time::Duration;

    fn session(store: &MemoryResumeStore) -> ResumeSession {
        ResumeSession::new(Arc::new(store.clone()), &SyncSettings::default())
    }

    fn seeded_store() -> MemoryResumeStore {
        let store = MemoryResumeStore::new();
        store.seed_personal_info(PersonalInfoRecord {
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            ..Default::default()
        });
        store.seed(
            Section::Experience,
            json!({ "title": "Engineer", "description": ["Built engines"] }),
        );
        store.seed_skills(&["Math", "Rust"]);
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_populates_every_section() {
        let store = seeded_store();
        store.set_progress("personal_info", 100.0);
        store.set_progress("experience", 50.0);
        let session = session(&store);

        let loaded = session.load().await.unwrap();
        assert!(!loaded.preview_only);
        assert_eq!(loaded.progress["experience"], 50.0);

        let profile = session.snapshot();
        assert_eq!(profile.personal_info.full_name, "Ada Lovelace");
        assert_eq!(profile.experience[0].title, "Engineer");
        assert_eq!(profile.skills.items, vec!["Math", "Rust"]);
        assert!(!session.has_unsaved_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_progress_opens_preview_only() {
        let store = seeded_store();
        for section in ["personal_info", "experience", "education", "skills", "projects"] {
            store.set_progress(section, 100.0);
        }
        assert!(session(&store).load().await.unwrap().preview_only);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_leaves_sections_empty() {
        let store = seeded_store();
        store.fail_next(CallKind::FetchResume);
        let session = session(&store);

        let err = session.load().await.unwrap_err();
        assert_eq!(err.kind, SyncErrorKind::Fetch);
        assert_eq!(session.snapshot(), ResumeProfile::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readers_see_edits_through_snapshots() {
        let store = seeded_store();
        let session = session(&store);
        session.load().await.unwrap();
        let mut changes = session.subscribe();
        let before = session.version();

        let id = session.experience.add();
        session
            .experience
            .update_field(id, ExperienceField::Title, "Analyst")
            .unwrap();
        changes.changed().await.unwrap();
        assert!(session.version() > before);

        let wizard = Wizard::default();
        let profile = session.snapshot();
        assert_eq!(profile.experience.len(), 2);
        assert!(!wizard.is_step_complete(2, &profile));
        assert_eq!(session.preview().section(Section::Experience).unwrap().items.len(), 2);

        session.idle().await;
        assert!(!session.has_unsaved_changes());
        assert_eq!(store.records(Section::Experience).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_reports_failed_sections() {
        let store = seeded_store();
        store.fail_next(CallKind::List);
        let session = session(&store);

        let failures = session.fetch_all().await.unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].1.kind, SyncErrorKind::Fetch);
        assert_eq!(session.errors().len(), 1);
        assert_eq!(session.snapshot().personal_info.full_name, "Ada Lovelace");
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_store_fails_every_section() {
        let store = seeded_store();
        store.set_offline(true);
        let session = session(&store);

        let failures = session.fetch_all().await.unwrap_err();
        assert_eq!(failures.len(), 5);
        assert!(failures.iter().all(|(_, e)| e.kind == SyncErrorKind::Fetch));
        assert_eq!(session.snapshot(), ResumeProfile::default());

        store.set_offline(false);
        session.fetch_all().await.unwrap();
        assert_eq!(session.snapshot().skills.items, vec!["Math", "Rust"]);
        assert!(session.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sections_save_independently() {
        let store = MemoryResumeStore::new();
        let session = session(&store);

        session.personal_info.update_field(PersonalField::FullName, "Ada");
        session.skills.add_skill("Rust");
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // Personal info uses a 1 s quiet period, skills 2 s.
        assert!(store.personal_info().is_some());
        assert!(store.skills().is_none());

        session.idle().await;
        assert_eq!(store.skills().unwrap().skills, vec!["Rust"]);
    }
}
