//! Synchronizers for the per-user singleton records: personal info and skills.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{EditError, FieldErrors, StoreError};
use crate::models::wire::{PersonalInfoPayload, SkillsRecord};
use crate::models::{PersonalField, PersonalInfo, Section, Skills};
use crate::store::ResumeStore;
use crate::sync::debounce::KeyedDebouncer;
use crate::sync::status::{SectionError, StatusBoard, SyncErrorKind, SyncStatus};
use crate::sync::{BoxedTask, ChangeNotifier};

/// A record that exists at most once per user.
#[async_trait]
trait Singleton: Clone + Default + Send + Sync + 'static {
    const SECTION: Section;

    /// `Ok(None)` when the store has no record yet.
    async fn load(store: &dyn ResumeStore) -> Result<Option<Self>, StoreError>;

    /// `Ok(None)` when there is nothing worth sending.
    async fn save(&self, store: &dyn ResumeStore) -> Result<Option<Self>, StoreError>;

    /// Folds a save response into local state. `latest` is false when the
    /// user edited again while the write was in flight.
    fn absorb(&mut self, saved: Self, latest: bool);
}

#[async_trait]
impl Singleton for PersonalInfo {
    const SECTION: Section = Section::PersonalInfo;

    async fn load(store: &dyn ResumeStore) -> Result<Option<Self>, StoreError> {
        Ok(store.get_personal_info().await?.map(PersonalInfo::from))
    }

    async fn save(&self, store: &dyn ResumeStore) -> Result<Option<Self>, StoreError> {
        let payload = PersonalInfoPayload::from_info(self);
        if payload.is_empty() {
            debug!("personal_info: nothing to save");
            return Ok(None);
        }
        let record = store.save_personal_info(self.id, &payload).await?;
        Ok(Some(record.into()))
    }

    fn absorb(&mut self, saved: Self, _latest: bool) {
        // Blank fields are never sent, so the echo may hold stale values for
        // them. Only the id is taken.
        if saved.id.is_some() {
            self.id = saved.id;
        }
    }
}

#[async_trait]
impl Singleton for Skills {
    const SECTION: Section = Section::Skills;

    async fn load(store: &dyn ResumeStore) -> Result<Option<Self>, StoreError> {
        Ok(store.get_skills().await?.map(Skills::from))
    }

    async fn save(&self, store: &dyn ResumeStore) -> Result<Option<Self>, StoreError> {
        let record = store.save_skills(&SkillsRecord::from(self)).await?;
        Ok(Some(record.into()))
    }

    fn absorb(&mut self, saved: Self, latest: bool) {
        if saved.id.is_some() {
            self.id = saved.id;
        }
        if latest && saved.items != self.items {
            self.items = saved.items;
            self.input = None;
        }
    }
}

struct SingletonState<D> {
    data: D,
    revision: u64,
    /// Revision of the last local edit not yet confirmed by the store.
    pending: Option<u64>,
    /// A save is in flight. Writes firing meanwhile only set `dirty`.
    saving: bool,
    dirty: bool,
    status: StatusBoard,
}

struct Shared<D> {
    state: Mutex<SingletonState<D>>,
    store: Arc<dyn ResumeStore>,
    debouncer: KeyedDebouncer<Section>,
    notifier: ChangeNotifier,
    notice_ttl: Duration,
}

/// Optimistic state plus a single debounced writer for one singleton record.
struct SingletonSync<D: Singleton> {
    shared: Arc<Shared<D>>,
}

impl<D: Singleton> Clone for SingletonSync<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: Singleton> SingletonSync<D> {
    fn new(
        store: Arc<dyn ResumeStore>,
        delay: Duration,
        notice_ttl: Duration,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SingletonState {
                    data: D::default(),
                    revision: 0,
                    pending: None,
                    saving: false,
                    dirty: false,
                    status: StatusBoard::default(),
                }),
                store,
                debouncer: KeyedDebouncer::new(delay),
                notifier,
                notice_ttl,
            }),
        }
    }

    fn data(&self) -> D {
        self.shared.lock().data.clone()
    }

    /// Applies `edit` locally and schedules a write. Returns false, with no
    /// write scheduled, when `edit` reports that nothing changed.
    fn edit(&self, edit: impl FnOnce(&mut D) -> bool) -> bool {
        {
            let mut state = self.shared.lock();
            if !edit(&mut state.data) {
                return false;
            }
            state.revision += 1;
            state.pending = Some(state.revision);
        }
        self.shared.notifier.bump();

        let shared = Arc::clone(&self.shared);
        self.shared.debouncer.trigger(D::SECTION, shared.write());
        true
    }

    async fn fetch(&self) -> Result<(), SectionError> {
        self.shared.debouncer.cancel_all();
        {
            let mut state = self.shared.lock();
            state.status.set_loading(true);
            state.status.clear_error();
        }

        let result = D::load(self.shared.store.as_ref()).await;

        let outcome = {
            let mut state = self.shared.lock();
            state.status.set_loading(false);
            state.pending = None;
            match result {
                Ok(data) => {
                    state.data = data.unwrap_or_default();
                    Ok(())
                }
                Err(e) if e.is_not_found() => {
                    debug!("{}: no record yet", D::SECTION);
                    state.data = D::default();
                    Ok(())
                }
                Err(e) => {
                    warn!(code = e.code(), "{}: fetch failed: {}", D::SECTION, e);
                    state.data = D::default();
                    let error = SectionError::from_store(SyncErrorKind::Fetch, &e);
                    state.status.set_error(error.clone());
                    Err(error)
                }
            }
        };
        self.shared.notifier.bump();
        outcome
    }

    fn hydrate(&self, data: D) {
        self.shared.debouncer.cancel_all();
        {
            let mut state = self.shared.lock();
            state.data = data;
            state.pending = None;
            state.status.clear_error();
        }
        self.shared.notifier.bump();
    }

    async fn save_now(&self) -> bool {
        match self.shared.debouncer.flush(&D::SECTION) {
            Some(handle) => {
                let _ = handle.await;
                true
            }
            None => false,
        }
    }

    async fn idle(&self) {
        self.shared.debouncer.idle().await;
    }

    fn has_unsaved_changes(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    fn status(&self) -> SyncStatus {
        let state = self.shared.lock();
        state.status.snapshot(state.pending.is_some())
    }
}

impl<D: Singleton> Shared<D> {
    fn lock(&self) -> MutexGuard<'_, SingletonState<D>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The debounced write. At most one save is in flight; a write that fires
    /// meanwhile is folded into one follow-up carrying the latest state.
    fn write(self: Arc<Self>) -> BoxedTask {
        Box::pin(async move {
            let (data, sent) = {
                let mut state = self.lock();
                if state.saving {
                    debug!("{}: save in flight, queueing follow-up", D::SECTION);
                    state.dirty = true;
                    return;
                }
                state.saving = true;
                state.status.begin_save();
                (state.data.clone(), state.pending)
            };
            self.notifier.bump();

            let result = data.save(self.store.as_ref()).await;
            self.finish(result, sent);
        })
    }

    fn finish(self: Arc<Self>, result: Result<Option<D>, StoreError>, sent: Option<u64>) {
        let follow_up = {
            let mut state = self.lock();
            state.status.end_save();
            state.saving = false;
            let dirty = std::mem::take(&mut state.dirty);
            match result {
                Ok(Some(saved)) => {
                    let latest = state.pending == sent;
                    if latest {
                        state.pending = None;
                    }
                    state.data.absorb(saved, latest);
                    state.status.clear_error();
                    debug!("{}: saved", D::SECTION);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(code = e.code(), "{}: auto-save failed: {}", D::SECTION, e);
                    let error = SectionError::from_store(SyncErrorKind::AutoSave, &e);
                    let generation = state.status.set_error(error);
                    let shared = Arc::clone(&self);
                    tokio::spawn(async move {
                        tokio::time::sleep(shared.notice_ttl).await;
                        if shared.lock().status.expire_error(generation) {
                            shared.notifier.bump();
                        }
                    });
                }
            }
            dirty && state.pending.is_some()
        };
        self.notifier.bump();

        if follow_up {
            let task = Arc::clone(&self).write();
            self.debouncer.run_now(task);
        }
    }
}

/// Personal details, saved with `POST /personalInfo/` until the record
/// exists and `PUT /personalInfo/` afterwards.
#[derive(Clone)]
pub struct PersonalInfoSync {
    inner: SingletonSync<PersonalInfo>,
}

impl PersonalInfoSync {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        delay: Duration,
        notice_ttl: Duration,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            inner: SingletonSync::new(store, delay, notice_ttl, notifier),
        }
    }

    pub fn info(&self) -> PersonalInfo {
        self.inner.data()
    }

    pub fn update_field(&self, field: PersonalField, value: &str) {
        self.inner.edit(|info| {
            info.set_field(field, value);
            true
        });
    }

    pub fn update_named(&self, name: &str, value: &str) -> Result<(), EditError> {
        self.update_field(name.parse()?, value);
        Ok(())
    }

    /// Field problems to display next to the form. Saving is never blocked
    /// on these.
    pub fn validate(&self) -> FieldErrors {
        validate_personal_info(&self.info())
    }

    pub async fn fetch(&self) -> Result<(), SectionError> {
        self.inner.fetch().await
    }

    pub(crate) fn hydrate(&self, info: PersonalInfo) {
        self.inner.hydrate(info);
    }

    pub async fn save_now(&self) -> bool {
        self.inner.save_now().await
    }

    pub async fn idle(&self) {
        self.inner.idle().await;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.has_unsaved_changes()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status()
    }
}

pub fn validate_personal_info(info: &PersonalInfo) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let mut require = |field: PersonalField, message: &str| {
        if info.field(field).trim().is_empty() {
            errors.insert(field.to_string(), vec![message.to_string()]);
        }
    };
    require(PersonalField::FullName, "Full name is required");
    require(PersonalField::Email, "Email is required");
    require(PersonalField::Phone, "Phone number is required");
    require(PersonalField::Location, "Location is required");
    require(PersonalField::ProfessionalTitle, "Professional title is required");

    let email = info.email.trim();
    if !email.is_empty() && !looks_like_email(email) {
        errors.insert(
            PersonalField::Email.to_string(),
            vec!["Please enter a valid email address".to_string()],
        );
    }
    errors
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// The skills list, saved as one `PUT /skills/` record.
#[derive(Clone)]
pub struct SkillsSync {
    inner: SingletonSync<Skills>,
}

impl SkillsSync {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        delay: Duration,
        notice_ttl: Duration,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            inner: SingletonSync::new(store, delay, notice_ttl, notifier),
        }
    }

    pub fn skills(&self) -> Skills {
        self.inner.data()
    }

    pub fn items(&self) -> Vec<String> {
        self.inner.data().items
    }

    /// Replaces the list from comma-delimited text. The text is kept as
    /// typed for `Skills::to_text`.
    pub fn set_text(&self, text: &str) {
        let typed = Skills::from_text(text);
        self.inner.edit(|skills| {
            skills.items = typed.items;
            skills.input = typed.input;
            true
        });
    }

    /// Appends a skill. Blank and duplicate skills are ignored.
    pub fn add_skill(&self, skill: &str) -> bool {
        let skill = skill.trim().to_string();
        if skill.is_empty() {
            return false;
        }
        self.inner.edit(|skills| {
            if skills.items.contains(&skill) {
                return false;
            }
            skills.items.push(skill);
            skills.input = None;
            true
        })
    }

    pub fn remove_skill(&self, skill: &str) -> bool {
        let skill = skill.trim();
        self.inner.edit(|skills| {
            let before = skills.items.len();
            skills.items.retain(|s| s != skill);
            if skills.items.len() == before {
                return false;
            }
            skills.input = None;
            true
        })
    }

    pub async fn fetch(&self) -> Result<(), SectionError> {
        self.inner.fetch().await
    }

    pub(crate) fn hydrate(&self, skills: Skills) {
        self.inner.hydrate(skills);
    }

    pub async fn save_now(&self) -> bool {
        self.inner.save_now().await
    }

    pub async fn idle(&self) {
        self.inner.idle().await;
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.has_unsaved_changes()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status()
    }
}
