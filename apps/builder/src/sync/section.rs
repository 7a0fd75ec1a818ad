//! Synchronizer for list sections (experience, education, projects).
//!
//! Entry lifecycle:
//!
//! ```text
//! absent -> draft (temporary id) -> persisted (remote id) -> deleting -> absent
//!                                   persisted -> edited -> persisted
//! ```
//!
//! Local state is the user-visible source of truth. Every edit lands in
//! memory synchronously and schedules a write through a debouncer keyed by
//! entry id; the write reads the entry as it is when the timer fires.

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{EditError, StoreError};
use crate::models::wire::{EducationRecord, ExperienceRecord, ProjectRecord, Record};
use crate::models::{
    EducationEntry, EducationField, EntryId, ExperienceEntry, ExperienceField, ProjectEntry,
    ProjectField, Section, UnknownField,
};
use crate::store::ResumeStore;
use crate::sync::debounce::KeyedDebouncer;
use crate::sync::status::{SectionError, StatusBoard, SyncErrorKind, SyncStatus};
use crate::sync::{BoxedTask, ChangeNotifier};

/// A list entry type managed by a `SectionSync`.
pub trait SectionEntity: Clone + Debug + Send + Sync + 'static {
    type Field: Copy + Debug + Display + FromStr<Err = UnknownField> + Send + Sync + 'static;
    type Record: Record<Entry = Self> + Serialize + DeserializeOwned + Send + 'static;

    const SECTION: Section;

    /// An entry with every field empty.
    fn blank(id: EntryId) -> Self;
    fn id(&self) -> EntryId;
    fn set_id(&mut self, id: EntryId);
    fn apply(&mut self, field: Self::Field, value: &str);

    /// Copies local-only input state onto a server echo about to replace
    /// this entry.
    fn keep_input(&self, _echo: &mut Self) {}
}

impl SectionEntity for ExperienceEntry {
    type Field = ExperienceField;
    type Record = ExperienceRecord;

    const SECTION: Section = Section::Experience;

    fn blank(id: EntryId) -> Self {
        ExperienceEntry::new(id)
    }

    fn id(&self) -> EntryId {
        self.id
    }

    fn set_id(&mut self, id: EntryId) {
        self.id = id;
    }

    fn apply(&mut self, field: ExperienceField, value: &str) {
        self.set_field(field, value);
    }
}

impl SectionEntity for EducationEntry {
    type Field = EducationField;
    type Record = EducationRecord;

    const SECTION: Section = Section::Education;

    fn blank(id: EntryId) -> Self {
        EducationEntry::new(id)
    }

    fn id(&self) -> EntryId {
        self.id
    }

    fn set_id(&mut self, id: EntryId) {
        self.id = id;
    }

    fn apply(&mut self, field: EducationField, value: &str) {
        self.set_field(field, value);
    }
}

impl SectionEntity for ProjectEntry {
    type Field = ProjectField;
    type Record = ProjectRecord;

    const SECTION: Section = Section::Projects;

    fn blank(id: EntryId) -> Self {
        ProjectEntry::new(id)
    }

    fn id(&self) -> EntryId {
        self.id
    }

    fn set_id(&mut self, id: EntryId) {
        self.id = id;
    }

    fn apply(&mut self, field: ProjectField, value: &str) {
        self.set_field(field, value);
    }

    fn keep_input(&self, echo: &mut Self) {
        if echo.technologies == self.technologies {
            echo.technologies_input = self.technologies_input.clone();
        }
    }
}

pub type ExperienceSync = SectionSync<ExperienceEntry>;
pub type EducationSync = SectionSync<EducationEntry>;
pub type ProjectsSync = SectionSync<ProjectEntry>;

struct SectionState<E> {
    entries: Vec<E>,
    /// Temporary id → remote id, recorded when a create succeeds.
    aliases: HashMap<i64, i64>,
    /// Entries with local edits not yet confirmed, with their latest revision.
    revisions: HashMap<EntryId, u64>,
    next_revision: u64,
    /// Temporary ids whose create request is in flight.
    creating: HashSet<i64>,
    edited_while_creating: HashSet<i64>,
    removed_while_creating: HashSet<i64>,
    status: StatusBoard,
}

impl<E: SectionEntity> SectionState<E> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            aliases: HashMap::new(),
            revisions: HashMap::new(),
            next_revision: 0,
            creating: HashSet::new(),
            edited_while_creating: HashSet::new(),
            removed_while_creating: HashSet::new(),
            status: StatusBoard::default(),
        }
    }

    fn resolve(&self, id: EntryId) -> EntryId {
        match id {
            EntryId::Temporary(t) => self
                .aliases
                .get(&t)
                .map(|r| EntryId::Remote(*r))
                .unwrap_or(id),
            EntryId::Remote(_) => id,
        }
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    fn find_mut(&mut self, id: EntryId) -> Option<&mut E> {
        self.entries.iter_mut().find(|e| e.id() == id)
    }

    fn mark_edited(&mut self, id: EntryId) {
        self.next_revision += 1;
        self.revisions.insert(id, self.next_revision);
    }

    /// Clears the pending edit if nothing changed since `sent`.
    /// Returns true when the written state is still the latest one.
    fn confirm(&mut self, id: EntryId, sent: Option<u64>) -> bool {
        let current = self.revisions.get(&id).copied();
        if current == sent {
            self.revisions.remove(&id);
            true
        } else {
            false
        }
    }
}

enum WritePlan<E> {
    Create { temp: i64, entry: E, sent: Option<u64> },
    Update { id: i64, entry: E, sent: Option<u64> },
}

struct Shared<E: SectionEntity> {
    state: Mutex<SectionState<E>>,
    store: Arc<dyn ResumeStore>,
    debouncer: KeyedDebouncer<EntryId>,
    notifier: ChangeNotifier,
    notice_ttl: Duration,
}

/// Owns one list section and keeps it in sync with the Resume Store.
pub struct SectionSync<E: SectionEntity> {
    shared: Arc<Shared<E>>,
}

impl<E: SectionEntity> Clone for SectionSync<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: SectionEntity> SectionSync<E> {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        delay: Duration,
        notice_ttl: Duration,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SectionState::new()),
                store,
                debouncer: KeyedDebouncer::new(delay),
                notifier,
                notice_ttl,
            }),
        }
    }

    pub fn section(&self) -> Section {
        E::SECTION
    }

    /// Appends a blank entry with a fresh temporary id. No request is sent.
    pub fn add(&self) -> EntryId {
        let id = EntryId::temporary();
        self.shared.lock().entries.push(E::blank(id));
        self.shared.notifier.bump();
        debug!("{} {}: added draft", E::SECTION, id);
        id
    }

    /// Applies an edit locally, then schedules a debounced write.
    ///
    /// Returns the id the entry is currently known by, which differs from
    /// `id` once a temporary entry has been persisted.
    pub fn update_field(
        &self,
        id: EntryId,
        field: E::Field,
        value: &str,
    ) -> Result<EntryId, EditError> {
        let current = {
            let mut state = self.shared.lock();
            let current = state.resolve(id);
            let entry = state.find_mut(current).ok_or(EditError::UnknownEntry {
                section: E::SECTION,
                id,
            })?;
            entry.apply(field, value);
            state.mark_edited(current);
            current
        };
        self.shared.notifier.bump();

        let shared = Arc::clone(&self.shared);
        self.shared.debouncer.trigger(current, shared.write(current));
        debug!("{} {}: {} edited, write scheduled", E::SECTION, current, field);
        Ok(current)
    }

    /// `update_field` with the field given by its wire name.
    pub fn update_named(&self, id: EntryId, name: &str, value: &str) -> Result<EntryId, EditError> {
        let field = name.parse::<E::Field>()?;
        self.update_field(id, field, value)
    }

    /// Removes an entry locally. Persisted entries are also deleted remotely,
    /// in the background; a failed delete does not bring the entry back.
    pub fn remove(&self, id: EntryId) -> bool {
        let (current, remote) = {
            let mut state = self.shared.lock();
            let current = state.resolve(id);
            let Some(pos) = state.position(current) else {
                return false;
            };
            state.entries.remove(pos);
            state.revisions.remove(&current);
            if let EntryId::Temporary(t) = current {
                if state.creating.contains(&t) {
                    state.removed_while_creating.insert(t);
                }
            }
            (current, current.remote())
        };

        self.shared.debouncer.cancel(&current);
        if current != id {
            self.shared.debouncer.cancel(&id);
        }
        self.shared.notifier.bump();

        match remote {
            Some(remote) => {
                let shared = Arc::clone(&self.shared);
                self.shared.debouncer.run_now(shared.delete_remote(remote));
            }
            None => debug!("{} {}: dropped unsaved draft", E::SECTION, current),
        }
        true
    }

    /// Replaces the whole collection with the store's contents.
    ///
    /// Unsaved drafts are discarded and pending writes cancelled. On failure
    /// the collection is left empty and a fetch error is recorded.
    pub async fn fetch_all(&self) -> Result<usize, SectionError> {
        self.shared.debouncer.cancel_all();
        {
            let mut state = self.shared.lock();
            state.status.set_loading(true);
            state.status.clear_error();
        }

        let result = self.shared.store.list(E::SECTION).await;

        let outcome = {
            let mut state = self.shared.lock();
            state.status.set_loading(false);
            state.revisions.clear();
            match result {
                Ok(values) => {
                    state.entries = decode_entries::<E>(values);
                    Ok(state.entries.len())
                }
                Err(e) => {
                    warn!(code = e.code(), "{}: fetch failed: {}", E::SECTION, e);
                    state.entries.clear();
                    let error = SectionError::from_store(SyncErrorKind::Fetch, &e);
                    state.status.set_error(error.clone());
                    Err(error)
                }
            }
        };
        self.shared.notifier.bump();
        outcome
    }

    /// Replaces the collection with already-loaded entries.
    pub fn hydrate(&self, entries: Vec<E>) {
        self.shared.debouncer.cancel_all();
        {
            let mut state = self.shared.lock();
            state.entries = entries;
            state.revisions.clear();
            state.status.clear_error();
        }
        self.shared.notifier.bump();
    }

    /// Fires the pending write for `id` now and waits for it.
    pub async fn save_now(&self, id: EntryId) -> bool {
        let current = self.resolve(id);
        match self.shared.debouncer.flush(&current) {
            Some(handle) => {
                let _ = handle.await;
                true
            }
            None => false,
        }
    }

    /// Waits until no write is pending or in flight.
    pub async fn idle(&self) {
        self.shared.debouncer.idle().await;
    }

    pub fn entries(&self) -> Vec<E> {
        self.shared.lock().entries.clone()
    }

    pub fn get(&self, id: EntryId) -> Option<E> {
        let state = self.shared.lock();
        let current = state.resolve(id);
        state.entries.iter().find(|e| e.id() == current).cloned()
    }

    /// The id an entry is currently known by.
    pub fn resolve(&self, id: EntryId) -> EntryId {
        self.shared.lock().resolve(id)
    }

    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries that exist remotely.
    pub fn saved_entries(&self) -> Vec<E> {
        self.shared
            .lock()
            .entries
            .iter()
            .filter(|e| e.id().is_remote())
            .cloned()
            .collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.shared.lock();
        !state.revisions.is_empty() || state.entries.iter().any(|e| e.id().is_temporary())
    }

    pub fn pending_writes(&self) -> usize {
        self.shared.debouncer.pending_count()
    }

    pub fn status(&self) -> SyncStatus {
        let unsaved = self.has_unsaved_changes();
        self.shared.lock().status.snapshot(unsaved)
    }
}

fn decode_entries<E: SectionEntity>(values: Vec<Value>) -> Vec<E> {
    values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<E::Record>(v) {
            Ok(record) => Some(record.into_entry()),
            Err(e) => {
                warn!("{}: skipping malformed record: {}", E::SECTION, e);
                None
            }
        })
        .collect()
}

fn decode_record<E: SectionEntity>(value: Value) -> Result<E::Record, StoreError> {
    Ok(serde_json::from_value(value)?)
}

impl<E: SectionEntity> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, SectionState<E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The debounced write for `key`. Boxed so it can schedule follow-ups of
    /// itself.
    fn write(self: Arc<Self>, key: EntryId) -> BoxedTask {
        Box::pin(async move {
            let plan = {
                let mut state = self.lock();
                let current = state.resolve(key);
                let Some(entry) = state.entries.iter().find(|e| e.id() == current).cloned() else {
                    debug!("{} {}: entry gone before write fired", E::SECTION, key);
                    return;
                };
                let sent = state.revisions.get(&current).copied();
                let plan = match current {
                    EntryId::Temporary(temp) => {
                        if state.creating.contains(&temp) {
                            // Picked up with the latest state once the create lands.
                            state.edited_while_creating.insert(temp);
                            return;
                        }
                        state.creating.insert(temp);
                        WritePlan::Create { temp, entry, sent }
                    }
                    EntryId::Remote(id) => WritePlan::Update { id, entry, sent },
                };
                state.status.begin_save();
                plan
            };
            self.notifier.bump();

            match plan {
                WritePlan::Create { temp, entry, sent } => self.create(temp, entry, sent).await,
                WritePlan::Update { id, entry, sent } => self.update(id, entry, sent).await,
            }
        })
    }

    async fn create(self: Arc<Self>, temp: i64, entry: E, sent: Option<u64>) {
        let body = serde_json::to_value(<E::Record as Record>::from_entry(&entry));
        let result = match body {
            Ok(body) => self
                .store
                .create(E::SECTION, body)
                .await
                .and_then(decode_record::<E>),
            Err(e) => Err(e.into()),
        };

        let temp_id = EntryId::Temporary(temp);
        let mut follow_up: Option<BoxedTask> = None;
        {
            let mut state = self.lock();
            state.status.end_save();
            state.creating.remove(&temp);
            let edited = state.edited_while_creating.remove(&temp);
            let removed = state.removed_while_creating.remove(&temp);

            match result.and_then(|record| match record.remote_id() {
                Some(id) => Ok((id, record)),
                None => Err(StoreError::Api {
                    status: 200,
                    message: "created record has no id".to_string(),
                }),
            }) {
                Ok((remote, record)) => {
                    let remote_id = EntryId::Remote(remote);
                    state.aliases.insert(temp, remote);
                    info!("{} {}: persisted as {}", E::SECTION, temp_id, remote_id);

                    let pending = state.revisions.remove(&temp_id);
                    if let Some(pos) = state.position(temp_id) {
                        if pending == sent {
                            let mut fresh = record.into_entry();
                            fresh.set_id(remote_id);
                            state.entries[pos].keep_input(&mut fresh);
                            state.entries[pos] = fresh;
                        } else {
                            state.entries[pos].set_id(remote_id);
                            if let Some(revision) = pending {
                                state.revisions.insert(remote_id, revision);
                            }
                            if edited {
                                follow_up = Some(Arc::clone(&self).write(remote_id));
                            }
                        }
                    } else if removed {
                        debug!("{} {}: removed while creating, deleting", E::SECTION, remote_id);
                        follow_up = Some(Box::pin(Arc::clone(&self).delete_remote(remote)));
                    } else if state.position(remote_id).is_some() {
                        debug!("{} {}: already loaded by a refresh", E::SECTION, remote_id);
                    } else {
                        // Discarded by a refresh that ran before the store committed it.
                        let mut fresh = record.into_entry();
                        fresh.set_id(remote_id);
                        state.entries.push(fresh);
                    }
                    self.debouncer.rekey(&temp_id, remote_id);
                    state.status.clear_error();
                }
                Err(e) => {
                    warn!(
                        code = e.code(),
                        "{} {}: auto-save (create) failed: {}",
                        E::SECTION,
                        temp_id,
                        e
                    );
                    let error = SectionError::from_store(SyncErrorKind::AutoSave, &e);
                    let generation = state.status.set_error(error);
                    self.expire_notice(generation);
                }
            }
        }
        self.notifier.bump();

        if let Some(task) = follow_up {
            self.debouncer.run_now(task);
        }
    }

    async fn update(self: Arc<Self>, id: i64, entry: E, sent: Option<u64>) {
        let body = serde_json::to_value(<E::Record as Record>::from_entry(&entry));
        let result = match body {
            Ok(body) => self
                .store
                .update(E::SECTION, id, body)
                .await
                .and_then(decode_record::<E>),
            Err(e) => Err(e.into()),
        };

        let remote_id = EntryId::Remote(id);
        {
            let mut state = self.lock();
            state.status.end_save();
            match result {
                Ok(record) => {
                    debug!("{} {}: saved", E::SECTION, remote_id);
                    if state.confirm(remote_id, sent) {
                        if let Some(pos) = state.position(remote_id) {
                            let mut fresh = record.into_entry();
                            fresh.set_id(remote_id);
                            state.entries[pos].keep_input(&mut fresh);
                            state.entries[pos] = fresh;
                        }
                    }
                    state.status.clear_error();
                }
                Err(e) => {
                    warn!(
                        code = e.code(),
                        "{} {}: auto-save failed: {}",
                        E::SECTION,
                        remote_id,
                        e
                    );
                    let error = SectionError::from_store(SyncErrorKind::AutoSave, &e);
                    let generation = state.status.set_error(error);
                    self.expire_notice(generation);
                }
            }
        }
        self.notifier.bump();
    }

    async fn delete_remote(self: Arc<Self>, id: i64) {
        info!("{} {}: deleting", E::SECTION, id);
        let result = self.store.delete(E::SECTION, id).await;
        if let Err(e) = result {
            // The entry stays removed locally.
            warn!(code = e.code(), "{} {}: delete failed: {}", E::SECTION, id, e);
            let generation = {
                let mut state = self.lock();
                state
                    .status
                    .set_error(SectionError::from_store(SyncErrorKind::Delete, &e))
            };
            self.expire_notice(generation);
            self.notifier.bump();
        }
    }

    /// Clears a transient error after the notice lifetime, unless replaced.
    fn expire_notice(self: &Arc<Self>, generation: u64) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(shared.notice_ttl).await;
            let expired = shared.lock().status.expire_error(generation);
            if expired {
                shared.notifier.bump();
            }
        });
    }
}
