use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::errors::{FieldErrors, StoreError};
use crate::models::wire::{PersonalInfoPayload, PersonalInfoRecord, ResumeResponse, SkillsRecord};
use crate::models::Section;
use crate::store::ResumeStore;

/// Kind of request, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    FetchResume,
    GetPersonalInfo,
    SavePersonalInfo,
    GetSkills,
    SaveSkills,
    List,
    Create,
    Update,
    Delete,
}

/// A request as received by the store, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FetchResume,
    GetPersonalInfo,
    SavePersonalInfo { id: Option<i64>, body: Value },
    GetSkills,
    SaveSkills { body: Value },
    List { section: Section },
    Create { section: Section, body: Value },
    Update { section: Section, id: i64, body: Value },
    Delete { section: Section, id: i64 },
}

impl StoreCall {
    pub fn kind(&self) -> CallKind {
        match self {
            StoreCall::FetchResume => CallKind::FetchResume,
            StoreCall::GetPersonalInfo => CallKind::GetPersonalInfo,
            StoreCall::SavePersonalInfo { .. } => CallKind::SavePersonalInfo,
            StoreCall::GetSkills => CallKind::GetSkills,
            StoreCall::SaveSkills { .. } => CallKind::SaveSkills,
            StoreCall::List { .. } => CallKind::List,
            StoreCall::Create { .. } => CallKind::Create,
            StoreCall::Update { .. } => CallKind::Update,
            StoreCall::Delete { .. } => CallKind::Delete,
        }
    }

    /// Whether the call writes to the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreCall::SavePersonalInfo { .. }
                | StoreCall::SaveSkills { .. }
                | StoreCall::Create { .. }
                | StoreCall::Update { .. }
                | StoreCall::Delete { .. }
        )
    }
}

#[derive(Debug, Clone)]
enum Injected {
    Unavailable(String),
    Validation(FieldErrors),
}

impl Injected {
    fn into_error(self) -> StoreError {
        match self {
            Injected::Unavailable(msg) => StoreError::Unavailable(msg),
            Injected::Validation(fields) => StoreError::Validation(fields),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    personal_info: Option<PersonalInfoRecord>,
    skills: Option<SkillsRecord>,
    collections: HashMap<Section, BTreeMap<i64, Value>>,
    progress: BTreeMap<String, f64>,
    next_id: i64,
    calls: Vec<StoreCall>,
    failures: VecDeque<(CallKind, Injected)>,
    offline: bool,
    latency: Duration,
    reply_delay: Duration,
}

/// In-memory Resume Store for tests and offline runs.
///
/// Records every request it receives, can inject failures for a given kind
/// of request and can delay responses to model requests in flight.
#[derive(Clone, Debug, Default)]
pub struct MemoryResumeStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts a persisted record into a list section and returns its id.
    pub fn seed(&self, section: Section, mut record: Value) -> i64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        record["id"] = json!(id);
        state.collections.entry(section).or_default().insert(id, record);
        id
    }

    pub fn seed_personal_info(&self, mut record: PersonalInfoRecord) {
        let mut state = self.lock();
        state.next_id += 1;
        record.id = Some(state.next_id);
        state.personal_info = Some(record);
    }

    pub fn seed_skills(&self, items: &[&str]) {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.skills = Some(SkillsRecord {
            id: Some(id),
            skills: items.iter().map(|s| s.to_string()).collect(),
        });
    }

    pub fn set_progress(&self, section: &str, percent: f64) {
        self.lock().progress.insert(section.to_string(), percent);
    }

    /// Makes the next request of `kind` fail with a generic error.
    pub fn fail_next(&self, kind: CallKind) {
        self.lock()
            .failures
            .push_back((kind, Injected::Unavailable(format!("injected {kind:?} failure"))));
    }

    /// Makes the next request of `kind` fail with a 400-style validation error.
    pub fn reject_next(&self, kind: CallKind, fields: FieldErrors) {
        self.lock().failures.push_back((kind, Injected::Validation(fields)));
    }

    /// While offline every request fails.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Delay applied to every response (requests are recorded on arrival).
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Delay between committing a write and answering it. Models a store
    /// that has saved the record while the response is still on its way.
    pub fn set_reply_delay(&self, delay: Duration) {
        self.lock().reply_delay = delay;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.lock().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn records(&self, section: Section) -> Vec<Value> {
        self.lock()
            .collections
            .get(&section)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn personal_info(&self) -> Option<PersonalInfoRecord> {
        self.lock().personal_info.clone()
    }

    pub fn skills(&self) -> Option<SkillsRecord> {
        self.lock().skills.clone()
    }

    /// Records the call, then waits out the latency and applies any failure.
    async fn begin(&self, call: StoreCall) -> Result<(), StoreError> {
        let kind = call.kind();
        let (latency, failure) = {
            let mut state = self.lock();
            state.calls.push(call);
            let failure = if state.offline {
                Some(Injected::Unavailable("store offline".to_string()))
            } else {
                state
                    .failures
                    .iter()
                    .position(|(k, _)| *k == kind)
                    .and_then(|i| state.failures.remove(i))
                    .map(|(_, f)| f)
            };
            (state.latency, failure)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(f) => Err(f.into_error()),
            None => Ok(()),
        }
    }

    async fn reply<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        let delay = self.lock().reply_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    fn commit_personal_info(&self, body: Value) -> Result<PersonalInfoRecord, StoreError> {
        let mut state = self.lock();
        let mut merged = state
            .personal_info
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?
            .unwrap_or_else(|| json!({}));
        if let (Some(target), Value::Object(fields)) = (merged.as_object_mut(), body) {
            target.extend(fields);
        }
        let record_id = match state.personal_info.as_ref().and_then(|p| p.id) {
            Some(existing) => existing,
            None => {
                state.next_id += 1;
                state.next_id
            }
        };
        merged["id"] = json!(record_id);
        let record: PersonalInfoRecord = serde_json::from_value(merged)?;
        state.personal_info = Some(record.clone());
        Ok(record)
    }

    fn commit_skills(&self, record: &SkillsRecord) -> SkillsRecord {
        let mut state = self.lock();
        let id = match state.skills.as_ref().and_then(|s| s.id) {
            Some(existing) => existing,
            None => {
                state.next_id += 1;
                state.next_id
            }
        };
        let saved = SkillsRecord {
            id: Some(id),
            skills: record.skills.clone(),
        };
        state.skills = Some(saved.clone());
        saved
    }

    fn commit_create(&self, section: Section, mut record: Value) -> Value {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        record["id"] = json!(id);
        state
            .collections
            .entry(section)
            .or_default()
            .insert(id, record.clone());
        record
    }

    fn commit_update(
        &self,
        section: Section,
        id: i64,
        mut record: Value,
    ) -> Result<Value, StoreError> {
        let mut state = self.lock();
        let slot = state
            .collections
            .get_mut(&section)
            .and_then(|c| c.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound(format!("/{}/{}/", section.endpoint(), id)))?;
        record["id"] = json!(id);
        *slot = record.clone();
        Ok(record)
    }

    fn commit_delete(&self, section: Section, id: i64) -> Result<(), StoreError> {
        self.lock()
            .collections
            .get_mut(&section)
            .and_then(|c| c.remove(&id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("/{}/{}/", section.endpoint(), id)))
    }
}

fn decode_section<T: DeserializeOwned>(
    state: &MemoryState,
    section: Section,
) -> Result<Vec<T>, StoreError> {
    state
        .collections
        .get(&section)
        .map(|c| c.values().cloned().collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn fetch_resume(&self) -> Result<ResumeResponse, StoreError> {
        self.begin(StoreCall::FetchResume).await?;
        let state = self.lock();
        Ok(ResumeResponse {
            personal_info: state.personal_info.clone(),
            experiences: decode_section(&state, Section::Experience)?,
            education: decode_section(&state, Section::Education)?,
            skills: state.skills.clone().into_iter().collect(),
            projects: decode_section(&state, Section::Projects)?,
            progress: state.progress.clone(),
        })
    }

    async fn get_personal_info(&self) -> Result<Option<PersonalInfoRecord>, StoreError> {
        self.begin(StoreCall::GetPersonalInfo).await?;
        self.lock()
            .personal_info
            .clone()
            .map(Some)
            .ok_or_else(|| StoreError::NotFound("/personalInfo/".to_string()))
    }

    async fn save_personal_info(
        &self,
        id: Option<i64>,
        payload: &PersonalInfoPayload,
    ) -> Result<PersonalInfoRecord, StoreError> {
        let body = serde_json::to_value(payload)?;
        self.begin(StoreCall::SavePersonalInfo { id, body: body.clone() }).await?;
        let result = self.commit_personal_info(body);
        self.reply(result).await
    }

    async fn get_skills(&self) -> Result<Option<SkillsRecord>, StoreError> {
        self.begin(StoreCall::GetSkills).await?;
        self.lock()
            .skills
            .clone()
            .map(Some)
            .ok_or_else(|| StoreError::NotFound("/skills/".to_string()))
    }

    async fn save_skills(&self, record: &SkillsRecord) -> Result<SkillsRecord, StoreError> {
        let body = serde_json::to_value(record)?;
        self.begin(StoreCall::SaveSkills { body }).await?;
        let saved = self.commit_skills(record);
        self.reply(Ok(saved)).await
    }

    async fn list(&self, section: Section) -> Result<Vec<Value>, StoreError> {
        self.begin(StoreCall::List { section }).await?;
        Ok(self.records(section))
    }

    async fn create(&self, section: Section, body: Value) -> Result<Value, StoreError> {
        self.begin(StoreCall::Create {
            section,
            body: body.clone(),
        })
        .await?;
        let record = self.commit_create(section, body);
        self.reply(Ok(record)).await
    }

    async fn update(&self, section: Section, id: i64, body: Value) -> Result<Value, StoreError> {
        self.begin(StoreCall::Update {
            section,
            id,
            body: body.clone(),
        })
        .await?;
        let result = self.commit_update(section, id, body);
        self.reply(result).await
    }

    async fn delete(&self, section: Section, id: i64) -> Result<(), StoreError> {
        self.begin(StoreCall::Delete { section, id }).await?;
        let result = self.commit_delete(section, id);
        self.reply(result).await
    }
}
