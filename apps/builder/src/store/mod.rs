//! Resume Store: the remote persistence API, seen as a black box.
//!
//! Synchronizers only talk to the store through `ResumeStore`, carried as an
//! `Arc<dyn ResumeStore>` so the HTTP client can be swapped for the in-memory
//! store in tests or offline runs.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::models::wire::{PersonalInfoPayload, PersonalInfoRecord, ResumeResponse, SkillsRecord};
use crate::models::Section;

pub mod http;
pub mod memory;

pub use http::HttpResumeStore;
pub use memory::{CallKind, MemoryResumeStore, StoreCall};

impl Section {
    /// Path segment of the section's endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Section::PersonalInfo => "personalInfo",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Skills => "skills",
            Section::Projects => "projects",
        }
    }
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// `GET /resume/`: every section plus server-side progress.
    async fn fetch_resume(&self) -> Result<ResumeResponse, StoreError>;

    /// `GET /personalInfo/`. `Ok(None)` when the server answers with no body.
    async fn get_personal_info(&self) -> Result<Option<PersonalInfoRecord>, StoreError>;

    /// `POST /personalInfo/` when `id` is unknown, `PUT /personalInfo/` otherwise.
    async fn save_personal_info(
        &self,
        id: Option<i64>,
        payload: &PersonalInfoPayload,
    ) -> Result<PersonalInfoRecord, StoreError>;

    async fn get_skills(&self) -> Result<Option<SkillsRecord>, StoreError>;

    /// `PUT /skills/`. The skills record is a per-user singleton.
    async fn save_skills(&self, record: &SkillsRecord) -> Result<SkillsRecord, StoreError>;

    /// `GET /{section}/` for list sections; pagination is already unwrapped.
    async fn list(&self, section: Section) -> Result<Vec<Value>, StoreError>;

    async fn create(&self, section: Section, body: Value) -> Result<Value, StoreError>;

    async fn update(&self, section: Section, id: i64, body: Value) -> Result<Value, StoreError>;

    async fn delete(&self, section: Section, id: i64) -> Result<(), StoreError>;
}
