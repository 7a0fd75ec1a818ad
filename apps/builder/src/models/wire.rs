//! JSON shapes exchanged with the Resume Store.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::ids::EntryId;
use crate::models::resume::{
    EducationEntry, ExperienceEntry, PersonalInfo, ProjectEntry, ResumeProfile, Skills,
};
use crate::models::text::{deserialize_delimited, serialize_delimited, BulletList};

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A list endpoint answers either with a bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListResponse<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Paged { results } => results,
            ListResponse::Plain(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfoRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub full_name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub professional_title: String,
}

impl From<PersonalInfoRecord> for PersonalInfo {
    fn from(r: PersonalInfoRecord) -> Self {
        PersonalInfo {
            id: r.id,
            full_name: r.full_name,
            email: r.email,
            phone: r.phone,
            location: r.location,
            professional_title: r.professional_title,
        }
    }
}

/// Body of a personal-info save. Blank fields are left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonalInfoPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_title: Option<String>,
}

impl PersonalInfoPayload {
    /// Trims every field and drops the blank ones.
    pub fn from_info(info: &PersonalInfo) -> Self {
        fn keep(value: &str) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        Self {
            full_name: keep(&info.full_name),
            email: keep(&info.email),
            phone: keep(&info.phone),
            location: keep(&info.location),
            professional_title: keep(&info.professional_title),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub company: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub duration: String,
    #[serde(default)]
    pub description: BulletList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub degree: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub institution: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub education_duration: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub education_location: String,
    #[serde(default)]
    pub description: BulletList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub duration: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub link: String,
    #[serde(
        default,
        deserialize_with = "deserialize_delimited",
        serialize_with = "serialize_delimited"
    )]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub description: BulletList,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_delimited",
        serialize_with = "serialize_delimited"
    )]
    pub skills: Vec<String>,
}

impl From<SkillsRecord> for Skills {
    fn from(r: SkillsRecord) -> Self {
        Skills {
            id: r.id,
            items: r.skills,
            input: None,
        }
    }
}

impl From<&Skills> for SkillsRecord {
    fn from(s: &Skills) -> Self {
        SkillsRecord {
            id: None,
            skills: s.items.clone(),
        }
    }
}

/// Conversion between a list entry and its wire record.
pub trait Record: Sized {
    type Entry;

    fn remote_id(&self) -> Option<i64>;
    fn into_entry(self) -> Self::Entry;
    fn from_entry(entry: &Self::Entry) -> Self;
}

fn entry_id(id: Option<i64>) -> EntryId {
    id.map(EntryId::Remote).unwrap_or_else(EntryId::temporary)
}

impl Record for ExperienceRecord {
    type Entry = ExperienceEntry;

    fn remote_id(&self) -> Option<i64> {
        self.id
    }

    fn into_entry(self) -> ExperienceEntry {
        ExperienceEntry {
            id: entry_id(self.id),
            title: self.title,
            company: self.company,
            location: self.location,
            duration: self.duration,
            description: self.description,
        }
    }

    fn from_entry(e: &ExperienceEntry) -> Self {
        ExperienceRecord {
            id: e.id.remote(),
            title: e.title.clone(),
            company: e.company.clone(),
            location: e.location.clone(),
            duration: e.duration.clone(),
            description: e.description.clone(),
        }
    }
}

impl Record for EducationRecord {
    type Entry = EducationEntry;

    fn remote_id(&self) -> Option<i64> {
        self.id
    }

    fn into_entry(self) -> EducationEntry {
        EducationEntry {
            id: entry_id(self.id),
            degree: self.degree,
            institution: self.institution,
            duration: self.education_duration,
            location: self.education_location,
            description: self.description,
        }
    }

    fn from_entry(e: &EducationEntry) -> Self {
        EducationRecord {
            id: e.id.remote(),
            degree: e.degree.clone(),
            institution: e.institution.clone(),
            education_duration: e.duration.clone(),
            education_location: e.location.clone(),
            description: e.description.clone(),
        }
    }
}

impl Record for ProjectRecord {
    type Entry = ProjectEntry;

    fn remote_id(&self) -> Option<i64> {
        self.id
    }

    fn into_entry(self) -> ProjectEntry {
        ProjectEntry {
            id: entry_id(self.id),
            name: self.name,
            duration: self.duration,
            link: self.link,
            technologies: self.technologies,
            technologies_input: None,
            description: self.description,
        }
    }

    fn from_entry(e: &ProjectEntry) -> Self {
        ProjectRecord {
            id: e.id.remote(),
            name: e.name.clone(),
            duration: e.duration.clone(),
            link: e.link.clone(),
            technologies: e.technologies.clone(),
            description: e.description.clone(),
        }
    }
}

/// Aggregate `GET /resume/` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeResponse {
    #[serde(default)]
    pub personal_info: Option<PersonalInfoRecord>,
    #[serde(default)]
    pub experiences: Vec<ExperienceRecord>,
    #[serde(default)]
    pub education: Vec<EducationRecord>,
    #[serde(default)]
    pub skills: Vec<SkillsRecord>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    /// Section name → percent complete, as computed by the server.
    #[serde(default)]
    pub progress: BTreeMap<String, f64>,
}

impl ResumeResponse {
    pub fn into_profile(self) -> ResumeProfile {
        ResumeProfile {
            personal_info: self.personal_info.map(PersonalInfo::from).unwrap_or_default(),
            experience: self.experiences.into_iter().map(Record::into_entry).collect(),
            education: self.education.into_iter().map(Record::into_entry).collect(),
            skills: self
                .skills
                .into_iter()
                .next()
                .map(Skills::from)
                .unwrap_or_default(),
            projects: self.projects.into_iter().map(Record::into_entry).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_response_accepts_both_shapes() {
        let paged: ListResponse<ExperienceRecord> =
            serde_json::from_value(json!({ "results": [{ "id": 1, "title": "Dev" }] })).unwrap();
        let plain: ListResponse<ExperienceRecord> =
            serde_json::from_value(json!([{ "id": 1, "title": "Dev" }])).unwrap();
        assert_eq!(paged.into_vec(), plain.into_vec());
    }

    #[test]
    fn test_null_fields_become_empty() {
        let record: EducationRecord = serde_json::from_value(json!({
            "id": 3,
            "degree": "BSc",
            "institution": null,
            "description": null
        }))
        .unwrap();
        let entry = record.into_entry();
        assert_eq!(entry.id, EntryId::Remote(3));
        assert_eq!(entry.institution, "");
        assert!(entry.description.lines().is_empty());
    }

    #[test]
    fn test_create_payload_omits_id_and_serializes_text() {
        let mut entry = ProjectEntry::new(EntryId::Temporary(1_700_000_000_000));
        entry.name = "Crawler".into();
        entry.technologies = vec!["Rust".into(), "tokio".into()];
        entry.description = BulletList::from_text("Fast\nSafe");

        let value = serde_json::to_value(ProjectRecord::from_entry(&entry)).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["technologies"], "Rust, tokio");
        assert_eq!(value["description"], "Fast\nSafe");
    }

    #[test]
    fn test_personal_payload_drops_blank_fields() {
        let info = PersonalInfo {
            full_name: "  Ada Lovelace ".into(),
            email: "   ".into(),
            ..Default::default()
        };
        let payload = PersonalInfoPayload::from_info(&info);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "full_name": "Ada Lovelace" })
        );
        assert!(PersonalInfoPayload::from_info(&PersonalInfo::default()).is_empty());
    }

    #[test]
    fn test_aggregate_response_into_profile() {
        let response: ResumeResponse = serde_json::from_value(json!({
            "personal_info": { "id": 1, "full_name": "Ada", "email": "ada@example.com" },
            "experiences": [{ "id": 4, "title": "Engineer", "description": "Built things" }],
            "education": [],
            "skills": [{ "skills": "Rust, SQL" }],
            "progress": { "personal_info": 100.0 }
        }))
        .unwrap();
        let profile = response.into_profile();
        assert_eq!(profile.personal_info.id, Some(1));
        assert_eq!(profile.experience[0].id, EntryId::Remote(4));
        assert_eq!(profile.skills.items, vec!["Rust", "SQL"]);
        assert!(profile.projects.is_empty());
    }
}
