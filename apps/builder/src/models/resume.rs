use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::ids::EntryId;
use crate::models::text::{join_delimited, split_delimited, BulletList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    PersonalInfo,
    Experience,
    Education,
    Skills,
    Projects,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PersonalInfo => "personal_info",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Skills => "skills",
            Section::Projects => "projects",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a field name does not belong to an entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {entity} field '{name}'")]
pub struct UnknownField {
    pub entity: &'static str,
    pub name: String,
}

macro_rules! field_enum {
    ($name:ident, $entity:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownField;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownField {
                        entity: $entity,
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

field_enum!(PersonalField, "personal info", {
    FullName => "full_name",
    Email => "email",
    Phone => "phone",
    Location => "location",
    ProfessionalTitle => "professional_title",
});

field_enum!(ExperienceField, "experience", {
    Title => "title",
    Company => "company",
    Location => "location",
    Duration => "duration",
    Description => "description",
});

field_enum!(EducationField, "education", {
    Degree => "degree",
    Institution => "institution",
    Duration => "education_duration",
    Location => "education_location",
    Description => "description",
});

field_enum!(ProjectField, "project", {
    Name => "name",
    Duration => "duration",
    Link => "link",
    Technologies => "technologies",
    Description => "description",
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalInfo {
    /// Remote record id, once the profile has been saved.
    pub id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub professional_title: String,
}

impl PersonalInfo {
    pub fn field(&self, field: PersonalField) -> &str {
        match field {
            PersonalField::FullName => &self.full_name,
            PersonalField::Email => &self.email,
            PersonalField::Phone => &self.phone,
            PersonalField::Location => &self.location,
            PersonalField::ProfessionalTitle => &self.professional_title,
        }
    }

    pub fn set_field(&mut self, field: PersonalField, value: &str) {
        let slot = match field {
            PersonalField::FullName => &mut self.full_name,
            PersonalField::Email => &mut self.email,
            PersonalField::Phone => &mut self.phone,
            PersonalField::Location => &mut self.location,
            PersonalField::ProfessionalTitle => &mut self.professional_title,
        };
        *slot = value.to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceEntry {
    pub id: EntryId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub duration: String,
    pub description: BulletList,
}

impl ExperienceEntry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            title: String::new(),
            company: String::new(),
            location: String::new(),
            duration: String::new(),
            description: BulletList::default(),
        }
    }

    pub fn set_field(&mut self, field: ExperienceField, value: &str) {
        match field {
            ExperienceField::Title => self.title = value.to_string(),
            ExperienceField::Company => self.company = value.to_string(),
            ExperienceField::Location => self.location = value.to_string(),
            ExperienceField::Duration => self.duration = value.to_string(),
            ExperienceField::Description => self.description = BulletList::from_text(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EducationEntry {
    pub id: EntryId,
    pub degree: String,
    pub institution: String,
    pub duration: String,
    pub location: String,
    pub description: BulletList,
}

impl EducationEntry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            degree: String::new(),
            institution: String::new(),
            duration: String::new(),
            location: String::new(),
            description: BulletList::default(),
        }
    }

    pub fn set_field(&mut self, field: EducationField, value: &str) {
        match field {
            EducationField::Degree => self.degree = value.to_string(),
            EducationField::Institution => self.institution = value.to_string(),
            EducationField::Duration => self.duration = value.to_string(),
            EducationField::Location => self.location = value.to_string(),
            EducationField::Description => self.description = BulletList::from_text(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    pub id: EntryId,
    pub name: String,
    pub duration: String,
    pub link: String,
    pub technologies: Vec<String>,
    /// Technologies text as typed. `None` for entries loaded from the store.
    pub technologies_input: Option<String>,
    pub description: BulletList,
}

impl ProjectEntry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            name: String::new(),
            duration: String::new(),
            link: String::new(),
            technologies: Vec::new(),
            technologies_input: None,
            description: BulletList::default(),
        }
    }

    pub fn set_field(&mut self, field: ProjectField, value: &str) {
        match field {
            ProjectField::Name => self.name = value.to_string(),
            ProjectField::Duration => self.duration = value.to_string(),
            ProjectField::Link => self.link = value.to_string(),
            ProjectField::Technologies => {
                self.technologies = split_delimited(value);
                self.technologies_input = Some(value.to_string());
            }
            ProjectField::Description => self.description = BulletList::from_text(value),
        }
    }

    /// The text to show in the form: as typed when available.
    pub fn technologies_text(&self) -> String {
        match &self.technologies_input {
            Some(input) => input.clone(),
            None => join_delimited(&self.technologies),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skills {
    pub id: Option<i64>,
    pub items: Vec<String>,
    /// Skills text as typed, cleared by per-item edits.
    pub input: Option<String>,
}

impl Skills {
    pub fn from_text(text: &str) -> Self {
        Self {
            id: None,
            items: split_delimited(text),
            input: Some(text.to_string()),
        }
    }

    pub fn to_text(&self) -> String {
        match &self.input {
            Some(input) => input.clone(),
            None => join_delimited(&self.items),
        }
    }
}

/// The whole resume as seen by readers (wizard, preview).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeProfile {
    pub personal_info: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Skills,
    pub projects: Vec<ProjectEntry>,
}
