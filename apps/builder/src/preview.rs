//! Projection of a resume profile into a display document.
//!
//! `project` is pure: same profile in, same document out. Sections appear in
//! a fixed order and only when they have something to show.

use std::fmt::Write as _;

use serde::Serialize;

use crate::content::HasContent;
use crate::models::{
    BulletList, EducationEntry, ExperienceEntry, PersonalInfo, ProjectEntry, ResumeProfile,
    Section,
};

pub const NAME_PLACEHOLDER: &str = "Your Name";
pub const TITLE_PLACEHOLDER: &str = "Your Title";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Phone,
    Email,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub kind: ContactKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewHeader {
    pub name: String,
    pub title: String,
    /// False when `name` is the placeholder.
    pub has_name: bool,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub heading: String,
    pub subheading: Option<String>,
    pub meta: Option<String>,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewSection {
    pub section: Section,
    pub heading: &'static str,
    /// Skills are shown as tags rather than items.
    pub tags: Vec<String>,
    pub items: Vec<PreviewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewDocument {
    pub header: PreviewHeader,
    pub sections: Vec<PreviewSection>,
}

pub fn project(profile: &ResumeProfile) -> PreviewDocument {
    let mut sections = Vec::new();

    let skills: Vec<String> = profile
        .skills
        .items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !skills.is_empty() {
        sections.push(PreviewSection {
            section: Section::Skills,
            heading: "SKILLS",
            tags: skills,
            items: Vec::new(),
        });
    }

    push_items(
        &mut sections,
        Section::Experience,
        "EXPERIENCE",
        profile.experience.iter().filter_map(experience_item),
    );
    push_items(
        &mut sections,
        Section::Education,
        "EDUCATION",
        profile.education.iter().filter_map(education_item),
    );
    push_items(
        &mut sections,
        Section::Projects,
        "PROJECTS",
        profile.projects.iter().filter_map(project_item),
    );

    PreviewDocument {
        header: header(&profile.personal_info),
        sections,
    }
}

fn push_items(
    sections: &mut Vec<PreviewSection>,
    section: Section,
    heading: &'static str,
    items: impl Iterator<Item = PreviewItem>,
) {
    let items: Vec<PreviewItem> = items.collect();
    if !items.is_empty() {
        sections.push(PreviewSection {
            section,
            heading,
            tags: Vec::new(),
            items,
        });
    }
}

fn header(info: &PersonalInfo) -> PreviewHeader {
    let contacts = [
        (ContactKind::Phone, &info.phone),
        (ContactKind::Email, &info.email),
        (ContactKind::Location, &info.location),
    ]
    .into_iter()
    .filter(|(_, value)| value.has_content())
    .map(|(kind, value)| Contact {
        kind,
        value: value.trim().to_string(),
    })
    .collect();

    PreviewHeader {
        name: or_placeholder(&info.full_name, NAME_PLACEHOLDER),
        title: or_placeholder(&info.professional_title, TITLE_PLACEHOLDER),
        has_name: info.full_name.has_content(),
        contacts,
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.has_content() {
        value.trim().to_string()
    } else {
        placeholder.to_string()
    }
}

fn text(value: &str) -> Option<String> {
    value.has_content().then(|| value.trim().to_string())
}

fn bullets(description: &BulletList) -> Vec<String> {
    description.items()
}

/// `a • b`, skipping blanks.
fn joined(parts: &[&str]) -> Option<String> {
    let kept: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    (!kept.is_empty()).then(|| kept.join(" • "))
}

/// `None` for an item with nothing to display.
fn non_blank(item: PreviewItem) -> Option<PreviewItem> {
    let blank = item.heading.is_empty()
        && item.subheading.is_none()
        && item.meta.is_none()
        && item.link.is_none()
        && item.tags.is_empty()
        && item.bullets.is_empty();
    (!blank).then_some(item)
}

fn experience_item(exp: &ExperienceEntry) -> Option<PreviewItem> {
    non_blank(PreviewItem {
        heading: exp.title.trim().to_string(),
        subheading: text(&exp.company),
        meta: joined(&[exp.duration.as_str(), exp.location.as_str()]),
        link: None,
        tags: Vec::new(),
        bullets: bullets(&exp.description),
    })
}

fn education_item(edu: &EducationEntry) -> Option<PreviewItem> {
    non_blank(PreviewItem {
        heading: edu.degree.trim().to_string(),
        subheading: text(&edu.institution),
        meta: joined(&[edu.duration.as_str(), edu.location.as_str()]),
        link: None,
        tags: Vec::new(),
        bullets: bullets(&edu.description),
    })
}

fn project_item(project: &ProjectEntry) -> Option<PreviewItem> {
    non_blank(PreviewItem {
        heading: project.name.trim().to_string(),
        subheading: None,
        meta: text(&project.duration),
        link: text(&project.link),
        tags: project
            .technologies
            .iter()
            .filter(|t| t.has_content())
            .map(|t| t.trim().to_string())
            .collect(),
        bullets: bullets(&project.description),
    })
}

impl PreviewDocument {
    /// The "No content yet" state: no name and nothing in any section.
    pub fn is_empty(&self) -> bool {
        !self.header.has_name && self.sections.is_empty()
    }

    pub fn section(&self, section: Section) -> Option<&PreviewSection> {
        self.sections.iter().find(|s| s.section == section)
    }

    pub fn export_file_name(&self) -> String {
        if self.header.has_name {
            format!("{}.pdf", self.header.name)
        } else {
            "Resume.pdf".to_string()
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.header.name);
        let _ = writeln!(out, "{}", self.header.title);
        if !self.header.contacts.is_empty() {
            let contacts: Vec<&str> = self
                .header
                .contacts
                .iter()
                .map(|c| c.value.as_str())
                .collect();
            let _ = writeln!(out, "{}", contacts.join(" | "));
        }

        for section in &self.sections {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", section.heading);
            if !section.tags.is_empty() {
                let _ = writeln!(out, "  {}", section.tags.join(", "));
            }
            for item in &section.items {
                let mut line = item.heading.clone();
                if let Some(sub) = &item.subheading {
                    if !line.is_empty() {
                        line.push_str(", ");
                    }
                    line.push_str(sub);
                }
                if let Some(meta) = &item.meta {
                    let _ = write!(line, " ({meta})");
                }
                let _ = writeln!(out, "  {}", line.trim());
                if let Some(link) = &item.link {
                    let _ = writeln!(out, "    {link}");
                }
                if !item.tags.is_empty() {
                    let _ = writeln!(out, "    [{}]", item.tags.join(", "));
                }
                for bullet in &item.bullets {
                    let _ = writeln!(out, "    - {bullet}");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wire::SkillsRecord;
    use crate::models::{EntryId, ExperienceField, Skills};
    use serde_json::json;

    fn skills_from(value: serde_json::Value) -> Skills {
        serde_json::from_value::<SkillsRecord>(json!({ "skills": value }))
            .unwrap()
            .into()
    }

    #[test]
    fn test_skills_text_and_list_project_identically() {
        let as_text = ResumeProfile {
            skills: skills_from(json!("a, b, c")),
            ..Default::default()
        };
        let as_list = ResumeProfile {
            skills: skills_from(json!(["a", "b", "c"])),
            ..Default::default()
        };

        let left = project(&as_text);
        let right = project(&as_list);
        assert_eq!(left.sections, right.sections);
        assert_eq!(left.section(Section::Skills).unwrap().tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_profile_uses_placeholders() {
        let doc = project(&ResumeProfile::default());
        assert!(doc.is_empty());
        assert_eq!(doc.header.name, NAME_PLACEHOLDER);
        assert_eq!(doc.header.title, TITLE_PLACEHOLDER);
        assert!(doc.header.contacts.is_empty());
        assert_eq!(doc.export_file_name(), "Resume.pdf");
    }

    #[test]
    fn test_sections_follow_fixed_order_and_skip_blank_entries() {
        let mut exp = ExperienceEntry::new(EntryId::Remote(1));
        exp.set_field(ExperienceField::Title, "Engineer");
        exp.set_field(ExperienceField::Description, "  Led team \n\n Shipped API");
        let mut edu = EducationEntry::new(EntryId::Remote(2));
        edu.degree = "BSc".into();
        edu.duration = "2010 - 2014".into();
        edu.location = "London".into();

        let profile = ResumeProfile {
            experience: vec![exp, ExperienceEntry::new(EntryId::Remote(3))],
            education: vec![edu],
            skills: Skills::from_text("Rust"),
            ..Default::default()
        };
        let doc = project(&profile);

        let order: Vec<Section> = doc.sections.iter().map(|s| s.section).collect();
        assert_eq!(order, vec![Section::Skills, Section::Experience, Section::Education]);

        let experience = doc.section(Section::Experience).unwrap();
        assert_eq!(experience.items.len(), 1);
        assert_eq!(experience.items[0].bullets, vec!["Led team", "Shipped API"]);

        let education = &doc.section(Section::Education).unwrap().items[0];
        assert_eq!(education.meta.as_deref(), Some("2010 - 2014 • London"));
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_header_contacts_and_file_name() {
        let profile = ResumeProfile {
            personal_info: PersonalInfo {
                full_name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                location: "  ".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let doc = project(&profile);
        assert_eq!(
            doc.header.contacts,
            vec![Contact {
                kind: ContactKind::Email,
                value: "ada@example.com".into()
            }]
        );
        assert_eq!(doc.export_file_name(), "Ada Lovelace.pdf");
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_render_text() {
        let mut project_entry = ProjectEntry::new(EntryId::Remote(4));
        project_entry.name = "Crawler".into();
        project_entry.technologies = vec!["Rust".into(), "tokio".into()];
        project_entry.description = BulletList::from_text("Fast");
        let profile = ResumeProfile {
            personal_info: PersonalInfo {
                full_name: "Ada".into(),
                phone: "555".into(),
                email: "ada@example.com".into(),
                ..Default::default()
            },
            projects: vec![project_entry],
            ..Default::default()
        };

        let text = project(&profile).render_text();
        assert_eq!(
            text,
            "Ada\nYour Title\n555 | ada@example.com\n\nPROJECTS\n  Crawler\n    [Rust, tokio]\n    - Fast\n"
        );
    }
}
