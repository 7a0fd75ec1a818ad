//! The "has content" rule shared by step completion and the preview.

use crate::models::{
    BulletList, EducationEntry, ExperienceEntry, PersonalInfo, PersonalField, ProjectEntry, Skills,
};

pub trait HasContent {
    fn has_content(&self) -> bool;
}

impl HasContent for str {
    fn has_content(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl HasContent for String {
    fn has_content(&self) -> bool {
        self.as_str().has_content()
    }
}

impl HasContent for BulletList {
    /// At least one non-blank line.
    fn has_content(&self) -> bool {
        self.has_item()
    }
}

impl HasContent for ExperienceEntry {
    fn has_content(&self) -> bool {
        self.title.has_content() && self.description.has_content()
    }
}

impl HasContent for ProjectEntry {
    fn has_content(&self) -> bool {
        self.name.has_content() && self.description.has_content()
    }
}

impl HasContent for EducationEntry {
    fn has_content(&self) -> bool {
        self.degree.has_content() || self.institution.has_content()
    }
}

impl HasContent for Skills {
    fn has_content(&self) -> bool {
        self.items.iter().any(|s| s.has_content())
    }
}

impl HasContent for PersonalInfo {
    /// Any one field filled in.
    fn has_content(&self) -> bool {
        PersonalField::ALL.iter().any(|f| self.field(*f).has_content())
    }
}

/// A list has content when it is non-empty and every item does.
impl<T: HasContent> HasContent for [T] {
    fn has_content(&self) -> bool {
        !self.is_empty() && self.iter().all(HasContent::has_content)
    }
}

impl<T: HasContent> HasContent for Vec<T> {
    fn has_content(&self) -> bool {
        self.as_slice().has_content()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryId, ExperienceField};

    #[test]
    fn test_strings() {
        assert!(!"".has_content());
        assert!(!"  \n ".has_content());
        assert!(" x ".has_content());
    }

    #[test]
    fn test_experience_needs_title_and_a_bullet() {
        let mut exp = ExperienceEntry::new(EntryId::Temporary(1));
        exp.set_field(ExperienceField::Title, "Engineer");
        assert!(!exp.has_content());

        exp.set_field(ExperienceField::Description, "\n   \n");
        assert!(!exp.has_content());

        exp.set_field(ExperienceField::Description, "\nShipped the API");
        assert!(exp.has_content());
    }

    #[test]
    fn test_list_requires_every_entry() {
        let mut good = EducationEntry::new(EntryId::Remote(1));
        good.institution = "MIT".into();
        let blank = EducationEntry::new(EntryId::Remote(2));

        assert!(!Vec::<EducationEntry>::new().has_content());
        assert!(vec![good.clone()].has_content());
        assert!(!vec![good, blank].has_content());
    }

    #[test]
    fn test_skills() {
        assert!(!Skills::default().has_content());
        assert!(Skills::from_text("Rust").has_content());
    }
}
