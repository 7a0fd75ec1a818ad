//! Step navigation for the resume form.
//!
//! Steps are numbered from 1. Moving forward out of a step requires it to be
//! complete, moving back is always allowed, and jumping to step `j` requires
//! steps `1..j` to be complete. Completion is always computed from the
//! profile passed in, never cached.

use serde::Serialize;
use thiserror::Error;

use crate::content::HasContent;
use crate::models::{PersonalField, ResumeProfile};

/// A piece of the profile a step requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepField {
    Personal(PersonalField),
    Experience,
    Education,
    Skills,
    Projects,
}

impl StepField {
    pub fn has_content(&self, profile: &ResumeProfile) -> bool {
        match self {
            StepField::Personal(field) => profile.personal_info.field(*field).has_content(),
            StepField::Experience => profile.experience.has_content(),
            StepField::Education => profile.education.has_content(),
            StepField::Skills => profile.skills.has_content(),
            StepField::Projects => profile.projects.has_content(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub title: String,
    pub description: String,
    /// Required fields. A step with none is always complete.
    pub fields: Vec<StepField>,
}

impl Step {
    pub fn new(title: &str, description: &str, fields: Vec<StepField>) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            fields,
        }
    }

    pub fn is_complete(&self, profile: &ResumeProfile) -> bool {
        self.fields.iter().all(|f| f.has_content(profile))
    }
}

pub fn default_steps() -> Vec<Step> {
    vec![
        Step::new(
            "Personal Information",
            "Basic contact information and professional title",
            vec![
                StepField::Personal(PersonalField::FullName),
                StepField::Personal(PersonalField::Email),
                StepField::Personal(PersonalField::Phone),
                StepField::Personal(PersonalField::Location),
                StepField::Personal(PersonalField::ProfessionalTitle),
            ],
        ),
        Step::new(
            "Experience",
            "Work experience, internships, and professional roles",
            vec![StepField::Experience],
        ),
        Step::new(
            "Education",
            "Educational background and qualifications",
            vec![StepField::Education],
        ),
        Step::new(
            "Skills",
            "Technical skills, programming languages, and tools",
            vec![StepField::Skills],
        ),
        Step::new(
            "Projects",
            "Notable projects and achievements",
            vec![StepField::Projects],
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Step(usize),
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("step {step} ({title}) is not complete")]
    StepIncomplete { step: usize, title: String },

    #[error("step {step} does not exist (1..={count})")]
    OutOfRange { step: usize, count: usize },

    #[error("step {step} is locked until steps {missing:?} are complete")]
    PrerequisitesIncomplete { step: usize, missing: Vec<usize> },

    #[error("the wizard is already finished")]
    AlreadyFinished,

    #[error("a wizard needs at least one step")]
    NoSteps,
}

/// Per-step line of a completion report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub title: String,
    pub complete: bool,
    pub accessible: bool,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    steps: Vec<Step>,
    position: Position,
}

impl Default for Wizard {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            position: Position::Step(1),
        }
    }
}

impl Wizard {
    pub fn new(steps: Vec<Step>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::NoSteps);
        }
        Ok(Self {
            steps,
            position: Position::Step(1),
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Current step number, `None` once finished.
    pub fn current(&self) -> Option<usize> {
        match self.position {
            Position::Step(n) => Some(n),
            Position::Finished => None,
        }
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current().and_then(|n| self.step(n))
    }

    pub fn is_finished(&self) -> bool {
        self.position == Position::Finished
    }

    fn step(&self, n: usize) -> Option<&Step> {
        n.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    fn check_range(&self, n: usize) -> Result<&Step, WizardError> {
        self.step(n).ok_or(WizardError::OutOfRange {
            step: n,
            count: self.steps.len(),
        })
    }

    /// Out-of-range steps are never complete.
    pub fn is_step_complete(&self, n: usize, profile: &ResumeProfile) -> bool {
        self.step(n).map(|s| s.is_complete(profile)).unwrap_or(false)
    }

    fn missing_before(&self, n: usize, profile: &ResumeProfile) -> Vec<usize> {
        (1..n).filter(|k| !self.is_step_complete(*k, profile)).collect()
    }

    pub fn can_access(&self, n: usize, profile: &ResumeProfile) -> bool {
        self.step(n).is_some() && self.missing_before(n, profile).is_empty()
    }

    /// Advances past the current step, or finishes from the last one.
    pub fn next(&mut self, profile: &ResumeProfile) -> Result<Position, WizardError> {
        let Position::Step(n) = self.position else {
            return Err(WizardError::AlreadyFinished);
        };
        let step = self.check_range(n)?;
        if !step.is_complete(profile) {
            return Err(WizardError::StepIncomplete {
                step: n,
                title: step.title.clone(),
            });
        }
        self.position = if n == self.steps.len() {
            Position::Finished
        } else {
            Position::Step(n + 1)
        };
        Ok(self.position)
    }

    /// Steps back; stays on step 1. From finished, returns to the last step.
    pub fn back(&mut self) -> Position {
        self.position = match self.position {
            Position::Step(n) => Position::Step(n.saturating_sub(1).max(1)),
            Position::Finished => Position::Step(self.steps.len()),
        };
        self.position
    }

    pub fn jump_to(&mut self, n: usize, profile: &ResumeProfile) -> Result<Position, WizardError> {
        self.check_range(n)?;
        let missing = self.missing_before(n, profile);
        if !missing.is_empty() {
            return Err(WizardError::PrerequisitesIncomplete { step: n, missing });
        }
        self.position = Position::Step(n);
        Ok(self.position)
    }

    /// Reopens a finished wizard on its last step.
    pub fn edit(&mut self) -> Position {
        if self.is_finished() {
            self.position = Position::Step(self.steps.len());
        }
        self.position
    }

    pub fn completion(&self, profile: &ResumeProfile) -> Vec<StepReport> {
        (1..=self.steps.len())
            .filter_map(|n| {
                let step = self.step(n)?;
                Some(StepReport {
                    step: n,
                    title: step.title.clone(),
                    complete: step.is_complete(profile),
                    accessible: self.can_access(n, profile),
                    current: self.position == Position::Step(n),
                })
            })
            .collect()
    }

    pub fn completed_count(&self, profile: &ResumeProfile) -> usize {
        self.steps.iter().filter(|s| s.is_complete(profile)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EducationEntry, EntryId, ExperienceEntry, ExperienceField, PersonalInfo, ProjectEntry,
        ProjectField, Skills,
    };

    fn personal() -> PersonalInfo {
        PersonalInfo {
            id: Some(1),
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
            location: "London".into(),
            professional_title: "Engineer".into(),
        }
    }

    fn full_profile() -> ResumeProfile {
        let mut exp = ExperienceEntry::new(EntryId::Remote(1));
        exp.set_field(ExperienceField::Title, "Engineer");
        exp.set_field(ExperienceField::Description, "Built engines");
        let mut edu = EducationEntry::new(EntryId::Remote(2));
        edu.degree = "BSc".into();
        let mut project = ProjectEntry::new(EntryId::Remote(3));
        project.set_field(ProjectField::Name, "Analytical Engine");
        project.set_field(ProjectField::Description, "Notes");
        ResumeProfile {
            personal_info: personal(),
            experience: vec![exp],
            education: vec![edu],
            skills: Skills::from_text("Math, Rust"),
            projects: vec![project],
        }
    }

    #[test]
    fn test_required_fields_gate_completion() {
        let steps = vec![Step::new(
            "Contact",
            "",
            vec![
                StepField::Personal(PersonalField::FullName),
                StepField::Personal(PersonalField::Email),
            ],
        )];
        let wizard = Wizard::new(steps).unwrap();
        let mut profile = ResumeProfile::default();

        profile.personal_info.full_name = "Ada".into();
        assert!(!wizard.is_step_complete(1, &profile));
        profile.personal_info.email = "   ".into();
        assert!(!wizard.is_step_complete(1, &profile));
        profile.personal_info.email = "ada@example.com".into();
        assert!(wizard.is_step_complete(1, &profile));
    }

    #[test]
    fn test_step_without_fields_is_always_complete() {
        let wizard = Wizard::new(vec![Step::new("Review", "", vec![])]).unwrap();
        assert!(wizard.is_step_complete(1, &ResumeProfile::default()));
    }

    #[test]
    fn test_experience_without_description_blocks_progress() {
        let mut profile = ResumeProfile {
            personal_info: personal(),
            ..Default::default()
        };
        let mut exp = ExperienceEntry::new(EntryId::temporary());
        exp.set_field(ExperienceField::Title, "Engineer");
        profile.experience.push(exp);

        let mut wizard = Wizard::default();
        wizard.next(&profile).unwrap();
        assert_eq!(wizard.current(), Some(2));
        assert!(!wizard.is_step_complete(2, &profile));
        assert!(matches!(
            wizard.next(&profile),
            Err(WizardError::StepIncomplete { step: 2, .. })
        ));

        profile.experience[0].set_field(ExperienceField::Description, "Shipped the API");
        assert!(wizard.is_step_complete(2, &profile));
        assert_eq!(wizard.next(&profile).unwrap(), Position::Step(3));
    }

    #[test]
    fn test_jump_requires_all_earlier_steps() {
        let mut profile = full_profile();
        profile.education.clear();
        let mut wizard = Wizard::default();

        assert_eq!(wizard.jump_to(3, &profile).unwrap(), Position::Step(3));
        assert_eq!(
            wizard.jump_to(5, &profile).unwrap_err(),
            WizardError::PrerequisitesIncomplete {
                step: 5,
                missing: vec![3]
            }
        );
        assert!(!wizard.can_access(4, &profile));
        assert!(matches!(
            wizard.jump_to(9, &profile),
            Err(WizardError::OutOfRange { step: 9, count: 5 })
        ));
        assert_eq!(wizard.current(), Some(3));
    }

    #[test]
    fn test_back_is_always_allowed() {
        let mut wizard = Wizard::default();
        assert_eq!(wizard.back(), Position::Step(1));
        wizard.jump_to(2, &full_profile()).unwrap();
        assert_eq!(wizard.back(), Position::Step(1));
    }

    #[test]
    fn test_finish_and_edit() {
        let profile = full_profile();
        let mut wizard = Wizard::default();
        assert_eq!(wizard.current_step().unwrap().title, "Personal Information");
        for _ in 0..5 {
            wizard.next(&profile).unwrap();
        }
        assert!(wizard.is_finished());
        assert!(wizard.current_step().is_none());
        assert_eq!(wizard.next(&profile).unwrap_err(), WizardError::AlreadyFinished);

        assert_eq!(wizard.edit(), Position::Step(5));
        assert!(!wizard.is_finished());
        assert_eq!(wizard.current_step().unwrap().title, "Projects");
    }

    #[test]
    fn test_completion_report() {
        let mut profile = full_profile();
        profile.skills = Skills::default();
        let wizard = Wizard::default();

        let report = wizard.completion(&profile);
        assert_eq!(report.len(), 5);
        assert!(report[0].current);
        assert!(report[2].complete);
        assert!(!report[3].complete);
        assert!(report[3].accessible);
        assert!(!report[4].accessible);
        assert_eq!(wizard.completed_count(&profile), 4);
    }

    #[test]
    fn test_empty_wizard_is_rejected() {
        assert_eq!(Wizard::new(vec![]).unwrap_err(), WizardError::NoSteps);
    }
}
