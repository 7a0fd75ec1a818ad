pub mod ids;
pub mod resume;
pub mod text;
pub mod wire;

pub use ids::EntryId;
pub use resume::{
    EducationEntry, EducationField, ExperienceEntry, ExperienceField, PersonalField,
    PersonalInfo, ProjectEntry, ProjectField, ResumeProfile, Section, Skills, UnknownField,
};
pub use text::BulletList;
