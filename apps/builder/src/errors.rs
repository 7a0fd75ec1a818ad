use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{EntryId, Section};

/// Field name → messages, as returned by the Resume Store on HTTP 400.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failure talking to the Resume Store.
///
/// None of these escape the section synchronizers: they are caught there,
/// logged and turned into a `SectionError` for the UI layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {}", describe_fields(.0))]
    Validation(FieldErrors),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Short machine-readable code, attached to failure log lines.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Http(_) => "HTTP_ERROR",
            StoreError::Validation(_) => "VALIDATION_ERROR",
            StoreError::Unauthorized => "UNAUTHORIZED",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Api { .. } => "API_ERROR",
            StoreError::Parse(_) => "PARSE_ERROR",
            StoreError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            StoreError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

/// A local edit addressed something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no {section} entry with id {id}")]
    UnknownEntry { section: Section, id: EntryId },

    #[error(transparent)]
    UnknownField(#[from] crate::models::UnknownField),
}

fn describe_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("email".into(), vec!["Enter a valid email address.".into()]);
        fields.insert("title".into(), vec!["This field may not be blank.".into()]);
        let err = StoreError::Validation(fields);
        assert_eq!(
            err.to_string(),
            "Validation error: email: Enter a valid email address.; title: This field may not be blank."
        );
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.field_errors().map(|f| f.len()), Some(2));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(StoreError::NotFound("/skills/".into()).is_not_found());
        assert!(!StoreError::Unauthorized.is_not_found());
    }
}
