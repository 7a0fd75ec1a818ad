use serde::Serialize;

use crate::errors::{FieldErrors, StoreError};

pub const AUTO_SAVE_FAILED: &str = "Auto-save failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// Loading a section failed; the section fell back to empty.
    Fetch,
    /// A debounced write failed; the local value was kept.
    AutoSave,
    /// A remote delete failed; the entry stays removed locally.
    Delete,
}

/// Error surfaced to the UI layer for one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionError {
    pub kind: SyncErrorKind,
    pub message: String,
    /// Per-field messages when the store rejected a write with HTTP 400.
    pub field_errors: FieldErrors,
}

impl SectionError {
    pub fn from_store(kind: SyncErrorKind, err: &StoreError) -> Self {
        let message = match kind {
            SyncErrorKind::Fetch => err.to_string(),
            SyncErrorKind::AutoSave => AUTO_SAVE_FAILED.to_string(),
            SyncErrorKind::Delete => format!("Failed to delete entry: {err}"),
        };
        Self {
            kind,
            message,
            field_errors: err.field_errors().cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatus {
    pub loading: bool,
    pub saving: bool,
    /// Local edits not yet confirmed by the store.
    pub unsaved: bool,
    pub error: Option<SectionError>,
}

/// Mutable status bookkeeping held inside a synchronizer's state.
#[derive(Debug, Default)]
pub(crate) struct StatusBoard {
    loading: bool,
    saving: usize,
    error: Option<SectionError>,
    error_generation: u64,
}

impl StatusBoard {
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn begin_save(&mut self) {
        self.saving += 1;
    }

    pub fn end_save(&mut self) {
        self.saving = self.saving.saturating_sub(1);
    }

    /// Records an error and returns its generation, for later expiry.
    pub fn set_error(&mut self, error: SectionError) -> u64 {
        self.error_generation += 1;
        self.error = Some(error);
        self.error_generation
    }

    /// Clears the error only if it is still the one recorded at `generation`.
    pub fn expire_error(&mut self, generation: u64) -> bool {
        if self.error_generation == generation && self.error.is_some() {
            self.error = None;
            return true;
        }
        false
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn snapshot(&self, unsaved: bool) -> SyncStatus {
        SyncStatus {
            loading: self.loading,
            saving: self.saving > 0,
            unsaved,
            error: self.error.clone(),
        }
    }
}

/// What a save indicator should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveIndicator {
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl SaveIndicator {
    /// Next indicator state given the previous one and the current status.
    /// `Saved` is only shown right after a save finished cleanly.
    pub fn next(previous: &SaveIndicator, status: &SyncStatus) -> SaveIndicator {
        if status.saving {
            return SaveIndicator::Saving;
        }
        if let Some(error) = &status.error {
            return SaveIndicator::Error(error.message.clone());
        }
        match previous {
            SaveIndicator::Saving => SaveIndicator::Saved,
            _ => SaveIndicator::Idle,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SaveIndicator::Idle => "",
            SaveIndicator::Saving => "Saving changes...",
            SaveIndicator::Saved => "All changes saved!",
            SaveIndicator::Error(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_save_error_keeps_field_errors() {
        let mut fields = FieldErrors::new();
        fields.insert("email".into(), vec!["Enter a valid email address.".into()]);
        let err = SectionError::from_store(SyncErrorKind::AutoSave, &StoreError::Validation(fields));
        assert_eq!(err.message, AUTO_SAVE_FAILED);
        assert_eq!(err.field_errors["email"].len(), 1);
    }

    #[test]
    fn test_error_expiry_respects_generation() {
        let mut board = StatusBoard::default();
        let err = SectionError::from_store(SyncErrorKind::AutoSave, &StoreError::Unauthorized);
        let first = board.set_error(err.clone());
        let second = board.set_error(err);

        assert!(!board.expire_error(first));
        assert!(board.snapshot(false).error.is_some());
        assert!(board.expire_error(second));
        assert!(board.snapshot(false).error.is_none());
    }

    #[test]
    fn test_indicator_transitions() {
        let saving = SyncStatus {
            saving: true,
            ..Default::default()
        };
        let idle = SyncStatus::default();

        let state = SaveIndicator::next(&SaveIndicator::Idle, &saving);
        assert_eq!(state, SaveIndicator::Saving);
        let state = SaveIndicator::next(&state, &idle);
        assert_eq!(state, SaveIndicator::Saved);
        assert_eq!(state.message(), "All changes saved!");
        assert_eq!(SaveIndicator::next(&state, &idle), SaveIndicator::Idle);
    }
}
