//! Client-side state for a multi-step resume builder.
//!
//! Edits land in memory immediately and reach the Resume Store through
//! per-entry debounced writes (`sync`). The wizard and the preview only read
//! snapshots of that state.

pub mod auth;
pub mod config;
pub mod content;
pub mod errors;
pub mod models;
pub mod preview;
pub mod session;
pub mod store;
pub mod sync;
pub mod wizard;

pub use errors::{EditError, StoreError};
pub use session::{LoadedResume, ResumeSession};
