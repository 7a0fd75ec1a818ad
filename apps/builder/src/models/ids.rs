use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Identity of a list entry.
///
/// Entries start life with a `Temporary` id derived from the creation
/// timestamp and switch to the `Remote` id assigned by the Resume Store the
/// first time a create request succeeds. The switch happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntryId {
    Temporary(i64),
    Remote(i64),
}

impl EntryId {
    /// Allocates a fresh temporary id.
    ///
    /// Ids are millisecond timestamps, bumped past the last issued value so
    /// entries created within the same millisecond stay distinct.
    pub fn temporary() -> Self {
        static LAST: AtomicI64 = AtomicI64::new(0);

        let now = Utc::now().timestamp_millis();
        let mut prev = LAST.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return EntryId::Temporary(next),
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, EntryId::Temporary(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, EntryId::Remote(_))
    }

    /// The remote id, if this entry has been persisted.
    pub fn remote(&self) -> Option<i64> {
        match self {
            EntryId::Remote(id) => Some(*id),
            EntryId::Temporary(_) => None,
        }
    }

    pub fn raw(&self) -> i64 {
        match self {
            EntryId::Temporary(id) | EntryId::Remote(id) => *id,
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Temporary(id) => write!(f, "tmp-{id}"),
            EntryId::Remote(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_ids_are_distinct_and_increasing() {
        let ids: Vec<_> = (0..50).map(|_| EntryId::temporary()).collect();
        for pair in ids.windows(2) {
            assert!(pair[1].raw() > pair[0].raw());
        }
        assert!(ids.iter().all(EntryId::is_temporary));
    }

    #[test]
    fn test_temporary_ids_look_like_timestamps() {
        // Remote ids are small database keys; temporary ones are epoch millis.
        assert!(EntryId::temporary().raw() > 1_000_000_000_000);
    }

    #[test]
    fn test_remote_accessor() {
        assert_eq!(EntryId::Remote(7).remote(), Some(7));
        assert_eq!(EntryId::Temporary(7).remote(), None);
        assert_eq!(EntryId::Temporary(7).to_string(), "tmp-7");
    }
}
