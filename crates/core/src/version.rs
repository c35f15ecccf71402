#![forbid(unsafe_code)]

//! Optimistic concurrency for structural edits.
//!
//! A node carries a monotonic `version`. Writers either present the
//! version they last observed or skip the check; in both cases the
//! version only moves when a field actually changed. Hot counters
//! (votes) never pass through here.

pub const INITIAL_VERSION: i64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionMismatch {
    pub expected: i64,
    pub actual: i64,
}

pub fn check_version(expected: Option<i64>, actual: i64) -> Result<(), VersionMismatch> {
    match expected {
        Some(expected) if expected != actual => Err(VersionMismatch { expected, actual }),
        _ => Ok(()),
    }
}

/// Applies present patch fields against stored values and remembers which
/// of them differ.
#[derive(Clone, Debug, Default)]
pub struct ChangeTracker {
    changed: Vec<&'static str>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent (`None`) keeps `current`; present-and-equal keeps `current`
    /// without marking a change. Nullable columns pass `Option<Option<T>>`.
    pub fn apply<T: PartialEq>(&mut self, field: &'static str, current: T, patch: Option<T>) -> T {
        match patch {
            Some(next) if next != current => {
                self.changed.push(field);
                next
            }
            _ => current,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn changed_fields(&self) -> &[&'static str] {
        &self.changed
    }

    pub fn next_version(&self, current: i64) -> i64 {
        if self.has_changes() {
            current + 1
        } else {
            current
        }
    }
}
