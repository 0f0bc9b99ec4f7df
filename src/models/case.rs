use serde::{Deserialize, Serialize};

/// Length of a USCIS receipt number, e.g. `EAC2190012345`.
pub const CASE_ID_LEN: usize = 13;

pub const CASE_NAME_MAX_LEN: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Case {
    pub id: String,

    pub name: String,

    pub status: String,

    pub old_status: String,

    pub checked_at: Option<String>,
}

impl Case {
    /// Name shown to users; unnamed cases fall back to the receipt number.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    #[must_use]
    pub fn has_status(&self) -> bool {
        !self.status.is_empty()
    }
}

/// Outcome of a full status synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub checked: usize,
    pub changed: usize,
    pub notified: usize,
    pub failed: usize,
}

impl SyncReport {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }
}
