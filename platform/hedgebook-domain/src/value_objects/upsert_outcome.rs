use serde::{Deserialize, Serialize};

/// Per-record result of an upsert call. A failed record is not an error of
/// the call itself; callers inspect `success` on every entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub id: Option<String>,
    pub success: bool,
    pub created: bool,
    pub errors: Vec<String>,
}

impl UpsertOutcome {
    pub fn is_update(&self) -> bool {
        self.success && !self.created
    }
}
