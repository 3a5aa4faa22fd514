use serde::{Deserialize, Serialize};

pub mod error;
pub mod keys;
pub mod reducer;
pub mod run;

pub use error::{ActionError, BulkError, ErrorDetail, FieldError};
pub use keys::{compare_strings, id_key_fn, key_fn, name_key_fn, ItemKey, KeyFn};
pub use reducer::{apply, reduce, RunEvent};
pub use run::{ActionOutcome, BulkRun, OutcomeStatus, RunId, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    /// Every outcome is terminal and none was canceled.
    Completed,
    /// Every outcome is terminal and at least one was skipped by cancellation.
    Canceled,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Canceled)
    }
}
