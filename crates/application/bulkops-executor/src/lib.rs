pub mod action;
pub mod dialog;
pub mod executor;
pub mod options;
pub mod rest;
pub mod store;
pub mod tracker;

pub use action::{action_fn, FnAction, ItemAction};
pub use dialog::{BulkActionDialog, BulkActionRequest, DialogState};
pub use executor::BulkActionExecutor;
pub use options::{CloseFn, CompleteFn, ExecutorOptions, RunOptions};
pub use rest::{RequestBody, RestAction};
pub use store::RunStore;
pub use tracker::{ProgressSnapshot, ProgressTracker};

// Re-export core types often needed by callers
pub use bulkops_core::{
    ActionError, ActionOutcome, BulkError, BulkRun, ErrorDetail, ItemKey, OutcomeStatus, RunEvent,
    RunState, RunSummary,
};
