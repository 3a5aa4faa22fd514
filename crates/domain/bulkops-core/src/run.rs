use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BulkError, ErrorDetail};
use crate::keys::{ItemKey, KeyFn};
use crate::RunState;

pub type RunId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Pending,
    Success,
    Failed,
    Canceled,
}

impl OutcomeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OutcomeStatus::Pending)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeStatus::Pending => "pending",
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome<T> {
    pub key: ItemKey,
    pub item: T,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Set when the item was handed to its action. A `Pending` outcome with
    /// no start time is still queued.
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl<T> ActionOutcome<T> {
    fn queued(key: ItemKey, item: T) -> Self {
        Self {
            key,
            item,
            status: OutcomeStatus::Pending,
            error: None,
            output: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == OutcomeStatus::Pending && self.started_at.is_some()
    }

    pub fn is_queued(&self) -> bool {
        self.status == OutcomeStatus::Pending && self.started_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub pending: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)?;
        if self.canceled > 0 {
            write!(f, ", {} canceled", self.canceled)?;
        }
        if self.pending > 0 {
            write!(f, ", {} pending", self.pending)?;
        }
        Ok(())
    }
}

/// All outcomes of one bulk invocation, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkRun<T> {
    pub id: RunId,
    pub state: RunState,
    pub outcomes: Vec<ActionOutcome<T>>,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    index: HashMap<ItemKey, usize>,
}

impl<T> BulkRun<T> {
    /// Creates an idle run with one queued outcome per item.
    ///
    /// Zero items, an item without a key, or two items sharing a key are
    /// caller bugs and are rejected.
    pub fn new(items: Vec<T>, key_fn: &KeyFn<T>) -> Result<Self, BulkError> {
        if items.is_empty() {
            return Err(BulkError::InvalidArgument(
                "bulk action requires at least one item".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());
        let mut outcomes = Vec::with_capacity(items.len());
        for (ix, item) in items.into_iter().enumerate() {
            let key = key_fn(&item);
            if key.as_str().is_empty() {
                return Err(BulkError::InvalidArgument(format!(
                    "item at position {ix} has no key"
                )));
            }
            if !seen.insert(key.clone()) {
                return Err(BulkError::InvalidArgument(format!(
                    "duplicate item key '{key}'"
                )));
            }
            index.insert(key.clone(), ix);
            outcomes.push(ActionOutcome::queued(key, item));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            state: RunState::Idle,
            outcomes,
            cancel_requested: false,
            created_at: Utc::now(),
            finished_at: None,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.outcomes.iter().map(|o| &o.key)
    }

    pub fn outcome(&self, key: &ItemKey) -> Option<&ActionOutcome<T>> {
        self.index.get(key).map(|&ix| &self.outcomes[ix])
    }

    pub(crate) fn outcome_mut(&mut self, key: &ItemKey) -> Option<&mut ActionOutcome<T>> {
        let ix = *self.index.get(key)?;
        self.outcomes.get_mut(ix)
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn all_terminal(&self) -> bool {
        self.outcomes.iter().all(ActionOutcome::is_terminal)
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &ActionOutcome<T>> {
        self.outcomes.iter().filter(|o| o.is_in_flight())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ItemKey, &ErrorDetail)> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .filter_map(|o| o.error.as_ref().map(|e| (&o.key, e)))
    }

    pub fn summary(&self) -> RunSummary {
        self.outcomes
            .iter()
            .fold(RunSummary::default(), |mut acc, o| {
                acc.total += 1;
                match o.status {
                    OutcomeStatus::Pending => acc.pending += 1,
                    OutcomeStatus::Success => acc.succeeded += 1,
                    OutcomeStatus::Failed => acc.failed += 1,
                    OutcomeStatus::Canceled => acc.canceled += 1,
                }
                acc
            })
    }
}
