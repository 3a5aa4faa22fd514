use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::ErrorDetail;
use crate::keys::ItemKey;
use crate::run::{BulkRun, OutcomeStatus};
use crate::RunState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started,
    ItemStarted {
        key: ItemKey,
    },
    ItemSucceeded {
        key: ItemKey,
        output: Option<Value>,
    },
    ItemFailed {
        key: ItemKey,
        error: ErrorDetail,
    },
    ItemCanceled {
        key: ItemKey,
    },
    CancelRequested,
    Finished,
}

impl RunEvent {
    pub fn key(&self) -> Option<&ItemKey> {
        match self {
            RunEvent::ItemStarted { key }
            | RunEvent::ItemSucceeded { key, .. }
            | RunEvent::ItemFailed { key, .. }
            | RunEvent::ItemCanceled { key } => Some(key),
            RunEvent::Started | RunEvent::CancelRequested | RunEvent::Finished => None,
        }
    }
}

pub fn reduce<T>(mut run: BulkRun<T>, ev: RunEvent) -> BulkRun<T> {
    apply(&mut run, ev);
    run
}

/// In-place form of [`reduce`]. Terminal outcomes are never modified and a
/// finished run ignores every event.
pub fn apply<T>(run: &mut BulkRun<T>, ev: RunEvent) {
    if run.is_finished() {
        return;
    }

    match ev {
        RunEvent::Started => {
            if run.state == RunState::Idle {
                run.state = RunState::Running;
            }
        }

        RunEvent::ItemStarted { key } => {
            run.state = RunState::Running;
            let cancel_requested = run.cancel_requested;
            if let Some(outcome) = run.outcome_mut(&key) {
                if !outcome.is_queued() {
                    return;
                }
                let now = Utc::now();
                if cancel_requested {
                    outcome.status = OutcomeStatus::Canceled;
                    outcome.finished_at = Some(now);
                } else {
                    outcome.started_at = Some(now);
                }
            }
        }

        RunEvent::ItemSucceeded { key, output } => {
            if let Some(outcome) = run.outcome_mut(&key) {
                if outcome.is_terminal() {
                    return;
                }
                outcome.status = OutcomeStatus::Success;
                outcome.output = output.filter(|v| !v.is_null());
                outcome.finished_at = Some(Utc::now());
            }
        }

        RunEvent::ItemFailed { key, error } => {
            if let Some(outcome) = run.outcome_mut(&key) {
                if outcome.is_terminal() {
                    return;
                }
                outcome.status = OutcomeStatus::Failed;
                outcome.error = Some(error);
                outcome.finished_at = Some(Utc::now());
            }
        }

        RunEvent::ItemCanceled { key } => {
            if let Some(outcome) = run.outcome_mut(&key) {
                if outcome.is_terminal() {
                    return;
                }
                outcome.status = OutcomeStatus::Canceled;
                outcome.finished_at = Some(Utc::now());
            }
        }

        RunEvent::CancelRequested => {
            run.cancel_requested = true;
            cancel_queued(run);
        }

        RunEvent::Finished => {
            if run.in_flight().next().is_some() {
                return;
            }
            cancel_queued(run);
            run.state = if run
                .outcomes
                .iter()
                .any(|o| o.status == OutcomeStatus::Canceled)
            {
                RunState::Canceled
            } else {
                RunState::Completed
            };
            run.finished_at = Some(Utc::now());
        }
    }
}

fn cancel_queued<T>(run: &mut BulkRun<T>) {
    let now = Utc::now();
    for outcome in run.outcomes.iter_mut().filter(|o| o.is_queued()) {
        outcome.status = OutcomeStatus::Canceled;
        outcome.finished_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::key_fn;

    fn run_of(ids: &[u32]) -> BulkRun<u32> {
        BulkRun::new(ids.to_vec(), &key_fn(|id: &u32| id.to_string())).unwrap()
    }

    #[test]
    fn started_moves_idle_to_running() {
        let run = reduce(run_of(&[1]), RunEvent::Started);
        assert_eq!(run.state, RunState::Running);
    }

    #[test]
    fn terminal_outcome_is_immutable() {
        let mut run = run_of(&[1]);
        apply(&mut run, RunEvent::ItemStarted { key: "1".into() });
        apply(
            &mut run,
            RunEvent::ItemSucceeded {
                key: "1".into(),
                output: None,
            },
        );
        apply(
            &mut run,
            RunEvent::ItemFailed {
                key: "1".into(),
                error: ErrorDetail::new("late"),
            },
        );
        let outcome = run.outcome(&"1".into()).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn finished_waits_for_in_flight_items() {
        let mut run = run_of(&[1, 2]);
        apply(&mut run, RunEvent::ItemStarted { key: "1".into() });
        apply(&mut run, RunEvent::Finished);
        assert_eq!(run.state, RunState::Running);

        apply(
            &mut run,
            RunEvent::ItemSucceeded {
                key: "1".into(),
                output: None,
            },
        );
        apply(&mut run, RunEvent::ItemStarted { key: "2".into() });
        apply(
            &mut run,
            RunEvent::ItemSucceeded {
                key: "2".into(),
                output: None,
            },
        );
        apply(&mut run, RunEvent::Finished);
        assert_eq!(run.state, RunState::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn cancel_skips_queued_items_and_lets_in_flight_finish() {
        let mut run = run_of(&[1, 2, 3]);
        apply(&mut run, RunEvent::Started);
        apply(&mut run, RunEvent::ItemStarted { key: "1".into() });
        apply(&mut run, RunEvent::CancelRequested);

        assert_eq!(run.outcome(&"2".into()).unwrap().status, OutcomeStatus::Canceled);
        assert!(run.outcome(&"1".into()).unwrap().is_in_flight());

        // A start that raced the cancellation must not go in flight.
        apply(&mut run, RunEvent::ItemStarted { key: "3".into() });
        assert_eq!(run.outcome(&"3".into()).unwrap().status, OutcomeStatus::Canceled);

        apply(
            &mut run,
            RunEvent::ItemFailed {
                key: "1".into(),
                error: ErrorDetail::new("locked"),
            },
        );
        apply(&mut run, RunEvent::Finished);
        assert_eq!(run.state, RunState::Canceled);
        assert_eq!(run.summary().failed, 1);
        assert_eq!(run.summary().canceled, 2);
    }

    #[test]
    fn finished_run_ignores_events() {
        let mut run = run_of(&[1]);
        apply(&mut run, RunEvent::ItemStarted { key: "1".into() });
        apply(
            &mut run,
            RunEvent::ItemSucceeded {
                key: "1".into(),
                output: Some(serde_json::json!({ "ok": true })),
            },
        );
        apply(&mut run, RunEvent::Finished);
        apply(&mut run, RunEvent::CancelRequested);
        assert_eq!(run.state, RunState::Completed);
        assert!(!run.cancel_requested);
        assert!(run.outcome(&"1".into()).unwrap().output.is_some());
    }
}
