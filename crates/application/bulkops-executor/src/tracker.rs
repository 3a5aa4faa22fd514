use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use bulkops_core::{ItemKey, RunEvent};

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub in_flight: Vec<ItemKey>,
    pub items_per_sec: f64,
    pub finished: bool,
}

impl ProgressSnapshot {
    pub fn done(&self) -> usize {
        self.succeeded + self.failed + self.canceled
    }
}

/// Folds the executor's progress events into counters for a progress view.
pub struct ProgressTracker {
    total: usize,
    in_flight: HashMap<ItemKey, Instant>,
    settled: HashSet<ItemKey>,
    succeeded: usize,
    failed: usize,
    canceled: usize,
    finished: bool,
    last_tick: Instant,
    settled_since_last_tick: usize,
    items_per_sec: f64,
    history: VecDeque<f64>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            in_flight: HashMap::new(),
            settled: HashSet::new(),
            succeeded: 0,
            failed: 0,
            canceled: 0,
            finished: false,
            last_tick: Instant::now(),
            settled_since_last_tick: 0,
            items_per_sec: 0.0,
            history: VecDeque::new(),
        }
    }

    pub fn update(&mut self, event: &RunEvent) {
        match event {
            RunEvent::ItemStarted { key } => {
                if !self.settled.contains(key) {
                    self.in_flight.insert(key.clone(), Instant::now());
                }
            }
            RunEvent::ItemSucceeded { key, .. } => {
                if self.settle(key) {
                    self.succeeded += 1;
                }
            }
            RunEvent::ItemFailed { key, .. } => {
                if self.settle(key) {
                    self.failed += 1;
                }
            }
            RunEvent::ItemCanceled { key } => {
                if self.settle(key) {
                    self.canceled += 1;
                }
            }
            RunEvent::Finished => {
                self.finished = true;
                self.in_flight.clear();
            }
            RunEvent::Started | RunEvent::CancelRequested => {}
        }
    }

    fn settle(&mut self, key: &ItemKey) -> bool {
        self.in_flight.remove(key);
        if !self.settled.insert(key.clone()) {
            return false;
        }
        self.settled_since_last_tick += 1;
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn snapshot(&mut self) -> ProgressSnapshot {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();

        if elapsed >= 0.5 {
            self.history
                .push_back(self.settled_since_last_tick as f64 / elapsed);
            if self.history.len() > 5 {
                self.history.pop_front();
            }
            self.items_per_sec = self.history.iter().sum::<f64>() / self.history.len() as f64;
            self.last_tick = now;
            self.settled_since_last_tick = 0;
        }

        let mut in_flight: Vec<(ItemKey, Instant)> =
            self.in_flight.iter().map(|(k, t)| (k.clone(), *t)).collect();
        in_flight.sort_by_key(|(_, started)| *started);

        ProgressSnapshot {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            canceled: self.canceled,
            in_flight: in_flight.into_iter().map(|(k, _)| k).collect(),
            items_per_sec: self.items_per_sec,
            finished: self.finished,
        }
    }
}
