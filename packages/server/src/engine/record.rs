use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use common::{Problem, Submission, SubmissionState};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::aggregator::ResultAggregator;

/// Engine-side bookkeeping for one submission.
pub(crate) struct Record {
    pub submission: Submission,
    pub problem: Arc<Problem>,
    /// Fired to stop the owning worker's sandbox.
    pub cancel: CancellationToken,
    pub state_tx: watch::Sender<SubmissionState>,
}

impl Record {
    pub fn new(submission: Submission, problem: Arc<Problem>) -> Self {
        let (state_tx, _) = watch::channel(submission.state);
        Self {
            submission,
            problem,
            cancel: CancellationToken::new(),
            state_tx,
        }
    }

    /// Move to `state` and wake every waiter. Terminal states also stamp `finished_at`.
    pub fn transition(&mut self, state: SubmissionState) {
        let now = Utc::now();
        match state {
            SubmissionState::Running => self.submission.started_at = Some(now),
            s if s.is_terminal() => self.submission.finished_at = Some(now),
            _ => {}
        }
        self.submission.state = state;
        self.state_tx.send_replace(state);
    }
}

/// Queue and submission records. Always accessed under the engine's lock, so
/// every state transition is atomic with respect to queue membership.
#[derive(Default)]
pub(crate) struct Store {
    pub queue: VecDeque<Uuid>,
    pub records: HashMap<Uuid, Record>,
    pub aggregator: ResultAggregator,
    pub running: usize,
}

impl Store {
    /// Pop the next queued submission and mark it running.
    pub fn dispatch(&mut self) -> Option<(Submission, Arc<Problem>, CancellationToken)> {
        while let Some(id) = self.queue.pop_front() {
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            if record.submission.state != SubmissionState::Queued {
                continue;
            }
            record.transition(SubmissionState::Running);
            self.running += 1;
            return Some((
                record.submission.clone(),
                record.problem.clone(),
                record.cancel.clone(),
            ));
        }
        None
    }

    /// Remove a queued submission from the queue. Returns false if it was not queued.
    pub fn dequeue(&mut self, id: &Uuid) -> bool {
        match self.queue.iter().position(|queued| queued == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Evict terminal records that finished before `cutoff`. Returns the number removed.
    pub fn evict_finished_before(&mut self, cutoff: chrono::DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .records
            .values()
            .filter(|r| r.submission.is_terminal())
            .filter(|r| r.submission.finished_at.is_some_and(|at| at < cutoff))
            .map(|r| r.submission.id)
            .collect();
        for id in &expired {
            self.records.remove(id);
            self.aggregator.forget(id);
        }
        expired.len()
    }
}
