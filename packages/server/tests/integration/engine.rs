use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use common::event::{Event, SubmissionEvent, topics};
use common::hook::{Hook, HookAction};
use common::{EngineConfig, NewSubmission, SubmissionState};
use server::engine::EngineError;

use crate::common::{TWO_SUM_PYTHON, directives, start_engine};

/// Records the topic of every event it sees.
#[derive(Clone, Default)]
struct RecordingHook {
    seen: Arc<Mutex<Vec<(String, SubmissionState)>>>,
}

#[async_trait]
impl Hook<SubmissionEvent> for RecordingHook {
    fn id(&self) -> &str {
        "recorder"
    }

    fn topics(&self) -> &[&str] {
        &[
            topics::SUBMISSION_QUEUED,
            topics::SUBMISSION_STARTED,
            topics::SUBMISSION_FINISHED,
        ]
    }

    async fn on_event(&self, event: &SubmissionEvent) -> Result<HookAction> {
        let state = match event {
            SubmissionEvent::Queued { .. } => SubmissionState::Queued,
            SubmissionEvent::Started { .. } => SubmissionState::Running,
            SubmissionEvent::Finished { submission } => submission.state,
        };
        self.seen
            .lock()
            .unwrap()
            .push((event.topic().to_string(), state));
        Ok(HookAction::Pass)
    }
}

fn request(source: &str) -> NewSubmission {
    NewSubmission::new("two-sum", "python", source)
}

mod lifecycle_hooks {
    use super::*;

    #[tokio::test]
    async fn hook_observes_every_transition_in_order() {
        let (engine, _) = start_engine(EngineConfig::default());
        let hook = RecordingHook::default();
        engine.add_hook(hook.clone()).await.unwrap();

        let id = engine.submit(request(TWO_SUM_PYTHON)).await.unwrap();
        let finished = engine.wait(id, Duration::from_secs(5)).await.unwrap();
        assert_eq!(finished.state, SubmissionState::Completed);
        // Finished fires after the state is published.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = hook.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (topics::SUBMISSION_QUEUED.to_string(), SubmissionState::Queued),
                (topics::SUBMISSION_STARTED.to_string(), SubmissionState::Running),
                (topics::SUBMISSION_FINISHED.to_string(), SubmissionState::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn removed_hook_stops_receiving_events() {
        let (engine, _) = start_engine(EngineConfig::default());
        let hook = RecordingHook::default();
        engine.add_hook(hook.clone()).await.unwrap();
        engine.remove_hook("recorder").await.unwrap();

        let id = engine.submit(request(TWO_SUM_PYTHON)).await.unwrap();
        engine.wait(id, Duration::from_secs(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(hook.seen.lock().unwrap().is_empty());
    }
}

mod scheduling {
    use super::*;

    #[tokio::test]
    async fn never_runs_more_than_pool_size_at_once() {
        let (engine, _) = start_engine(EngineConfig {
            pool_size: 2,
            ..Default::default()
        });
        let source = format!("{}\n{TWO_SUM_PYTHON}", directives::SLOW);

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(engine.submit(request(&source)).await.unwrap());
        }

        let mut peak = 0;
        loop {
            let states: Vec<SubmissionState> = ids
                .iter()
                .map(|id| engine.status(*id).unwrap().state)
                .collect();
            let running = states
                .iter()
                .filter(|s| **s == SubmissionState::Running)
                .count();
            peak = peak.max(running);
            assert!(running <= 2, "{running} submissions running at once");
            assert!(engine.in_flight() <= 2);
            if states.iter().all(|s| s.is_terminal()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(peak, 2);
        assert_eq!(engine.in_flight(), 0);
        for id in ids {
            assert_eq!(engine.status(id).unwrap().state, SubmissionState::Completed);
        }
    }

    #[tokio::test]
    async fn zero_pool_size_still_runs_one_worker() {
        let (engine, _) = start_engine(EngineConfig {
            pool_size: 0,
            ..Default::default()
        });

        let id = engine.submit(request(TWO_SUM_PYTHON)).await.unwrap();
        let submission = engine.wait(id, Duration::from_secs(10)).await.unwrap();
        assert_eq!(submission.state, SubmissionState::Completed);
    }

    #[tokio::test]
    async fn submissions_start_in_arrival_order() {
        let (engine, _) = start_engine(EngineConfig {
            pool_size: 1,
            ..Default::default()
        });
        let source = format!("{}\n{TWO_SUM_PYTHON}", directives::SLOW);

        let first = engine.submit(request(&source)).await.unwrap();
        let second = engine.submit(request(&source)).await.unwrap();
        engine.wait(second, Duration::from_secs(10)).await.unwrap();

        let first = engine.status(first).unwrap();
        let second = engine.status(second).unwrap();
        assert!(first.started_at.unwrap() <= second.started_at.unwrap());
        assert!(first.finished_at.unwrap() <= second.started_at.unwrap());
    }

    #[tokio::test]
    async fn queue_capacity_bounds_admission() {
        let (engine, _) = start_engine(EngineConfig {
            pool_size: 1,
            queue_capacity: 1,
            ..Default::default()
        });
        let hang = format!("{}\n{TWO_SUM_PYTHON}", directives::HANG);

        let running = engine.submit(request(&hang)).await.unwrap();
        let mut polls = 0;
        while engine.status(running).unwrap().state != SubmissionState::Running && polls < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            polls += 1;
        }
        engine.submit(request(&hang)).await.unwrap();

        let err = engine.submit(request(&hang)).await.unwrap_err();
        assert_eq!(err, EngineError::CapacityExceeded { capacity: 1 });
    }
}

mod shutdown {
    use super::*;

    #[tokio::test]
    async fn shutdown_cancels_queued_and_running_work() {
        let (engine, _) = start_engine(EngineConfig {
            pool_size: 1,
            ..Default::default()
        });
        let hang = format!("{}\n{TWO_SUM_PYTHON}", directives::HANG);
        let running = engine.submit(request(&hang)).await.unwrap();
        let queued = engine.submit(request(&hang)).await.unwrap();
        let mut polls = 0;
        while engine.status(running).unwrap().state != SubmissionState::Running && polls < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            polls += 1;
        }

        tokio::time::timeout(Duration::from_secs(5), engine.shutdown())
            .await
            .expect("shutdown should finish promptly");

        assert_eq!(engine.status(running).unwrap().state, SubmissionState::Cancelled);
        assert_eq!(engine.status(queued).unwrap().state, SubmissionState::Cancelled);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_refused() {
        let (engine, _) = start_engine(EngineConfig::default());
        engine.shutdown().await;

        let err = engine.submit(request(TWO_SUM_PYTHON)).await.unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }
}
