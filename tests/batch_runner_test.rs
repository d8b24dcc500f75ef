mod common;

use batch_runner::{
    BatchRunner, BatchRunnerError, BatchRunnerOptions, FailureJobResult, JobExecutionError,
    JobResult, RunnerState, RunnerStatus, SuccessJobResult,
};
use common::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Records every invocation of a stopped-callback
fn capture_stops(runner: &BatchRunner<String>) -> Arc<Mutex<Vec<RunnerState<String>>>> {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    runner.on_stopped(move |state| sink.lock().push(state));
    calls
}

fn running_runner() -> BatchRunner<String> {
    let runner = runner(2, 2);
    for i in 0..10 {
        assert_ok!(runner.add_job(timed_job(1000, &i.to_string())));
    }
    assert_ok!(runner.start());
    runner
}

mod construction {
    use super::*;

    #[test]
    fn test_create_with_options() {
        let runner = assert_ok!(BatchRunner::<String>::create(
            BatchRunnerOptions::default()
                .with_batch_size(10)
                .with_concurrency(2)
        ));
        assert_eq!(runner.batch_size(), 10);
        assert_eq!(runner.concurrency(), 2);
    }

    #[test]
    fn test_create_without_options() {
        let runner = assert_ok!(BatchRunner::<String>::create(BatchRunnerOptions::default()));
        assert_eq!(
            runner.get_batch_runner_state(),
            RunnerState {
                status: RunnerStatus::Idle,
                processed_jobs: vec![],
                failed_jobs: vec![],
            }
        );
    }

    #[test]
    fn test_create_rejects_invalid_values() {
        let err = assert_err!(BatchRunner::<String>::create(
            BatchRunnerOptions::default()
                .with_batch_size(-10)
                .with_concurrency(-2)
        ));
        assert!(err.is_validation());
        assert!(err
            .to_string()
            .contains("'batch_size' must be between 1-1000 inclusive"));
    }
}

mod when_idle {
    use super::*;

    #[test]
    fn test_update_batch_size() {
        let runner = runner(1, 1);
        assert_ok!(runner.update_batch_size(10));
        assert_eq!(runner.batch_size(), 10);
    }

    #[test]
    fn test_update_rejects_out_of_range_values() {
        let runner = runner(1, 1);
        for value in [0, -10, 1001] {
            let err = assert_err!(runner.update_batch_size(value));
            assert!(err.is_validation());
            let err = assert_err!(runner.update_concurrency(value));
            assert!(err.is_validation());
        }
        assert_eq!(runner.batch_size(), 1);
        assert_eq!(runner.concurrency(), 1);
    }

    #[test]
    fn test_update_concurrency() {
        let runner = runner(1, 1);
        assert_ok!(runner.update_concurrency(10));
        assert_eq!(runner.concurrency(), 10);
    }

    #[test]
    fn test_add_job_returns_idle_projection() {
        let runner = runner(1, 1);
        let projection = assert_ok!(runner.add_job(timed_job(10, "1")));
        assert_eq!(projection, JobResult::Idle { id: "1".to_string() });
        assert_eq!(runner.get_jobs_count(), 1);
    }

    #[test]
    fn test_add_jobs_reports_each_job() {
        let runner = runner(1, 1);
        let results = runner.add_jobs(vec![
            timed_job(10, "1"),
            timed_job(10, "2"),
            timed_job(10, "1"),
        ]);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].as_ref().unwrap_err().is_validation());
        assert_eq!(runner.get_jobs_count(), 2);
    }

    #[test]
    fn test_clear_jobs() {
        let runner = runner(1, 1);
        assert_ok!(runner.add_job(timed_job(10, "1")));
        assert_eq!(runner.get_jobs_count(), 1);

        assert_ok!(runner.clear_jobs());
        assert_eq!(runner.get_jobs_count(), 0);
    }
}

mod when_running {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_state_starts_empty() {
        let runner = running_runner();
        assert_eq!(
            runner.get_batch_runner_state(),
            RunnerState {
                status: RunnerStatus::Running,
                processed_jobs: vec![],
                failed_jobs: vec![],
            }
        );
        assert_eq!(runner.get_jobs_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_are_rejected() {
        let runner = running_runner();

        let err = assert_err!(runner.update_batch_size(10));
        assert_eq!(
            err.to_string(),
            "cannot update 'batch_size' when runner is not in 'idle' status (current: 'running')"
        );

        let err = assert_err!(runner.update_concurrency(10));
        assert_eq!(
            err.to_string(),
            "cannot update 'concurrency' when runner is not in 'idle' status (current: 'running')"
        );

        let err = assert_err!(runner.add_job(timed_job(10, "late")));
        assert_eq!(
            err.to_string(),
            "cannot add job when runner is not in 'idle' status (current: 'running')"
        );

        let err = assert_err!(runner.clear_jobs());
        assert!(err.is_invalid_state());

        let err = assert_err!(runner.start());
        assert_eq!(
            err,
            BatchRunnerError::InvalidState {
                operation: "start",
                required: RunnerStatus::Idle,
                current: RunnerStatus::Running,
            }
        );

        assert_eq!(runner.batch_size(), 2);
        assert_eq!(runner.get_jobs_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_are_recorded_per_job_not_per_batch() {
        let runner = runner(2, 1);
        assert_ok!(runner.add_job(timed_job(100, "1")));
        assert_ok!(runner.add_job(timed_job(1000, "2")));
        assert_ok!(runner.start());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let state = runner.get_batch_runner_state();
        assert_eq!(processed_ids(&state), vec![1]);
        assert_eq!(state.status, RunnerStatus::Running);

        let state = runner.wait_for_stop().await;
        assert_eq!(processed_ids(&state), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_within_a_batch_run_concurrently() {
        let runner = runner(3, 1);
        for i in 1..=6 {
            assert_ok!(runner.add_job(timed_job(1000, &i.to_string())));
        }
        assert_ok!(runner.start());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(processed_ids(&runner.get_batch_runner_state()), vec![1, 2, 3]);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let state = runner.get_batch_runner_state();
        assert_eq!(processed_ids(&state), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(state.status, RunnerStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_fails_alone() {
        let runner = runner(3, 1);
        assert_ok!(runner.add_job(timed_job(100, "1")));
        assert_ok!(runner.add_job(timed_panicking_job(100, "2")));
        assert_ok!(runner.add_job(timed_job(100, "3")));
        assert_ok!(runner.start());

        let state = runner.wait_for_stop().await;
        assert_eq!(processed_ids(&state), vec![1, 3]);
        assert_eq!(
            state.failed_jobs,
            vec![FailureJobResult {
                id: "2".to_string(),
                error: JobExecutionError::new("job panicked: work function blew up"),
            }]
        );
    }
}

mod when_stopped {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_run_drains_in_flight_batches() {
        let runner = runner_with_every_third_failing(1, 2, 10, 1000);
        let stops = capture_stops(&runner);
        assert_ok!(runner.start());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let state = runner.stop();

        assert_eq!(state.status, RunnerStatus::Stopped);
        // Only jobs 1-4 can have settled after 2.1s
        assert_eq!(processed_ids(&state), vec![1, 2, 4]);
        assert_eq!(
            state.failed_jobs,
            vec![FailureJobResult {
                id: "3".to_string(),
                error: JobExecutionError::new("3"),
            }]
        );

        {
            let stops = stops.lock();
            assert_eq!(stops.len(), 1);
            assert_eq!(stops[0], state);
        }

        // Jobs 5 and 6 were in flight and still finish
        let drained = runner.wait_for_drain().await;
        assert_eq!(processed_ids(&drained), vec![1, 2, 4, 5]);
        assert_eq!(failed_ids(&drained), vec![3, 6]);
        assert_eq!(drained.status, RunnerStatus::Stopped);
        assert_eq!(stops.lock().len(), 1);

        // Nothing past the drained batches ever starts
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(runner.get_batch_runner_state().outcome_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_all_jobs_and_stops() {
        let runner = runner_with_every_third_failing(1, 2, 10, 1000);
        let stops = capture_stops(&runner);
        assert_ok!(runner.start());

        tokio::time::sleep(Duration::from_millis(5100)).await;
        let state = runner.get_batch_runner_state();

        assert_eq!(state.status, RunnerStatus::Stopped);
        assert_eq!(processed_ids(&state), vec![1, 2, 4, 5, 7, 8, 10]);
        assert_eq!(failed_ids(&state), vec![3, 6, 9]);
        assert!(state
            .processed_jobs
            .iter()
            .all(|job| job.result == job.id));
        assert!(state
            .failed_jobs
            .iter()
            .all(|job| job.error == JobExecutionError::new(job.id.clone())));

        let stops = stops.lock();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0], state);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_of_two_complete_all_jobs() {
        let runner = runner_with_every_third_failing(2, 2, 20, 500);
        assert_eq!(runner.get_jobs_count(), 20);
        assert_ok!(runner.start());

        let state = runner.wait_for_stop().await;
        assert_eq!(state.processed_jobs.len(), 14);
        assert_eq!(state.failed_jobs.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_of_two_stop_keeps_partial_progress() {
        let runner = runner_with_every_third_failing(2, 2, 20, 500);
        assert_ok!(runner.start());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let state = runner.stop();
        assert_eq!(state.outcome_count(), 8);

        let drained = runner.wait_for_drain().await;
        assert_eq!(drained.outcome_count(), 12);
        assert_eq!(processed_ids(&drained), vec![1, 2, 4, 5, 7, 8, 10, 11]);
        assert_eq!(failed_ids(&drained), vec![3, 6, 9, 12]);
    }

    #[test]
    fn test_empty_queue_stops_immediately() {
        let runner = runner(1, 2);
        let stops = capture_stops(&runner);

        assert_eq!(assert_ok!(runner.start()), RunnerStatus::Stopped);
        let expected = RunnerState {
            status: RunnerStatus::Stopped,
            processed_jobs: Vec::<SuccessJobResult<String>>::new(),
            failed_jobs: vec![],
        };
        assert_eq!(runner.get_batch_runner_state(), expected);
        assert_eq!(*stops.lock(), vec![expected]);
    }

    #[test]
    fn test_mutations_after_stop_are_rejected() {
        let runner = runner(1, 1);
        assert_ok!(runner.add_job(timed_job(10, "1")));
        runner.stop();
        let before = runner.get_batch_runner_state();

        assert!(assert_err!(runner.add_job(timed_job(10, "2"))).is_invalid_state());
        assert!(assert_err!(runner.clear_jobs()).is_invalid_state());
        assert!(assert_err!(runner.update_batch_size(5)).is_invalid_state());
        assert!(assert_err!(runner.update_concurrency(5)).is_invalid_state());
        let err = assert_err!(runner.start());
        assert!(err.is_invalid_state());
        assert_eq!(
            err.to_string(),
            "cannot start when runner is not in 'idle' status (current: 'stopped')"
        );

        assert_eq!(runner.get_batch_runner_state(), before);
        assert_eq!(runner.batch_size(), 1);
        assert_eq!(runner.get_jobs_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let runner = runner(1, 1);
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = invocations.clone();
        runner.on_stopped(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let first = runner.stop();
        let second = runner.shutdown();
        assert_eq!(first, second);
        assert_eq!(first.status, RunnerStatus::Stopped);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        // Never dispatched anything, so draining is already complete
        assert_eq!(runner.wait_for_drain().await, first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_registration_last_wins() {
        let runner = runner(1, 1);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        runner.on_stopped(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        runner.on_stopped(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_ok!(runner.add_job(timed_job(100, "1")));
        assert_ok!(runner.start());
        runner.wait_for_stop().await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}

mod unsupported_operations {
    use super::*;

    #[test]
    fn test_pause_is_not_supported() {
        let runner = runner(1, 1);
        let err = assert_err!(runner.pause());
        assert_eq!(err, BatchRunnerError::UnsupportedOperation("pause"));
        assert_eq!(err.to_string(), "operation 'pause' is not supported yet");
        assert_eq!(runner.status(), RunnerStatus::Idle);
    }

    #[test]
    fn test_resume_is_not_supported() {
        let runner = runner(1, 1);
        let err = assert_err!(runner.resume());
        assert_eq!(err.to_string(), "operation 'resume' is not supported yet");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_outcomes_recorded_exactly_once_under_multithreaded_runtime() {
    let runner = runner(3, 4);
    for i in 1..=60 {
        let id = i.to_string();
        let job = if i % 5 == 0 {
            timed_failed_job(5, &id)
        } else {
            timed_job(5, &id)
        };
        assert_ok!(runner.add_job(job));
    }
    let stops = capture_stops(&runner);
    assert_ok!(runner.start());

    let state = tokio::time::timeout(Duration::from_secs(10), runner.wait_for_drain())
        .await
        .expect("runner drains");

    assert_eq!(state.status, RunnerStatus::Stopped);
    assert_eq!(state.outcome_count(), 60);
    assert_eq!(failed_ids(&state), (1..=12).map(|i| i * 5).collect::<Vec<_>>());
    assert_eq!(
        processed_ids(&state),
        (1..=60).filter(|i| i % 5 != 0).collect::<Vec<_>>()
    );
    assert_eq!(stops.lock().len(), 1);
}
