//! Job and runner builders shared by the integration tests

#![allow(dead_code)]

use anyhow::anyhow;
use batch_runner::{BatchRunner, BatchRunnerOptions, Job, JobOptions, RunnerState};
use std::time::Duration;

/// Job that resolves with its own id after `millis`
pub fn timed_job(millis: u64, id: &str) -> Job<String> {
    let value = id.to_string();
    Job::create(JobOptions::new().id(id).job_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(value)
    }))
    .expect("valid job options")
}

/// Job that fails with its own id as the error message after `millis`
pub fn timed_failed_job(millis: u64, id: &str) -> Job<String> {
    let message = id.to_string();
    Job::create(JobOptions::new().id(id).job_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Err(anyhow!(message))
    }))
    .expect("valid job options")
}

/// Job that panics after `millis`
pub fn timed_panicking_job(millis: u64, id: &str) -> Job<String> {
    Job::create(JobOptions::new().id(id).job_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        if millis < u64::MAX {
            panic!("work function blew up");
        }
        Ok(String::new())
    }))
    .expect("valid job options")
}

pub fn runner(batch_size: i64, concurrency: i64) -> BatchRunner<String> {
    BatchRunner::create(
        BatchRunnerOptions::default()
            .with_batch_size(batch_size)
            .with_concurrency(concurrency),
    )
    .expect("valid runner options")
}

/// Runner loaded with jobs `1..=count`, where every 3rd job fails
pub fn runner_with_every_third_failing(
    batch_size: i64,
    concurrency: i64,
    count: usize,
    millis: u64,
) -> BatchRunner<String> {
    let runner = runner(batch_size, concurrency);
    for i in 1..=count {
        let id = i.to_string();
        let job = if i % 3 == 0 {
            timed_failed_job(millis, &id)
        } else {
            timed_job(millis, &id)
        };
        runner.add_job(job).expect("runner is idle");
    }
    runner
}

/// Ids of successful outcomes, sorted numerically
pub fn processed_ids(state: &RunnerState<String>) -> Vec<u32> {
    let mut ids: Vec<u32> = state
        .processed_jobs
        .iter()
        .map(|job| job.id.parse().expect("numeric id"))
        .collect();
    ids.sort_unstable();
    ids
}

/// Ids of failed outcomes, sorted numerically
pub fn failed_ids(state: &RunnerState<String>) -> Vec<u32> {
    let mut ids: Vec<u32> = state
        .failed_jobs
        .iter()
        .map(|job| job.id.parse().expect("numeric id"))
        .collect();
    ids.sort_unstable();
    ids
}
