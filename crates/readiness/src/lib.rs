//! Readiness Gate (§4.E): waits for the log-index backend to have
//! fully absorbed a failed build's artifacts before classification
//! proceeds.

use std::sync::Arc;
use std::time::Duration;

use recheckwatch_model::FailJob;
use recheckwatch_search::query_builder::{files_ready, result_ready};
use recheckwatch_search::LogIndexBackend;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("readiness polling exhausted its retries for {job}")]
    ResultTimedOut { job: String },
}

/// The fixed service-log artifact set required for integration-test
/// jobs, beyond the universal `console.html`.
const INTEGRATION_TEST_FILES: &[&str] = &[
    "console.html",
    "logs/screen-n-api.txt",
    "logs/screen-n-cpu.txt",
    "logs/screen-n-sch.txt",
    "logs/screen-c-api.txt",
    "logs/screen-c-vol.txt",
    "logs/syslog.txt",
];

/// Retry/sleep parameters for both readiness phases.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessConfig {
    pub retries: u32,
    pub poll_interval: Duration,
    pub grace_period: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            retries: 20,
            poll_interval: Duration::from_secs(40),
            grace_period: Duration::from_secs(10),
        }
    }
}

/// A single failed job's readiness-gate identity: the fields needed to
/// scope the readiness queries to this build.
#[derive(Debug, Clone)]
pub struct JobIdentity {
    pub change: u64,
    pub patch: u64,
    pub name: String,
    pub short_build_uuid: String,
    /// `true` for jobs matching the integration-test naming, which
    /// require the full service-log file set rather than just the
    /// console log.
    pub requires_service_logs: bool,
}

impl JobIdentity {
    pub fn for_job(change: u64, patch: u64, job: &FailJob, requires_service_logs: bool) -> Self {
        Self {
            change,
            patch,
            name: job.name.clone(),
            short_build_uuid: job.short_build_uuid().to_string(),
            requires_service_logs,
        }
    }

    fn required_files(&self) -> &'static [&'static str] {
        if self.requires_service_logs {
            INTEGRATION_TEST_FILES
        } else {
            &INTEGRATION_TEST_FILES[..1]
        }
    }
}

/// Waits on a [`LogIndexBackend`] for a job's artifacts to appear.
pub struct ReadinessGate {
    backend: Arc<dyn LogIndexBackend>,
    config: ReadinessConfig,
}

impl ReadinessGate {
    pub fn new(backend: Arc<dyn LogIndexBackend>, config: ReadinessConfig) -> Self {
        Self { backend, config }
    }

    /// Run both phases for every job, sequentially. A single job's
    /// timeout fails the whole wait — the caller (orchestrator)
    /// abandons the event on `ResultTimedOut`.
    pub async fn wait_for(&self, jobs: &[JobIdentity]) -> Result<(), ReadinessError> {
        for job in jobs {
            self.wait_console_present(job).await?;
            self.wait_files_present(job).await?;
        }
        Ok(())
    }

    /// Phase 1: poll until the console-log completion marker is
    /// indexed, or a transient backend error occurs (treated as "not
    /// yet ready" for this attempt).
    async fn wait_console_present(&self, job: &JobIdentity) -> Result<(), ReadinessError> {
        let query = result_ready(job.change, job.patch, &job.name, &job.short_build_uuid);
        for _ in 0..self.config.retries {
            match self.backend.search(&query, 10, true).await {
                Ok(result) if !result.is_empty() => return Ok(()),
                _ => tokio::time::sleep(self.config.poll_interval).await,
            }
        }
        Err(ReadinessError::ResultTimedOut {
            job: job.name.clone(),
        })
    }

    /// Phase 2: poll the files-ready facet until every required
    /// filename has been indexed, then wait out the grace period
    /// before returning.
    async fn wait_files_present(&self, job: &JobIdentity) -> Result<(), ReadinessError> {
        let query = files_ready(job.change, job.patch, &job.name, &job.short_build_uuid);
        let required = job.required_files();

        for _ in 0..self.config.retries {
            match self.backend.search(&query, 80, true).await {
                Ok(result) => {
                    let present: Vec<&str> = result.filenames().collect();
                    if required.iter().all(|f| present.contains(f)) {
                        tokio::time::sleep(self.config.grace_period).await;
                        return Ok(());
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(_) => tokio::time::sleep(self.config.poll_interval).await,
            }
        }
        Err(ReadinessError::ResultTimedOut {
            job: job.name.clone(),
        })
    }
}
