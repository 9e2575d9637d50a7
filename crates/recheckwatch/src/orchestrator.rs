//! Orchestrator (§4.H): the single long-lived loop wiring the event
//! source, readiness gate, classifier, and reporter together.

use recheckwatch_events::{next_fail_event, EventFeed, FilterConfig};
use recheckwatch_readiness::{JobIdentity, ReadinessError, ReadinessGate};
use recheckwatch_report::Reporter;
use tracing::{error, warn};

use recheckwatch_classify::Classifier;

pub struct Orchestrator {
    feed: Box<dyn EventFeed>,
    filter_config: FilterConfig,
    readiness: ReadinessGate,
    classifier: Classifier,
    reporter: Reporter,
}

impl Orchestrator {
    pub fn new(
        feed: Box<dyn EventFeed>,
        filter_config: FilterConfig,
        readiness: ReadinessGate,
        classifier: Classifier,
        reporter: Reporter,
    ) -> Self {
        Self {
            feed,
            filter_config,
            readiness,
            classifier,
            reporter,
        }
    }

    /// Run forever. Per-event errors are logged and the loop
    /// continues with the next event (§4.H, §7 "Uncaught").
    ///
    /// `next_fail_event` blocks on the underlying SSH channel, so it
    /// runs on a blocking-pool thread each iteration; the feed is
    /// handed back and forth across that boundary.
    pub async fn run(&mut self) -> ! {
        loop {
            let mut feed = std::mem::replace(&mut self.feed, Box::new(ExhaustedFeed));
            let filter_config = self.filter_config.clone();
            let (feed, outcome) = tokio::task::spawn_blocking(move || {
                let outcome = next_fail_event(feed.as_mut(), &filter_config);
                (feed, outcome)
            })
            .await
            .expect("event feed blocking task panicked");
            self.feed = feed;

            let mut event = match outcome {
                Ok(event) => event,
                Err(e) => {
                    error!(error = %e, "event feed error, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            let jobs: Vec<JobIdentity> = event
                .failed_jobs
                .iter()
                .map(|job| {
                    let requires_service_logs = self
                        .filter_config
                        .gating_job_patterns
                        .iter()
                        .any(|re| re.is_match(&job.name));
                    JobIdentity::for_job(event.change, event.rev, job, requires_service_logs)
                })
                .collect();

            if let Err(ReadinessError::ResultTimedOut { job }) = self.readiness.wait_for(&jobs).await {
                warn!(change = event.change, rev = event.rev, %job, "readiness gate timed out");
                let msg = format!(
                    "change {}/{} job {job} timed out waiting for log index readiness",
                    event.change, event.rev
                );
                self.reporter.dispatch_message(&msg).await;
                continue;
            }

            for job in &mut event.failed_jobs {
                let short_build_uuid = job.short_build_uuid().to_string();
                match self.classifier.classify(event.change, event.rev, &short_build_uuid).await {
                    Ok(bugs) => {
                        for bug in bugs {
                            job.record_bug(bug);
                        }
                    }
                    Err(e) => {
                        error!(change = event.change, rev = event.rev, error = %e, "classification failed for job");
                    }
                }
            }

            self.reporter.dispatch(&event).await;
        }
    }
}

/// Placeholder occupying `Orchestrator::feed` only for the instant it
/// is handed off to the blocking pool and back.
struct ExhaustedFeed;

impl EventFeed for ExhaustedFeed {
    fn next_line(&mut self) -> Result<String, recheckwatch_events::EventSourceError> {
        Err(recheckwatch_events::EventSourceError::Connection(
            "placeholder feed polled".to_string(),
        ))
    }
}
