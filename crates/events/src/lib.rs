//! Event Source (§4.D): consumes the live review-event feed and
//! distills CI-failure comments into [`FailEvent`]s.

pub mod filter;
pub mod raw;
pub mod ssh;

pub use filter::{accept, FilterConfig};
pub use raw::RawEvent;

use recheckwatch_model::FailEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("event feed connection failed: {0}")]
    Connection(String),
    #[error("malformed event on feed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// An authenticated source of raw review-event-feed lines.
///
/// The SSH-backed implementation lives in [`ssh`]; tests drive the
/// filtering pipeline directly against [`RawEvent`] values instead of
/// a live feed.
pub trait EventFeed: Send {
    /// Block until the next raw JSON line arrives on the feed.
    fn next_line(&mut self) -> Result<String, EventSourceError>;
}

/// Pull events from `feed` until one survives the filter in `config`,
/// blocking on malformed or filtered-out lines.
pub fn next_fail_event(
    feed: &mut dyn EventFeed,
    config: &FilterConfig,
) -> Result<FailEvent, EventSourceError> {
    loop {
        let line = feed.next_line()?;
        let raw: RawEvent = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        if let Some(event) = accept(&raw, config) {
            return Ok(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeFeed {
        lines: std::vec::IntoIter<String>,
    }

    impl EventFeed for FakeFeed {
        fn next_line(&mut self) -> Result<String, EventSourceError> {
            self.lines
                .next()
                .ok_or_else(|| EventSourceError::Connection("feed exhausted".to_string()))
        }
    }

    fn config() -> FilterConfig {
        FilterConfig {
            ci_username: "jenkins".to_string(),
            failure_line: FilterConfig::default_failure_line(),
            suppressed_job_substrings: vec![],
            suppress_nonvoting_annotation: true,
            gating_job_patterns: vec![],
        }
    }

    #[test]
    fn skips_non_json_and_filtered_lines_until_a_match() {
        let good = serde_json::json!({
            "type": "comment-added",
            "author": {"username": "jenkins"},
            "comment": "Build failed.  For information on how to proceed\n- gate-foo http://x : FAILURE\n",
            "change": {"number": "1", "project": "keystone", "url": "http://review/1"},
            "patchSet": {"number": "1"},
        })
        .to_string();

        let mut feed = FakeFeed {
            lines: vec!["not json".to_string(), "{}".to_string(), good].into_iter(),
        };
        let event = next_fail_event(&mut feed, &config()).unwrap();
        assert_eq!(event.change, 1);
    }

    #[test]
    fn propagates_connection_errors_when_the_feed_is_exhausted() {
        let mut feed = FakeFeed { lines: vec![].into_iter() };
        let err = next_fail_event(&mut feed, &config()).unwrap_err();
        assert!(matches!(err, EventSourceError::Connection(_)));
    }
}
