//! Event Source filtering pipeline (§4.D): turns a raw feed event into
//! a [`FailEvent`], or drops it.

use recheckwatch_model::event::Queue;
use recheckwatch_model::{FailEvent, FailJob};
use regex::Regex;

use crate::raw::RawEvent;

/// The literal marker that distinguishes a CI failure comment from
/// every other comment-added event.
const FAILURE_MARKER: &str = "Build failed.  For information on how to proceed";

/// Policy knobs for the filtering pipeline. Two historical unit-test
/// suppression strategies coexist (§9 Open Questions): suppressing by
/// job-name substring (`python2`/`pep8`) and suppressing by an explicit
/// `(non-voting)` annotation on the failure line. Both are exposed so
/// operators can enable either, both, or neither.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Username of the CI account whose comments we watch.
    pub ci_username: String,
    /// A failure line is accepted only if it matches this pattern.
    pub failure_line: Regex,
    /// Job-name substrings that suppress a matched line even though it
    /// says FAILURE (legacy python2/pep8 unit-test exclusion).
    pub suppressed_job_substrings: Vec<String>,
    /// Suppress lines explicitly annotated non-voting.
    pub suppress_nonvoting_annotation: bool,
    /// At least one of these regexes must appear in the comment for the
    /// event to be kept (the "gating-job name" project filter).
    pub gating_job_patterns: Vec<Regex>,
}

impl FilterConfig {
    /// The canonical `- <name> <url> : FAILURE` line pattern, with an
    /// optional trailing `(non-voting)` annotation.
    pub fn default_failure_line() -> Regex {
        Regex::new(r"(?m)^-\s*(?P<name>\S+)\s+(?P<url>\S+)\s*:\s*FAILURE(?P<nonvoting>\s*\(non-voting\))?\s*$")
            .expect("failure-line pattern is a valid regex")
    }
}

/// Apply the full §4.D filter chain to one raw feed event.
///
/// Returns `None` if the event should be dropped at any stage.
pub fn accept(event: &RawEvent, config: &FilterConfig) -> Option<FailEvent> {
    if event.kind != "comment-added" {
        return None;
    }
    if event.author.username != config.ci_username {
        return None;
    }
    if !event.comment.contains(FAILURE_MARKER) {
        return None;
    }

    let failed_jobs = parse_failure_lines(&event.comment, config);
    if failed_jobs.is_empty() {
        return None;
    }

    let matches_gating_job = config
        .gating_job_patterns
        .iter()
        .any(|re| re.is_match(&event.comment));
    if !config.gating_job_patterns.is_empty() && !matches_gating_job {
        return None;
    }

    let change: u64 = event.change.number.parse().ok()?;
    let rev: u64 = event.patch_set.number.parse().ok()?;

    Some(FailEvent {
        change,
        rev,
        project: event.change.project.clone(),
        url: event.change.url.clone(),
        queue: detect_queue(&failed_jobs),
        comment: event.comment.clone(),
        failed_jobs,
    })
}

/// A build log URL carries its pipeline as a path segment (Zuul's
/// layout: `.../<change>/<patchset>/<pipeline>/<job>/<build>/...`).
/// Any job logged under `check` puts the whole event on the check
/// queue; absent that segment, a failure is assumed to be a gate
/// failure (the historically dominant case this bot was built for).
fn detect_queue(jobs: &[FailJob]) -> Queue {
    let on_check = jobs
        .iter()
        .any(|job| job.url.split('/').any(|segment| segment == "check"));
    if on_check {
        Queue::Check
    } else {
        Queue::Gate
    }
}

fn parse_failure_lines(comment: &str, config: &FilterConfig) -> Vec<FailJob> {
    config
        .failure_line
        .captures_iter(comment)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str();
            let url = caps.name("url")?.as_str();
            let nonvoting = caps.name("nonvoting").is_some();

            if config.suppress_nonvoting_annotation && nonvoting {
                return None;
            }
            if config
                .suppressed_job_substrings
                .iter()
                .any(|s| name.contains(s.as_str()))
            {
                return None;
            }

            Some(FailJob::new(name, url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FilterConfig {
        FilterConfig {
            ci_username: "jenkins".to_string(),
            failure_line: FilterConfig::default_failure_line(),
            suppressed_job_substrings: vec!["python2".to_string(), "pep8".to_string()],
            suppress_nonvoting_annotation: true,
            gating_job_patterns: vec![Regex::new(r"gate-\S+-devstack").unwrap()],
        }
    }

    fn raw(comment: &str) -> RawEvent {
        RawEvent {
            kind: "comment-added".to_string(),
            author: crate::raw::RawAuthor {
                username: "jenkins".to_string(),
            },
            comment: comment.to_string(),
            change: crate::raw::RawChange {
                number: "64750".to_string(),
                project: "keystone".to_string(),
                url: "https://review.example.org/#/c/64750/6".to_string(),
            },
            patch_set: crate::raw::RawPatchSet {
                number: "6".to_string(),
            },
        }
    }

    #[test]
    fn accepts_a_well_formed_failure_comment() {
        let comment = format!(
            "{}\n- gate-keystone-devstack-vm-full http://logs.example.org/d3fd328 : FAILURE\n",
            FAILURE_MARKER
        );
        let event = accept(&raw(&comment), &config()).unwrap();
        assert_eq!(event.change, 64750);
        assert_eq!(event.rev, 6);
        assert_eq!(event.failed_jobs.len(), 1);
        assert_eq!(event.failed_jobs[0].name, "gate-keystone-devstack-vm-full");
    }

    #[test]
    fn drops_events_from_other_authors() {
        let mut e = raw(&format!("{FAILURE_MARKER}\n- x http://y : FAILURE\n"));
        e.author.username = "someone-else".to_string();
        assert!(accept(&e, &config()).is_none());
    }

    #[test]
    fn drops_events_missing_the_marker() {
        let e = raw("nothing relevant here");
        assert!(accept(&e, &config()).is_none());
    }

    #[test]
    fn drops_nonvoting_annotated_lines() {
        let comment = format!(
            "{}\n- gate-keystone-devstack-vm-full http://logs.example.org/d3fd328 : FAILURE (non-voting)\n",
            FAILURE_MARKER
        );
        assert!(accept(&raw(&comment), &config()).is_none());
    }

    #[test]
    fn drops_python2_and_pep8_unit_test_lines() {
        let comment = format!(
            "{}\n- gate-keystone-python27 http://logs.example.org/5dd41fe : FAILURE\n",
            FAILURE_MARKER
        );
        let mut cfg = config();
        cfg.gating_job_patterns.clear();
        let event = accept(&raw(&comment), &cfg).unwrap();
        assert_eq!(event.failed_jobs.len(), 1);

        let comment = format!(
            "{}\n- gate-keystone-python26 http://logs.example.org/d3fd328 : FAILURE\n",
            FAILURE_MARKER
        );
        assert!(accept(&raw(&comment), &cfg).is_none());
    }

    #[test]
    fn drops_events_not_matching_the_gating_job_filter() {
        let comment = format!(
            "{}\n- some-unrelated-job http://logs.example.org/d3fd328 : FAILURE\n",
            FAILURE_MARKER
        );
        assert!(accept(&raw(&comment), &config()).is_none());
    }

    #[test]
    fn multiple_failure_lines_become_multiple_jobs() {
        let comment = format!(
            "{}\n- gate-keystone-devstack-vm-full http://logs.example.org/d3fd328 : FAILURE\n\
             - gate-keystone-devstack-vm-postgres http://logs.example.org/5dd41fe : FAILURE\n",
            FAILURE_MARKER
        );
        let event = accept(&raw(&comment), &config()).unwrap();
        assert_eq!(event.failed_jobs.len(), 2);
    }

    #[test]
    fn a_job_url_under_the_check_pipeline_puts_the_event_on_the_check_queue() {
        let comment = format!(
            "{}\n- gate-keystone-devstack-vm-full http://logs.example.org/63/47463/3/check/gate-keystone-devstack-vm-full/d3fd328/console.html : FAILURE\n",
            FAILURE_MARKER
        );
        let event = accept(&raw(&comment), &config()).unwrap();
        assert_eq!(event.queue, Queue::Check);
    }

    #[test]
    fn a_job_url_under_the_gate_pipeline_puts_the_event_on_the_gate_queue() {
        let comment = format!(
            "{}\n- gate-keystone-devstack-vm-full http://logs.example.org/63/47463/3/gate/gate-keystone-devstack-vm-full/d3fd328/console.html : FAILURE\n",
            FAILURE_MARKER
        );
        let event = accept(&raw(&comment), &config()).unwrap();
        assert_eq!(event.queue, Queue::Gate);
    }
}
