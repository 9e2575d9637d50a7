//! Pure message-composition functions for both Reporter sinks: the
//! review-feed comment and the chat summaries (§4.G).

use recheckwatch_model::{BugId, FailEvent};

/// Documentation page pointed to when a failure could not be
/// classified against any known bug.
const UNCLASSIFIED_DOC_URL: &str = "https://wiki.example.org/CI/TestFailures";

pub fn bug_url(bug_id: &BugId) -> String {
    format!("https://bugs.launchpad.net/bugs/{bug_id}")
}

/// The review comment for a fully or partially classified event: one
/// line per job, plus the standard recheck/reverify retry
/// instructions citing the first matched bug.
pub fn classified_review_comment(event: &FailEvent) -> String {
    let all_bugs = event.all_bugs();
    let mut lines = vec!["I noticed tests failed, I think you hit bug(s):".to_string(), String::new()];

    for job in &event.failed_jobs {
        if job.bugs.is_empty() {
            lines.push(format!("- {}: unrecognized error", job.name));
        } else {
            let urls = job.bugs.iter().map(bug_url).collect::<Vec<_>>().join(", ");
            lines.push(format!("- {}: {}", job.name, urls));
        }
    }

    if let Some(first_bug) = all_bugs.iter().next() {
        lines.push(String::new());
        lines.push(
            "We don't automatically recheck or reverify, so please consider doing that \
             manually if someone hasn't already. For a code review which is not yet \
             approved, you can recheck by leaving a code review comment with just the text:"
                .to_string(),
        );
        lines.push(String::new());
        lines.push(format!("    recheck bug {first_bug}"));
        lines.push(String::new());
        lines.push(
            "For a code review which has been approved but failed to merge, you can \
             reverify by leaving a comment like this:"
                .to_string(),
        );
        lines.push(String::new());
        lines.push(format!("    reverify bug {first_bug}"));
    }

    lines.join("\n")
}

/// The review comment for an event with no matched bugs at all.
pub fn unclassified_review_comment() -> String {
    format!("I noticed tests failed, but could not classify the failure against a known bug. Refer to: {UNCLASSIFIED_DOC_URL}")
}

pub fn review_comment(event: &FailEvent) -> String {
    if event.all_bugs().is_empty() {
        unclassified_review_comment()
    } else {
        classified_review_comment(event)
    }
}

/// Chat summary for a classified failure.
pub fn classified_chat_message(event: &FailEvent, bug_urls: &[String]) -> String {
    format!(
        "{} change: {} failed because of: {}",
        event.project,
        event.url,
        bug_urls.join(", ")
    )
}

/// Chat summary for an unrecognized (unclassified) failure.
pub fn unrecognized_chat_message(event: &FailEvent) -> String {
    format!(
        "{} change: {} failed with an unrecognized error",
        event.project, event.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use recheckwatch_model::event::Queue;
    use recheckwatch_model::FailJob;

    fn event_with(jobs: Vec<FailJob>) -> FailEvent {
        FailEvent {
            change: 64750,
            rev: 6,
            project: "keystone".to_string(),
            url: "https://review.example.org/#/c/64750/6".to_string(),
            queue: Queue::Gate,
            comment: "irrelevant".to_string(),
            failed_jobs: jobs,
        }
    }

    #[test]
    fn classified_comment_lists_each_job_and_cites_first_bug() {
        let mut a = FailJob::new("gate-keystone-python26", "http://x/d3fd328");
        a.record_bug("1234567".into());
        let b = FailJob::new("gate-keystone-python27", "http://x/5dd41fe");
        let event = event_with(vec![a, b]);

        let comment = review_comment(&event);
        assert!(comment.contains("gate-keystone-python26: https://bugs.launchpad.net/bugs/1234567"));
        assert!(comment.contains("gate-keystone-python27: unrecognized error"));
        assert!(comment.contains("recheck bug 1234567"));
        assert!(comment.contains("reverify bug 1234567"));
    }

    #[test]
    fn unclassified_comment_points_to_docs() {
        let event = event_with(vec![FailJob::new("gate-keystone-python26", "http://x/d3fd328")]);
        let comment = review_comment(&event);
        assert!(comment.contains(UNCLASSIFIED_DOC_URL));
        assert!(!comment.contains("recheck bug"));
    }

    #[test]
    fn chat_messages_match_the_expected_shape() {
        let event = event_with(vec![FailJob::new("gate-keystone-python26", "http://x/d3fd328")]);
        assert_eq!(
            unrecognized_chat_message(&event),
            "keystone change: https://review.example.org/#/c/64750/6 failed with an unrecognized error"
        );
        let msg = classified_chat_message(&event, &["https://bugs.launchpad.net/bugs/1234567".to_string()]);
        assert!(msg.starts_with("keystone change:"));
        assert!(msg.ends_with("1234567"));
    }
}
