//! Reporter (§4.G): formats and dispatches review comments and chat
//! messages, subject to per-channel subscription rules.

use std::sync::Arc;

use recheckwatch_chat::ChatHandle;
use recheckwatch_model::channel::EventKind;
use recheckwatch_model::event::Queue;
use recheckwatch_model::{ChannelConfig, FailEvent};
use tracing::{error, info};

use crate::messages::{
    bug_url, classified_chat_message, review_comment, unrecognized_chat_message,
};
use crate::traits::{change_id, BugTracker, NoBugTracker, ReviewFeed};

pub struct Reporter {
    chat: Option<ChatHandle>,
    review_feed: Arc<dyn ReviewFeed>,
    bug_tracker: Arc<dyn BugTracker>,
    channel_config: ChannelConfig,
    /// `-n/--nocomment`: suppress the actual review-feed post.
    nocomment: bool,
    /// Drop check-queue failures before they reach chat (§9 Open
    /// Questions); review comments are unaffected.
    suppress_check_queue_chat: bool,
}

impl Reporter {
    pub fn new(
        chat: Option<ChatHandle>,
        review_feed: Arc<dyn ReviewFeed>,
        channel_config: ChannelConfig,
        nocomment: bool,
    ) -> Self {
        Self {
            chat,
            review_feed,
            bug_tracker: Arc::new(NoBugTracker),
            channel_config,
            nocomment,
            suppress_check_queue_chat: true,
        }
    }

    pub fn with_check_queue_chat_suppression(mut self, suppress: bool) -> Self {
        self.suppress_check_queue_chat = suppress;
        self
    }

    pub fn with_bug_tracker(mut self, tracker: Arc<dyn BugTracker>) -> Self {
        self.bug_tracker = tracker;
        self
    }

    /// Channel dispatch plus the review comment, for one classified (or
    /// unclassified) failure event.
    pub async fn dispatch(&self, event: &FailEvent) {
        self.dispatch_channels(event).await;
        self.leave_review_comment(event).await;
    }

    /// A free-form notice (e.g. a readiness timeout) posted only to
    /// `negative`-subscribed channels.
    pub async fn dispatch_message(&self, msg: &str) {
        let Some(chat) = &self.chat else { return };
        for channel in self.channel_config.channels() {
            if self.channel_config.subscribes(channel, EventKind::Negative) {
                if let Err(e) = chat.send(channel, msg).await {
                    error!(%channel, error = %e, "failed to send chat notice");
                }
            }
        }
    }

    async fn dispatch_channels(&self, event: &FailEvent) {
        // Check-queue failures are considered spam by default; only
        // gate failures reach chat unless this is turned off.
        if self.suppress_check_queue_chat && event.queue != Queue::Gate {
            return;
        }
        let Some(chat) = &self.chat else { return };

        let all_bugs = event.all_bugs();
        for channel in self.channel_config.channels() {
            if all_bugs.is_empty() {
                if self.channel_config.subscribes(channel, EventKind::Negative) {
                    let msg = unrecognized_chat_message(event);
                    if let Err(e) = chat.send(channel, msg).await {
                        error!(%channel, error = %e, "failed to send chat notice");
                    }
                }
                continue;
            }

            if !self.channel_config.subscribes(channel, EventKind::Positive) {
                continue;
            }

            let projects = self.bug_target_projects(event, &all_bugs).await;
            let interested = projects
                .iter()
                .any(|p| self.channel_config.interested_in_project(channel, p));
            if !interested {
                continue;
            }

            let urls: Vec<String> = all_bugs.iter().map(bug_url).collect();
            let msg = classified_chat_message(event, &urls);
            if let Err(e) = chat.send(channel, msg).await {
                error!(%channel, error = %e, "failed to send chat notice");
            }
        }
    }

    async fn leave_review_comment(&self, event: &FailEvent) {
        if self.nocomment {
            info!(change = event.change, rev = event.rev, "nocomment mode: suppressing review post");
            return;
        }
        let message = review_comment(event);
        if let Err(e) = self
            .review_feed
            .post_comment(&event.project, &change_id(event), &message)
            .await
        {
            error!(change = event.change, rev = event.rev, error = %e, "failed to post review comment");
        }
    }

    /// The set of projects any of `bugs` targets, via the bug tracker;
    /// falls back to the event's own project when the tracker has no
    /// data for a bug (including when none is configured).
    async fn bug_target_projects(
        &self,
        event: &FailEvent,
        bugs: &std::collections::BTreeSet<String>,
    ) -> Vec<String> {
        let mut projects = Vec::new();
        for bug in bugs {
            match self.bug_tracker.bug(bug).await {
                Some(info) if !info.target_projects.is_empty() => {
                    projects.extend(info.target_projects);
                }
                _ => projects.push(event.project.clone()),
            }
        }
        projects.sort();
        projects.dedup();
        projects
    }
}
