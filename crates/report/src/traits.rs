//! External collaborators the Reporter depends on (§6).

use recheckwatch_model::FailEvent;

#[async_trait::async_trait]
pub trait ReviewFeed: Send + Sync {
    async fn post_comment(&self, project: &str, change_id: &str, message: &str) -> Result<(), String>;
}

/// Metadata about a bug, used only to decide which channels' project
/// filters a classified failure satisfies.
#[derive(Debug, Clone, Default)]
pub struct BugInfo {
    pub target_projects: Vec<String>,
}

#[async_trait::async_trait]
pub trait BugTracker: Send + Sync {
    async fn bug(&self, bug_id: &str) -> Option<BugInfo>;
}

/// A `BugTracker` whose every bug targets the event's own project —
/// the default when no bug tracker is configured, which preserves the
/// original project-only interest check.
pub struct NoBugTracker;

#[async_trait::async_trait]
impl BugTracker for NoBugTracker {
    async fn bug(&self, _bug_id: &str) -> Option<BugInfo> {
        None
    }
}

/// Identify the change for [`ReviewFeed::post_comment`] the way the
/// review system expects: `<change>,<patchset>`.
pub fn change_id(event: &FailEvent) -> String {
    format!("{},{}", event.change, event.rev)
}
