//! Chat channel subscription table: which channels want which kind of
//! event, for which projects.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The two subscription classes a channel can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Classified and unrecognized failures alike.
    Positive,
    /// Unrecognized failures and timeout notices only.
    Negative,
}

/// The raw per-channel document as it appears in the channel-config
/// YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub events: BTreeSet<EventKind>,
    #[serde(default)]
    pub projects: BTreeSet<String>,
}

/// The special project name that opts a channel into every project.
const ALL_PROJECTS: &str = "all";

/// The full channel-config document: named message templates plus the
/// per-channel subscription table, along with the inverted indices the
/// Reporter queries at dispatch time.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub messages: BTreeMap<String, String>,
    channels: BTreeMap<String, ChannelEntry>,
    events: BTreeMap<EventKind, BTreeSet<String>>,
    projects: BTreeMap<String, BTreeSet<String>>,
}

/// The shape the YAML document is parsed into before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfigDocument {
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelEntry>,
}

impl ChannelConfig {
    /// Normalize channel names (prepend `#` if absent) and build the
    /// `events -> {channels}` and `projects -> {channels}` inverted
    /// indices.
    pub fn from_document(doc: ChannelConfigDocument) -> Self {
        let mut channels = BTreeMap::new();
        for (name, entry) in doc.channels {
            let name = normalize_channel_name(&name);
            channels.insert(name, entry);
        }

        let mut events: BTreeMap<EventKind, BTreeSet<String>> = BTreeMap::new();
        let mut projects: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (channel, entry) in &channels {
            for kind in &entry.events {
                events.entry(*kind).or_default().insert(channel.clone());
            }
            for project in &entry.projects {
                projects
                    .entry(project.clone())
                    .or_default()
                    .insert(channel.clone());
            }
        }

        Self {
            messages: doc.messages,
            channels,
            events,
            projects,
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn subscribes(&self, channel: &str, kind: EventKind) -> bool {
        self.events
            .get(&kind)
            .is_some_and(|chans| chans.contains(channel))
    }

    /// `true` if `channel` is interested in `project`, either directly
    /// or via the `all` projects bucket.
    pub fn interested_in_project(&self, channel: &str, project: &str) -> bool {
        let direct = self
            .projects
            .get(project)
            .is_some_and(|chans| chans.contains(channel));
        let catch_all = self
            .projects
            .get(ALL_PROJECTS)
            .is_some_and(|chans| chans.contains(channel));
        direct || catch_all
    }
}

fn normalize_channel_name(name: &str) -> String {
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}
