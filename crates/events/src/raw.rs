//! The raw shape of one event as delivered by the review-event feed
//! (§6 "Event feed").

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub author: RawAuthor,
    #[serde(default)]
    pub comment: String,
    pub change: RawChange,
    #[serde(rename = "patchSet")]
    pub patch_set: RawPatchSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawChange {
    pub number: String,
    pub project: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPatchSet {
    pub number: String,
}
