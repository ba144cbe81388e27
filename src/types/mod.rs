// src/types/mod.rs - Wire models and poll outcomes shared across the relay

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// YouTube activities response body. Persisted verbatim as the video
/// snapshot, so unknown response fields must survive a round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFeed {
    #[serde(default)]
    pub items: Vec<ActivityItem>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One activity entry from the YouTube feed. Only upload activities carry
/// a `contentDetails.upload.videoId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(default)]
    pub snippet: ActivitySnippet,
    #[serde(rename = "contentDetails", default)]
    pub content_details: ContentDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivitySnippet {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "channelTitle", default)]
    pub channel_title: String,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentDetails {
    #[serde(default)]
    pub upload: Option<UploadDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

impl ActivityItem {
    /// Stable identifier for diffing. `None` for non-upload activities
    /// (likes, playlist adds), which are never announced.
    pub fn upload_id(&self) -> Option<&str> {
        self.content_details
            .upload
            .as_ref()
            .map(|u| u.video_id.as_str())
    }

    /// Direct watch link for an upload.
    pub fn watch_url(&self) -> Option<String> {
        self.upload_id()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
    }
}

/// Twitch streams response body. Persisted verbatim as the stream snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamRoster {
    #[serde(default)]
    pub streams: Vec<StreamRecord>,
}

/// One live stream as reported by the Twitch API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "_id")]
    pub id: u64,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub channel: StreamChannel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChannel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

impl StreamRecord {
    pub fn stream_url(&self) -> String {
        format!("https://twitch.tv/{}", self.channel.name)
    }
}

/// Change set for one Twitch poll cycle. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct StreamDiff {
    pub went_live: Vec<StreamRecord>,
    pub went_offline: Vec<StreamRecord>,
}

impl StreamDiff {
    pub fn is_empty(&self) -> bool {
        self.went_live.is_empty() && self.went_offline.is_empty()
    }
}

/// Outcome taxonomy for a poll cycle. `NoChange` is expected and only
/// logged; `Failure` aborts the cycle with the snapshot left untouched.
/// Callers branch on the variant instead of matching error strings.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("no changes detected")]
    NoChange,
    #[error(transparent)]
    Failure(#[from] anyhow::Error),
}

pub type PollResult<T> = Result<T, PollError>;

impl PollError {
    pub fn is_no_change(&self) -> bool {
        matches!(self, PollError::NoChange)
    }
}
