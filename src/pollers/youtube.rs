use anyhow::Context;
use log::{debug, info};
use std::collections::HashSet;

use crate::config::ConfigHandle;
use crate::store;
use crate::types::{ActivityFeed, ActivityItem, PollError, PollResult};

const ACTIVITIES_URL: &str = "https://www.googleapis.com/youtube/v3/activities";
const MAX_RESULTS: &str = "25";

/// Polls the YouTube activities feed for one tracked channel and reports
/// uploads that were absent from the previous snapshot.
pub struct YouTubePoller {
    http: reqwest::Client,
    config: ConfigHandle,
}

impl YouTubePoller {
    pub fn new(http: reqwest::Client, config: ConfigHandle) -> Self {
        Self { http, config }
    }

    /// One poll cycle: fetch, diff against the snapshot, persist the new
    /// feed unconditionally. `NoChange` when nothing new was uploaded;
    /// any fetch or parse error leaves the snapshot untouched.
    pub async fn poll(&self) -> PollResult<Vec<ActivityItem>> {
        let config = self.config.get().await;

        let feed: ActivityFeed = self
            .http
            .get(ACTIVITIES_URL)
            .query(&[
                ("maxResults", MAX_RESULTS),
                ("part", "snippet,contentDetails"),
                ("channelId", config.youtube.channel_id.as_str()),
                ("key", config.youtube.key.as_str()),
            ])
            .send()
            .await
            .context("YouTube activities request failed")?
            .error_for_status()
            .context("YouTube activities request rejected")?
            .json()
            .await
            .context("failed to parse YouTube activities response")?;

        debug!(
            "Fetched {} activity items for channel {}",
            feed.items.len(),
            config.youtube.channel_id
        );

        let fresh = settle_feed(&config.youtube.datafile, &feed).await?;
        info!("Found {} new upload(s)", fresh.len());
        Ok(fresh)
    }
}

/// Diff a fetched feed against the snapshot and make it the new
/// snapshot. The write happens even when nothing is new; only a failed
/// fetch leaves the snapshot alone, and that never reaches this point.
async fn settle_feed(datafile: &std::path::Path, feed: &ActivityFeed) -> PollResult<Vec<ActivityItem>> {
    let previous: ActivityFeed = store::load_snapshot(datafile).await;
    let fresh = new_uploads(&previous, feed);

    store::save_snapshot(datafile, feed).await;

    if fresh.is_empty() {
        return Err(PollError::NoChange);
    }
    Ok(fresh)
}

/// Items of `current` whose upload id is absent from `previous`,
/// restricted to activities that actually are uploads.
pub fn new_uploads(previous: &ActivityFeed, current: &ActivityFeed) -> Vec<ActivityItem> {
    let known: HashSet<&str> = previous.items.iter().filter_map(|i| i.upload_id()).collect();

    current
        .items
        .iter()
        .filter(|item| match item.upload_id() {
            Some(id) => !known.contains(id),
            None => false,
        })
        .cloned()
        .collect()
}
