use anyhow::{anyhow, Context};
use log::{debug, info};
use std::collections::HashSet;

use crate::config::ConfigHandle;
use crate::store;
use crate::types::{PollError, PollResult, StreamDiff, StreamRoster};

const STREAMS_URL: &str = "https://api.twitch.tv/kraken/streams";
const ACCEPT_HEADER: &str = "application/vnd.twitchtv.v3+json";

/// Polls the Twitch streams API for every tracked username in one
/// batched call and reports who went live or offline since the last
/// snapshot.
pub struct TwitchPoller {
    http: reqwest::Client,
    config: ConfigHandle,
}

impl TwitchPoller {
    pub fn new(http: reqwest::Client, config: ConfigHandle) -> Self {
        Self { http, config }
    }

    /// One poll cycle. The tracked-username set is read fresh from
    /// configuration so command-listener updates take effect on the next
    /// tick. Fails before any network call when nothing is tracked.
    pub async fn poll(&self) -> PollResult<StreamDiff> {
        let config = self.config.get().await;
        let tracked = config.twitch.tracked_usernames();

        if tracked.is_empty() {
            return Err(PollError::Failure(anyhow!(
                "no Twitch channels are tracked; mention the bot with a username to add one"
            )));
        }

        let roster: StreamRoster = self
            .http
            .get(STREAMS_URL)
            .query(&[
                ("stream_type", "live"),
                ("limit", "100"),
                ("channel", tracked.join(",").as_str()),
            ])
            .header("Accept", ACCEPT_HEADER)
            .header("Client-ID", config.twitch.clientid.as_str())
            .send()
            .await
            .context("Twitch streams request failed")?
            .error_for_status()
            .context("Twitch streams request rejected")?
            .json()
            .await
            .context("failed to parse Twitch streams response")?;

        debug!(
            "Fetched {} live stream(s) for {} tracked channel(s)",
            roster.streams.len(),
            tracked.len()
        );

        let diff = settle_roster(&config.twitch.datafile, &roster).await?;
        info!(
            "Twitch changes: {} went live, {} went offline",
            diff.went_live.len(),
            diff.went_offline.len()
        );
        Ok(diff)
    }
}

/// Diff a fetched roster against the snapshot and make it the new
/// snapshot. The write happens even when nothing changed; only a failed
/// fetch leaves the snapshot alone, and that never reaches this point.
async fn settle_roster(datafile: &std::path::Path, roster: &StreamRoster) -> PollResult<StreamDiff> {
    let previous: StreamRoster = store::load_snapshot(datafile).await;
    let diff = diff_rosters(&previous, roster);

    store::save_snapshot(datafile, roster).await;

    if diff.is_empty() {
        return Err(PollError::NoChange);
    }
    Ok(diff)
}

/// Symmetric differences by stream id: streams only in `previous` went
/// offline, streams only in `current` went live.
pub fn diff_rosters(previous: &StreamRoster, current: &StreamRoster) -> StreamDiff {
    let old_ids: HashSet<u64> = previous.streams.iter().map(|s| s.id).collect();
    let new_ids: HashSet<u64> = current.streams.iter().map(|s| s.id).collect();

    StreamDiff {
        went_offline: previous
            .streams
            .iter()
            .filter(|s| !new_ids.contains(&s.id))
            .cloned()
            .collect(),
        went_live: current
            .streams
            .iter()
            .filter(|s| !old_ids.contains(&s.id))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigHandle;
    use crate::types::{StreamChannel, StreamRecord};

    fn stream(id: u64, name: &str) -> StreamRecord {
        StreamRecord {
            id,
            game: "Some Game".to_string(),
            channel: StreamChannel {
                name: name.to_string(),
                display_name: name.to_uppercase(),
            },
        }
    }

    fn roster(streams: Vec<StreamRecord>) -> StreamRoster {
        StreamRoster { streams }
    }

    #[test]
    fn diff_splits_offline_and_live() {
        // Worked example: ids 1,2 before; 2,3 now.
        let previous = roster(vec![stream(1, "one"), stream(2, "two")]);
        let current = roster(vec![stream(2, "two"), stream(3, "three")]);

        let diff = diff_rosters(&previous, &current);
        assert_eq!(diff.went_offline.len(), 1);
        assert_eq!(diff.went_offline[0].id, 1);
        assert_eq!(diff.went_live.len(), 1);
        assert_eq!(diff.went_live[0].id, 3);
    }

    #[test]
    fn diff_sets_are_disjoint() {
        let previous = roster(vec![stream(1, "a"), stream(2, "b"), stream(3, "c")]);
        let current = roster(vec![stream(3, "c"), stream(4, "d")]);

        let diff = diff_rosters(&previous, &current);
        let offline: HashSet<u64> = diff.went_offline.iter().map(|s| s.id).collect();
        let live: HashSet<u64> = diff.went_live.iter().map(|s| s.id).collect();
        assert!(offline.is_disjoint(&live));
    }

    #[test]
    fn identical_rosters_diff_to_nothing() {
        let previous = roster(vec![stream(1, "a"), stream(2, "b")]);
        let current = roster(vec![stream(1, "a"), stream(2, "b")]);
        assert!(diff_rosters(&previous, &current).is_empty());
    }

    #[test]
    fn everyone_offline_is_still_a_change() {
        let previous = roster(vec![stream(1, "a")]);
        let current = roster(vec![]);

        let diff = diff_rosters(&previous, &current);
        assert_eq!(diff.went_offline.len(), 1);
        assert!(diff.went_live.is_empty());
        assert!(!diff.is_empty());
    }

    #[tokio::test]
    async fn unchanged_roster_signals_no_change_but_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let datafile = dir.path().join("twitch.json");

        let roster = roster(vec![stream(1, "a")]);
        // First settle: everything is new, snapshot gets written.
        assert!(settle_roster(&datafile, &roster).await.is_ok());

        let before = tokio::fs::metadata(&datafile).await.unwrap().modified().unwrap();

        // Same roster again: NoChange, but the file is rewritten.
        match settle_roster(&datafile, &roster).await {
            Err(PollError::NoChange) => {}
            other => panic!("expected NoChange, got {:?}", other.map(|_| ())),
        }
        let after = tokio::fs::metadata(&datafile).await.unwrap().modified().unwrap();
        assert!(after >= before);

        let persisted: StreamRoster = store::load_snapshot(&datafile).await;
        assert_eq!(persisted.streams.len(), 1);
    }

    #[tokio::test]
    async fn empty_roster_after_live_roster_reports_offline_and_persists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let datafile = dir.path().join("twitch.json");

        let live_roster = roster(vec![stream(1, "a")]);
        settle_roster(&datafile, &live_roster).await.unwrap();

        let diff = settle_roster(&datafile, &StreamRoster::default())
            .await
            .unwrap();
        assert_eq!(diff.went_offline.len(), 1);

        let persisted: StreamRoster = store::load_snapshot(&datafile).await;
        assert!(persisted.streams.is_empty());
    }

    #[tokio::test]
    async fn poll_fails_fast_without_tracked_channels() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        tokio::fs::write(
            &config_path,
            r#"{
                "discord": { "key": "t", "announce_channel": "" },
                "youtube": { "key": "k", "channel_id": "c", "datafile": "yt.json" },
                "twitch": { "clientid": "cid", "datafile": "tw.json", "channels": {} }
            }"#,
        )
        .await
        .unwrap();

        let config = ConfigHandle::load(&config_path).await.unwrap();
        let poller = TwitchPoller::new(reqwest::Client::new(), config);

        // No HTTP call is made: the failure is immediate and is a real
        // failure, not NoChange.
        match poller.poll().await {
            Err(PollError::Failure(_)) => {}
            other => panic!("expected immediate failure, got {:?}", other.map(|_| ())),
        }
    }
}
