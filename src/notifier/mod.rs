// src/notifier/mod.rs - Renders change sets and delivers them to Discord

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info};
use serenity::all::ChannelId;
use serenity::http::Http;
use std::sync::Arc;

use crate::config::ConfigHandle;
use crate::types::{ActivityItem, StreamDiff, StreamRecord};

/// Delivery seam for announcements. Production uses Discord; tests use a
/// recording sink.
#[async_trait]
pub trait AnnounceSink: Send + Sync {
    async fn send(&self, channel_id: u64, text: &str) -> Result<()>;
}

/// Sends announcements through the serenity HTTP client.
pub struct DiscordSink {
    http: Arc<Http>,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AnnounceSink for DiscordSink {
    async fn send(&self, channel_id: u64, text: &str) -> Result<()> {
        ChannelId::new(channel_id).say(&self.http, text).await?;
        Ok(())
    }
}

/// Formats a change set into one message per cycle and hands it to the
/// sink. No-ops silently when the announce channel is not configured.
pub struct Notifier {
    sink: Arc<dyn AnnounceSink>,
    config: ConfigHandle,
}

impl Notifier {
    pub fn new(sink: Arc<dyn AnnounceSink>, config: ConfigHandle) -> Self {
        Self { sink, config }
    }

    /// Announce channel id, or `None` when unset/unparsable.
    async fn announce_channel(&self) -> Option<u64> {
        let raw = self.config.get().await.discord.announce_channel;
        match raw.parse::<u64>() {
            Ok(id) if id != 0 => Some(id),
            _ => {
                debug!("No usable announce channel configured, dropping announcement");
                None
            }
        }
    }

    async fn deliver(&self, text: String) {
        let Some(channel_id) = self.announce_channel().await else {
            return;
        };
        if let Err(e) = self.sink.send(channel_id, &text).await {
            error!("Failed to announce to channel {}: {}", channel_id, e);
        }
    }

    /// One message for all new uploads of this cycle.
    pub async fn announce_uploads(&self, items: &[ActivityItem]) {
        if items.is_empty() {
            return;
        }
        self.deliver(format_uploads(items)).await;
    }

    /// One message for all newly-live streams of this cycle. Offline
    /// transitions are logged only, never sent to chat.
    pub async fn announce_streams(&self, diff: &StreamDiff) {
        for stream in &diff.went_offline {
            info!("{} went offline", stream.channel.display_name);
        }
        if diff.went_live.is_empty() {
            return;
        }
        self.deliver(format_live(&diff.went_live)).await;
    }
}

/// Banner plus one title/link line per new upload.
pub fn format_uploads(items: &[ActivityItem]) -> String {
    let channel_title = items
        .iter()
        .map(|i| i.snippet.channel_title.as_str())
        .find(|t| !t.is_empty())
        .unwrap_or("the channel");

    let mut say = format!("**New videos have been uploaded by {}!**\n", channel_title);
    for item in items {
        if let Some(url) = item.watch_url() {
            say.push_str(&format!("\"{}\" -- {}\n", item.snippet.title, url));
        }
    }
    say
}

/// One line per newly-live stream, concatenated into a single message.
pub fn format_live(streams: &[StreamRecord]) -> String {
    let mut say = String::new();
    for stream in streams {
        say.push_str(&format!(
            "{} just went live playing {}! Go check it out at {}\n",
            stream.channel.display_name,
            stream.game,
            stream.stream_url()
        ));
    }
    say
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivitySnippet, ContentDetails, StreamChannel, StreamRecord, UploadDetails};
    use tokio::sync::Mutex;

    /// Records every send instead of talking to Discord.
    struct RecordingSink {
        sent: Mutex<Vec<(u64, String)>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AnnounceSink for RecordingSink {
        async fn send(&self, channel_id: u64, text: &str) -> Result<()> {
            self.sent.lock().await.push((channel_id, text.to_string()));
            Ok(())
        }
    }

    async fn config_with_channel(dir: &tempfile::TempDir, channel: &str) -> ConfigHandle {
        let path = dir.path().join("config.json");
        let content = format!(
            r#"{{
                "discord": {{ "key": "t", "announce_channel": "{}" }},
                "youtube": {{ "key": "k", "channel_id": "c", "datafile": "yt.json" }},
                "twitch": {{ "clientid": "cid", "datafile": "tw.json", "channels": {{}} }}
            }}"#,
            channel
        );
        tokio::fs::write(&path, content).await.unwrap();
        ConfigHandle::load(&path).await.unwrap()
    }

    fn upload(video_id: &str, title: &str, channel_title: &str) -> ActivityItem {
        ActivityItem {
            snippet: ActivitySnippet {
                title: title.to_string(),
                channel_title: channel_title.to_string(),
                published_at: None,
            },
            content_details: ContentDetails {
                upload: Some(UploadDetails {
                    video_id: video_id.to_string(),
                }),
            },
        }
    }

    fn live(id: u64, name: &str, display: &str, game: &str) -> StreamRecord {
        StreamRecord {
            id,
            game: game.to_string(),
            channel: StreamChannel {
                name: name.to_string(),
                display_name: display.to_string(),
            },
        }
    }

    #[test]
    fn upload_message_has_banner_and_one_line_per_item() {
        let items = vec![
            upload("id1", "First", "Tirean"),
            upload("id2", "Second", "Tirean"),
        ];
        let text = format_uploads(&items);

        assert!(text.starts_with("**New videos have been uploaded by Tirean!**"));
        assert!(text.contains("\"First\" -- https://www.youtube.com/watch?v=id1"));
        assert!(text.contains("\"Second\" -- https://www.youtube.com/watch?v=id2"));
    }

    #[test]
    fn live_message_names_display_name_game_and_link() {
        let text = format_live(&[live(1, "playerone", "PlayerOne", "Tetris")]);
        assert_eq!(
            text,
            "PlayerOne just went live playing Tetris! Go check it out at https://twitch.tv/playerone\n"
        );
    }

    #[tokio::test]
    async fn one_message_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_channel(&dir, "42").await;
        let sink = RecordingSink::new();
        let notifier = Notifier::new(sink.clone(), config);

        let diff = StreamDiff {
            went_live: vec![
                live(1, "a", "A", "G1"),
                live(2, "b", "B", "G2"),
            ],
            went_offline: vec![],
        };
        notifier.announce_streams(&diff).await;

        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert!(sent[0].1.contains("A just went live"));
        assert!(sent[0].1.contains("B just went live"));
    }

    #[tokio::test]
    async fn offline_only_diff_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_channel(&dir, "42").await;
        let sink = RecordingSink::new();
        let notifier = Notifier::new(sink.clone(), config);

        let diff = StreamDiff {
            went_live: vec![],
            went_offline: vec![live(1, "a", "A", "G")],
        };
        notifier.announce_streams(&diff).await;

        assert!(sink.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_channel_is_a_silent_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_channel(&dir, "").await;
        let sink = RecordingSink::new();
        let notifier = Notifier::new(sink.clone(), config);

        notifier
            .announce_uploads(&[upload("id1", "Video", "Someone")])
            .await;

        assert!(sink.sent.lock().await.is_empty());
    }
}
