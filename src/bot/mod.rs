// src/bot/mod.rs - Discord event handling, the poll scheduler, and the
// mention command that registers Twitch usernames

use log::{debug, error, info, warn};
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

use crate::config::{ConfigHandle, MappingChange};
use crate::notifier::{AnnounceSink, DiscordSink, Notifier};
use crate::pollers::{TwitchPoller, YouTubePoller};

/// Serenity event handler wiring the whole relay together: `ready`
/// starts the scheduler, `message` is the command listener.
pub struct RelayHandler {
    config: ConfigHandle,
    http: reqwest::Client,
    bot_user_id: AtomicU64,
    scheduler_started: AtomicBool,
}

impl RelayHandler {
    pub fn new(config: ConfigHandle, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            bot_user_id: AtomicU64::new(0),
            scheduler_started: AtomicBool::new(false),
        }
    }

    /// Gateway intents the relay needs: guild/DM messages with content
    /// for the command listener.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot ready as {}", ready.user.name);
        self.bot_user_id.store(ready.user.id.get(), Ordering::Relaxed);

        // `ready` fires again on reconnect; the scheduler starts once.
        if self.scheduler_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let sink: Arc<dyn AnnounceSink> = Arc::new(DiscordSink::new(ctx.http.clone()));
        tokio::spawn(run_scheduler(self.config.clone(), self.http.clone(), sink));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Never react to bots, including ourselves.
        if msg.author.bot {
            return;
        }

        let bot_id = self.bot_user_id.load(Ordering::Relaxed);
        let mention_ids: Vec<u64> = msg.mentions.iter().map(|u| u.id.get()).collect();
        if !is_bot_mentioned(bot_id, &mention_ids) {
            return;
        }

        let Some(username) = extract_username(&msg.content) else {
            debug!("Mention from {} without a usable username, ignoring", msg.author.name);
            return;
        };

        let user_id = msg.author.id.get().to_string();
        match self.config.map_user(&user_id, &username).await {
            Ok(change) => {
                if let Err(e) = msg.reply(&ctx.http, reply_text(change, &username)).await {
                    warn!("Failed to reply to mention: {}", e);
                }
            }
            Err(e) => error!("Failed to persist user mapping: {:#}", e),
        }
    }
}

/// True when the message mentions the bot's own identity. `bot_id` is 0
/// until the first `ready` event.
fn is_bot_mentioned(bot_id: u64, mention_ids: &[u64]) -> bool {
    bot_id != 0 && mention_ids.contains(&bot_id)
}

/// First whitespace token that is not mention markup, lowercased to a
/// Twitch username. `None` when the message has nothing usable.
pub fn extract_username(content: &str) -> Option<String> {
    content
        .split_whitespace()
        .find(|token| !is_mention_token(token))
        .map(|token| token.to_lowercase())
}

fn is_mention_token(token: &str) -> bool {
    token.starts_with("<@") && token.ends_with('>')
}

fn reply_text(change: MappingChange, username: &str) -> String {
    match change {
        MappingChange::Added => format!(
            "Twitch channel '{}' added. I'll announce here when it goes live.",
            username
        ),
        MappingChange::Updated => format!("Twitch channel updated to '{}'.", username),
    }
}

/// Fixed-interval scheduler. Every tick spawns an independent poll
/// cycle; a cycle that outlives the interval may overlap the next one,
/// which is accepted at this polling frequency.
pub async fn run_scheduler(config: ConfigHandle, http: reqwest::Client, sink: Arc<dyn AnnounceSink>) {
    let interval_secs = config.get().await.poll_interval_secs.max(1);
    let notifier = Arc::new(Notifier::new(sink, config.clone()));

    info!("Scheduler started with a {}s interval", interval_secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;
        tokio::spawn(run_cycle(config.clone(), http.clone(), notifier.clone()));
    }
}

/// One poll-and-notify cycle across the enabled sources. `NoChange` is
/// routine and only logged; failures abort that source for this cycle.
pub async fn run_cycle(config: ConfigHandle, http: reqwest::Client, notifier: Arc<Notifier>) {
    let cfg = config.get().await;

    if cfg.youtube.enabled {
        let poller = YouTubePoller::new(http.clone(), config.clone());
        match poller.poll().await {
            Ok(items) => notifier.announce_uploads(&items).await,
            Err(e) if e.is_no_change() => warn!("YouTube: no new videos"),
            Err(e) => warn!("YouTube poll failed: {}", e),
        }
    }

    let poller = TwitchPoller::new(http, config);
    match poller.poll().await {
        Ok(diff) => notifier.announce_streams(&diff).await,
        Err(e) if e.is_no_change() => warn!("Twitch: no changes"),
        Err(e) => warn!("Twitch poll failed: {}", e),
    }
}
