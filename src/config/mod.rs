// src/config/mod.rs - File-backed bot configuration

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Top-level configuration document (`config.json`). Loaded once at
/// startup and persisted after every mutation by the command listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub discord: DiscordSection,
    pub youtube: YouTubeSection,
    pub twitch: TwitchSection,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSection {
    /// Static bot token. `DISCORD_TOKEN` in the environment overrides it.
    pub key: String,
    /// Channel id all announcements go to. Empty or unparsable means
    /// announcements are dropped silently.
    #[serde(default)]
    pub announce_channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeSection {
    pub key: String,
    pub channel_id: String,
    pub datafile: PathBuf,
    /// Upload polling is off by default; Twitch is the primary source.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchSection {
    pub clientid: String,
    pub datafile: PathBuf,
    /// Discord user id -> Twitch username, maintained by the command
    /// listener.
    #[serde(default)]
    pub channels: HashMap<String, String>,
}

impl TwitchSection {
    /// Usernames to poll, in a stable order so the batched API call is
    /// reproducible.
    pub fn tracked_usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }
}

fn default_poll_interval_secs() -> u64 {
    120
}

/// Result of a user-mapping mutation, used to word the chat reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingChange {
    Added,
    Updated,
}

/// Shared handle to the configuration. Constructed once at startup and
/// cloned into every component that needs it; pollers read tracked
/// usernames through it fresh on every cycle.
#[derive(Clone)]
pub struct ConfigHandle {
    path: PathBuf,
    inner: Arc<RwLock<BotConfig>>,
}

impl ConfigHandle {
    /// Load configuration from disk. A missing or malformed file is a
    /// startup error; there is no default config to fall back to.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let config: BotConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;

        info!(
            "Loaded config from {} ({} tracked Twitch channels)",
            path.display(),
            config.twitch.channels.len()
        );

        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(config)),
        })
    }

    /// Current configuration by value. Callers get a consistent view of
    /// one cycle; mutations land on the next read.
    pub async fn get(&self) -> BotConfig {
        self.inner.read().await.clone()
    }

    pub async fn tracked_usernames(&self) -> Vec<String> {
        self.inner.read().await.twitch.tracked_usernames()
    }

    /// Map a Discord user to a Twitch username, overwriting any previous
    /// mapping, and persist the result.
    pub async fn map_user(&self, discord_user_id: &str, twitch_name: &str) -> Result<MappingChange> {
        let change = {
            let mut config = self.inner.write().await;
            match config
                .twitch
                .channels
                .insert(discord_user_id.to_string(), twitch_name.to_string())
            {
                Some(_) => MappingChange::Updated,
                None => MappingChange::Added,
            }
        };

        self.persist().await?;
        info!(
            "Mapped Discord user {} to Twitch channel '{}' ({:?})",
            discord_user_id, twitch_name, change
        );
        Ok(change)
    }

    async fn persist(&self) -> Result<()> {
        let content = {
            let config = self.inner.read().await;
            serde_json::to_string_pretty(&*config).context("failed to serialize config")?
        };

        fs::write(&self.path, content)
            .await
            .with_context(|| format!("failed to write config: {}", self.path.display()))?;

        debug!("Persisted config to {}", self.path.display());
        Ok(())
    }
}
