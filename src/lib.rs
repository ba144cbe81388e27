//! # Stream Herald
//!
//! A Discord notification relay: polls the YouTube activities feed and the
//! Twitch streams API on a fixed interval, diffs each result against a JSON
//! snapshot on disk, and announces the changes in a configured channel.
//! Mentioning the bot with a Twitch username registers that channel for
//! live announcements.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serenity::all::Client;
//! use streamherald::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigHandle::load("config.json").await?;
//!     let token = config.get().await.discord.key.clone();
//!
//!     let handler = RelayHandler::new(config, reqwest::Client::new());
//!     let mut client = Client::builder(&token, RelayHandler::intents())
//!         .event_handler(handler)
//!         .await?;
//!     client.start().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod notifier;
pub mod pollers;
pub mod store;
pub mod types;

// Re-export commonly used items
pub mod prelude {
    pub use crate::bot::RelayHandler;
    pub use crate::config::{BotConfig, ConfigHandle, MappingChange};
    pub use crate::notifier::{AnnounceSink, DiscordSink, Notifier};
    pub use crate::pollers::{TwitchPoller, YouTubePoller};
    pub use crate::types::{
        ActivityFeed, ActivityItem, PollError, PollResult, StreamDiff, StreamRecord, StreamRoster,
    };
    pub use anyhow::Result;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
