// src/pollers/mod.rs - Fetch/diff/persist pipelines, one per external source

pub mod twitch;
pub mod youtube;

pub use twitch::TwitchPoller;
pub use youtube::YouTubePoller;
