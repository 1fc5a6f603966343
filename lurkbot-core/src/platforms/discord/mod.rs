// File: src/platforms/discord/mod.rs

pub mod profile;
pub mod runtime;

pub use profile::fetch_profile;
pub use runtime::{DiscordPresencePlatform, SessionEnd};
