// File: src/platforms/discord/profile.rs

use reqwest::Client as ReqwestClient;
use tracing::warn;

use crate::models::DiscordProfile;

const USERS_ME_URL: &str = "https://discordapp.com/api/v9/users/@me";

/// One-shot identity lookup for log output. Diagnostic only: every failure
/// mode (network, non-2xx, malformed body) collapses to the Unknown
/// sentinel so account startup is never blocked on this call.
pub async fn fetch_profile(token: &str) -> DiscordProfile {
    let http = ReqwestClient::new();

    let resp = match http
        .get(USERS_ME_URL)
        .header("Authorization", token)
        .header("Content-Type", "application/json")
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("profile lookup failed: {e}");
            return DiscordProfile::unknown();
        }
    };

    let status = resp.status();
    if !status.is_success() {
        warn!("profile lookup returned HTTP {status}");
        return DiscordProfile::unknown();
    }

    match resp.json::<DiscordProfile>().await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("profile lookup returned malformed body: {e}");
            DiscordProfile::unknown()
        }
    }
}
