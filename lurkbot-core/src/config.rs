// src/config.rs
//
// Account configuration comes from indexed environment variables:
//
//   DISCORD_TOKEN_1=...               (required; scan stops at the first gap)
//   DISCORD_STATUS_1=online           (optional; online/idle/dnd/invisible)
//   DISCORD_CUSTOM_STATUS_1=...       (optional free text)
//   DISCORD_ACTIVE_HOURS_1=9-17       (optional local-time window [9,17))
//
// A record that fails validation is dropped with a logged reason; the
// remaining records still run.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::Error;
use crate::models::{AccountConfig, PresenceStatus};
use crate::window::ActiveWindow;

const TOKEN_PLACEHOLDER: &str = "YOUR_DISCORD_USER_TOKEN";

/// Scan `DISCORD_TOKEN_1..n` until the first absent variable and validate
/// each record. Invalid records are dropped, not fatal.
pub fn load_accounts_from_env() -> Vec<AccountConfig> {
    let mut accounts = Vec::new();
    let mut ordinal = 1usize;

    loop {
        let Ok(token) = env::var(format!("DISCORD_TOKEN_{ordinal}")) else {
            break;
        };
        let status = env::var(format!("DISCORD_STATUS_{ordinal}")).ok();
        let custom_status = env::var(format!("DISCORD_CUSTOM_STATUS_{ordinal}")).ok();
        let hours = env::var(format!("DISCORD_ACTIVE_HOURS_{ordinal}")).ok();

        match account_from_parts(
            ordinal,
            token,
            status.as_deref(),
            custom_status.as_deref(),
            hours.as_deref(),
        ) {
            Ok(account) => accounts.push(account),
            Err(e) => warn!("[account {ordinal}] dropped from configuration: {e}"),
        }
        ordinal += 1;
    }

    accounts
}

/// Validate one raw record. Pure so the rules are testable without touching
/// the process environment.
pub fn account_from_parts(
    ordinal: usize,
    token: String,
    status: Option<&str>,
    custom_status: Option<&str>,
    active_hours: Option<&str>,
) -> Result<AccountConfig, Error> {
    if token.is_empty() {
        return Err(Error::Auth("token is empty".into()));
    }
    if token == TOKEN_PLACEHOLDER {
        return Err(Error::Auth("token is the unconfigured placeholder".into()));
    }

    let status = match status {
        Some(s) => PresenceStatus::from_str(s).map_err(Error::Parse)?,
        None => PresenceStatus::default(),
    };

    let window = match active_hours {
        Some(raw) => Some(parse_active_hours(raw)?),
        None => None,
    };

    Ok(AccountConfig {
        ordinal,
        token,
        status,
        custom_status: custom_status.unwrap_or_default().to_string(),
        window,
    })
}

/// Parse `"<start>-<end>"` into a window, enforcing `0 <= start < end <= 23`.
fn parse_active_hours(raw: &str) -> Result<ActiveWindow, Error> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| Error::Parse(format!("active hours '{raw}' is not '<start>-<end>'")))?;

    let start_hour: u8 = start
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("active hours start '{start}' is not an hour")))?;
    let end_hour: u8 = end
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("active hours end '{end}' is not an hour")))?;

    if start_hour >= end_hour || end_hour > 23 {
        return Err(Error::Parse(format!(
            "active hours '{raw}' must satisfy 0 <= start < end <= 23"
        )));
    }

    Ok(ActiveWindow { start_hour, end_hour })
}
