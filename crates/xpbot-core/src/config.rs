use std::{env, path::PathBuf, time::Duration};

use tracing::{debug, warn};

use crate::{domain::ChatId, errors::Error, Result};

const DEFAULT_REWARDS_API_URL: &str = "https://be-express-lime.vercel.app";
const DEFAULT_REGISTRY_FILE: &str = "./user_data.json";

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_timeout: Duration,
    pub admin_user_ids: Vec<i64>,
    pub announce_channel: Option<ChatId>,

    // Registry
    pub registry_file: PathBuf,

    // Rewards API
    pub rewards_api_url: String,
    pub rewards_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Variables already in the environment win over `.env`.
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable .env"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_user_ids = parse_csv_i64(lookup("ADMIN_USER_IDS"));

        let announce_channel = match lookup("ANNOUNCE_CHANNEL_ID").and_then(non_empty) {
            Some(raw) => Some(ChatId(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("ANNOUNCE_CHANNEL_ID is not a chat id: {raw}"))
            })?)),
            None => None,
        };

        let registry_file = PathBuf::from(
            lookup("REGISTRY_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_REGISTRY_FILE.to_string()),
        );

        let rewards_api_url = lookup("REWARDS_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_REWARDS_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let rewards_timeout =
            Duration::from_millis(parse_u64(lookup("REWARDS_TIMEOUT_MS")).unwrap_or(10_000));
        // Must stay above the long-poll window or every idle poll times out.
        let telegram_timeout =
            Duration::from_secs(parse_u64(lookup("TELEGRAM_TIMEOUT_SECS")).unwrap_or(30));

        Ok(Self {
            telegram_bot_token,
            telegram_timeout,
            admin_user_ids,
            announce_channel,
            registry_file,
            rewards_api_url,
            rewards_timeout,
        })
    }
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
