use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::ChatId, errors::Error, filter::SenderRule, Result};

/// Upper bound for `LOOKBACK_DAYS` (ten years).
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Typed configuration for the monitor, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub monitored_chats: Vec<ChatId>,
    pub user_filter: Vec<SenderRule>,
    pub forward_to: Vec<ChatId>,

    // Persistence
    pub detection_log_path: PathBuf,
    pub detection_log_json: bool,

    // Lookback seeding
    pub history_export_path: Option<PathBuf>,
    pub lookback_days: i64,

    // Background tasks
    pub heartbeat_interval: Duration,
    pub metrics_interval: Duration,

    // Forwarding throttle
    pub forward_global_interval: Duration,
    pub forward_per_chat_interval: Duration,

    // Inbound queue
    pub stream_capacity: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let monitored_chats = parse_csv_chats(get("MONITORED_CHATS"))?;
        if monitored_chats.is_empty() {
            return Err(Error::Config(
                "MONITORED_CHATS environment variable is required".to_string(),
            ));
        }

        let user_filter = get("USER_FILTER")
            .unwrap_or_default()
            .split(',')
            .filter_map(SenderRule::parse)
            .collect();
        let forward_to = parse_csv_chats(get("FORWARD_TO"))?;

        let detection_log_path = PathBuf::from(
            get("DETECTION_LOG_PATH")
                .and_then(non_empty)
                .unwrap_or("sol_contracts.txt".to_string()),
        );
        let detection_log_json = parse_bool(get("DETECTION_LOG_JSON")).unwrap_or(false);

        let history_export_path = get("HISTORY_EXPORT_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let lookback_days = parse_num::<i64>(get("LOOKBACK_DAYS"))
            .unwrap_or(30)
            .clamp(0, MAX_LOOKBACK_DAYS);

        let heartbeat_interval =
            Duration::from_secs(parse_num::<u64>(get("HEARTBEAT_INTERVAL_SECS")).unwrap_or(60).max(1));
        let metrics_interval =
            Duration::from_secs(parse_num::<u64>(get("METRICS_INTERVAL_SECS")).unwrap_or(30).max(1));

        let forward_global_interval =
            Duration::from_millis(parse_num::<u64>(get("FORWARD_GLOBAL_INTERVAL_MS")).unwrap_or(40));
        let forward_per_chat_interval =
            Duration::from_millis(parse_num::<u64>(get("FORWARD_PER_CHAT_INTERVAL_MS")).unwrap_or(1050));

        let stream_capacity = parse_num::<usize>(get("STREAM_CAPACITY")).unwrap_or(256).max(1);

        Ok(Self {
            telegram_bot_token,
            monitored_chats,
            user_filter,
            forward_to,
            detection_log_path,
            detection_log_json,
            history_export_path,
            lookback_days,
            heartbeat_interval,
            metrics_interval,
            forward_global_interval,
            forward_per_chat_interval,
            stream_capacity,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(v: &str) -> &str {
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        return &v[1..v.len() - 1];
    }
    v
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

/// Comma-separated chat ids. Unlike most settings a malformed entry is an
/// error: silently dropping a chat would stop watching it.
fn parse_csv_chats(v: Option<String>) -> Result<Vec<ChatId>> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(ChatId)
                .map_err(|_| Error::Config(format!("invalid chat id: {s}")))
        })
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
