use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Only keys with this prefix are read from a `.env` file.
pub const ENV_PREFIX: &str = "WAB_";

/// Typed configuration for the bulk-send client.
#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,

    // Contacts
    pub contacts_file: PathBuf,
    pub default_country_code: String,

    // Sending
    pub message_delay: Duration,
    pub status_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
            contacts_file: PathBuf::from("bulk-contacts.json"),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            message_delay: Duration::from_secs(5),
            status_poll_interval: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Read `WAB_*` settings from the environment, falling back to `./.env`.
    ///
    /// The process environment always wins over the file, and the file never
    /// touches the environment itself.
    pub fn load() -> Result<Self> {
        let file = read_dotenv(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Build a config from an arbitrary key lookup (env in production, maps in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_base_url = get("WAB_API_URL")
            .and_then(non_empty)
            .unwrap_or(defaults.api_base_url)
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "WAB_API_URL must be an http(s) URL, got {api_base_url}"
            )));
        }

        let contacts_file = match get("WAB_CONTACTS_FILE").and_then(non_empty) {
            Some(p) => PathBuf::from(p),
            None => match home_dir() {
                Some(home) => home.join(".wab").join("bulk-contacts.json"),
                None => defaults.contacts_file,
            },
        };

        let default_country_code = get("WAB_DEFAULT_COUNTRY_CODE")
            .and_then(non_empty)
            .map(|s| s.trim().trim_start_matches('+').to_string())
            .unwrap_or(defaults.default_country_code);
        if !default_country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Config(format!(
                "WAB_DEFAULT_COUNTRY_CODE must be digits only, got {default_country_code}"
            )));
        }

        let message_delay = secs(&get, "WAB_MESSAGE_DELAY_SECS")?.unwrap_or(defaults.message_delay);
        let status_poll_interval =
            secs(&get, "WAB_STATUS_POLL_SECS")?.unwrap_or(defaults.status_poll_interval);
        if status_poll_interval.is_zero() {
            return Err(Error::Config("WAB_STATUS_POLL_SECS must be > 0".to_string()));
        }
        let request_timeout =
            secs(&get, "WAB_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout);
        let upload_timeout =
            secs(&get, "WAB_UPLOAD_TIMEOUT_SECS")?.unwrap_or(defaults.upload_timeout);

        Ok(Self {
            api_base_url,
            request_timeout,
            upload_timeout,
            contacts_file,
            default_country_code,
            message_delay,
            status_poll_interval,
        })
    }
}

fn secs(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    let Some(raw) = get(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|n| Some(Duration::from_secs(n)))
        .map_err(|_| Error::Config(format!("{key} must be a whole number of seconds, got {raw}")))
}

fn read_dotenv(path: &Path) -> HashMap<String, String> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let vars = parse_dotenv(&text);
            tracing::debug!(path = %path.display(), keys = vars.len(), "loaded .env");
            vars
        }
        Err(_) => HashMap::new(),
    }
}

/// `WAB_*` assignments from `.env` text. Later lines win.
///
/// Accepts `KEY=value`, `export KEY=value` and values wrapped in matching
/// single or double quotes; comments and other keys are skipped.
pub fn parse_dotenv(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            key.starts_with(ENV_PREFIX)
                .then(|| (key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(q)
            .and_then(|v| v.strip_suffix(q))
        {
            return inner;
        }
    }
    value
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
