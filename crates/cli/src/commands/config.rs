use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use paintvox_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Entry {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Entry {
    fn new(key: &'static str, env_keys: &'static [&'static str], value: impl ToString) -> Self {
        Self { key, env_keys, value: value.to_string() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }
    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let secret = match &config.transport.shared_secret {
        Some(secret) => redact_secret(secret.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        Entry::new("database.url", &["PAINTVOX_DATABASE_URL"], &config.database.url),
        Entry::new(
            "database.max_connections",
            &["PAINTVOX_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections,
        ),
        Entry::new(
            "database.timeout_secs",
            &["PAINTVOX_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs,
        ),
        Entry::new(
            "business.hourly_rate",
            &["PAINTVOX_BUSINESS_HOURLY_RATE"],
            config.business.hourly_rate,
        ),
        Entry::new("business.markup_pct", &["PAINTVOX_BUSINESS_MARKUP_PCT"], config.business.markup_pct),
        Entry::new(
            "business.tax_rate_pct",
            &["PAINTVOX_BUSINESS_TAX_RATE_PCT"],
            config.business.tax_rate_pct,
        ),
        Entry::new(
            "business.hours_per_day",
            &["PAINTVOX_BUSINESS_HOURS_PER_DAY"],
            config.business.hours_per_day,
        ),
        Entry::new(
            "session.completion_threshold_pct",
            &["PAINTVOX_SESSION_COMPLETION_THRESHOLD_PCT"],
            config.session.completion_threshold_pct,
        ),
        Entry::new("transport.shared_secret", &["PAINTVOX_TRANSPORT_SHARED_SECRET"], secret),
        Entry::new(
            "server.bind_address",
            &["PAINTVOX_SERVER_BIND_ADDRESS"],
            &config.server.bind_address,
        ),
        Entry::new("server.port", &["PAINTVOX_SERVER_PORT"], config.server.port),
        Entry::new(
            "server.graceful_shutdown_secs",
            &["PAINTVOX_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs,
        ),
        Entry::new(
            "logging.level",
            &["PAINTVOX_LOGGING_LEVEL", "PAINTVOX_LOG_LEVEL"],
            &config.logging.level,
        ),
        Entry::new(
            "logging.format",
            &["PAINTVOX_LOGGING_FORMAT", "PAINTVOX_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["paintvox.toml", "config/paintvox.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows only the length so two configured secrets can be told apart without exposing either.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    format!("<redacted:{} chars>", trimmed.chars().count())
}
