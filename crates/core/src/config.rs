use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::business::BusinessDefaults;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub business: BusinessConfig,
    pub session: SessionConfig,
    pub transport: TransportConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Contractor defaults applied when the conversation leaves a value unset.
#[derive(Clone, Debug)]
pub struct BusinessConfig {
    pub hourly_rate: Decimal,
    pub markup_pct: Decimal,
    pub tax_rate_pct: Decimal,
    pub hours_per_day: Decimal,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Completion percentage a disconnected session needs to be marked complete.
    pub completion_threshold_pct: u8,
}

#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub shared_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub hourly_rate: Option<Decimal>,
    pub completion_threshold_pct: Option<u8>,
    pub transport_shared_secret: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let business = BusinessDefaults::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://paintvox.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            business: BusinessConfig {
                hourly_rate: business.hourly_rate,
                markup_pct: business.markup_pct,
                tax_rate_pct: business.tax_rate_pct,
                hours_per_day: business.hours_per_day,
            },
            session: SessionConfig { completion_threshold_pct: 100 },
            transport: TransportConfig { shared_secret: None },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl BusinessConfig {
    pub fn defaults(&self) -> BusinessDefaults {
        BusinessDefaults {
            hourly_rate: self.hourly_rate,
            markup_pct: self.markup_pct,
            tax_rate_pct: self.tax_rate_pct,
            hours_per_day: self.hours_per_day,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("paintvox.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(business) = patch.business {
            if let Some(hourly_rate) = business.hourly_rate {
                self.business.hourly_rate = hourly_rate;
            }
            if let Some(markup_pct) = business.markup_pct {
                self.business.markup_pct = markup_pct;
            }
            if let Some(tax_rate_pct) = business.tax_rate_pct {
                self.business.tax_rate_pct = tax_rate_pct;
            }
            if let Some(hours_per_day) = business.hours_per_day {
                self.business.hours_per_day = hours_per_day;
            }
        }

        if let Some(session) = patch.session {
            if let Some(threshold) = session.completion_threshold_pct {
                self.session.completion_threshold_pct = threshold;
            }
        }

        if let Some(transport) = patch.transport {
            if let Some(shared_secret) = transport.shared_secret {
                self.transport.shared_secret = Some(secret_value(shared_secret));
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PAINTVOX_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PAINTVOX_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("PAINTVOX_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PAINTVOX_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("PAINTVOX_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PAINTVOX_BUSINESS_HOURLY_RATE") {
            self.business.hourly_rate = parse_env("PAINTVOX_BUSINESS_HOURLY_RATE", &value)?;
        }
        if let Some(value) = read_env("PAINTVOX_BUSINESS_MARKUP_PCT") {
            self.business.markup_pct = parse_env("PAINTVOX_BUSINESS_MARKUP_PCT", &value)?;
        }
        if let Some(value) = read_env("PAINTVOX_BUSINESS_TAX_RATE_PCT") {
            self.business.tax_rate_pct = parse_env("PAINTVOX_BUSINESS_TAX_RATE_PCT", &value)?;
        }
        if let Some(value) = read_env("PAINTVOX_BUSINESS_HOURS_PER_DAY") {
            self.business.hours_per_day = parse_env("PAINTVOX_BUSINESS_HOURS_PER_DAY", &value)?;
        }

        if let Some(value) = read_env("PAINTVOX_SESSION_COMPLETION_THRESHOLD_PCT") {
            self.session.completion_threshold_pct =
                parse_env("PAINTVOX_SESSION_COMPLETION_THRESHOLD_PCT", &value)?;
        }

        if let Some(value) = read_env("PAINTVOX_TRANSPORT_SHARED_SECRET") {
            self.transport.shared_secret = Some(secret_value(value));
        }

        if let Some(value) = read_env("PAINTVOX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PAINTVOX_SERVER_PORT") {
            self.server.port = parse_env("PAINTVOX_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PAINTVOX_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("PAINTVOX_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("PAINTVOX_LOGGING_LEVEL").or_else(|| read_env("PAINTVOX_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PAINTVOX_LOGGING_FORMAT").or_else(|| read_env("PAINTVOX_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(hourly_rate) = overrides.hourly_rate {
            self.business.hourly_rate = hourly_rate;
        }
        if let Some(threshold) = overrides.completion_threshold_pct {
            self.session.completion_threshold_pct = threshold;
        }
        if let Some(shared_secret) = overrides.transport_shared_secret {
            self.transport.shared_secret = Some(secret_value(shared_secret));
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_business(&self.business)?;
        validate_session(&self.session)?;
        validate_transport(&self.transport)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("paintvox.toml"), PathBuf::from("config/paintvox.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_business(business: &BusinessConfig) -> Result<(), ConfigError> {
    let fields = [
        ("business.hourly_rate", business.hourly_rate),
        ("business.markup_pct", business.markup_pct),
        ("business.tax_rate_pct", business.tax_rate_pct),
        ("business.hours_per_day", business.hours_per_day),
    ];
    for (key, value) in fields {
        if value.is_sign_negative() {
            return Err(ConfigError::Validation(format!("{key} must not be negative")));
        }
    }

    if business.hours_per_day.is_zero() || business.hours_per_day > Decimal::from(24) {
        return Err(ConfigError::Validation(
            "business.hours_per_day must be greater than zero and at most 24".to_string(),
        ));
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.completion_threshold_pct == 0 || session.completion_threshold_pct > 100 {
        return Err(ConfigError::Validation(
            "session.completion_threshold_pct must be in range 1..=100".to_string(),
        ));
    }
    Ok(())
}

fn validate_transport(transport: &TransportConfig) -> Result<(), ConfigError> {
    let blank = transport
        .shared_secret
        .as_ref()
        .map(|secret| secret.expose_secret().trim().is_empty())
        .unwrap_or(false);
    if blank {
        return Err(ConfigError::Validation(
            "transport.shared_secret must not be blank; remove it to disable the header check"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    business: Option<BusinessPatch>,
    session: Option<SessionPatch>,
    transport: Option<TransportPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BusinessPatch {
    hourly_rate: Option<Decimal>,
    markup_pct: Option<Decimal>,
    tax_rate_pct: Option<Decimal>,
    hours_per_day: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    completion_threshold_pct: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct TransportPatch {
    shared_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
