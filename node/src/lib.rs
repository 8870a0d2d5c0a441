use kibitz_client::automation::{Policy, DEFAULT_ENGINE_DEPTH};
use kibitz_client::control::MAX_ENGINE_DEPTH;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::Level;
use url::Url;

pub mod dashboard;
pub mod defaults;

/// Lobby account. Without one the bot plays as a guest.
#[derive(Clone, Deserialize, Serialize)]
pub struct Account {
    pub login: String,
    pub password: String,
}

/// Configuration for the bot, read from YAML.
#[derive(Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub account: Option<Account>,

    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_lobby_url")]
    pub lobby_url: String,
    #[serde(default = "default_origin")]
    pub origin: String,

    pub engine_path: PathBuf,
    #[serde(default = "default_engine_depth")]
    pub engine_depth: u32,
    /// Sent to the engine as `setoption` commands.
    #[serde(default)]
    pub engine_options: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub kick_low_elo: bool,
    #[serde(default)]
    pub kick_if_lose: bool,
    #[serde(default)]
    pub kick_if_draw: bool,

    #[serde(default)]
    pub dashboard_port: Option<u16>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_mailbox_size")]
    pub mailbox_size: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
    #[error("{field} must be a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} URL scheme must be one of {expected:?}: {value}")]
    InvalidUrlScheme {
        field: &'static str,
        value: String,
        expected: &'static [&'static str],
    },
    #[error("engine_depth must be between 1 and {max} (got {value})")]
    InvalidEngineDepth { value: u32, max: u32 },
    #[error("engine option {name} must be a string, number or bool")]
    InvalidEngineOption { name: String },
    #[error("account {field} must not be empty")]
    EmptyCredential { field: &'static str },
}

pub struct ValidatedConfig {
    pub account: Option<Account>,
    pub server_url: Url,
    pub login_url: Url,
    pub lobby_url: Url,
    pub origin: String,
    pub engine_path: PathBuf,
    pub engine_options: BTreeMap<String, String>,
    pub policy: Policy,
    pub dashboard_port: Option<u16>,
    pub log_level: Level,
    pub mailbox_size: usize,
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        f.debug_struct("Config")
            .field(
                "account",
                &cfg.account.as_ref().map(|account| &account.login),
            )
            .field("password", &"<redacted>")
            .field("server_url", &cfg.server_url)
            .field("login_url", &cfg.login_url)
            .field("lobby_url", &cfg.lobby_url)
            .field("origin", &cfg.origin)
            .field("engine_path", &cfg.engine_path)
            .field("engine_depth", &cfg.engine_depth)
            .field("engine_options", &cfg.engine_options)
            .field("auto_start", &cfg.auto_start)
            .field("kick_low_elo", &cfg.kick_low_elo)
            .field("kick_if_lose", &cfg.kick_if_lose)
            .field("kick_if_draw", &cfg.kick_if_draw)
            .field("dashboard_port", &cfg.dashboard_port)
            .field("log_level", &cfg.log_level)
            .field("mailbox_size", &cfg.mailbox_size)
            .finish()
    }
}

fn default_server_url() -> String {
    defaults::DEFAULT_SERVER_URL.to_string()
}

fn default_login_url() -> String {
    defaults::DEFAULT_LOGIN_URL.to_string()
}

fn default_lobby_url() -> String {
    defaults::DEFAULT_LOBBY_URL.to_string()
}

fn default_origin() -> String {
    defaults::DEFAULT_ORIGIN.to_string()
}

fn default_engine_depth() -> u32 {
    DEFAULT_ENGINE_DEPTH
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_mailbox_size() -> usize {
    defaults::DEFAULT_MAILBOX_SIZE
}

const HTTP_SCHEMES: &[&str] = &["http", "https"];
const WS_SCHEMES: &[&str] = &["ws", "wss"];

fn parse_url(
    field: &'static str,
    value: &str,
    expected: &'static [&'static str],
) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    if !expected.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrlScheme {
            field,
            value: value.to_string(),
            expected,
        });
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
    Ok(url)
}

fn engine_option(name: &str, value: &serde_yaml::Value) -> Result<String, ConfigError> {
    match value {
        serde_yaml::Value::String(value) => Ok(value.clone()),
        serde_yaml::Value::Number(value) => Ok(value.to_string()),
        serde_yaml::Value::Bool(value) => Ok(value.to_string()),
        _ => Err(ConfigError::InvalidEngineOption {
            name: name.to_string(),
        }),
    }
}

impl Config {
    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if let Some(account) = &self.account {
            if account.login.is_empty() {
                return Err(ConfigError::EmptyCredential { field: "login" });
            }
            if account.password.is_empty() {
                return Err(ConfigError::EmptyCredential { field: "password" });
            }
        }
        if !(1..=MAX_ENGINE_DEPTH).contains(&self.engine_depth) {
            return Err(ConfigError::InvalidEngineDepth {
                value: self.engine_depth,
                max: MAX_ENGINE_DEPTH,
            });
        }
        if self.mailbox_size == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "mailbox_size",
                value: 0,
            });
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        let engine_options = self
            .engine_options
            .iter()
            .map(|(name, value)| Ok((name.clone(), engine_option(name, value)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        Ok(ValidatedConfig {
            server_url: parse_url("server_url", &self.server_url, WS_SCHEMES)?,
            login_url: parse_url("login_url", &self.login_url, HTTP_SCHEMES)?,
            lobby_url: parse_url("lobby_url", &self.lobby_url, HTTP_SCHEMES)?,
            origin: parse_url("origin", &self.origin, HTTP_SCHEMES)?.to_string(),
            account: self.account,
            engine_path: self.engine_path,
            engine_options,
            policy: Policy {
                auto_start: self.auto_start,
                kick_low_elo: self.kick_low_elo,
                kick_if_lose: self.kick_if_lose,
                kick_if_draw: self.kick_if_draw,
                engine_depth: self.engine_depth,
            },
            dashboard_port: self.dashboard_port,
            log_level,
            mailbox_size: self.mailbox_size,
        })
    }
}

#[cfg(test)]
mod tests;
