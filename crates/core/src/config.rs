use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PRICE_API_ENDPOINT: &str = "https://api.tarkov.dev/graphql";
pub const DEFAULT_COMMAND_PREFIX: char = '!';

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub price_api: PriceApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: SecretString,
    pub command_prefix: char,
}

#[derive(Clone, Debug)]
pub struct PriceApiConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
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
    pub discord_token: Option<String>,
    pub command_prefix: Option<char>,
    pub price_api_endpoint: Option<String>,
    pub price_api_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    /// Skips the Discord token checks, for tools that only talk to the price API.
    pub skip_discord_validation: bool,
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
        Self {
            discord: DiscordConfig {
                token: String::new().into(),
                command_prefix: DEFAULT_COMMAND_PREFIX,
            },
            price_api: PriceApiConfig {
                endpoint: DEFAULT_PRICE_API_ENDPOINT.to_string(),
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
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
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pricebot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        if options.skip_discord_validation {
            config.validate_price_lookup()?;
        } else {
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(discord) = patch.discord {
            if let Some(token) = discord.token {
                self.discord.token = secret_value(token);
            }
            if let Some(prefix) = discord.command_prefix {
                self.discord.command_prefix = parse_prefix("discord.command_prefix", &prefix)?;
            }
        }

        if let Some(price_api) = patch.price_api {
            if let Some(endpoint) = price_api.endpoint {
                self.price_api.endpoint = endpoint;
            }
            if let Some(timeout_secs) = price_api.timeout_secs {
                self.price_api.timeout_secs = timeout_secs;
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

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // DISCORD_TOKEN is the name most bot hosting guides use; the prefixed key wins.
        let token = read_env("PRICEBOT_DISCORD_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = token {
            self.discord.token = secret_value(value);
        }
        if let Some(value) = read_env("PRICEBOT_DISCORD_COMMAND_PREFIX") {
            self.discord.command_prefix = parse_prefix("PRICEBOT_DISCORD_COMMAND_PREFIX", &value)?;
        }

        if let Some(value) = read_env("PRICEBOT_PRICE_API_ENDPOINT") {
            self.price_api.endpoint = value;
        }
        if let Some(value) = read_env("PRICEBOT_PRICE_API_TIMEOUT_SECS") {
            self.price_api.timeout_secs = parse_u64("PRICEBOT_PRICE_API_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("PRICEBOT_LOGGING_LEVEL").or_else(|| read_env("PRICEBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEBOT_LOGGING_FORMAT").or_else(|| read_env("PRICEBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(token) = overrides.discord_token {
            self.discord.token = secret_value(token);
        }
        if let Some(prefix) = overrides.command_prefix {
            self.discord.command_prefix = prefix;
        }
        if let Some(endpoint) = overrides.price_api_endpoint {
            self.price_api.endpoint = endpoint;
        }
        if let Some(timeout_secs) = overrides.price_api_timeout_secs {
            self.price_api.timeout_secs = timeout_secs;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        self.validate_price_lookup()
    }

    /// Validates everything a one-shot price lookup needs.
    pub fn validate_price_lookup(&self) -> Result<(), ConfigError> {
        validate_command_prefix(self.discord.command_prefix)?;
        validate_price_api(&self.price_api)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pricebot.toml"), PathBuf::from("config/pricebot.toml")]
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

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let token = discord.token.expose_secret().trim();
    if token.is_empty() {
        return Err(ConfigError::Validation(
            "discord.token is required. Set DISCORD_TOKEN (or PRICEBOT_DISCORD_TOKEN) in the environment or a .env file; get it from https://discord.com/developers/applications > Your App > Bot".to_string(),
        ));
    }
    if token.starts_with("Bot ") {
        return Err(ConfigError::Validation(
            "discord.token must be the raw bot token (hint: drop the `Bot ` prefix, it is added automatically)"
                .to_string(),
        ));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.token must not contain whitespace".to_string(),
        ));
    }

    Ok(())
}

fn validate_command_prefix(prefix: char) -> Result<(), ConfigError> {
    if prefix.is_whitespace() || prefix.is_control() {
        return Err(ConfigError::Validation(
            "discord.command_prefix must be a visible character such as `!`".to_string(),
        ));
    }
    Ok(())
}

fn validate_price_api(price_api: &PriceApiConfig) -> Result<(), ConfigError> {
    let endpoint = price_api.endpoint.trim();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "price_api.endpoint must start with http:// or https://".to_string(),
        ));
    }

    if price_api.timeout_secs == 0 || price_api.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "price_api.timeout_secs must be in range 1..=120".to_string(),
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_prefix(key: &str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(prefix), None) => Ok(prefix),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    price_api: Option<PriceApiPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
    command_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceApiPatch {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
