use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pricebot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct FieldLine<'a> {
    key_path: &'static str,
    value: String,
    env_keys: &'a [&'a str],
}

/// Prints the effective configuration; the Discord token is never shown in full.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions {
        skip_discord_validation: true,
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        FieldLine {
            key_path: "discord.token",
            value: redact_token(config.discord.token.expose_secret()),
            env_keys: &["PRICEBOT_DISCORD_TOKEN", "DISCORD_TOKEN"],
        },
        FieldLine {
            key_path: "discord.command_prefix",
            value: config.discord.command_prefix.to_string(),
            env_keys: &["PRICEBOT_DISCORD_COMMAND_PREFIX"],
        },
        FieldLine {
            key_path: "price_api.endpoint",
            value: config.price_api.endpoint.clone(),
            env_keys: &["PRICEBOT_PRICE_API_ENDPOINT"],
        },
        FieldLine {
            key_path: "price_api.timeout_secs",
            value: config.price_api.timeout_secs.to_string(),
            env_keys: &["PRICEBOT_PRICE_API_TIMEOUT_SECS"],
        },
        FieldLine {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["PRICEBOT_LOGGING_LEVEL", "PRICEBOT_LOG_LEVEL"],
        },
        FieldLine {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["PRICEBOT_LOGGING_FORMAT", "PRICEBOT_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pricebot.toml"), PathBuf::from("config/pricebot.toml")]
        .into_iter()
        .find(|path| path.exists())
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

// Discord tokens are three dot-separated segments; the first only encodes the bot id.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('.') {
        return format!("{prefix}.***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn redaction_keeps_only_the_id_segment() {
        assert_eq!(redact_token("MTIz.abc.def"), "MTIz.***");
        assert_eq!(redact_token("   "), "<empty>");
        assert_eq!(redact_token("opaque"), "<redacted>");
    }

    #[test]
    fn nested_key_paths_resolve_in_toml_documents() {
        let doc: toml::Value = "[price_api]\ntimeout_secs = 5\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "price_api.timeout_secs"));
        assert!(!contains_path(&doc, "price_api.endpoint"));
        assert!(!contains_path(&doc, "discord.token"));
    }
}
