use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use supportdesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

/// One rendered config key: dotted path, display value, env vars that can
/// set it (highest precedence first).
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let config_file_path = detect_config_path();
            let config_file_doc = load_config_file_doc(config_file_path.as_deref());
            CommandResult::text(0, render(&config, config_file_doc.as_ref(), config_file_path.as_deref()))
        }
        Err(error) => CommandResult::text(EXIT_CONFIG, format!("config validation failed: {error}")),
    }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());

    vec![
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["SUPPORTDESK_DATABASE_URL", "DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["SUPPORTDESK_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["SUPPORTDESK_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.api_key",
            value: redact_secret(config.llm.api_key.is_some()),
            env_keys: &["SUPPORTDESK_LLM_API_KEY", "GEMINI_API_KEY"],
        },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone(),
            env_keys: &["SUPPORTDESK_LLM_BASE_URL"],
        },
        Field { key: "llm.model", value: config.llm.model.clone(), env_keys: &["SUPPORTDESK_LLM_MODEL"] },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["SUPPORTDESK_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.max_retries",
            value: config.llm.max_retries.to_string(),
            env_keys: &["SUPPORTDESK_LLM_MAX_RETRIES"],
        },
        Field {
            key: "llm.max_tool_rounds",
            value: config.llm.max_tool_rounds.to_string(),
            env_keys: &["SUPPORTDESK_LLM_MAX_TOOL_ROUNDS"],
        },
        Field {
            key: "llm.system_prompt_path",
            value: optional(config.llm.system_prompt_path.as_ref().map(|path| path.display().to_string())),
            env_keys: &["SUPPORTDESK_LLM_SYSTEM_PROMPT_PATH"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["SUPPORTDESK_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["SUPPORTDESK_SERVER_PORT"],
        },
        Field {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["SUPPORTDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key: "tools.normalize_dummy_customer_ids",
            value: config.tools.normalize_dummy_customer_ids.to_string(),
            env_keys: &["SUPPORTDESK_TOOLS_NORMALIZE_DUMMY_CUSTOMER_IDS"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SUPPORTDESK_LOGGING_LEVEL", "SUPPORTDESK_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            env_keys: &["SUPPORTDESK_LOGGING_FORMAT", "SUPPORTDESK_LOG_FORMAT"],
        },
    ]
}

fn render(config: &AppConfig, config_file_doc: Option<&Value>, config_file_path: Option<&Path>) -> String {
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields(config).into_iter().map(|field| {
        let source = field_source(field.key, field.env_keys, config_file_doc, config_file_path);
        render_line(field.key, &field.value, source)
    }));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["supportdesk.toml", "config/supportdesk.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

fn redact_secret(present: bool) -> String {
    let shown = if present { "<redacted>" } else { "<unset>" };
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use secrecy::SecretString;
    use supportdesk_core::config::AppConfig;

    use super::{contains_path, field_source, render};

    #[test]
    fn render_never_prints_the_api_key() {
        let mut config = AppConfig::default();
        config.database.url = "sqlite://support.db".to_string();
        config.llm.api_key = Some(SecretString::from("super-secret-key".to_string()));

        let output = render(&config, None, None);
        assert!(output.contains("- llm.api_key = <redacted>"));
        assert!(!output.contains("super-secret-key"));
        assert!(output.contains("- llm.model = gemini-2.0-flash (source: "));
        assert!(output.contains("- tools.normalize_dummy_customer_ids = false"));
        assert!(output.contains("- logging.format = compact"));
    }

    #[test]
    fn file_source_is_reported_for_keys_present_in_file() {
        let doc: toml::Value = "[llm]\nmodel = \"gemini-2.0-pro\"\n".parse().expect("toml");
        let path = Path::new("supportdesk.toml");

        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert_eq!(
            field_source("llm.model", &["SUPPORTDESK_TEST_UNSET_VAR"], Some(&doc), Some(path)),
            "file (supportdesk.toml)"
        );
        assert_eq!(field_source("llm.base_url", &[], Some(&doc), Some(path)), "default");
    }
}
