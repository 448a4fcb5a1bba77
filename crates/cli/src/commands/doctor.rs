use secrecy::ExposeSecret;
use serde::Serialize;
use supportdesk_agent::prompt::load_system_prompt;
use supportdesk_core::config::{AppConfig, LoadOptions};
use supportdesk_db::{connect_with_config, ping};

use crate::commands::{current_thread_runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CONFIG_CHECK: &str = "config_validation";
const LLM_CHECK: &str = "llm_key_readiness";
const PROMPT_CHECK: &str = "system_prompt";
const DATABASE_CHECK: &str = "database_connectivity";

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(LoadOptions::default());
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        return CommandResult::text(exit_code, output);
    }

    CommandResult::text(exit_code, render_human(&report))
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let checks = match AppConfig::load(options) {
        Ok(config) => vec![
            DoctorCheck::pass(CONFIG_CHECK, "configuration loaded and validated"),
            check_llm_key(&config),
            check_system_prompt(&config),
            check_database_connectivity(&config),
        ],
        Err(error) => vec![
            DoctorCheck::fail(CONFIG_CHECK, error.to_string()),
            DoctorCheck::skipped(LLM_CHECK),
            DoctorCheck::skipped(PROMPT_CHECK),
            DoctorCheck::skipped(DATABASE_CHECK),
        ],
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

// Format only; the endpoint is not called.
fn check_llm_key(config: &AppConfig) -> DoctorCheck {
    match &config.llm.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => DoctorCheck::pass(
            LLM_CHECK,
            format!("api key present for model `{}` at {}", config.llm.model, config.llm.base_url),
        ),
        _ => DoctorCheck::fail(LLM_CHECK, "llm.api_key is empty"),
    }
}

fn check_system_prompt(config: &AppConfig) -> DoctorCheck {
    let source = config
        .llm
        .system_prompt_path
        .as_ref()
        .map(|path| format!("`{}`", path.display()))
        .unwrap_or_else(|| "built-in instructions".to_string());

    match load_system_prompt(config.llm.system_prompt_path.as_deref()) {
        Ok(_) => DoctorCheck::pass(PROMPT_CHECK, format!("using {source}")),
        Err(error) => DoctorCheck::fail(PROMPT_CHECK, error.to_string()),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return DoctorCheck::fail(DATABASE_CHECK, setup.message),
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let probe = ping(&pool).await.map_err(|error| format!("SELECT 1 failed: {error}"));
        pool.close().await;
        probe
    });

    match result {
        Ok(()) => DoctorCheck::pass(DATABASE_CHECK, format!("connected using `{}`", config.database.url)),
        Err(error) => DoctorCheck::fail(DATABASE_CHECK, error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
