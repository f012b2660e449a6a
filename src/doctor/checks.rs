//! Health checks for the doctor command

use super::report::{CheckCategory, CheckResult, Severity};
use crate::agent::Assistant;
use crate::config::Config;

/// (input, fragment the reply must contain)
pub const SELF_TEST_CASES: &[(&str, &str)] = &[
    ("ما هو اسمك؟", "أنا ماني، مساعدك الذكي!"),
    ("كيف حالك؟", "أنا بخير"),
];

/// Run all health checks
pub async fn run_all_checks(assistant: &Assistant, config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.extend(check_config(config));
    results.extend(check_store(assistant).await);
    results.extend(check_model(config));
    results.extend(check_responses(assistant).await);
    results.extend(check_patterns(assistant).await);

    results
}

/// Check configuration files
pub fn check_config(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match crate::config::config_path() {
        Ok(path) if path.exists() => results.push(CheckResult::pass(
            "config_file",
            CheckCategory::Configuration,
            format!("Configuration file found at {}", path.display()),
        )),
        Ok(path) => results.push(
            CheckResult::fail(
                "config_file",
                CheckCategory::Configuration,
                Severity::Warning,
                format!("No configuration file at {}", path.display()),
            )
            .with_fix("Run 'mani config --show' to write the defaults"),
        ),
        Err(e) => results.push(CheckResult::fail(
            "config_file",
            CheckCategory::Configuration,
            Severity::Error,
            format!("Cannot determine configuration path: {}", e),
        )),
    }

    let modes = &config.modes;
    let bad_modes: Vec<String> = crate::types::Mode::all()
        .iter()
        .filter(|m| {
            let params = modes.params(**m);
            !(params.temperature > 0.0 && params.temperature <= 1.0) || params.max_length == 0
        })
        .map(|m| m.to_string())
        .collect();

    if bad_modes.is_empty() {
        results.push(CheckResult::pass(
            "mode_parameters",
            CheckCategory::Configuration,
            "Mode parameters are within range",
        ));
    } else {
        results.push(
            CheckResult::fail(
                "mode_parameters",
                CheckCategory::Configuration,
                Severity::Warning,
                "Some modes have out-of-range parameters (temperature is clamped)",
            )
            .with_details(bad_modes),
        );
    }

    results
}

/// Check the knowledge store answers queries
pub async fn check_store(assistant: &Assistant) -> Vec<CheckResult> {
    match assistant.store().learning_stats().await {
        Ok(stats) => vec![CheckResult::pass(
            "knowledge_store",
            CheckCategory::Storage,
            format!(
                "Knowledge store reachable ({} interactions, {} knowledge items)",
                stats.total_interactions, stats.knowledge_items
            ),
        )],
        Err(e) => vec![CheckResult::fail(
            "knowledge_store",
            CheckCategory::Storage,
            Severity::Error,
            format!("Knowledge store query failed: {}", e),
        )
        .with_fix("Check the database path in config.toml or restore a backup")],
    }
}

/// Check model endpoint and credentials
pub fn check_model(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match reqwest::Url::parse(&config.model.endpoint) {
        Ok(_) => results.push(CheckResult::pass(
            "model_endpoint",
            CheckCategory::Model,
            format!("{} via {}", config.model.name, config.model.endpoint),
        )),
        Err(e) => results.push(
            CheckResult::fail(
                "model_endpoint",
                CheckCategory::Model,
                Severity::Error,
                format!("Invalid model endpoint '{}': {}", config.model.endpoint, e),
            )
            .with_fix("Set [model] endpoint in config.toml"),
        ),
    }

    if crate::security::has_hf_token() {
        results.push(CheckResult::pass(
            "hf_token",
            CheckCategory::Model,
            "Hugging Face token is configured",
        ));
    } else {
        results.push(
            CheckResult::fail(
                "hf_token",
                CheckCategory::Model,
                Severity::Warning,
                "No Hugging Face token configured",
            )
            .with_fix(format!(
                "Run 'mani config --set-hf-token TOKEN' or export {}",
                crate::security::HF_TOKEN_ENV
            )),
        );
    }

    results
}

/// Check the fixed answers still come back unchanged
pub async fn check_responses(assistant: &Assistant) -> Vec<CheckResult> {
    let mut failures = Vec::new();

    for (input, expected) in SELF_TEST_CASES {
        let reply = assistant.probe(input).await;
        if !reply.text.contains(expected) {
            failures.push(format!("'{}' answered '{}'", input, reply.text));
        }
    }

    if failures.is_empty() {
        vec![CheckResult::pass(
            "canned_responses",
            CheckCategory::Behavior,
            format!("{} self-test answer(s) correct", SELF_TEST_CASES.len()),
        )]
    } else {
        vec![CheckResult::fail(
            "canned_responses",
            CheckCategory::Behavior,
            Severity::Error,
            "Self-test answers differ from the expected text",
        )
        .with_details(failures)]
    }
}

/// Check every configured pattern category is seeded in the store
pub async fn check_patterns(assistant: &Assistant) -> Vec<CheckResult> {
    let stored = match assistant.store().list_patterns().await {
        Ok(patterns) => patterns,
        Err(e) => {
            return vec![CheckResult::fail(
                "pattern_seeds",
                CheckCategory::Behavior,
                Severity::Warning,
                format!("Could not list patterns: {}", e),
            )]
        }
    };

    let missing: Vec<String> = assistant
        .detector()
        .config()
        .patterns
        .iter()
        .filter(|p| !stored.iter().any(|s| s.name == p.name))
        .map(|p| p.name.clone())
        .collect();

    if missing.is_empty() {
        vec![CheckResult::pass(
            "pattern_seeds",
            CheckCategory::Behavior,
            format!("{} pattern categories seeded", stored.len()),
        )]
    } else {
        vec![CheckResult::fail(
            "pattern_seeds",
            CheckCategory::Behavior,
            Severity::Warning,
            "Some pattern categories are missing from the store",
        )
        .with_details(missing)]
    }
}
