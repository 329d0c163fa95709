//! `peoplesay ai doctor`

use serde_json::json;

use peoplesay_config::{LlmConfigStatus, LlmDiagnostics, ResolvedLlmConfig, Settings};
use peoplesay_llm::{build_backend, CompletionBackend, LlmError};

use crate::exit_codes::{
    EXIT_AI_DISABLED, EXIT_AI_KEY_REJECTED, EXIT_AI_MISSING_KEY, EXIT_ERROR, EXIT_SUCCESS,
};
use crate::{AiArgs, CliError};

/// Outcome of `--test`.
enum KeyTest {
    Skipped,
    Ok,
    Rejected(String),
    Failed(String),
}

impl KeyTest {
    fn as_str(&self) -> &'static str {
        match self {
            KeyTest::Skipped => "skipped",
            KeyTest::Ok => "ok",
            KeyTest::Rejected(_) => "rejected",
            KeyTest::Failed(_) => "failed",
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            KeyTest::Rejected(msg) | KeyTest::Failed(msg) => Some(msg),
            KeyTest::Skipped | KeyTest::Ok => None,
        }
    }
}

pub fn cmd_ai_doctor(args: AiArgs, json: bool, test: bool) -> Result<u8, CliError> {
    let mut settings = Settings::load();
    args.apply(&mut settings);

    let config = ResolvedLlmConfig::resolve(&settings.ai, args.api_key.as_deref());
    let diag = LlmDiagnostics::from_resolved(&config);

    let key_test = if test && config.status.is_ready() {
        run_key_test(&config)
    } else {
        KeyTest::Skipped
    };

    if json {
        let output = json!({
            "schema_version": 1,
            "status": diag.status.as_str(),
            "blocking_reason": diag.blocking_reason,
            "provider": diag.provider,
            "model_configured": !settings.ai.model.is_empty(),
            "model_effective": if diag.model.is_empty() { "(none)" } else { diag.model.as_str() },
            "endpoint": diag.endpoint,
            "key": if diag.key_present { "present" } else { "missing" },
            "key_source": diag.key_source.as_str(),
            "key_variable": diag.key_variable,
            "keychain": if diag.keychain_available { "ok" } else { "unavailable" },
            "timeout_secs": diag.timeout_secs,
            "verify_key": diag.verify_key,
            "known_models": settings
                .ai
                .provider
                .known_models()
                .iter()
                .map(|(name, description)| json!({
                    "name": name,
                    "description": description,
                    "selected": *name == diag.model,
                }))
                .collect::<Vec<_>>(),
            "test": key_test.as_str(),
            "test_detail": key_test.detail(),
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", diag);
        let known = settings.ai.provider.known_models();
        if !known.is_empty() {
            println!("Known models:");
            for (name, description) in known {
                let marker = if *name == diag.model { "*" } else { " " };
                println!("  {marker} {name:<32} {description}");
            }
        }
        match (&key_test, test) {
            (KeyTest::Skipped, false) => println!("Key test:          skipped (use --test)"),
            (KeyTest::Skipped, true) => println!("Key test:          skipped (not ready)"),
            (result, _) => match result.detail() {
                Some(detail) => println!("Key test:          {} ({})", result.as_str(), detail),
                None => println!("Key test:          {}", result.as_str()),
            },
        }

        match diag.status {
            LlmConfigStatus::Disabled => {
                println!();
                println!("AI is disabled. To enable:");
                println!("  Set ai.provider in {}", Settings::config_path().display());
            }
            LlmConfigStatus::MissingKey => {
                println!();
                println!(
                    "Fix: set PEOPLESAY_{}_KEY or pass --api-key",
                    diag.provider.to_uppercase()
                );
            }
            LlmConfigStatus::Ready => {}
        }
    }

    match (diag.status, key_test) {
        (LlmConfigStatus::Disabled, _) => {
            Err(CliError::new(EXIT_AI_DISABLED, "AI is disabled"))
        }
        (LlmConfigStatus::MissingKey, _) => Err(CliError::new(
            EXIT_AI_MISSING_KEY,
            diag.blocking_reason.unwrap_or_else(|| "No API key found".to_string()),
        )),
        (LlmConfigStatus::Ready, KeyTest::Rejected(msg)) => {
            Err(CliError::new(EXIT_AI_KEY_REJECTED, format!("API key rejected: {msg}")))
        }
        (LlmConfigStatus::Ready, KeyTest::Failed(msg)) => {
            Err(CliError::new(EXIT_ERROR, format!("key test failed: {msg}")))
        }
        (LlmConfigStatus::Ready, _) => Ok(EXIT_SUCCESS),
    }
}

fn run_key_test(config: &ResolvedLlmConfig) -> KeyTest {
    let result = build_backend(config).and_then(|backend| backend.verify_key());
    match result {
        Ok(()) => KeyTest::Ok,
        Err(e @ LlmError::Api { .. }) if e.is_auth() => KeyTest::Rejected(e.to_string()),
        Err(e) => KeyTest::Failed(e.to_string()),
    }
}
