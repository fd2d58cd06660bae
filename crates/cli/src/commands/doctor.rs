//! `codicode doctor` — Diagnose config and backend health.

use codicode_config::{AppConfig, ConfigError};
use codicode_providers::model_matches;

pub async fn run(loaded: Result<AppConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 CodiCode Doctor — System Diagnostics");
    println!("=======================================\n");

    let issues = diagnose(loaded).await;

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(())
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        Err(format!("doctor found {issues} issue(s)").into())
    }
}

/// Run every check, printing one line each. Returns the number of issues.
async fn diagnose(loaded: Result<AppConfig, ConfigError>) -> usize {
    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults — run `codicode config init`");
    }

    let config = match loaded.and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            issues += 1;
            // The remaining checks need a usable config
            return issues;
        }
    };

    match codicode_tools::default_registry(&config.tools) {
        Ok(registry) => println!("  ✅ {} tools registered", registry.len()),
        Err(e) => {
            println!("  ❌ Tool registry failed: {e}");
            issues += 1;
        }
    }

    let gateway = match codicode_providers::build_from_config(&config.llm) {
        Ok(gateway) => gateway,
        Err(e) => {
            println!("  ❌ {e}");
            return issues + 1;
        }
    };

    if !gateway.health_check().await.unwrap_or(false) {
        println!("  ❌ Backend unreachable at {}", config.llm.base_url);
        return issues + 1;
    }
    println!("  ✅ Backend reachable at {}", config.llm.base_url);

    match gateway.list_models().await {
        Ok(models) if models.iter().any(|m| model_matches(&config.llm.model, m)) => {
            println!("  ✅ Model '{}' available", config.llm.model);
        }
        Ok(_) => {
            println!(
                "  ⚠️  Model '{}' not found — try `ollama pull {}`",
                config.llm.model, config.llm.model
            );
            issues += 1;
        }
        Err(e) => {
            println!("  ⚠️  Could not list models: {e}");
            issues += 1;
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_config_counts_as_one_issue_and_fails() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;

        assert_eq!(diagnose(Ok(config.clone())).await, 1);
        assert!(run(Ok(config)).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_config_is_reported() {
        let loaded = Err(ConfigError::ValidationError("AGENT_MAX_STEPS=\"x\"".into()));
        assert_eq!(diagnose(loaded).await, 1);
    }

    #[tokio::test]
    async fn unreachable_backend_fails_the_run() {
        let mut config = AppConfig::default();
        config.llm.base_url = "http://127.0.0.1:1".into();

        assert_eq!(diagnose(Ok(config.clone())).await, 1);
        assert!(run(Ok(config)).await.is_err());
    }
}
