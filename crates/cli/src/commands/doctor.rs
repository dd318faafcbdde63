//! `localagent doctor`: Diagnose system health.

use localagent_agent::AgentService;
use localagent_config::AppConfig;
use localagent_core::provider::Provider;
use localagent_providers::{OllamaProvider, model_matches};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("LocalAgent Doctor: System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid ({})", config_path.display());
            } else {
                println!("  ⚠️  No config file, using defaults (run `localagent config init`)");
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  1 issue found. Fix the config before running other checks.");
            return Err(e.into());
        }
    };

    // Check model server and model
    let provider = OllamaProvider::from_config(&config)?;
    match provider.list_models().await {
        Ok(models) => {
            println!("  ✅ Model server reachable at {}", provider.base_url());
            if models.iter().any(|m| model_matches(m, &config.model.id)) {
                println!("  ✅ Model '{}' available", config.model.id);
            } else {
                println!(
                    "  ❌ Model '{}' not pulled (server has: {})",
                    config.model.id,
                    if models.is_empty() { "none".to_string() } else { models.join(", ") }
                );
                issues += 1;
            }
        }
        Err(e) => {
            println!("  ❌ Model server unreachable at {}: {e}", provider.base_url());
            issues += 1;
        }
    }

    // Check memory store
    match AgentService::from_config(&config) {
        Ok(service) => match service.memory_count().await {
            Ok(count) => println!(
                "  ✅ Memory store '{}' readable ({count} entries)",
                service.memory_backend()
            ),
            Err(e) => {
                println!("  ❌ Memory store '{}' unreadable: {e}", service.memory_backend());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Memory store failed to open: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
