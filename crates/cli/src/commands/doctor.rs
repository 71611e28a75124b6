//! `clawloop doctor`: Diagnose setup.

use std::path::Path;

use clawloop_config::AppConfig;

use super::agent::load_instructions;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 clawloop doctor");
    println!("==================\n");

    let mut issues = 0;

    let file = config_path.map_or_else(AppConfig::config_path, Path::to_path_buf);
    if file.exists() {
        println!("  ✅ Config file: {}", file.display());
    } else {
        println!("  ⚠️  No config file at {} (using defaults)", file.display());
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid (model {}, endpoint {})", config.model, config.base_url);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config file and run doctor again.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
        match clawloop_providers::from_config(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ Endpoint reachable ({})", provider.name()),
                Ok(false) => {
                    println!("  ❌ Endpoint rejected the request — check the API key and base_url");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Endpoint unreachable: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ Provider setup failed: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ No API key — set OPENROUTER_API_KEY or api_key in config.toml");
        issues += 1;
    }

    let tools = clawloop_tools::builtin_registry(&config.tools);
    println!("  ✅ Tools: {}", tools.names().join(", "));

    match load_instructions(&config) {
        Some(i) => println!("  ✅ Instructions: {} (~{} tokens)", i.file_name(), i.estimated_tokens()),
        None if config.instructions.enabled => println!(
            "  ⚠️  No instructions file in the working directory (looked for {})",
            config.instructions.files.join(", ")
        ),
        None => println!("  ✅ Instructions disabled"),
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
