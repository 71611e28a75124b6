//! `clawloop config`: Configuration inspection commands.

use std::path::{Path, PathBuf};

use clawloop_config::AppConfig;

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render(&config)?);
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", resolve_path(config_path).display());
}

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path.map_or_else(AppConfig::config_path, Path::to_path_buf)
}

/// TOML for display, with the API key masked.
fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_config_toml() {
        let path = resolve_path(None);
        assert!(path.ends_with(".clawloop/config.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = resolve_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn render_masks_api_key() {
        let config = AppConfig {
            api_key: Some("sk-or-secret".into()),
            ..AppConfig::default()
        };
        let rendered = render(&config).unwrap();
        assert!(!rendered.contains("sk-or-secret"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("anthropic/claude-haiku-4.5"));
    }
}
