//! Model endpoint adapters for clawloop.
//!
//! All providers implement the `clawloop_core::Provider` trait and hand the
//! agent loop an ordered stream of fragments.

pub mod openai_compat;
pub mod sse;

use std::sync::Arc;

use clawloop_config::AppConfig;
use clawloop_core::error::ProviderError;
use clawloop_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;
pub use sse::SseDecoder;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no API key is available.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "no API key; set OPENROUTER_API_KEY or api_key in the config file".into(),
            )
        })?;

    let name = provider_name(&config.base_url);
    tracing::debug!(provider = name, base_url = %config.base_url, "Creating provider");

    Ok(Arc::new(OpenAiCompatProvider::new(name, &config.base_url, api_key)?))
}

/// A short display name derived from the endpoint host.
fn provider_name(base_url: &str) -> &'static str {
    if base_url.contains("openrouter.ai") {
        "openrouter"
    } else if base_url.contains("api.openai.com") {
        "openai"
    } else if base_url.contains("localhost:11434") || base_url.contains("127.0.0.1:11434") {
        "ollama"
    } else {
        "openai-compatible"
    }
}
