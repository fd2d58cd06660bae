//! Gateway implementations for CodiCode.
//!
//! All backends implement the `codicode_core::Gateway` trait.
//! [`build_from_config`] picks the backend named in `[llm]`.

pub mod ollama;

use std::sync::Arc;
use std::time::Duration;

use codicode_config::LlmConfig;
use codicode_core::{Error, Gateway};

pub use ollama::{OllamaGateway, model_matches};

/// Build the configured gateway.
pub fn build_from_config(llm: &LlmConfig) -> Result<Arc<dyn Gateway>, Error> {
    match llm.provider.as_str() {
        "ollama" => {
            let gateway = OllamaGateway::with_timeout(
                &llm.model,
                &llm.base_url,
                Duration::from_secs(llm.request_timeout_secs),
            )?;
            Ok(Arc::new(gateway))
        }
        other => Err(Error::Config {
            message: format!("Unknown LLM provider '{other}'. Supported: ollama"),
        }),
    }
}
