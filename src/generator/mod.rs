//! The language model collaborator.
//!
//! [`Generator::OpenAi`] talks to an OpenAI-compatible chat completions
//! endpoint. Without an API key [`Generator::Simulated`] returns placeholder
//! markdown so the rest of the pipeline still runs.

mod openai;
mod templates;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::models::DocType;

pub use openai::OpenAiGenerator;
pub use templates::{template_for, Template};

/// Tokens the simulated generator reports per document.
pub const SIMULATED_TOKENS: i64 = 800;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub doc_type: DocType,
    pub context: String,
    pub features: Option<String>,
}

/// Text and accounting returned by one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Generation {
    pub content: String,
    pub tokens: i64,
    pub cost: f64,
    pub model: String,
    pub provider: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Generator {
    OpenAi(OpenAiGenerator),
    Simulated(SimulatedGenerator),
}

impl Generator {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        match &config.api_key {
            Some(key) => Self::OpenAi(OpenAiGenerator::new(
                &config.base_url,
                key,
                &config.model,
                config.timeout,
                config.max_retries,
            )),
            None => {
                tracing::warn!("OPENAI_API_KEY not set, using simulated generator");
                Self::Simulated(SimulatedGenerator::new(&config.model))
            }
        }
    }

    /// Generate a document. `timeout` overrides the configured per-attempt timeout.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        timeout: Option<Duration>,
    ) -> Result<Generation> {
        match self {
            Self::OpenAi(generator) => generator.generate(request, timeout).await,
            Self::Simulated(generator) => Ok(generator.generate(request)),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Simulated(_) => "simulated",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(generator) => generator.model(),
            Self::Simulated(_) => "simulated",
        }
    }
}

/// Deterministic stand-in used when no API key is configured.
#[derive(Debug, Clone)]
pub struct SimulatedGenerator {
    /// Model whose pricing the placeholder cost is computed with.
    priced_as: String,
}

impl SimulatedGenerator {
    pub fn new(priced_as: impl Into<String>) -> Self {
        Self {
            priced_as: priced_as.into(),
        }
    }

    pub fn generate(&self, request: &GenerationRequest) -> Generation {
        let now = Utc::now();
        let content = format!(
            "# {title}

## Based on: {context}

### Document Type: {doc_type}
### Generated: {generated}
### Status: Simulated (language model not configured)

This is a simulated document. Set `OPENAI_API_KEY` and restart the server
to generate real content.

**Example Content Structure:**
- Overview
- Technical specifications
- Requirements
- Integration points
- Security considerations
- Licensing recommendations
",
            title = request.doc_type.title(),
            context = request.context.trim(),
            doc_type = request.doc_type.as_str(),
            generated = now.format("%Y-%m-%d %H:%M"),
        );

        Generation {
            content,
            tokens: SIMULATED_TOKENS,
            cost: calculate_cost(&self.priced_as, SIMULATED_TOKENS),
            model: "simulated".to_string(),
            provider: "simulated".to_string(),
            generated_at: now,
        }
    }
}

/// Dollars per 1K tokens. Unknown models are priced like gpt-3.5-turbo.
pub fn price_per_1k(model: &str) -> f64 {
    match model {
        "gpt-3.5-turbo" => 0.002,
        "gpt-3.5-turbo-instruct" => 0.0015,
        "gpt-4" => 0.03,
        "gpt-4-turbo-preview" => 0.01,
        _ => 0.002,
    }
}

pub fn calculate_cost(model: &str, tokens: i64) -> f64 {
    tokens as f64 / 1000.0 * price_per_1k(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            doc_type: DocType::Installation,
            context: "  Almond Milk Homogenization Control System ".to_string(),
            features: None,
        }
    }

    #[test]
    fn cost_uses_model_pricing() {
        assert!((calculate_cost("gpt-4", 2000) - 0.06).abs() < 1e-12);
        assert!((calculate_cost("gpt-3.5-turbo", 800) - 0.0016).abs() < 1e-12);
        assert_eq!(price_per_1k("some-future-model"), price_per_1k("gpt-3.5-turbo"));
    }

    #[test]
    fn simulated_generation_is_labelled_and_priced() {
        let generation = tokio_test::block_on(
            Generator::Simulated(SimulatedGenerator::new("gpt-4")).generate(&request(), None),
        )
        .unwrap();

        assert_eq!(generation.provider, "simulated");
        assert_eq!(generation.tokens, SIMULATED_TOKENS);
        assert!((generation.cost - 0.024).abs() < 1e-12);
        let heading = "# Installation Guide\n\n## Based on: Almond Milk Homogenization Control System";
        assert!(generation.content.starts_with(heading));
    }

    #[test]
    fn missing_api_key_selects_simulated_generator() {
        let generator = Generator::from_config(&GeneratorConfig::default());
        assert_eq!(generator.provider(), "simulated");
        assert_eq!(generator.model(), "simulated");
    }
}
