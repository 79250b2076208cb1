//! Text generation for plans and commands
//!
//! `TextGenerator` is the seam a model backend plugs into. The bundled
//! `TemplateGenerator` renders deterministic templated text so workflows run
//! without any model.

mod template;

use async_trait::async_trait;
use flow_engine::FlowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{defaults as config_defaults, Impact, ModelId, Platform};
use crate::stix::Technique;

pub use template::{build_plan_prompt, TemplateGenerator};

/// Default values for generator configuration
pub mod defaults {
    /// No simulated latency
    pub const LATENCY_MS: u64 = 0;
}

/// Errors raised by a text generator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Temperature {0} is outside the range [0, 1]")]
    InvalidTemperature(f64),
}

impl From<GenerationError> for FlowError {
    fn from(e: GenerationError) -> Self {
        FlowError::ExecutionFailed(e.to_string())
    }
}

/// Options for plan generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub model: ModelId,
    pub temperature: f64,
    pub impact: Impact,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            temperature: config_defaults::TEMPERATURE,
            impact: Impact::default(),
        }
    }
}

/// Options for command generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOptions {
    pub platform: Platform,
    pub model: Option<ModelId>,
    pub temperature: Option<f64>,
}

/// Settings of the bundled template generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Simulated model latency per call
    pub latency_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latency_ms: defaults::LATENCY_MS,
        }
    }
}

/// Produces attack plans and commands
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Write an emulation plan for `techniques`
    async fn generate_plan(
        &self,
        techniques: &[Technique],
        options: &PlanOptions,
    ) -> Result<String, GenerationError>;

    /// Derive concrete commands from a plan
    async fn generate_commands(
        &self,
        plan: &str,
        options: &CommandOptions,
    ) -> Result<Vec<String>, GenerationError>;
}
