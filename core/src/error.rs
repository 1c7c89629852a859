// tienda-flow/src/error.rs

use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised by the engine itself. Flows built with an application error
/// type `E` convert these through `E: From<FlowError>`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Extractor failed for step '{step_name}': {source}")]
  ExtractorFailure {
    step_name: String,
    #[source]
    source: AnyhowError,
  },

  #[error("No branch arm matched for step '{step_name}'")]
  NoBranchMatched { step_name: String },

  #[error("No flow registered for context type {type_name}")]
  NotRegistered { type_name: String },

  #[error("Context type mismatch, expected {expected_type}")]
  TypeMismatch { expected_type: String },

  #[error("Handler failed: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
