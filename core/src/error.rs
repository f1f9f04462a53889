// etapa/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the engine itself.
///
/// Application pipelines use their own error type `Err`, which must be
/// `From<EtapaError>` so engine failures can flow through the same channel.
#[derive(Debug, Error)]
pub enum EtapaError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Extractor failed for step '{step_name}': {source}")]
  ExtractorFailure {
    step_name: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Type mismatch for context (expected {expected_type}, step: '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Handler failed: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("No conditional scope matched for step '{step_name}'")]
  NoConditionalScopeMatched { step_name: String },

  #[error("Internal etapa error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for EtapaError {
  fn from(err: AnyhowError) -> Self {
    EtapaError::HandlerError { source: err }
  }
}

pub type EtapaResult<T, E = EtapaError> = std::result::Result<T, E>;
