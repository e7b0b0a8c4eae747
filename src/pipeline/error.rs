use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
  /// The options payload is not JSON, or not a JSON array.
  #[error("malformed options payload: {0}")]
  MalformedInput(String),

  #[error("step {index}: unsupported step type, use GREYSCALE | RESIZE | ROTATE")]
  UnsupportedStepType { index: usize },

  #[error("step {index}: invalid {operand} in {step} ({reason})")]
  InvalidOperand {
    index: usize,
    step: &'static str,
    operand: &'static str,
    reason: &'static str,
  },

  /// The image handle rejected an operation while the pipeline was running.
  #[error(transparent)]
  ExecutionFailure(Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
  /// Zero-based index of the offending step, for compile-time errors.
  pub fn step_index(&self) -> Option<usize> {
    match self {
      PipelineError::UnsupportedStepType { index } => Some(*index),
      PipelineError::InvalidOperand { index, .. } => Some(*index),
      _ => None,
    }
  }
}
