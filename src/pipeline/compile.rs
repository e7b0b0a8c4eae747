use serde_json::Value;

use super::{Operation, Pipeline, PipelineError, RawOptions};

const RESIZE: &str = "RESIZE";
const ROTATE: &str = "ROTATE";

impl Pipeline {
  /// Validates every step of the payload and builds the pipeline.
  ///
  /// Fails on the first invalid step; the error names its zero-based index.
  pub fn compile(raw: impl Into<RawOptions>) -> Result<Pipeline, PipelineError> {
    let steps = normalize(raw.into())?;

    let operations = steps
      .iter()
      .enumerate()
      .map(|(index, step)| compile_step(index, step))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Pipeline { operations })
  }
}

fn normalize(raw: RawOptions) -> Result<Vec<Value>, PipelineError> {
  let value = match raw {
    RawOptions::Text(text) | RawOptions::Structured(Value::String(text)) => {
      serde_json::from_str(&text).map_err(|e| PipelineError::MalformedInput(e.to_string()))?
    }
    RawOptions::Structured(value) => value,
  };

  match value {
    Value::Array(steps) => Ok(steps),
    _ => Err(PipelineError::MalformedInput(
      "expected an array of steps".to_owned(),
    )),
  }
}

fn compile_step(index: usize, step: &Value) -> Result<Operation, PipelineError> {
  let kind = step
    .get("type")
    .and_then(Value::as_str)
    .map(|t| t.trim().to_uppercase())
    .unwrap_or_default();

  match kind.as_str() {
    "GREYSCALE" | "GRAYSCALE" => Ok(Operation::Greyscale),
    RESIZE => {
      let width = positive(step.get("width")).ok_or(PipelineError::InvalidOperand {
        index,
        step: RESIZE,
        operand: "width",
        reason: "must be a positive number",
      })?;
      let height = positive(step.get("height")).ok_or(PipelineError::InvalidOperand {
        index,
        step: RESIZE,
        operand: "height",
        reason: "must be a positive number",
      })?;

      Ok(Operation::Resize { width, height })
    }
    ROTATE => {
      let degrees = finite(step.get("deg")).ok_or(PipelineError::InvalidOperand {
        index,
        step: ROTATE,
        operand: "degrees",
        reason: "must be a finite number",
      })?;

      Ok(Operation::Rotate { degrees })
    }
    _ => Err(PipelineError::UnsupportedStepType { index }),
  }
}

// Only JSON numbers qualify; numeric strings like "90" are rejected.
fn finite(value: Option<&Value>) -> Option<f64> {
  value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn positive(value: Option<&Value>) -> Option<f64> {
  finite(value).filter(|n| *n > 0.0)
}
