use super::{ImageHandle, Operation, Pipeline, PipelineError, RawOptions};

impl Pipeline {
  /// Applies every operation to `handle`, in order.
  ///
  /// The first failing operation stops the run; operations already applied
  /// stay applied to the in-memory handle.
  pub fn execute<'h, H: ImageHandle>(&self, handle: &'h mut H) -> Result<&'h mut H, PipelineError> {
    for operation in &self.operations {
      match *operation {
        Operation::Greyscale => handle.greyscale(),
        Operation::Resize { width, height } => handle.resize(width, height),
        Operation::Rotate { degrees } => handle.rotate(degrees),
      }
      .map_err(|e| PipelineError::ExecutionFailure(Box::new(e)))?;
    }

    Ok(handle)
  }
}

/// Compiles `raw` and runs it against `handle`.
pub fn process<'h, H: ImageHandle>(
  raw: impl Into<RawOptions>,
  handle: &'h mut H,
) -> Result<&'h mut H, PipelineError> {
  Pipeline::compile(raw)?.execute(handle)
}

#[cfg(test)]
mod tests {
  use super::*;
  use thiserror::Error;

  #[derive(Debug, Clone, PartialEq)]
  enum Call {
    Greyscale,
    Resize(f64, f64),
    Rotate(f64),
  }

  #[derive(Error, Debug)]
  #[error("corrupt image data")]
  struct Corrupt;

  #[derive(Default, Debug)]
  struct Recorder {
    calls: Vec<Call>,
    fail_at: Option<usize>,
  }

  impl Recorder {
    fn record(&mut self, call: Call) -> Result<&mut Self, Corrupt> {
      if self.fail_at == Some(self.calls.len()) {
        return Err(Corrupt);
      }
      self.calls.push(call);
      Ok(self)
    }
  }

  impl ImageHandle for Recorder {
    type Error = Corrupt;

    fn greyscale(&mut self) -> Result<&mut Self, Corrupt> {
      self.record(Call::Greyscale)
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<&mut Self, Corrupt> {
      self.record(Call::Resize(width, height))
    }

    fn rotate(&mut self, degrees: f64) -> Result<&mut Self, Corrupt> {
      self.record(Call::Rotate(degrees))
    }
  }

  #[test]
  fn operations_run_in_supplied_order() {
    let mut handle = Recorder::default();
    process(
      r#"[{"type":"RESIZE","width":50,"height":50},{"type":"ROTATE","deg":90}]"#,
      &mut handle,
    )
    .unwrap();

    assert_eq!(handle.calls, vec![Call::Resize(50.0, 50.0), Call::Rotate(90.0)]);
  }

  #[test]
  fn empty_pipeline_leaves_handle_untouched() {
    let mut handle = Recorder::default();
    Pipeline::compile("[]").unwrap().execute(&mut handle).unwrap();
    assert!(handle.calls.is_empty());
  }

  #[test]
  fn invalid_step_applies_nothing() {
    let mut handle = Recorder::default();
    let err = process(
      r#"[{"type":"GREYSCALE"},{"type":"RESIZE","width":100,"height":0}]"#,
      &mut handle,
    )
    .unwrap_err();

    assert_eq!(err.step_index(), Some(1));
    assert!(handle.calls.is_empty());
  }

  #[test]
  fn execute_returns_the_same_handle() {
    let pipeline = Pipeline::compile(r#"[{"type":"grayscale"}]"#).unwrap();
    let mut handle = Recorder::default();

    let returned = pipeline.execute(&mut handle).unwrap();
    returned.rotate(180.0).unwrap();

    assert_eq!(handle.calls, vec![Call::Greyscale, Call::Rotate(180.0)]);
  }

  #[test]
  fn handle_failure_stops_execution() {
    let pipeline = Pipeline::compile(
      r#"[{"type":"grayscale"},{"type":"rotate","deg":45},{"type":"greyscale"}]"#,
    )
    .unwrap();
    let mut handle = Recorder {
      fail_at: Some(1),
      ..Recorder::default()
    };

    let err = pipeline.execute(&mut handle).unwrap_err();

    assert!(matches!(err, PipelineError::ExecutionFailure(_)));
    assert_eq!(err.to_string(), "corrupt image data");
    assert_eq!(handle.calls, vec![Call::Greyscale]);
  }

  #[test]
  fn pipeline_can_run_twice() {
    let pipeline = Pipeline::compile(r#"[{"type":"rotate","deg":-30}]"#).unwrap();
    let mut first = Recorder::default();
    let mut second = Recorder::default();

    pipeline.execute(&mut first).unwrap();
    pipeline.execute(&mut second).unwrap();

    assert_eq!(first.calls, second.calls);
  }
}
