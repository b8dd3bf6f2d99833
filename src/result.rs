use super::*;

/// The outcome of one `run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
  pub args: Vec<String>,
  pub returncode: Option<i32>,
  pub stdout: String,
  pub files: Vec<FileAttachment>,
}

impl EvalResult {
  pub fn new(args: Vec<String>, returncode: Option<i32>, stdout: String, files: Vec<FileAttachment>) -> Self {
    Self {
      args,
      returncode,
      stdout,
      files,
    }
  }

  /// Builds a result carrying no return code and a diagnostic message in
  /// place of captured stdout, matching the contract in place for every
  /// recoverable failure inside `run`.
  fn diagnostic(args: Vec<String>, message: impl Into<String>) -> Self {
    Self {
      args,
      returncode: None,
      stdout: message.into(),
      files: Vec::new(),
    }
  }
}

/// Internal error raised within the orchestrator. Always caught at the
/// outermost frame of [`crate::orchestrator::run`] and folded into an
/// [`EvalResult`] with `returncode: None`.
#[derive(Debug)]
pub(crate) struct EvalError {
  pub message: String,
}

impl EvalError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }

  pub fn into_result(self, args: Vec<String>) -> EvalResult {
    EvalResult::diagnostic(args, self.message)
  }
}

impl From<Error> for EvalError {
  fn from(err: Error) -> Self {
    EvalError::new(err.to_string())
  }
}

impl From<io::Error> for EvalError {
  fn from(err: io::Error) -> Self {
    EvalError::new(format!("{}: {err}", err.kind_label()))
  }
}

trait IoErrorKindLabel {
  fn kind_label(&self) -> &'static str;
}

impl IoErrorKindLabel for io::Error {
  fn kind_label(&self) -> &'static str {
    match self.kind() {
      io::ErrorKind::NotFound => "FileNotFoundError",
      io::ErrorKind::PermissionDenied => "PermissionError",
      io::ErrorKind::AlreadyExists => "FileExistsError",
      _ => "OSError",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn diagnostic_result_has_no_returncode() {
    let result = EvalResult::diagnostic(vec!["-c".into()], "ValueError: embedded null byte");
    assert_eq!(result.returncode, None);
    assert_eq!(result.stdout, "ValueError: embedded null byte");
    assert!(result.files.is_empty());
  }
}
