#[cfg(test)]
use super::*;

#[macro_export]
macro_rules! ensure {
  ($cond:expr, $err:expr) => {
    if !($cond) {
      return Err($err);
    }
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ensures_properly() {
    fn validate_path(path: &str) -> Result<()> {
      ensure!(
        !path.starts_with('/'),
        Error::IllegalPath(format!("File path '{path}' must be relative"))
      );

      Ok(())
    }

    assert!(validate_path("foo/bar").is_ok());

    assert!(matches!(
      validate_path("/etc/passwd"),
      Err(Error::IllegalPath(_))
    ));
  }
}
