use super::*;

/// Fixed per-chunk accounting overhead added on top of each chunk's raw
/// byte length before comparing against the output budget, matching the
/// conservative (object-overhead-inclusive) accounting of the historical
/// implementation this crate's behavior is pinned to.
const CHUNK_OVERHEAD_BYTES: usize = 49;

/// Reads a child process's combined stdout+stderr under a hard byte
/// budget, sending `SIGTERM` and returning early if the budget is
/// exceeded. Always waits for the child before returning.
pub struct BoundedOutputReader {
  max_output_size: usize,
  read_chunk_size: usize,
}

/// Whether the output budget was exceeded while draining the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
  Drained,
  Overflowed,
}

impl BoundedOutputReader {
  pub fn new(max_output_size: usize, read_chunk_size: usize) -> Self {
    Self {
      max_output_size,
      read_chunk_size,
    }
  }

  /// Drains `reader` (the child's combined stdout+stderr pipe) into a
  /// UTF-8 string, terminating `pid` with `SIGTERM` if the budget is
  /// exceeded, then waits for `child` regardless of outcome.
  pub fn drain(
    &self,
    mut reader: impl Read,
    pid: Pid,
    child: &mut std::process::Child,
  ) -> Result<(String, DrainOutcome, ExitStatus)> {
    let mut buf = vec![0u8; self.read_chunk_size];
    let mut collected: Vec<u8> = Vec::new();
    let mut budget_used = 0usize;
    let mut outcome = DrainOutcome::Drained;

    loop {
      let n = reader
        .read(&mut buf)
        .map_err(|err| Error::Spawn(format!("failed to read jailer output: {err}")))?;

      if n == 0 {
        break;
      }

      collected.extend_from_slice(&buf[..n]);
      budget_used += n + CHUNK_OVERHEAD_BYTES;

      if budget_used > self.max_output_size {
        outcome = DrainOutcome::Overflowed;
        let _ = kill(pid, Signal::SIGTERM);
        break;
      }
    }

    let status = child
      .wait()
      .map_err(|err| Error::Spawn(format!("failed to wait for jailer: {err}")))?;

    let text = String::from_utf8(collected)
      .map_err(|_| Error::Spawn("UnicodeDecodeError: invalid Unicode in output pipe".into()))?;

    Ok((text, outcome, status))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::process::{Command, Stdio};

  #[test]
  fn drains_small_output_without_overflow() {
    let mut child = Command::new("printf")
      .arg("hello")
      .stdout(Stdio::piped())
      .spawn()
      .unwrap();

    let stdout = child.stdout.take().unwrap();
    let pid = Pid::from_raw(child.id() as i32);

    let reader = BoundedOutputReader::new(1_000_000, 4096);
    let (text, outcome, _status) = reader.drain(stdout, pid, &mut child).unwrap();

    assert_eq!(text, "hello");
    assert_eq!(outcome, DrainOutcome::Drained);
  }

  #[test]
  fn overflow_terminates_child_and_truncates_output() {
    let mut child = Command::new("yes")
      .stdout(Stdio::piped())
      .spawn()
      .unwrap();

    let stdout = child.stdout.take().unwrap();
    let pid = Pid::from_raw(child.id() as i32);

    let reader = BoundedOutputReader::new(64, 16);
    let (text, outcome, _status) = reader.drain(stdout, pid, &mut child).unwrap();

    assert_eq!(outcome, DrainOutcome::Overflowed);
    assert!(text.len() <= 64 + 16 + CHUNK_OVERHEAD_BYTES);
  }
}
