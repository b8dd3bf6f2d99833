use super::*;

/// Wraps [`MemFs::enumerate_files`] with a wall-clock budget computed from
/// `now`, rather than an absolute deadline, so callers reason in terms of
/// "how long do I have left" instead of juggling `Instant`s directly.
pub struct TimedHarvester {
  pub pattern: String,
  pub limit: usize,
  pub budget: Duration,
}

impl TimedHarvester {
  pub fn new(pattern: impl Into<String>, limit: usize, budget: Duration) -> Self {
    Self {
      pattern: pattern.into(),
      limit,
      budget,
    }
  }

  /// Harvests files from `memfs`, excluding any entry whose path and mtime
  /// match `seed_files` (files the caller itself wrote in and that the
  /// child left untouched).
  pub fn harvest(
    &self,
    memfs: &MemFs,
    seed_files: &HashMap<PathBuf, SystemTime>,
  ) -> Result<Vec<FileAttachment>> {
    let deadline = Instant::now() + self.budget;

    memfs.enumerate_files(&self.pattern, seed_files, self.limit, deadline)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn harvest_respects_configured_limit() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = temp.path().join("output");
    fs::create_dir(&output).unwrap();
    for i in 0..3 {
      fs::write(output.join(format!("{i}.txt")), b"x").unwrap();
    }

    let memfs = MemFs::for_test(temp.path().to_path_buf(), output, Size::MiB(1));

    let harvester = TimedHarvester::new("**/*", 2, Duration::from_secs(5));
    let files = harvester.harvest(&memfs, &HashMap::new()).unwrap();

    assert_eq!(files.len(), 2);
  }
}
