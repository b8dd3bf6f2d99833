use super::*;

const MAX_NAME_ATTEMPTS: u32 = 10;
const DEFAULT_MODE: u32 = 0o777;
const MAX_WALK_DEPTH: usize = 32;

/// A per-invocation tmpfs workspace.
///
/// Owns exactly one tmpfs mount, rooted at `<root_dir>/<uuid>`, with a
/// `home` subdirectory the jailed child writes into and an `output`
/// subdirectory (by default the same as `home`) that is later harvested.
/// Dropping a `MemFs` without calling [`MemFs::cleanup`] still unmounts and
/// removes it, but logs a warning — callers are expected to release it
/// explicitly once they are done with it.
#[derive(Debug)]
pub struct MemFs {
  root: PathBuf,
  home: PathBuf,
  output: PathBuf,
  instance_size: Size,
  cleaned_up: bool,
}

impl MemFs {
  /// Allocates a fresh tmpfs workspace under `root_dir`, sized at
  /// `instance_size`, with `home_name`/`output_name` subdirectories.
  pub fn new(
    root_dir: &Path,
    instance_size: Size,
    home_name: &str,
    output_name: &str,
  ) -> Result<Self> {
    let mut last_err = None;

    for _ in 0..MAX_NAME_ATTEMPTS {
      let root = root_dir.join(Uuid::new_v4().to_string());

      match Self::create_at(&root, instance_size, home_name, output_name) {
        Ok(memfs) => return Ok(memfs),
        Err(Error::Mount(message)) => last_err = Some(Error::Mount(message)),
        Err(err) => return Err(err),
      }
    }

    Err(last_err.unwrap_or_else(|| Error::Mount("failed to allocate a unique memfs root".into())))
  }

  fn create_at(
    root: &Path,
    instance_size: Size,
    home_name: &str,
    output_name: &str,
  ) -> Result<Self> {
    root.to_path_buf().create(DEFAULT_MODE)?;

    fs_primitives::mount(root, "tmpfs", &[format!("size={instance_size}")])?;

    let home = root.join(home_name);
    home.create(DEFAULT_MODE)?;

    let output = if output_name == home_name {
      home.clone()
    } else {
      let output = root.join(output_name);
      output.create(DEFAULT_MODE)?;
      output
    };

    Ok(Self {
      root: root.to_path_buf(),
      home,
      output,
      instance_size,
      cleaned_up: false,
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn home(&self) -> &Path {
    &self.home
  }

  pub fn output(&self) -> &Path {
    &self.output
  }

  /// Unmounts and removes this workspace. Idempotent.
  pub fn cleanup(&mut self) -> Result<()> {
    if self.cleaned_up {
      return Ok(());
    }

    self.cleaned_up = true;
    Self::teardown(&self.root)
  }

  fn teardown(root: &Path) -> Result<()> {
    fs_primitives::unmount(root, UnmountFlags::DETACH)?;
    fs::remove_dir_all(root)?;
    Ok(())
  }

  /// Enumerates files under [`MemFs::output`] matching `pattern`, skipping
  /// entries present (by path and mtime) in `exclude`, stopping once
  /// `limit` files have been emitted or the cumulative size would exceed
  /// this workspace's instance size, and failing if `deadline` elapses
  /// first.
  pub fn enumerate_files(
    &self,
    pattern: &str,
    exclude: &HashMap<PathBuf, SystemTime>,
    limit: usize,
    deadline: Instant,
  ) -> Result<Vec<FileAttachment>> {
    let matcher = glob::Pattern::new(pattern)
      .map_err(|err| Error::Config(format!("invalid glob pattern '{pattern}': {err}")))?;

    let mut out = Vec::new();
    let mut total_size: u64 = 0;

    for entry in WalkDir::new(&self.output).follow_links(true) {
      if Instant::now() >= deadline {
        return Err(Error::HarvestTimeout);
      }

      let entry =
        entry.map_err(|err| Error::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))?;

      if entry.depth() > MAX_WALK_DEPTH {
        return Err(Error::HarvestDepth);
      }

      if !entry.file_type().is_file() {
        continue;
      }

      let relative = entry
        .path()
        .strip_prefix(&self.output)
        .unwrap_or(entry.path());

      if !matcher.matches_path(relative) {
        continue;
      }

      let relative_str = relative.to_str().ok_or(Error::HarvestEncoding)?;

      let metadata = entry.path().metadata()?;
      let mtime = metadata.modified()?;

      if let Some(seed_mtime) = exclude.get(entry.path()) {
        if *seed_mtime == mtime {
          continue;
        }
      }

      if out.len() >= limit {
        break;
      }

      total_size += metadata.len();
      if total_size > self.instance_size.bytes() {
        break;
      }

      let content = fs::read(entry.path())?;
      out.push(FileAttachment::new(relative_str.to_string(), content)?);
    }

    out.sort_by(|a, b| a.path().cmp(b.path()));

    Ok(out)
  }
}

#[cfg(test)]
impl MemFs {
  /// Builds a `MemFs` handle over an already-existing directory, for tests
  /// that need to exercise enumeration without an actual tmpfs mount.
  pub(crate) fn for_test(root: PathBuf, output: PathBuf, instance_size: Size) -> Self {
    Self {
      home: output.clone(),
      root,
      output,
      instance_size,
      cleaned_up: true,
    }
  }
}

impl Drop for MemFs {
  fn drop(&mut self) {
    if self.cleaned_up {
      return;
    }

    warn!(path = %self.root.display(), "implicitly cleaning up memfs");

    if let Err(err) = Self::teardown(&self.root) {
      warn!(path = %self.root.display(), error = %err, "failed to clean up memfs on drop");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // These tests exercise only the parts of MemFs that do not require an
  // actual tmpfs mount (which needs root); the mount/unmount round trip
  // itself is covered under the `integration` feature.

  #[test]
  fn enumerate_files_respects_pattern_and_limit() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = temp.path().join("output");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("a.txt"), b"aaa").unwrap();
    fs::write(output.join("_hidden.txt"), b"bbb").unwrap();
    fs::write(output.join("b.txt"), b"bb").unwrap();

    let memfs = MemFs::for_test(temp.path().to_path_buf(), output, Size::MiB(1));

    let files = memfs
      .enumerate_files(
        "**/[!_]*",
        &HashMap::new(),
        10,
        Instant::now() + Duration::from_secs(5),
      )
      .unwrap();

    let names: Vec<_> = files.iter().map(|f| f.path().to_string()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
  }

  #[test]
  fn enumerate_files_excludes_unchanged_seed_files() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = temp.path().join("output");
    fs::create_dir(&output).unwrap();
    let seed_path = output.join("seed.txt");
    fs::write(&seed_path, b"seed").unwrap();
    let seed_mtime = seed_path.metadata().unwrap().modified().unwrap();

    let mut exclude = HashMap::new();
    exclude.insert(seed_path.clone(), seed_mtime);

    let memfs = MemFs::for_test(temp.path().to_path_buf(), output, Size::MiB(1));

    let files = memfs
      .enumerate_files("**/*", &exclude, 10, Instant::now() + Duration::from_secs(5))
      .unwrap();

    assert!(files.is_empty());
  }

  #[test]
  fn enumerate_files_stops_at_limit() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = temp.path().join("output");
    fs::create_dir(&output).unwrap();
    for i in 0..5 {
      fs::write(output.join(format!("{i}.txt")), b"x").unwrap();
    }

    let memfs = MemFs::for_test(temp.path().to_path_buf(), output, Size::MiB(1));

    let files = memfs
      .enumerate_files("**/*", &HashMap::new(), 2, Instant::now() + Duration::from_secs(5))
      .unwrap();

    assert_eq!(files.len(), 2);
  }
}
