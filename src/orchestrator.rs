use super::*;

/// Strips only the leading falsy (empty-string) items from `tokens`,
/// preserving any empty strings that occur after the first non-empty one.
fn iter_lstrip(tokens: &[String]) -> Vec<String> {
  let mut iter = tokens.iter().skip_while(|token| token.is_empty());
  let mut out = Vec::new();
  if let Some(first) = iter.next() {
    out.push(first.clone());
    out.extend(iter.cloned());
  }
  out
}

/// Runs one invocation end to end: allocates a tmpfs workspace, writes
/// `files` into it, launches the jailer with `py_args` appended to the
/// configured interpreter and `jailer_overrides` appended to its CLI, and
/// returns the captured output together with any files the child left
/// behind in the workspace's output directory.
pub fn run(
  configuration: &Configuration,
  jailer_config: &JailerConfig,
  cgroup_version: CgroupVersion,
  py_args: &[String],
  files: &[FileAttachment],
  jailer_overrides: &[String],
) -> EvalResult {
  // Best-effort argv for failures that occur before the full jailer argv
  // (built in step 4, once a workspace exists) is available.
  let fallback_args = fallback_args(jailer_config, py_args);

  match run_inner(
    configuration,
    jailer_config,
    cgroup_version,
    py_args,
    files,
    jailer_overrides,
  ) {
    Ok(result) => result,
    Err(eval_err) => eval_err.into_result(fallback_args),
  }
}

fn fallback_args(jailer_config: &JailerConfig, py_args: &[String]) -> Vec<String> {
  let mut args = vec![jailer_config.exec_bin.path.clone()];
  args.extend(iter_lstrip(&jailer_config.exec_bin.arg));
  args.extend(iter_lstrip(py_args));
  args
}

fn run_inner(
  configuration: &Configuration,
  jailer_config: &JailerConfig,
  cgroup_version: CgroupVersion,
  py_args: &[String],
  files: &[FileAttachment],
  jailer_overrides: &[String],
) -> std::result::Result<EvalResult, EvalError> {
  let span = debug_span!("run");
  let _enter = span.enter();

  // 1. Construct MemFS.
  let mut memfs = {
    let _span = debug_span!("construct_memfs").entered();
    MemFs::new(
      &configuration.memfs_root,
      configuration.memfs_instance_size,
      &configuration.home_name,
      &configuration.output_name,
    )?
  };

  let result = run_with_memfs(
    configuration,
    jailer_config,
    cgroup_version,
    py_args,
    files,
    jailer_overrides,
    &memfs,
  );

  // 10. Release MemFS, whether or not the call above succeeded.
  {
    let _span = debug_span!("release").entered();
    let _ = memfs.cleanup();
  }

  result.map(|(argv, returncode, stdout, attachments)| {
    EvalResult::new(argv, returncode, stdout, attachments)
  })
}

#[allow(clippy::too_many_arguments)]
fn run_with_memfs(
  configuration: &Configuration,
  jailer_config: &JailerConfig,
  cgroup_version: CgroupVersion,
  py_args: &[String],
  files: &[FileAttachment],
  jailer_overrides: &[String],
  memfs: &MemFs,
) -> std::result::Result<(Vec<String>, Option<i32>, String, Vec<FileAttachment>), EvalError> {
  // 2. Compute effective overrides.
  let overrides = effective_overrides(jailer_config, cgroup_version, jailer_overrides, memfs);

  // 3. Write seed files.
  let seed_files = {
    let _span = debug_span!("write_seed_files").entered();
    write_seed_files(memfs, files)?
  };

  // 4. Build argv.
  let log_file = tempfile::NamedTempFile::new()
    .map_err(|err| EvalError::new(format!("OSError: failed to create jailer log file: {err}")))?;
  let log_path = log_file.path().to_path_buf();

  let mut jailer_args: Vec<String> = vec![
    "--config".into(),
    configuration.jailer_config_path.to_string_lossy().into_owned(),
    "--log".into(),
    log_path.to_string_lossy().into_owned(),
  ];
  jailer_args.extend(overrides);
  jailer_args.push("--".into());
  jailer_args.push(jailer_config.exec_bin.path.clone());
  jailer_args.extend(iter_lstrip(&jailer_config.exec_bin.arg));
  jailer_args.extend(iter_lstrip(py_args));

  if contains_null_byte(&jailer_args) {
    return Err(EvalError::new("ValueError: embedded null byte"));
  }

  let mut argv = vec![configuration.jailer_bin.to_string_lossy().into_owned()];
  argv.extend(jailer_args.iter().cloned());

  // 5. Spawn.
  let (reader, writer) = os_pipe::pipe()
    .map_err(|err| EvalError::new(format!("OSError: failed to create output pipe: {err}")))?;
  let writer_clone = writer
    .try_clone()
    .map_err(|err| EvalError::new(format!("OSError: failed to duplicate output pipe: {err}")))?;

  let mut child = {
    let _span = debug_span!("spawn_jailer").entered();

    let mut command = Command::new(&configuration.jailer_bin);
    command
      .args(&jailer_args)
      .env_clear()
      .envs(child_environment())
      .stdin(Stdio::null())
      .stdout(writer)
      .stderr(writer_clone);

    command
      .spawn()
      .map_err(|err| EvalError::new(format!("OSError: failed to spawn jailer: {err}")))?
  };

  let pid = Pid::from_raw(child.id() as i32);

  // 6. Consume output.
  let (stdout, _outcome, status) = {
    let _span = debug_span!("drain_output").entered();
    let bounded = BoundedOutputReader::new(configuration.max_output_bytes, configuration.read_chunk_bytes);
    bounded.drain(reader, pid, &mut child)?
  };

  // 7. Determine return code.
  let returncode = exit_status_to_returncode(status);

  // 8. Harvest output files.
  let attachments = {
    let _span = debug_span!("harvest").entered();
    let harvester = TimedHarvester::new(
      configuration.file_glob_pattern.clone(),
      configuration.file_count_limit,
      configuration.harvest_timeout,
    );
    harvester.harvest(memfs, &seed_files)?
  };

  // 9. Parse jailer log (re-emit at the appropriate tracing levels), with
  // the documented fallback to stdout when the jailer itself failed
  // before it could write a log.
  let log_contents = fs::read_to_string(&log_path).unwrap_or_default();
  if log_contents.trim().is_empty() && returncode == Some(255) {
    log_parser::emit(&stdout, configuration.debug);
  } else {
    log_parser::emit(&log_contents, configuration.debug);
  }

  Ok((argv, returncode, stdout, attachments))
}

fn effective_overrides(
  jailer_config: &JailerConfig,
  cgroup_version: CgroupVersion,
  jailer_overrides: &[String],
  memfs: &MemFs,
) -> Vec<String> {
  let mut overrides = Vec::new();

  if cgroup_version == CgroupVersion::V2 {
    overrides.push("--use_cgroupv2".to_string());
  }

  if swap::should_ignore_swap_limit(jailer_config, cgroup_version) {
    overrides.push("--cgroup_mem_memsw_max".to_string());
    overrides.push("0".to_string());
    overrides.push("--cgroup_mem_swap_max".to_string());
    overrides.push("-1".to_string());
  }

  overrides.extend(jailer_overrides.iter().cloned());

  overrides.push("--bindmount".to_string());
  overrides.push(format!("{}:home", memfs.home().display()));

  overrides
}

fn write_seed_files(
  memfs: &MemFs,
  files: &[FileAttachment],
) -> std::result::Result<HashMap<PathBuf, SystemTime>, EvalError> {
  let mut seed_files = HashMap::new();

  for file in files {
    let path = file.save_to(memfs.home()).map_err(|err| {
      EvalError::new(format!(
        "{}: Failed to create file '{}'.",
        io_error_kind_name(&err),
        file.path()
      ))
    })?;

    let mtime = path
      .metadata()
      .and_then(|m| m.modified())
      .map_err(EvalError::from)?;

    seed_files.insert(path, mtime);
  }

  Ok(seed_files)
}

fn io_error_kind_name(err: &Error) -> &'static str {
  match err {
    Error::Io(io_err) => match io_err.kind() {
      io::ErrorKind::NotFound => "FileNotFoundError",
      io::ErrorKind::PermissionDenied => "PermissionError",
      io::ErrorKind::AlreadyExists => "FileExistsError",
      _ => "OSError",
    },
    _ => "OSError",
  }
}

fn contains_null_byte(args: &[String]) -> bool {
  args.iter().any(|arg| arg.contains('\0'))
}

fn exit_status_to_returncode(status: ExitStatus) -> Option<i32> {
  if let Some(signal) = status.signal() {
    Some(128 + signal)
  } else {
    status.code()
  }
}

/// The fixed environment the jailer (and, transitively, the interpreter it
/// execs) is started with, rather than inheriting this process's own
/// environment. Keeps invocations deterministic across hosts.
fn child_environment() -> Vec<(&'static str, &'static str)> {
  vec![
    ("PATH", "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"),
    ("LANG", "en_US.UTF-8"),
    ("PYTHONDONTWRITEBYTECODE", "1"),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iter_lstrip_strips_only_leading_empties() {
    assert_eq!(
      iter_lstrip(&["".into(), "-m".into(), "timeit".into()]),
      vec!["-m", "timeit"]
    );

    assert_eq!(
      iter_lstrip(&["-m".into(), "timeit".into(), "".into()]),
      vec!["-m", "timeit", ""]
    );

    assert_eq!(iter_lstrip(&["".into(), "".into()]), Vec::<String>::new());
  }

  #[test]
  fn detects_embedded_null_byte() {
    assert!(contains_null_byte(&["--config".into(), "x\0y".into()]));
    assert!(!contains_null_byte(&["--config".into(), "plain".into()]));
  }

  #[test]
  fn exit_status_maps_signals_to_128_plus_n() {
    let status = ExitStatus::from_raw(9); // SIGKILL, raw encoding: low byte = signal
    assert_eq!(exit_status_to_returncode(status), Some(128 + 9));
  }
}
