use super::*;

const DEFAULT_JAILER_BIN: &str = "/usr/bin/nsjail";
const DEFAULT_JAILER_CONFIG: &str = "/etc/snekbox/jailer.cfg";
const DEFAULT_MEMFS_ROOT: &str = "/memfs";
const DEFAULT_HOME_NAME: &str = "home";
const DEFAULT_OUTPUT_NAME: &str = "home";
const DEFAULT_MAX_OUTPUT_BYTES: usize = 1_000_000;
const DEFAULT_READ_CHUNK_BYTES: usize = 10_000;
const DEFAULT_MEMFS_INSTANCE_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_FILE_COUNT_LIMIT: usize = 100;
const DEFAULT_HARVEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_FILE_GLOB_PATTERN: &str = "**/[!_]*";

/// This service's own settings, loaded once at startup from the process
/// environment. Distinct from [`JailerConfig`], which is the jailer's own
/// (read-only, externally authored) configuration file.
#[derive(Debug, Clone)]
pub struct Configuration {
  pub jailer_bin: PathBuf,
  pub jailer_config_path: PathBuf,
  pub memfs_root: PathBuf,
  pub home_name: String,
  pub output_name: String,
  pub max_output_bytes: usize,
  pub read_chunk_bytes: usize,
  pub memfs_instance_size: Size,
  pub file_count_limit: usize,
  pub harvest_timeout: Duration,
  pub file_glob_pattern: String,
  pub debug: bool,
  pub telemetry_dsn: Option<String>,
}

impl Default for Configuration {
  fn default() -> Self {
    Self {
      jailer_bin: PathBuf::from(DEFAULT_JAILER_BIN),
      jailer_config_path: PathBuf::from(DEFAULT_JAILER_CONFIG),
      memfs_root: PathBuf::from(DEFAULT_MEMFS_ROOT),
      home_name: DEFAULT_HOME_NAME.to_string(),
      output_name: DEFAULT_OUTPUT_NAME.to_string(),
      max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
      read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
      memfs_instance_size: Size::KiB(DEFAULT_MEMFS_INSTANCE_BYTES / 1024),
      file_count_limit: DEFAULT_FILE_COUNT_LIMIT,
      harvest_timeout: Duration::from_secs(DEFAULT_HARVEST_TIMEOUT_SECS),
      file_glob_pattern: DEFAULT_FILE_GLOB_PATTERN.to_string(),
      debug: false,
      telemetry_dsn: None,
    }
  }
}

impl Configuration {
  /// Builds a `Configuration` from environment variables, falling back to
  /// the defaults above for anything unset.
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Ok(value) = env::var("NSJAIL_PATH") {
      config.jailer_bin = PathBuf::from(value);
    }

    if let Ok(value) = env::var("NSJAIL_CFG") {
      config.jailer_config_path = PathBuf::from(value);
    }

    if let Ok(value) = env::var("SNEKBOX_MEMFS_ROOT") {
      config.memfs_root = PathBuf::from(value);
    }

    if let Ok(value) = env::var("SNEKBOX_MAX_OUTPUT_BYTES") {
      if let Ok(parsed) = value.parse() {
        config.max_output_bytes = parsed;
      }
    }

    if let Ok(value) = env::var("SNEKBOX_MEMFS_INSTANCE_SIZE_KB") {
      if let Ok(parsed) = value.parse::<u64>() {
        config.memfs_instance_size = Size::KiB(parsed);
      }
    }

    config.debug = env::var("SNEKBOX_DEBUG")
      .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
      .unwrap_or(false);

    config.telemetry_dsn = env::var("SNEKBOX_SENTRY_DSN").ok();

    config
  }
}
