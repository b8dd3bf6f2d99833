mod cgroup;
mod configuration;
mod ensure;
mod error;
mod file_attachment;
mod fs_primitives;
mod harvester;
mod jailer_config;
mod log_parser;
mod logging;
mod memfs;
mod orchestrator;
mod output_reader;
mod path_ext;
mod result;
mod swap;

pub use cgroup::{init_v1, init_v2, probe_version, CgroupVersion};
pub use configuration::Configuration;
pub use error::Error;
pub use file_attachment::{safe_path, AttachmentRecord, FileAttachment};
pub use fs_primitives::{Size, UnmountFlags};
pub use harvester::TimedHarvester;
pub use jailer_config::{ExecBin, JailerConfig};
pub use log_parser::{LogLine, Severity};
pub use logging::init as init_logging;
pub use memfs::MemFs;
pub use orchestrator::run;
pub use output_reader::{BoundedOutputReader, DrainOutcome};
pub use path_ext::PathExt;
pub use result::EvalResult;
pub use swap::should_ignore_swap_limit;

/// Convenience alias used throughout the crate, mirroring how the rest of
/// the fallible surface (subprocess spawning, filesystem access, jailer
/// config parsing) is expressed.
pub type Result<T = ()> = std::result::Result<T, Error>;

use std::{
  collections::HashMap,
  env, fmt,
  fs,
  io::{self, Read},
  ops,
  os::unix::{
    fs::{MetadataExt, PermissionsExt},
    process::ExitStatusExt,
  },
  path::{Component, Path, PathBuf},
  process::{Command, ExitStatus, Stdio},
  sync::OnceLock,
  time::{Duration, Instant, SystemTime},
};

#[cfg(test)]
use assert_matches::assert_matches;
use base64::Engine as _;
use nix::{
  mount::{MntFlags, MsFlags},
  sys::signal::{kill, Signal},
  unistd::Pid,
};
use regex::Regex;
use result::EvalError;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{debug, debug_span, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;
