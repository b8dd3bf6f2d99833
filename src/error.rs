use super::*;

#[derive(Debug, ThisError)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(String),
  #[error("invalid file path: {0}")]
  IllegalPath(String),
  #[error("filesystem error: {0}")]
  Io(#[from] std::io::Error),
  #[error("mount error: {0}")]
  Mount(String),
  #[error("unmount error: {0}")]
  Unmount(String),
  #[error("cgroup error: {0}")]
  Cgroup(String),
  #[error("failed to parse jailer configuration: {0}")]
  Parsing(String),
  #[error("failed to spawn jailer: {0}")]
  Spawn(String),
  #[error("TimeoutError: Exceeded time limit while parsing attachments")]
  HarvestTimeout,
  #[error("FileParsingError: Exceeded directory depth limit while parsing attachments")]
  HarvestDepth,
  #[error("FileParsingError: invalid bytes in filename while parsing attachments")]
  HarvestEncoding,
  #[error("invalid base64 encoding for file '{0}'")]
  InvalidEncoding(String),
}
