use super::*;

/// A single file, identified by a path relative to a virtual `/home` root,
/// together with its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
  path: String,
  content: Vec<u8>,
}

impl FileAttachment {
  /// Builds an attachment, validating `path` with [`safe_path`].
  pub fn new(path: String, content: Vec<u8>) -> Result<Self> {
    let path = safe_path(&path)?;
    Ok(Self { path, content })
  }

  /// Builds an attachment from a client record, base64-decoding `content`.
  pub fn from_record(record: AttachmentRecord) -> Result<Self> {
    let content = base64::engine::general_purpose::STANDARD
      .decode(record.content.as_bytes())
      .map_err(|_| Error::InvalidEncoding(record.path.clone()))?;

    Self::new(record.path, content)
  }

  /// Reads `path` from disk, using `root` to compute the relative path
  /// stored on the attachment.
  pub fn from_path(root: &Path, path: &Path) -> Result<Self> {
    let relative = path.strip_prefix(root).unwrap_or(path);

    let relative = relative
      .to_str()
      .ok_or(Error::HarvestEncoding)?
      .to_string();

    let content = fs::read(path)?;

    Self::new(relative, content)
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn content(&self) -> &[u8] {
    &self.content
  }

  pub fn size(&self) -> usize {
    self.content.len()
  }

  /// Writes this attachment's content under `directory`, creating parent
  /// directories as needed, and returns the resulting absolute path.
  pub fn save_to(&self, directory: &Path) -> Result<PathBuf> {
    let target = directory.join(&self.path);

    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent)?;
    }

    fs::write(&target, &self.content)?;

    Ok(target)
  }

  pub fn to_record(&self) -> AttachmentRecord {
    AttachmentRecord {
      path: self.path.clone(),
      size: self.content.len(),
      content: base64::engine::general_purpose::STANDARD.encode(&self.content),
    }
  }
}

/// The wire shape of a [`FileAttachment`], consumed by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRecord {
  pub path: String,
  pub size: usize,
  pub content: String,
}

/// Validates that `path` is relative and does not traverse outside a
/// virtual `/home` root, returning the (unmodified) path on success.
pub fn safe_path(path: &str) -> Result<String> {
  ensure!(
    !path.starts_with('/'),
    Error::IllegalPath(format!("File path '{path}' must be relative"))
  );

  let resolved = Path::new("/home").join(path);
  let normalized = normalize(&resolved);

  ensure!(
    normalized.starts_with("/home"),
    Error::IllegalPath(format!(
      "File path '{path}' may not traverse beyond root"
    ))
  );

  Ok(path.to_string())
}

/// Lexically normalizes `path`, resolving `.` and `..` components without
/// touching the filesystem (the path need not exist).
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();

  for component in path.components() {
    match component {
      Component::ParentDir => {
        out.pop();
      }
      Component::CurDir => {}
      other => out.push(other.as_os_str()),
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_absolute_paths() {
    assert_matches!(safe_path("/etc/passwd"), Err(Error::IllegalPath(_)));
  }

  #[test]
  fn rejects_traversal_beyond_root() {
    assert_matches!(safe_path("../foo"), Err(Error::IllegalPath(_)));
    assert_matches!(safe_path("a/../../foo"), Err(Error::IllegalPath(_)));
  }

  #[test]
  fn traversal_error_message_matches_contract() {
    let err = safe_path("../foo").unwrap_err();
    assert_eq!(
      err.to_string(),
      "invalid file path: File path '../foo' may not traverse beyond root"
    );
  }

  #[test]
  fn allows_nested_relative_paths() {
    assert_eq!(safe_path("dir/test2.txt").unwrap(), "dir/test2.txt");
  }

  #[test]
  fn allows_internal_dotdot_that_stays_within_root() {
    assert!(safe_path("a/b/../c").is_ok());
  }

  #[test]
  fn round_trips_through_record() {
    let attachment = FileAttachment::new("test.txt".into(), b"test 1".to_vec()).unwrap();
    let record = attachment.to_record();

    assert_eq!(record.path, "test.txt");
    assert_eq!(record.size, 6);

    let restored = FileAttachment::from_record(record).unwrap();
    assert_eq!(restored, attachment);
  }

  #[test]
  fn rejects_invalid_base64() {
    let record = AttachmentRecord {
      path: "test.txt".into(),
      size: 0,
      content: "not valid base64!!".into(),
    };

    assert_matches!(
      FileAttachment::from_record(record),
      Err(Error::InvalidEncoding(_))
    );
  }

  #[test]
  fn serde_round_trip() {
    let attachment = FileAttachment::new("a.txt".into(), b"hi".to_vec()).unwrap();
    let record = attachment.to_record();

    let json = serde_json::to_string(&record).unwrap();
    let parsed: AttachmentRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, record);
  }
}
