use super::*;

/// Multiplier applied to a tmpfs `size=` mount option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
  KiB(u64),
  MiB(u64),
  GiB(u64),
  TiB(u64),
}

impl Size {
  /// Number of bytes this value represents.
  pub fn bytes(self) -> u64 {
    match self {
      Size::KiB(n) => n * 1024,
      Size::MiB(n) => n * 1024 * 1024,
      Size::GiB(n) => n * 1024 * 1024 * 1024,
      Size::TiB(n) => n * 1024 * 1024 * 1024 * 1024,
    }
  }
}

impl fmt::Display for Size {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.bytes())
  }
}

/// Flags accepted by [`unmount`], matching the `MNT_*`/`UMOUNT_*` values
/// the kernel expects from `umount2(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmountFlags(i32);

impl UnmountFlags {
  pub const FORCE: Self = Self(1);
  pub const DETACH: Self = Self(2);
  pub const EXPIRE: Self = Self(4);
  pub const NOFOLLOW: Self = Self(8);

  pub fn contains(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }
}

impl ops::BitOr for UnmountFlags {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

/// Checks whether `path` is currently a mount point, by comparing the
/// device id of `path` against that of its parent.
pub fn is_mount(path: &Path) -> Result<bool> {
  let meta = fs::symlink_metadata(path)?;

  let parent = match path.parent() {
    Some(parent) => parent,
    None => return Ok(true),
  };

  let parent_meta = fs::symlink_metadata(parent)?;

  Ok(meta.dev() != parent_meta.dev())
}

/// Mounts `fstype` on `target`, joining `options` as comma-separated
/// `key=value` pairs (or bare flags) the way `mount(8)` does for `-o`.
pub fn mount(target: &Path, fstype: &str, options: &[String]) -> Result<()> {
  if is_mount(target)? {
    return Err(Error::Mount(format!("{} is already a mount point", target.display())));
  }

  let data = options.join(",");

  let data = if data.is_empty() { None } else { Some(data.as_str()) };

  nix::mount::mount(
    None::<&str>,
    target,
    Some(fstype),
    MsFlags::empty(),
    data,
  )
  .map_err(|errno| Error::Mount(format!("failed to mount {fstype} at {}: {errno}", target.display())))
}

/// Unmounts `target`, defaulting to a lazy (`MNT_DETACH`) unmount when no
/// flags are given.
pub fn unmount(target: &Path, flags: UnmountFlags) -> Result<()> {
  if !is_mount(target)? {
    return Err(Error::Unmount(format!("{} is not a mount point", target.display())));
  }

  let mut mnt_flags = MntFlags::empty();

  if flags.contains(UnmountFlags::FORCE) {
    mnt_flags.insert(MntFlags::MNT_FORCE);
  }
  if flags.contains(UnmountFlags::DETACH) {
    mnt_flags.insert(MntFlags::MNT_DETACH);
  }
  if flags.contains(UnmountFlags::EXPIRE) {
    mnt_flags.insert(MntFlags::MNT_EXPIRE);
  }
  if flags.contains(UnmountFlags::NOFOLLOW) {
    mnt_flags.insert(MntFlags::UMOUNT_NOFOLLOW);
  }

  nix::mount::umount2(target, mnt_flags)
    .map_err(|errno| Error::Unmount(format!("failed to unmount {}: {errno}", target.display())))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn size_bytes() {
    assert_eq!(Size::KiB(1).bytes(), 1024);
    assert_eq!(Size::MiB(1).bytes(), 1024 * 1024);
    assert_eq!(Size::GiB(1).bytes(), 1024 * 1024 * 1024);
  }

  #[test]
  fn size_display_is_byte_count() {
    assert_eq!(Size::MiB(16).to_string(), (16 * 1024 * 1024).to_string());
  }

  #[test]
  fn unmount_flags_combine() {
    let flags = UnmountFlags::FORCE | UnmountFlags::DETACH;
    assert!(flags.contains(UnmountFlags::FORCE));
    assert!(flags.contains(UnmountFlags::DETACH));
    assert!(!flags.contains(UnmountFlags::EXPIRE));
  }

  #[test]
  fn is_mount_false_for_ordinary_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    let child = temp.path().join("child");
    fs::create_dir(&child).unwrap();
    assert!(!is_mount(&child).unwrap());
  }
}
