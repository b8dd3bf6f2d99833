#![cfg(feature = "integration")]

use {
  evaljail::{CgroupVersion, ExecBin, FileAttachment, JailerConfig, MemFs, Size},
  std::{fs, time::Duration, time::Instant},
  tempfile::TempDir,
};

// These tests touch real tmpfs/cgroup mounts and therefore need root; run
// them with `cargo test --features integration` under a privileged user.

#[test]
fn memfs_round_trips_a_real_tmpfs_mount() {
  let temp = TempDir::new().unwrap();

  let mut memfs = MemFs::new(temp.path(), Size::MiB(16), "home", "home").unwrap();

  assert!(memfs.home().exists());
  assert!(memfs.root().exists());

  fs::write(memfs.home().join("out.txt"), b"hello").unwrap();

  let files = memfs
    .enumerate_files(
      "**/*",
      &std::collections::HashMap::new(),
      10,
      Instant::now() + Duration::from_secs(5),
    )
    .unwrap();

  assert_eq!(files.len(), 1);
  assert_eq!(files[0].path(), "out.txt");

  let root = memfs.root().to_path_buf();
  memfs.cleanup().unwrap();

  assert!(!root.exists());
}

#[test]
fn memfs_drop_without_explicit_cleanup_still_unmounts() {
  let temp = TempDir::new().unwrap();
  let root = {
    let memfs = MemFs::new(temp.path(), Size::MiB(16), "home", "home").unwrap();
    memfs.root().to_path_buf()
  };

  assert!(!root.exists());
}

#[test]
fn cgroup_version_probe_reflects_host_hierarchy() {
  let mut config = JailerConfig::default();
  config.exec_bin = ExecBin {
    path: "/usr/bin/python3".into(),
    arg: Vec::new(),
  };
  config.cgroup_mem_mount = Some("/sys/fs/cgroup/memory".into());
  config.cgroupv2_mount = Some("/sys/fs/cgroup".into());

  // Whichever hierarchy the host actually exposes, probing must not panic
  // and must pick one of the two known versions.
  let version = evaljail::probe_version(&config);
  assert!(matches!(version, CgroupVersion::V1 | CgroupVersion::V2));
}

#[test]
fn file_attachment_save_to_real_directory() {
  let temp = TempDir::new().unwrap();

  let attachment = FileAttachment::new("nested/out.bin".into(), b"payload".to_vec()).unwrap();
  let saved = attachment.save_to(temp.path()).unwrap();

  assert_eq!(fs::read(&saved).unwrap(), b"payload");
}
