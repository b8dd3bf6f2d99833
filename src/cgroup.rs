use super::*;

/// Which cgroup hierarchy the host kernel exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
  V1,
  V2,
}

/// Detects which cgroup hierarchy is present, preferring the config's
/// stated preference when both (or neither) are present.
pub fn probe_version(config: &JailerConfig) -> CgroupVersion {
  let v1_present = [
    &config.cgroup_mem_mount,
    &config.cgroup_pids_mount,
    &config.cgroup_net_cls_mount,
    &config.cgroup_cpu_mount,
  ]
  .iter()
  .filter_map(|mount| mount.as_ref())
  .any(|mount| Path::new(mount).exists());

  let v2_present = config
    .cgroupv2_mount
    .as_ref()
    .map(|mount| Path::new(mount).join("cgroup.controllers").exists())
    .unwrap_or(false);

  let version = match (v1_present, v2_present) {
    (true, true) => {
      if config.use_cgroupv2 {
        CgroupVersion::V2
      } else {
        CgroupVersion::V1
      }
    }
    (true, false) => {
      if config.use_cgroupv2 {
        warn!("use_cgroupv2 requested but only a v1 hierarchy was found");
      }
      CgroupVersion::V1
    }
    (false, true) => CgroupVersion::V2,
    (false, false) => {
      warn!("no cgroup hierarchy detected, falling back to configured preference");
      if config.use_cgroupv2 {
        CgroupVersion::V2
      } else {
        CgroupVersion::V1
      }
    }
  };

  debug!(?version, "probed cgroup version");

  version
}

/// Creates per-controller parent directories for every v1 controller the
/// config actually configures a limit for.
pub fn init_v1(config: &JailerConfig) -> Result<()> {
  let controllers: &[(&Option<String>, &Option<String>, bool)] = &[
    (
      &config.cgroup_mem_mount,
      &config.cgroup_mem_parent,
      config.cgroup_mem_max.is_some()
        || config.cgroup_mem_memsw_max.is_some()
        || config.cgroup_mem_swap_max.is_some(),
    ),
    (
      &config.cgroup_pids_mount,
      &config.cgroup_pids_parent,
      config.cgroup_pids_max.is_some(),
    ),
    (
      &config.cgroup_net_cls_mount,
      &config.cgroup_net_cls_parent,
      config.cgroup_net_cls_classid.is_some(),
    ),
    (
      &config.cgroup_cpu_mount,
      &config.cgroup_cpu_parent,
      config.cgroup_cpu_ms_per_sec.is_some(),
    ),
  ];

  for (mount, parent, in_use) in controllers {
    if !*in_use {
      continue;
    }

    let (mount, parent) = match (mount, parent) {
      (Some(mount), Some(parent)) => (mount, parent),
      _ => continue,
    };

    PathBuf::from(mount)
      .join(parent)
      .create(0o755)
      .map_err(|err| Error::Cgroup(format!("failed to create cgroup parent {parent}: {err}")))?;
  }

  Ok(())
}

/// Seeds `cgroup.subtree_control` on a v2 hierarchy by migrating every
/// root process into a child `init` cgroup, then enabling every available
/// controller on the now-empty root.
pub fn init_v2(mount: &Path) -> Result<()> {
  let subtree_control = mount.join("cgroup.subtree_control");
  let controllers_file = mount.join("cgroup.controllers");

  let already_enabled = fs::read_to_string(&subtree_control)
    .map(|contents| !contents.trim().is_empty())
    .unwrap_or(false);

  if already_enabled {
    return Ok(());
  }

  let init_cgroup = mount.join("init");
  init_cgroup
    .create(0o755)
    .map_err(|err| Error::Cgroup(format!("failed to create init cgroup: {err}")))?;

  let procs = fs::read_to_string(mount.join("cgroup.procs"))
    .map_err(|err| Error::Cgroup(format!("failed to read cgroup.procs: {err}")))?;

  for pid in procs.lines() {
    fs::write(init_cgroup.join("cgroup.procs"), pid)
      .map_err(|err| Error::Cgroup(format!("failed to migrate pid {pid}: {err}")))?;
  }

  let controllers = fs::read_to_string(&controllers_file)
    .map_err(|err| Error::Cgroup(format!("failed to read cgroup.controllers: {err}")))?;

  for controller in controllers.split_whitespace() {
    fs::write(&subtree_control, format!("+{controller}"))
      .map_err(|err| Error::Cgroup(format!("failed to enable controller {controller}: {err}")))?;
  }

  Ok(())
}
