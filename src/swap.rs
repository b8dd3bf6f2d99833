use super::*;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Checks whether the swap-memory controller is actually usable for this
/// cgroup hierarchy.
pub fn controller_exists(config: &JailerConfig, version: CgroupVersion) -> bool {
  match version {
    CgroupVersion::V1 => config
      .cgroup_mem_mount
      .as_ref()
      .map(|mount| Path::new(mount).join("memory.memsw.max_usage_in_bytes").exists())
      .unwrap_or(false),
    CgroupVersion::V2 => {
      let Some(mount) = config.cgroupv2_mount.as_ref() else {
        return false;
      };

      let probe = Path::new(mount).join(format!("snekbox-swap-probe-{}", Uuid::new_v4()));

      if probe.create(0o755).is_err() {
        return false;
      }

      let exists = probe.join("memory.swap.max").exists();

      let _ = fs::remove_dir(&probe);

      exists
    }
  }
}

/// Reads `/proc/meminfo` and checks whether swap is enabled system-wide.
pub fn is_swap_enabled() -> bool {
  meminfo_swap_enabled(MEMINFO_PATH)
}

fn meminfo_swap_enabled(path: &str) -> bool {
  let Ok(contents) = fs::read_to_string(path) else {
    return false;
  };

  contents
    .lines()
    .find_map(|line| line.strip_prefix("SwapTotal:"))
    .map(|rest| {
      rest
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0)
        != 0
    })
    .unwrap_or(false)
}

/// Decides whether the jailer's configured swap limits should be
/// suppressed for this invocation, warning when swap is on but cannot be
/// limited.
pub fn should_ignore_swap_limit(config: &JailerConfig, version: CgroupVersion) -> bool {
  let memory_is_limited = config.cgroup_mem_max.map(|v| v != 0).unwrap_or(false);

  if !memory_is_limited {
    return false;
  }

  let swap_is_bounded = config.cgroup_mem_memsw_max.map(|v| v >= 0).unwrap_or(false)
    || config.cgroup_mem_swap_max.map(|v| v < 0).unwrap_or(false);

  if !swap_is_bounded {
    return false;
  }

  if controller_exists(config, version) {
    return false;
  }

  if is_swap_enabled() {
    warn!(
      "Swap memory is available, but the swap memory controller is not enabled. \
       This is probably due to the CONFIG_MEMCG_SWAP or CONFIG_MEMCG_SWAP_ENABLED \
       kernel parameters not being set. NsJail will not be able to limit memory \
       effectively. Please turn off swap memory on the system, or enable the \
       swap memory controller."
    );
  } else {
    warn!("Memory is being limited, but swap memory is unlimited.");
  }

  true
}
