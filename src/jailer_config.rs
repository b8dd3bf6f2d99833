use super::*;

/// The `exec_bin` nested message: the binary the jailer ultimately execs,
/// plus the fixed argument prefix it is always invoked with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecBin {
  pub path: String,
  pub arg: Vec<String>,
}

/// The subset of the jailer's text-format protobuf configuration this
/// crate reads. Parsed once at startup and treated as read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailerConfig {
  pub exec_bin: ExecBin,

  pub cgroup_mem_mount: Option<String>,
  pub cgroup_mem_parent: Option<String>,
  pub cgroup_mem_max: Option<i64>,
  pub cgroup_mem_memsw_max: Option<i64>,
  pub cgroup_mem_swap_max: Option<i64>,

  pub cgroup_pids_mount: Option<String>,
  pub cgroup_pids_parent: Option<String>,
  pub cgroup_pids_max: Option<u32>,

  pub cgroup_net_cls_mount: Option<String>,
  pub cgroup_net_cls_parent: Option<String>,
  pub cgroup_net_cls_classid: Option<u32>,

  pub cgroup_cpu_mount: Option<String>,
  pub cgroup_cpu_parent: Option<String>,
  pub cgroup_cpu_ms_per_sec: Option<u32>,

  pub use_cgroupv2: bool,
  pub cgroupv2_mount: Option<String>,
}

impl Default for JailerConfig {
  fn default() -> Self {
    Self {
      exec_bin: ExecBin::default(),
      cgroup_mem_mount: None,
      cgroup_mem_parent: None,
      cgroup_mem_max: None,
      cgroup_mem_memsw_max: None,
      cgroup_mem_swap_max: None,
      cgroup_pids_mount: None,
      cgroup_pids_parent: None,
      cgroup_pids_max: None,
      cgroup_net_cls_mount: None,
      cgroup_net_cls_parent: None,
      cgroup_net_cls_classid: None,
      cgroup_cpu_mount: None,
      cgroup_cpu_parent: None,
      cgroup_cpu_ms_per_sec: None,
      use_cgroupv2: false,
      cgroupv2_mount: None,
    }
  }
}

impl JailerConfig {
  /// Loads and parses the jailer's text-format protobuf config file.
  pub fn load(path: &Path) -> Result<Self> {
    let text = fs::read_to_string(path)
      .map_err(|err| Error::Parsing(format!("failed to read {}: {err}", path.display())))?;

    Self::parse(&text)
  }

  /// Parses the restricted text-format-protobuf subset this crate needs:
  /// top-level `key: value` scalar fields, repeated string fields written
  /// as multiple `key: "value"` lines, and one level of nested message
  /// (`exec_bin { ... }`) for the binary and its fixed argument prefix.
  pub fn parse(text: &str) -> Result<Self> {
    let mut config = Self::default();
    let mut lines = text.lines().peekable();

    while let Some(raw_line) = lines.next() {
      let line = strip_comment(raw_line).trim();
      if line.is_empty() {
        continue;
      }

      if let Some(rest) = line.strip_prefix("exec_bin") {
        let rest = rest.trim();
        if rest != "{" {
          return Err(Error::Parsing(format!("expected '{{' after exec_bin, found: {rest}")));
        }

        while let Some(raw_inner) = lines.next() {
          let inner = strip_comment(raw_inner).trim();
          if inner.is_empty() {
            continue;
          }
          if inner == "}" {
            break;
          }

          let (key, value) = split_field(inner)?;
          match key {
            "path" => config.exec_bin.path = parse_string(value)?,
            "arg" => config.exec_bin.arg.push(parse_string(value)?),
            other => {
              return Err(Error::Parsing(format!("unknown field exec_bin.{other}")));
            }
          }
        }

        continue;
      }

      let (key, value) = split_field(line)?;

      match key {
        "cgroup_mem_mount" => config.cgroup_mem_mount = Some(parse_string(value)?),
        "cgroup_mem_parent" => config.cgroup_mem_parent = Some(parse_string(value)?),
        "cgroup_mem_max" => config.cgroup_mem_max = Some(parse_int(value)?),
        "cgroup_mem_memsw_max" => config.cgroup_mem_memsw_max = Some(parse_int(value)?),
        "cgroup_mem_swap_max" => config.cgroup_mem_swap_max = Some(parse_int(value)?),
        "cgroup_pids_mount" => config.cgroup_pids_mount = Some(parse_string(value)?),
        "cgroup_pids_parent" => config.cgroup_pids_parent = Some(parse_string(value)?),
        "cgroup_pids_max" => config.cgroup_pids_max = Some(parse_int(value)?),
        "cgroup_net_cls_mount" => config.cgroup_net_cls_mount = Some(parse_string(value)?),
        "cgroup_net_cls_parent" => config.cgroup_net_cls_parent = Some(parse_string(value)?),
        "cgroup_net_cls_classid" => config.cgroup_net_cls_classid = Some(parse_int(value)?),
        "cgroup_cpu_mount" => config.cgroup_cpu_mount = Some(parse_string(value)?),
        "cgroup_cpu_parent" => config.cgroup_cpu_parent = Some(parse_string(value)?),
        "cgroup_cpu_ms_per_sec" => config.cgroup_cpu_ms_per_sec = Some(parse_int(value)?),
        "use_cgroupv2" => config.use_cgroupv2 = parse_bool(value)?,
        "cgroupv2_mount" => config.cgroupv2_mount = Some(parse_string(value)?),
        other => {
          return Err(Error::Parsing(format!("unknown field {other}")));
        }
      }
    }

    Ok(config)
  }
}

fn strip_comment(line: &str) -> &str {
  match line.find('#') {
    Some(idx) => &line[..idx],
    None => line,
  }
}

fn split_field(line: &str) -> Result<(&str, &str)> {
  let idx = line
    .find(':')
    .ok_or_else(|| Error::Parsing(format!("expected ':' in line: {line}")))?;

  Ok((line[..idx].trim(), line[idx + 1..].trim()))
}

fn parse_string(value: &str) -> Result<String> {
  let value = value
    .strip_prefix('"')
    .and_then(|v| v.strip_suffix('"'))
    .ok_or_else(|| Error::Parsing(format!("expected quoted string, found: {value}")))?;

  Ok(value.to_string())
}

fn parse_int<T: std::str::FromStr>(value: &str) -> Result<T> {
  value
    .parse()
    .map_err(|_| Error::Parsing(format!("expected integer, found: {value}")))
}

fn parse_bool(value: &str) -> Result<bool> {
  match value {
    "true" => Ok(true),
    "false" => Ok(false),
    other => Err(Error::Parsing(format!("expected bool, found: {other}"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_exec_bin_and_scalars() {
    let text = r#"
      exec_bin {
        path: "/usr/bin/nsjail"
        arg: "--quiet"
        arg: "-Mo"
      }
      cgroup_mem_mount: "/sys/fs/cgroup/memory"
      cgroup_mem_parent: "snekbox"
      cgroup_mem_max: 734003200
      use_cgroupv2: false
    "#;

    let config = JailerConfig::parse(text).unwrap();

    assert_eq!(config.exec_bin.path, "/usr/bin/nsjail");
    assert_eq!(config.exec_bin.arg, vec!["--quiet", "-Mo"]);
    assert_eq!(config.cgroup_mem_mount.as_deref(), Some("/sys/fs/cgroup/memory"));
    assert_eq!(config.cgroup_mem_max, Some(734003200));
    assert!(!config.use_cgroupv2);
  }

  #[test]
  fn ignores_comments_and_blank_lines() {
    let text = "\n# a comment\nuse_cgroupv2: true # trailing comment\n";
    let config = JailerConfig::parse(text).unwrap();
    assert!(config.use_cgroupv2);
  }

  #[test]
  fn rejects_unknown_field() {
    assert_matches!(JailerConfig::parse("bogus_field: 1"), Err(Error::Parsing(_)));
  }

  #[test]
  fn rejects_malformed_line() {
    assert_matches!(JailerConfig::parse("not_a_field_at_all"), Err(Error::Parsing(_)));
  }
}
