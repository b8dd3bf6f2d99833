use super::*;

/// The severity code the jailer prefixes each log line with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Debug,
  Info,
  Warning,
  Error,
  Fatal,
}

/// A single parsed jailer log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
  pub severity: Severity,
  pub message: String,
}

fn line_regex() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^\[(?P<level>[DIWEF])\]\[[^\]]*\](?:\[\d+\] (?P<loc>[^\s:]+:\S+ )?)?(?P<message>.*)$")
      .expect("static regex is valid")
  })
}

/// Parses one line of jailer log output. In debug mode, the optional
/// `source:line` prefix nsjail emits is kept attached to the message.
pub fn parse_line(line: &str, debug: bool) -> LogLine {
  let Some(captures) = line_regex().captures(line) else {
    return LogLine {
      severity: Severity::Warning,
      message: format!("unparseable jailer log line: {line}"),
    };
  };

  let level = &captures["level"];
  let message_body = captures["message"].trim_start();

  let message = if debug {
    match captures.name("loc") {
      Some(loc) => format!("{}{}", loc.as_str(), message_body),
      None => message_body.to_string(),
    }
  } else {
    message_body.to_string()
  };

  let severity = match level {
    "D" => Severity::Debug,
    "I" => Severity::Info,
    "W" => Severity::Warning,
    "E" => Severity::Error,
    "F" => Severity::Fatal,
    _ => unreachable!("regex only matches D/I/W/E/F"),
  };

  LogLine { severity, message }
}

/// Parses every line of `log` and re-emits each at the corresponding
/// `tracing` level. Info lines are suppressed unless `debug` is set or
/// the line reports a process exit (`pid=`); debug lines are always
/// emitted.
pub fn emit(log: &str, debug: bool) {
  for line in log.lines() {
    if line.trim().is_empty() {
      continue;
    }

    let parsed = parse_line(line, debug);

    match parsed.severity {
      Severity::Debug => debug!("{}", parsed.message),
      Severity::Info => {
        if debug || parsed.message.starts_with("pid=") {
          info!("{}", parsed.message);
        }
      }
      Severity::Warning => warn!("{}", parsed.message),
      Severity::Error | Severity::Fatal => error!("{}", parsed.message),
    }
  }
}
