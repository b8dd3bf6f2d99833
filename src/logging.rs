use super::*;

/// Installs a global `tracing` subscriber, the way a binary embedding this
/// crate would call it once at startup. The crate itself never installs a
/// subscriber as a side effect of being linked; library code only ever logs
/// through the `tracing` facade.
pub fn init(debug: bool) {
  let default_directive = if debug { "debug" } else { "info" };

  let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

  let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}
