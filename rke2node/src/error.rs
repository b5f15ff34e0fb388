use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced to the operator
///
/// Operations return `anyhow::Result`; these values are carried inside the
/// `anyhow::Error` so callers can `downcast_ref::<NodeError>()` when they need
/// to tell the kinds apart.
#[derive(Debug, Error)]
pub enum NodeError {
  #[error("must be run as root")]
  Permission,

  #[error("required command not found on PATH: {0}")]
  Environment(&'static str),

  #[error("unsupported architecture: {0}")]
  UnsupportedPlatform(String),

  #[error("{0}")]
  Validation(String),

  #[error("file not found: {0:?}")]
  NotFound(PathBuf),

  #[error("both rke2-server and rke2-agent are installed; use --role to select one")]
  AmbiguousRole,

  #[error("neither rke2-server nor rke2-agent is installed")]
  NotInstalled,

  #[error("{service} did not become active after {attempts} attempts; check `journalctl -u {service}`")]
  ServiceStart { service: String, attempts: u32 },

  #[error("{cmd} exited with status {status}: {stderr}")]
  CommandFailed { cmd: String, status: i32, stderr: String },
}

/// Return the `NodeError` carried by an `anyhow::Error`, if any
pub fn kind(err: &anyhow::Error) -> Option<&NodeError> {
  err.downcast_ref::<NodeError>()
}
