use std::{
  fs::{self, OpenOptions},
  io::Write,
  os::unix::fs::OpenOptionsExt,
  path::Path,
};

use anyhow::{anyhow, Result};
use regex_lite::Regex;
use semver::Version;

use crate::NodeError;

/// Extract the semantic version from the version string provided
pub fn get_semver(ver: &str) -> Result<Version> {
  let re = Regex::new(r"v?(\d+\.\d+\.\d+)([-+].*)?")?;
  match re.captures(ver).and_then(|cap| cap.get(1)) {
    Some(cap) => Ok(Version::parse(cap.as_str())?),
    None => Err(anyhow!("Unable to parse version from '{ver}'")),
  }
}

#[derive(Debug)]
pub struct CmdResult {
  pub stdout: String,
  pub stderr: String,
  pub status: i32,
}

impl CmdResult {
  pub fn success(&self) -> bool {
    self.status == 0
  }
}

/// Execute a command and return the output
///
/// A non-zero exit is not an error here; see `cmd_check`
pub fn cmd_exec(cmd: &str, args: Vec<&str>) -> Result<CmdResult> {
  let output = std::process::Command::new(cmd).args(args).output();

  match output {
    Ok(output) => Ok(CmdResult {
      stdout: String::from_utf8_lossy(&output.stdout).to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      status: output.status.code().unwrap_or(1),
    }),
    Err(e) => Err(anyhow!("Error executing command {cmd}: {e}")),
  }
}

/// Execute a command, failing when it exits non-zero
pub fn cmd_check(cmd: &str, args: Vec<&str>) -> Result<CmdResult> {
  let line = format!("{cmd} {}", args.join(" "));
  let result = cmd_exec(cmd, args)?;

  match result.success() {
    true => Ok(result),
    false => Err(
      NodeError::CommandFailed {
        cmd: line,
        status: result.status,
        stderr: result.stderr.trim().to_owned(),
      }
      .into(),
    ),
  }
}

/// Write a file to disk, creating parent directories and setting the file mode
///
/// Existing contents are truncated
pub fn write_file<P: AsRef<Path>>(contents: &[u8], path: P, mode: Option<u32>) -> Result<()> {
  if let Some(parent) = path.as_ref().parent() {
    fs::create_dir_all(parent)?;
  }

  let mut file = OpenOptions::new()
    .write(true)
    .create(true)
    .truncate(true)
    .mode(mode.unwrap_or(0o644))
    .open(&path)?;
  file.write_all(contents)?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::os::unix::fs::PermissionsExt;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn it_gets_semver_bare() {
    let expected = Version::parse("1.28.3").unwrap();
    let result = get_semver("1.28.3").unwrap();
    assert_eq!(result, expected);
  }

  #[test]
  fn it_gets_semver_leading() {
    let expected = Version::parse("1.28.3").unwrap();
    let result = get_semver("v1.28.3").unwrap();
    assert_eq!(result, expected);
  }

  #[test]
  fn it_gets_rke2_version() {
    let expected = Version::parse("1.28.3").unwrap();
    // This is the format returned from `rke2 --version`
    let result = get_semver("rke2 version v1.28.3+rke2r2 (4d5a5d6f5ff2f8f1b5f42e0e9c1a31ff5c4c1f0d)\ngo version go1.20.10").unwrap();
    assert_eq!(result, expected);
  }

  #[test]
  fn it_fails_without_version() {
    assert!(get_semver("rke2: command not found").is_err());
  }

  #[test]
  fn it_reports_failed_command() {
    let err = cmd_check("false", vec![]).unwrap_err();
    match crate::error::kind(&err) {
      Some(NodeError::CommandFailed { status, .. }) => assert_eq!(*status, 1),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn it_writes_and_truncates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/config.yaml");

    write_file(b"a much longer first write", &path, Some(0o600)).unwrap();
    write_file(b"short", &path, Some(0o600)).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
  }
}
