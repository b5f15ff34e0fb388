use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use tracing::{debug, info};

/// Copies of mutable node state taken before an uninstall
///
/// Written once and never read back by `rke2node`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupSet {
  pub dir: PathBuf,
  pub files: Vec<PathBuf>,
}

/// Candidates that currently exist; missing files are not an error
pub fn existing(candidates: &[PathBuf]) -> Vec<PathBuf> {
  candidates.iter().filter(|p| p.is_file()).cloned().collect()
}

/// Create `dir` and copy each existing candidate into it by file name
pub fn create<P: AsRef<Path>>(dir: P, candidates: &[PathBuf]) -> Result<BackupSet> {
  let dir = dir.as_ref();
  fs::create_dir_all(dir)?;

  let mut files = Vec::new();
  for source in candidates {
    if !source.is_file() {
      debug!("{source:?} does not exist; not backed up");
      continue;
    }
    let name = source
      .file_name()
      .ok_or_else(|| anyhow!("{source:?} has no file name"))?;
    let target = dir.join(name);
    fs::copy(source, &target)?;
    files.push(target);
  }
  info!("Backed up {} file(s) to {dir:?}", files.len());

  Ok(BackupSet {
    dir: dir.to_path_buf(),
    files,
  })
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn it_copies_existing_files() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    let token = dir.path().join("node-token");
    let missing = dir.path().join("rke2.yaml");
    fs::write(&config, "token: \"abc\"\n").unwrap();
    fs::write(&token, "K10::server:abc\n").unwrap();

    let target = dir.path().join("backup/rke2node-20231024-153000");
    let candidates = vec![config.clone(), missing, token];
    let backup = create(&target, &candidates).unwrap();

    assert_eq!(
      backup.files,
      vec![target.join("config.yaml"), target.join("node-token")]
    );
    assert_eq!(fs::read(target.join("config.yaml")).unwrap(), fs::read(&config).unwrap());
    assert!(!target.join("rke2.yaml").exists());
  }

  #[test]
  fn it_creates_empty_backup() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("backup");

    let backup = create(&target, &[dir.path().join("missing")]).unwrap();

    assert!(target.is_dir());
    assert!(backup.files.is_empty());
  }
}
