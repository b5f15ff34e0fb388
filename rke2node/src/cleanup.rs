use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::{info, warn};

/// Irreversible filesystem removal
///
/// Only invoked after the confirmation gate
pub trait Cleaner {
  fn remove_dir(&self, path: &Path) -> Result<()>;
  fn remove_file(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct FsCleaner;

impl Cleaner for FsCleaner {
  fn remove_dir(&self, path: &Path) -> Result<()> {
    fs::remove_dir_all(path)?;
    Ok(())
  }

  fn remove_file(&self, path: &Path) -> Result<()> {
    fs::remove_file(path)?;
    Ok(())
  }
}

/// Remove every directory and file independently
///
/// Paths that do not exist are skipped. Returns the paths that could not be removed
pub fn destructive_cleanup(cleaner: &dyn Cleaner, dirs: &[PathBuf], files: &[PathBuf]) -> Vec<PathBuf> {
  let mut failed = Vec::new();

  for dir in dirs {
    if !dir.exists() {
      continue;
    }
    match cleaner.remove_dir(dir) {
      Ok(()) => info!("Removed {dir:?}"),
      Err(e) => {
        warn!("Unable to remove {dir:?}: {e}");
        failed.push(dir.clone());
      }
    }
  }

  for file in files {
    if !file.exists() {
      continue;
    }
    match cleaner.remove_file(file) {
      Ok(()) => info!("Removed {file:?}"),
      Err(e) => {
        warn!("Unable to remove {file:?}: {e}");
        failed.push(file.clone());
      }
    }
  }

  failed
}


#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::{testing::RecordingCleaner, *};

  #[test]
  fn it_continues_past_failures() {
    let root = tempdir().unwrap();
    let dirs: Vec<PathBuf> = ["a", "b", "c"].iter().map(|d| root.path().join(d)).collect();
    for dir in &dirs {
      fs::create_dir_all(dir).unwrap();
    }
    let binary = root.path().join("rke2");
    fs::write(&binary, "").unwrap();

    let cleaner = RecordingCleaner {
      fail_on: vec![dirs[1].clone()],
      ..RecordingCleaner::default()
    };
    let failed = destructive_cleanup(&cleaner, &dirs, &[binary.clone()]);

    assert_eq!(failed, vec![dirs[1].clone()]);
    assert_eq!(cleaner.removed(), vec![dirs[0].clone(), dirs[2].clone(), binary]);
  }

  #[test]
  fn it_removes_from_disk() {
    let root = tempdir().unwrap();
    let data = root.path().join("var/lib/rancher/rke2");
    fs::create_dir_all(data.join("server/db")).unwrap();
    let missing = root.path().join("run/k3s");

    let failed = destructive_cleanup(&FsCleaner, &[data.clone(), missing], &[]);

    assert!(failed.is_empty());
    assert!(!data.exists());
  }
}
