use std::{fs, path::Path};

use anyhow::Result;
use tracing::info;

use crate::utils;

/// `/proc/swaps` carries a header line followed by one line per active device
pub fn swap_active<P: AsRef<Path>>(swaps: P) -> bool {
  match fs::read_to_string(swaps) {
    Ok(contents) => contents.lines().skip(1).any(|line| !line.trim().is_empty()),
    Err(_) => false,
  }
}

/// Drop fstab entries whose filesystem type is `swap`, keeping comments
pub fn strip_swap_entries(fstab: &str) -> String {
  let kept = fstab
    .lines()
    .filter(|line| {
      line.trim_start().starts_with('#') || line.split_whitespace().nth(2).map_or(true, |fs_type| fs_type != "swap")
    })
    .collect::<Vec<_>>()
    .join("\n");

  match fstab.ends_with('\n') && !kept.is_empty() {
    true => kept + "\n",
    false => kept,
  }
}

/// Turn swap off now and keep it off across reboots
pub fn disable_swap<P: AsRef<Path>, Q: AsRef<Path>>(swaps: P, fstab: Q) -> Result<()> {
  if swap_active(&swaps) {
    info!("Disabling swap");
    utils::cmd_check("swapoff", vec!["-a"])?;
  }

  let fstab = fstab.as_ref();
  if let Ok(original) = fs::read_to_string(fstab) {
    let cleaned = strip_swap_entries(&original);
    if cleaned != original {
      info!("Removing swap entries from {fstab:?}");
      fs::write(fstab, cleaned)?;
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  const FSTAB: &str = "# /etc/fstab\nUUID=abc / ext4 defaults 0 1\n/swap.img none swap sw 0 0\n# /dev/sdb none swap sw 0 0\n";

  #[test]
  fn it_strips_swap_entries() {
    assert_eq!(
      strip_swap_entries(FSTAB),
      "# /etc/fstab\nUUID=abc / ext4 defaults 0 1\n# /dev/sdb none swap sw 0 0\n"
    );
  }

  #[test]
  fn it_keeps_fstab_without_swap() {
    let fstab = "UUID=abc / ext4 defaults 0 1\n";
    assert_eq!(strip_swap_entries(fstab), fstab);
  }

  #[test]
  fn it_detects_active_swap() {
    let dir = tempdir().unwrap();
    let swaps = dir.path().join("swaps");

    fs::write(&swaps, "Filename\tType\tSize\tUsed\tPriority\n").unwrap();
    assert!(!swap_active(&swaps));

    fs::write(
      &swaps,
      "Filename\tType\tSize\tUsed\tPriority\n/swap.img\tfile\t2097148\t0\t-2\n",
    )
    .unwrap();
    assert!(swap_active(&swaps));

    assert!(!swap_active(dir.path().join("missing")));
  }

  #[test]
  fn it_rewrites_fstab_when_swap_inactive() {
    let dir = tempdir().unwrap();
    let swaps = dir.path().join("swaps");
    let fstab = dir.path().join("fstab");
    fs::write(&swaps, "Filename\tType\tSize\tUsed\tPriority\n").unwrap();
    fs::write(&fstab, FSTAB).unwrap();

    disable_swap(&swaps, &fstab).unwrap();

    assert!(!fs::read_to_string(&fstab).unwrap().contains("/swap.img"));
  }
}
