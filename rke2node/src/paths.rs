use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::Role;

pub const CONFIG_PATH: &str = "/etc/rancher/rke2/config.yaml";
pub const KUBECONFIG_PATH: &str = "/etc/rancher/rke2/rke2.yaml";
pub const NODE_TOKEN_PATH: &str = "/var/lib/rancher/rke2/server/node-token";
pub const UNIT_DIR: &str = "/usr/local/lib/systemd/system";
pub const UNINSTALL_SCRIPT_PATH: &str = "/usr/local/bin/rke2-uninstall.sh";
pub const BINARY_PATH: &str = "/usr/local/bin/rke2";
pub const BACKUP_ROOT: &str = "/var/backups";
pub const SWAPS_PATH: &str = "/proc/swaps";
pub const FSTAB_PATH: &str = "/etc/fstab";
pub const OS_RELEASE_PATH: &str = "/etc/os-release";
pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Directories removed by `--clean-data`
pub const DATA_DIRS: [&str; 4] = ["/etc/rancher/rke2", "/var/lib/rancher/rke2", "/var/lib/kubelet", "/run/k3s"];

/// Host paths read or written by `rke2node`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
  pub config: PathBuf,
  pub kubeconfig: PathBuf,
  pub node_token: PathBuf,
  pub unit_dir: PathBuf,
  pub uninstall_script: PathBuf,
  pub binary: PathBuf,
  pub data_dirs: Vec<PathBuf>,
  pub backup_root: PathBuf,
  pub swaps: PathBuf,
  pub fstab: PathBuf,
  pub os_release: PathBuf,
  pub meminfo: PathBuf,
}

impl Default for Layout {
  fn default() -> Self {
    Layout {
      config: PathBuf::from(CONFIG_PATH),
      kubeconfig: PathBuf::from(KUBECONFIG_PATH),
      node_token: PathBuf::from(NODE_TOKEN_PATH),
      unit_dir: PathBuf::from(UNIT_DIR),
      uninstall_script: PathBuf::from(UNINSTALL_SCRIPT_PATH),
      binary: PathBuf::from(BINARY_PATH),
      data_dirs: DATA_DIRS.iter().map(PathBuf::from).collect(),
      backup_root: PathBuf::from(BACKUP_ROOT),
      swaps: PathBuf::from(SWAPS_PATH),
      fstab: PathBuf::from(FSTAB_PATH),
      os_release: PathBuf::from(OS_RELEASE_PATH),
      meminfo: PathBuf::from(MEMINFO_PATH),
    }
  }
}

impl Layout {
  /// The default layout with every path moved under `root`
  pub fn rooted<P: AsRef<Path>>(root: P) -> Self {
    let root = root.as_ref();
    let under = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
    let default = Layout::default();

    Layout {
      config: under(&default.config),
      kubeconfig: under(&default.kubeconfig),
      node_token: under(&default.node_token),
      unit_dir: under(&default.unit_dir),
      uninstall_script: under(&default.uninstall_script),
      binary: under(&default.binary),
      data_dirs: default.data_dirs.iter().map(|d| under(d)).collect(),
      backup_root: under(&default.backup_root),
      swaps: under(&default.swaps),
      fstab: under(&default.fstab),
      os_release: under(&default.os_release),
      meminfo: under(&default.meminfo),
    }
  }

  pub fn unit_file(&self, role: Role) -> PathBuf {
    self.unit_dir.join(role.unit_name())
  }

  /// Files copied into the backup set on uninstall
  ///
  /// The kubeconfig is only written on servers
  pub fn backup_candidates(&self, role: Role) -> Vec<PathBuf> {
    let mut files = vec![self.config.clone()];
    if role == Role::Server {
      files.push(self.kubeconfig.clone());
    }
    files.push(self.node_token.clone());
    files.push(self.unit_file(role));

    files
  }

  /// Timestamped backup directory, e.g. `/var/backups/rke2node-20231024-153000`
  pub fn default_backup_dir(&self, now: DateTime<Local>) -> PathBuf {
    self
      .backup_root
      .join(format!("rke2node-{}", now.format("%Y%m%d-%H%M%S")))
  }
}
