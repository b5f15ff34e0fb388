use std::{
  fs,
  io::{self, Write},
  path::Path,
};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::{
  commands::{Host, System},
  host::read_os_release,
  swap, utils, Role,
};

#[derive(Args, Debug, Clone, Default)]
pub struct Info {}

/// Host details relevant to running RKE2
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
  pub arch: String,
  pub os_id: Option<String>,
  pub os_pretty_name: Option<String>,
  pub kernel: Option<String>,
  pub memory_total_kib: Option<u64>,
  pub swap_active: bool,
  pub is_root: bool,
  pub has_systemctl: bool,
  pub has_curl: bool,
  pub installed_version: Option<String>,
  /// Roles whose unit file is present
  pub installed_roles: Vec<Role>,
}

/// `MemTotal` from /proc/meminfo, in KiB
pub fn memory_total_kib<P: AsRef<Path>>(meminfo: P) -> Option<u64> {
  let contents = fs::read_to_string(meminfo).ok()?;
  contents
    .lines()
    .find_map(|line| line.strip_prefix("MemTotal:"))
    .and_then(|rest| rest.split_whitespace().next())
    .and_then(|kib| kib.parse().ok())
}

fn kernel_release() -> Option<String> {
  match utils::cmd_exec("uname", vec!["-r"]) {
    Ok(out) if out.success() => Some(out.stdout.trim().to_owned()),
    Ok(_) => None,
    Err(e) => {
      debug!("{e}");
      None
    }
  }
}

impl Info {
  /// Print host details as JSON
  pub async fn info(&self) -> Result<()> {
    let system = System::default();
    let stdout = io::stdout();

    self.execute(&system.host(), &mut stdout.lock())
  }

  pub fn collect(&self, host: &Host<'_>) -> NodeInfo {
    let layout = &host.layout;
    let installed_version = match host.installer.installed_version() {
      Ok(version) => version.map(|v| v.to_string()),
      Err(e) => {
        debug!("Unable to determine RKE2 version: {e}");
        None
      }
    };

    NodeInfo {
      arch: host.facts.arch.clone(),
      os_id: host.facts.os_id.clone(),
      os_pretty_name: read_os_release(&layout.os_release).remove("PRETTY_NAME"),
      kernel: kernel_release(),
      memory_total_kib: memory_total_kib(&layout.meminfo),
      swap_active: swap::swap_active(&layout.swaps),
      is_root: host.facts.is_root,
      has_systemctl: host.facts.has_systemctl,
      has_curl: host.facts.has_curl,
      installed_version,
      installed_roles: Role::ALL
        .into_iter()
        .filter(|role| layout.unit_file(*role).exists())
        .collect(),
    }
  }

  pub fn execute<W: Write>(&self, host: &Host<'_>, out: &mut W) -> Result<()> {
    let info = self.collect(host);
    writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;

    Ok(())
  }
}
