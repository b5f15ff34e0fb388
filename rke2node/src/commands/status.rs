use std::{
  fs,
  io::{self, Write},
};

use anyhow::Result;
use clap::Args;
use tracing::warn;

use crate::{
  commands::{self, Host, System},
  config::ConfigDocument,
  service, Role,
};

#[derive(Args, Debug, Clone, Default)]
pub struct Status {
  /// Role to report on; detected from the installed unit files when omitted
  #[arg(long, value_enum)]
  pub role: Option<Role>,
}

impl Status {
  /// Print the state of the node's RKE2 service
  pub async fn status(&self) -> Result<()> {
    let system = System::default();
    let stdout = io::stdout();

    self.execute(&system.host(), &mut stdout.lock())
  }

  pub fn execute<W: Write>(&self, host: &Host<'_>, out: &mut W) -> Result<()> {
    host.facts.require_systemctl()?;
    let role = commands::resolve_role(self.role, &host.layout)?;
    let unit = role.unit_name();

    writeln!(out, "Role: {role}")?;
    writeln!(out, "Service: {unit}")?;
    writeln!(out, "State: {}", service::service_state(host.services, &unit))?;
    let active = host.services.show(&unit, "ActiveState");
    let sub = host.services.show(&unit, "SubState");
    match (active, sub) {
      (Ok(active), Ok(sub)) => writeln!(out, "Active: {active} ({sub})")?,
      (Err(e), _) | (_, Err(e)) => warn!("Unable to read the active state of {unit}: {e}"),
    }
    writeln!(out, "Enabled: {}", host.services.is_enabled(&unit))?;

    let version = match host.installer.installed_version() {
      Ok(Some(version)) => version.to_string(),
      Ok(None) => "not installed".to_owned(),
      Err(e) => {
        warn!("Unable to determine RKE2 version: {e}");
        "unknown".to_owned()
      }
    };
    writeln!(out, "Version: {version}")?;

    let config = &host.layout.config;
    match fs::read_to_string(config) {
      Ok(contents) => match ConfigDocument::from_yaml(&contents) {
        Ok(doc) => writeln!(
          out,
          "Config: {} ({})",
          config.display(),
          doc.keys().collect::<Vec<_>>().join(", ")
        )?,
        Err(e) => {
          warn!("Unable to parse {config:?}: {e}");
          writeln!(out, "Config: {}", config.display())?
        }
      },
      Err(_) => writeln!(out, "Config: {} (missing)", config.display())?,
    }

    match host.services.status(&unit) {
      Ok(report) => write!(out, "\n{report}")?,
      Err(e) => warn!("Unable to read status of {unit}: {e}"),
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;
  use crate::{
    commands::testing::{root_facts, Fakes},
    host::HostFacts,
    installer::testing::FakeInstaller,
    service::testing::FakeServices,
    NodeError,
  };

  #[test]
  fn it_reports_active_server() {
    let root = tempdir().unwrap();
    let fakes = Fakes {
      services: FakeServices::active_after(0),
      installer: FakeInstaller::with_version("1.28.3"),
      ..Fakes::default()
    };
    fakes.services.registered.set(true);
    fakes.services.enabled.set(true);
    fakes.services.properties.borrow_mut().extend([
      ("ActiveState".to_owned(), "active".to_owned()),
      ("SubState".to_owned(), "running".to_owned()),
    ]);
    let host = fakes.host(root.path(), root_facts());
    fs::create_dir_all(&host.layout.unit_dir).unwrap();
    fs::write(host.layout.unit_file(Role::Server), "[Unit]\n").unwrap();
    fs::create_dir_all(host.layout.config.parent().unwrap()).unwrap();
    fs::write(&host.layout.config, "token: \"abc\"\ncluster-init: true\n").unwrap();

    let mut out = Vec::new();
    Status::default().execute(&host, &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    let config = host.layout.config.display().to_string();
    assert!(out.starts_with(
      "Role: server\nService: rke2-server.service\nState: installed-active\nActive: active (running)\nEnabled: true\n"
    ));
    assert!(out.contains("Version: 1.28.3\n"));
    assert!(out.contains(&format!("Config: {config} (token, cluster-init)\n")));
    assert!(out.contains("Loaded: loaded"));
    assert!(fakes.services.calls().is_empty());
  }

  #[test]
  fn it_reports_inactive_agent() {
    let root = tempdir().unwrap();
    let fakes = Fakes::default();
    let host = fakes.host(root.path(), root_facts());

    let mut out = Vec::new();
    Status { role: Some(Role::Agent) }.execute(&host, &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("State: not-installed\n"));
    assert!(!out.contains("Active:"));
    assert!(out.contains("Version: not installed\n"));
    assert!(out.contains("(missing)"));
  }

  #[test]
  fn it_requires_systemctl() {
    let root = tempdir().unwrap();
    let fakes = Fakes::default();
    let facts = HostFacts {
      has_systemctl: false,
      ..root_facts()
    };
    let host = fakes.host(root.path(), facts);

    let err = Status { role: Some(Role::Server) }
      .execute(&host, &mut Vec::new())
      .unwrap_err();

    assert!(matches!(crate::error::kind(&err), Some(NodeError::Environment("systemctl"))));
  }
}
