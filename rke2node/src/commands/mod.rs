pub mod info;
pub mod install;
pub mod status;
pub mod uninstall;

use anyhow::Result;

use crate::{
  activation::{ActivationPolicy, Pgrep, ProcessProbe, Sleeper, TokioSleeper},
  cleanup::{Cleaner, FsCleaner},
  host::HostFacts,
  installer::{Installer, ScriptInstaller},
  paths::Layout,
  service::{ServiceManager, Systemctl},
  NodeError, Role,
};

/// Everything a command needs to know about, and do to, the host
///
/// Built once per invocation and passed by reference to every operation
pub struct Host<'a> {
  pub layout: Layout,
  pub facts: HostFacts,
  pub services: &'a dyn ServiceManager,
  pub installer: &'a dyn Installer,
  pub probe: &'a dyn ProcessProbe,
  pub sleeper: &'a dyn Sleeper,
  pub cleaner: &'a dyn Cleaner,
  pub policy: ActivationPolicy,
}

/// Use the role given on the command line, or detect it from installed unit files
pub fn resolve_role(explicit: Option<Role>, layout: &Layout) -> Result<Role> {
  if let Some(role) = explicit {
    return Ok(role);
  }

  let server = layout.unit_file(Role::Server).exists();
  let agent = layout.unit_file(Role::Agent).exists();

  match (server, agent) {
    (true, true) => Err(NodeError::AmbiguousRole.into()),
    (true, false) => Ok(Role::Server),
    (false, true) => Ok(Role::Agent),
    (false, false) => Err(NodeError::NotInstalled.into()),
  }
}

/// The real collaborators: `systemctl`, the network installer, and the filesystem
#[derive(Debug, Default)]
pub struct System {
  services: Systemctl,
  installer: ScriptInstaller,
  probe: Pgrep,
  sleeper: TokioSleeper,
  cleaner: FsCleaner,
}

impl System {
  pub fn host(&self) -> Host<'_> {
    let layout = Layout::default();
    let facts = HostFacts::gather(&layout.os_release);

    Host {
      layout,
      facts,
      services: &self.services,
      installer: &self.installer,
      probe: &self.probe,
      sleeper: &self.sleeper,
      cleaner: &self.cleaner,
      policy: ActivationPolicy::default(),
    }
  }
}
