use std::fmt;

use anyhow::Result;
use tracing::debug;

use crate::utils;

/// Observed state of a role's service; polled, never persisted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ServiceState {
  NotInstalled,
  InstalledInactive,
  InstalledActive,
}

impl fmt::Display for ServiceState {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ServiceState::NotInstalled => write!(f, "not-installed"),
      ServiceState::InstalledInactive => write!(f, "installed-inactive"),
      ServiceState::InstalledActive => write!(f, "installed-active"),
    }
  }
}

/// The subset of the OS service manager `rke2node` drives
///
/// Query methods answer `false` when the manager cannot be asked
pub trait ServiceManager {
  fn enable(&self, unit: &str) -> Result<()>;
  fn disable(&self, unit: &str) -> Result<()>;
  fn restart(&self, unit: &str) -> Result<()>;
  fn stop(&self, unit: &str) -> Result<()>;
  fn daemon_reload(&self) -> Result<()>;
  fn is_active(&self, unit: &str) -> bool;
  fn is_enabled(&self, unit: &str) -> bool;
  /// Whether the unit file is known to the manager
  fn is_registered(&self, unit: &str) -> bool;
  /// Human readable status report
  fn status(&self, unit: &str) -> Result<String>;
  /// Value of a single unit property
  fn show(&self, unit: &str, property: &str) -> Result<String>;
}

/// Derive the coarse service state from the manager
pub fn service_state(services: &dyn ServiceManager, unit: &str) -> ServiceState {
  match (services.is_registered(unit), services.is_active(unit)) {
    (_, true) => ServiceState::InstalledActive,
    (true, false) => ServiceState::InstalledInactive,
    (false, false) => ServiceState::NotInstalled,
  }
}

/// `systemctl` backed service manager
#[derive(Debug, Default)]
pub struct Systemctl;

impl ServiceManager for Systemctl {
  fn enable(&self, unit: &str) -> Result<()> {
    utils::cmd_check("systemctl", vec!["enable", unit]).map(|_| ())
  }

  fn disable(&self, unit: &str) -> Result<()> {
    utils::cmd_check("systemctl", vec!["disable", unit]).map(|_| ())
  }

  fn restart(&self, unit: &str) -> Result<()> {
    utils::cmd_check("systemctl", vec!["restart", unit]).map(|_| ())
  }

  fn stop(&self, unit: &str) -> Result<()> {
    utils::cmd_check("systemctl", vec!["stop", unit]).map(|_| ())
  }

  fn daemon_reload(&self) -> Result<()> {
    utils::cmd_check("systemctl", vec!["daemon-reload"]).map(|_| ())
  }

  fn is_active(&self, unit: &str) -> bool {
    match utils::cmd_exec("systemctl", vec!["is-active", "--quiet", unit]) {
      Ok(out) => out.success(),
      Err(e) => {
        debug!("{e}");
        false
      }
    }
  }

  fn is_enabled(&self, unit: &str) -> bool {
    match utils::cmd_exec("systemctl", vec!["is-enabled", "--quiet", unit]) {
      Ok(out) => out.success(),
      Err(e) => {
        debug!("{e}");
        false
      }
    }
  }

  fn is_registered(&self, unit: &str) -> bool {
    match utils::cmd_exec("systemctl", vec!["list-unit-files", "--no-legend", unit]) {
      Ok(out) => out.stdout.lines().any(|line| line.split_whitespace().next() == Some(unit)),
      Err(e) => {
        debug!("{e}");
        false
      }
    }
  }

  fn status(&self, unit: &str) -> Result<String> {
    // Exits non-zero for inactive units; the report is still wanted
    let out = utils::cmd_exec("systemctl", vec!["status", "--no-pager", unit])?;
    Ok(out.stdout)
  }

  fn show(&self, unit: &str, property: &str) -> Result<String> {
    let out = utils::cmd_check("systemctl", vec!["show", unit, "--property", property, "--value"])?;
    Ok(out.stdout.trim().to_owned())
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
  };

  use anyhow::{anyhow, Result};

  use super::ServiceManager;

  /// Scriptable service manager that records every mutating call
  #[derive(Debug, Default)]
  pub struct FakeServices {
    pub calls: RefCell<Vec<String>>,
    /// Number of `is_active` samples answered `false` before answering `true`;
    /// `None` never becomes active
    pub active_after: Cell<Option<u32>>,
    pub samples: Cell<u32>,
    pub registered: Cell<bool>,
    pub enabled: Cell<bool>,
    pub fail_enable: Cell<bool>,
    pub fail_restart: Cell<bool>,
    pub fail_stop: Cell<bool>,
    /// Answers for `show`; unknown properties are an error
    pub properties: RefCell<BTreeMap<String, String>>,
  }

  impl FakeServices {
    pub fn active_after(samples: u32) -> Self {
      let fake = FakeServices::default();
      fake.active_after.set(Some(samples));
      fake
    }

    pub fn never_active() -> Self {
      FakeServices::default()
    }

    pub fn calls(&self) -> Vec<String> {
      self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
      self.calls.borrow_mut().push(call);
    }
  }

  impl ServiceManager for FakeServices {
    fn enable(&self, unit: &str) -> Result<()> {
      self.record(format!("enable {unit}"));
      match self.fail_enable.get() {
        true => Err(anyhow!("Failed to enable unit: Unit file {unit} does not exist.")),
        false => Ok(()),
      }
    }

    fn disable(&self, unit: &str) -> Result<()> {
      self.record(format!("disable {unit}"));
      Ok(())
    }

    fn restart(&self, unit: &str) -> Result<()> {
      self.record(format!("restart {unit}"));
      match self.fail_restart.get() {
        true => Err(anyhow!("Job for {unit} failed because the control process exited with error code.")),
        false => Ok(()),
      }
    }

    fn stop(&self, unit: &str) -> Result<()> {
      self.record(format!("stop {unit}"));
      match self.fail_stop.get() {
        true => Err(anyhow!("Failed to stop {unit}")),
        false => Ok(()),
      }
    }

    fn daemon_reload(&self) -> Result<()> {
      self.record("daemon-reload".to_owned());
      Ok(())
    }

    fn is_active(&self, _unit: &str) -> bool {
      let sample = self.samples.get();
      self.samples.set(sample + 1);
      match self.active_after.get() {
        Some(after) => sample >= after,
        None => false,
      }
    }

    fn is_enabled(&self, _unit: &str) -> bool {
      self.enabled.get()
    }

    fn is_registered(&self, _unit: &str) -> bool {
      self.registered.get()
    }

    fn status(&self, unit: &str) -> Result<String> {
      Ok(format!("● {unit}\n   Loaded: loaded\n"))
    }

    fn show(&self, unit: &str, property: &str) -> Result<String> {
      self
        .properties
        .borrow()
        .get(property)
        .cloned()
        .ok_or_else(|| anyhow!("{unit} has no property {property}"))
    }
  }
}
