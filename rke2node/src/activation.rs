use std::{future::Future, pin::Pin, time::Duration};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{service::ServiceManager, utils, NodeError, Role};

pub const MAX_ATTEMPTS: u32 = 3;
/// First start initializes the datastore and takes far longer than a restart
pub const FIRST_DWELL: Duration = Duration::from_secs(30);
pub const DWELL: Duration = Duration::from_secs(10);
pub const BACKOFF: Duration = Duration::from_secs(10);
pub const ETCD_POLL_ATTEMPTS: u32 = 12;
pub const ETCD_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const ETCD_PROCESS: &str = "etcd";

/// Timing and bounds of the activation loop
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActivationPolicy {
  pub max_attempts: u32,
  pub first_dwell: Duration,
  pub dwell: Duration,
  pub backoff: Duration,
  pub etcd_poll_attempts: u32,
  pub etcd_poll_interval: Duration,
}

impl Default for ActivationPolicy {
  fn default() -> Self {
    ActivationPolicy {
      max_attempts: MAX_ATTEMPTS,
      first_dwell: FIRST_DWELL,
      dwell: DWELL,
      backoff: BACKOFF,
      etcd_poll_attempts: ETCD_POLL_ATTEMPTS,
      etcd_poll_interval: ETCD_POLL_INTERVAL,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivationState {
  Disabled,
  Enabling,
  Starting { attempt: u32 },
  Active { attempts: u32 },
  Failed,
}

/// Source of blocking waits
pub trait Sleeper {
  fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + '_>>;
}

#[derive(Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
  fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + '_>> {
    Box::pin(tokio::time::sleep(duration))
  }
}

/// Checks for a running process by exact name
pub trait ProcessProbe {
  fn is_running(&self, name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct Pgrep;

impl ProcessProbe for Pgrep {
  fn is_running(&self, name: &str) -> bool {
    match utils::cmd_exec("pgrep", vec!["-x", name]) {
      Ok(out) => out.success(),
      Err(e) => {
        debug!("{e}");
        false
      }
    }
  }
}

/// Summary of a successful activation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActivationReport {
  /// Start attempts made, including the successful one
  pub attempts: u32,
  /// Result of the etcd poll; `None` for agents
  pub etcd_ready: Option<bool>,
}

/// Enable a role's service and drive it to active
///
/// `Disabled -> Enabling -> Starting -> Active`, or `Starting -> Failed` once
/// every attempt is exhausted
pub struct Activation<'a> {
  role: Role,
  services: &'a dyn ServiceManager,
  probe: &'a dyn ProcessProbe,
  sleeper: &'a dyn Sleeper,
  policy: ActivationPolicy,
  state: ActivationState,
}

impl<'a> Activation<'a> {
  pub fn new(
    role: Role,
    services: &'a dyn ServiceManager,
    probe: &'a dyn ProcessProbe,
    sleeper: &'a dyn Sleeper,
    policy: ActivationPolicy,
  ) -> Self {
    Activation {
      role,
      services,
      probe,
      sleeper,
      policy,
      state: ActivationState::Disabled,
    }
  }

  pub fn state(&self) -> ActivationState {
    self.state
  }

  fn transition(&mut self, next: ActivationState) {
    debug!("{}: {:?} -> {next:?}", self.role.service_name(), self.state);
    self.state = next;
  }

  pub async fn run(&mut self) -> Result<ActivationReport> {
    let unit = self.role.unit_name();

    loop {
      match self.state {
        ActivationState::Disabled => {
          self.services.enable(&unit)?;
          info!("Enabled {unit}");
          self.transition(ActivationState::Enabling);
        }
        ActivationState::Enabling => self.transition(ActivationState::Starting { attempt: 1 }),
        ActivationState::Starting { attempt } => {
          info!("Starting {unit} (attempt {attempt}/{})", self.policy.max_attempts);
          self.services.restart(&unit)?;

          let dwell = match attempt {
            1 => self.policy.first_dwell,
            _ => self.policy.dwell,
          };
          self.sleeper.sleep(dwell).await;

          if self.services.is_active(&unit) {
            info!("{unit} is active");
            self.transition(ActivationState::Active { attempts: attempt });
          } else if attempt >= self.policy.max_attempts {
            self.transition(ActivationState::Failed);
          } else {
            warn!("{unit} is not active after attempt {attempt}; retrying");
            self.sleeper.sleep(self.policy.backoff).await;
            self.transition(ActivationState::Starting { attempt: attempt + 1 });
          }
        }
        ActivationState::Active { attempts } => {
          let etcd_ready = self.poll_etcd().await;
          return Ok(ActivationReport { attempts, etcd_ready });
        }
        ActivationState::Failed => {
          return Err(
            NodeError::ServiceStart {
              service: self.role.service_name().to_owned(),
              attempts: self.policy.max_attempts,
            }
            .into(),
          )
        }
      }
    }
  }

  /// Wait for the etcd static pod on servers
  ///
  /// Advisory only: the service being active is the success signal
  async fn poll_etcd(&self) -> Option<bool> {
    if self.role != Role::Server {
      return None;
    }

    for poll in 1..=self.policy.etcd_poll_attempts {
      if self.probe.is_running(ETCD_PROCESS) {
        info!("etcd is running");
        return Some(true);
      }
      debug!("etcd not running yet ({poll}/{})", self.policy.etcd_poll_attempts);
      self.sleeper.sleep(self.policy.etcd_poll_interval).await;
    }

    warn!("etcd did not appear; the server may still be initializing");
    Some(false)
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    time::Duration,
  };

  use super::{ProcessProbe, Sleeper};

  /// Records requested sleeps and returns immediately
  #[derive(Debug, Default)]
  pub struct RecordingSleeper {
    pub sleeps: RefCell<Vec<Duration>>,
  }

  impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
      self.sleeps.borrow().clone()
    }
  }

  impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + '_>> {
      self.sleeps.borrow_mut().push(duration);
      Box::pin(std::future::ready(()))
    }
  }

  /// Reports the process as running after a number of probes; `None` never does
  #[derive(Debug, Default)]
  pub struct FakeProbe {
    pub running_after: Option<u32>,
    pub probes: Cell<u32>,
  }

  impl ProcessProbe for FakeProbe {
    fn is_running(&self, _name: &str) -> bool {
      let probe = self.probes.get();
      self.probes.set(probe + 1);
      match self.running_after {
        Some(after) => probe >= after,
        None => false,
      }
    }
  }
}
