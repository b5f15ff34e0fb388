pub mod activation;
pub mod backup;
pub mod cleanup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod installer;
pub mod paths;
pub mod service;
pub mod swap;
pub mod utils;

use std::fmt;

use clap::ValueEnum;
pub use cli::{Cli, Commands, UninstallCli};
pub use error::NodeError;
use serde::{Deserialize, Serialize};

/// The operating mode of an RKE2 node
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Control plane and datastore
  Server,
  /// Worker only
  Agent,
}

impl Role {
  pub const ALL: [Role; 2] = [Role::Server, Role::Agent];

  /// Name of the systemd service for the role
  pub fn service_name(&self) -> &'static str {
    match self {
      Self::Server => "rke2-server",
      Self::Agent => "rke2-agent",
    }
  }

  /// Name of the systemd unit file for the role
  pub fn unit_name(&self) -> String {
    format!("{}.service", self.service_name())
  }

  /// Value passed to the vendor installer as `INSTALL_RKE2_TYPE`
  pub fn installer_type(&self) -> &'static str {
    match self {
      Self::Server => "server",
      Self::Agent => "agent",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.installer_type())
  }
}
