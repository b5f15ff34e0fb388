use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::{
  activation::{Activation, ActivationReport},
  commands::{Host, System},
  config::{self, ConfigOptions, Materialized},
  installer::{self, InstallOutcome, InstallPlan, DEFAULT_CHANNEL},
  swap, Role,
};

#[derive(Args, Debug, Clone)]
#[command(disable_version_flag = true)]
pub struct Install {
  /// The role this node plays in the cluster
  #[arg(long, value_enum)]
  pub role: Role,

  /// Release channel passed to the RKE2 installer
  #[arg(long, env = "INSTALL_RKE2_CHANNEL", default_value = DEFAULT_CHANNEL)]
  pub channel: String,

  /// Exact RKE2 version to install, e.g. v1.28.3+rke2r2
  ///
  /// Forces the installer to run even when RKE2 is already installed
  #[arg(long, env = "INSTALL_RKE2_VERSION")]
  pub version: Option<String>,

  /// Existing RKE2 config file copied over /etc/rancher/rke2/config.yaml
  ///
  /// Takes precedence over --token, --token-file, --server-url and --cluster-init
  #[arg(long)]
  pub config: Option<PathBuf>,

  /// Registration address of an existing server, e.g. https://10.0.0.10:9345
  ///
  /// Required for agents
  #[arg(long, env = "RKE2_URL")]
  pub server_url: Option<String>,

  /// Shared secret used to join the cluster
  ///
  /// Takes precedence over --token-file
  #[arg(long, env = "RKE2_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// File containing the shared secret used to join the cluster
  #[arg(long, env = "RKE2_TOKEN_FILE")]
  pub token_file: Option<PathBuf>,

  /// Initialize a new embedded etcd cluster (server only)
  #[arg(long)]
  pub cluster_init: bool,

  /// Turn swap off and remove swap entries from /etc/fstab before installing
  #[arg(long)]
  pub auto_swapoff: bool,

  /// Run the installer even when RKE2 is already installed
  #[arg(long)]
  pub force: bool,
}

/// What an install run did, step by step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallSummary {
  pub config: Materialized,
  pub install: InstallOutcome,
  pub activation: ActivationReport,
}

impl Install {
  fn config_options(&self) -> ConfigOptions {
    ConfigOptions {
      config_file: self.config.clone(),
      token: self.token.clone(),
      token_file: self.token_file.clone(),
      server_url: self.server_url.clone(),
      cluster_init: self.cluster_init,
    }
  }

  fn install_plan(&self) -> InstallPlan {
    InstallPlan {
      role: self.role,
      channel: self.channel.clone(),
      version: self.version.clone(),
      force: self.force,
    }
  }

  /// Install RKE2 on this host and bring the role's service up
  pub async fn install(&self) -> Result<()> {
    let system = System::default();
    self.execute(&system.host()).await.map(|_| ())
  }

  pub async fn execute(&self, host: &Host<'_>) -> Result<InstallSummary> {
    host.facts.validate_install()?;

    let config = config::materialize(self.role, &self.config_options(), &host.layout.config)?;

    if self.auto_swapoff {
      swap::disable_swap(&host.layout.swaps, &host.layout.fstab)?;
    }

    let install = installer::ensure_installed(host.installer, &self.install_plan())?;

    let mut activation = Activation::new(self.role, host.services, host.probe, host.sleeper, host.policy);
    let report = activation.run().await?;

    info!(
      "{} is active after {} attempt(s); config at {:?}",
      self.role.service_name(),
      report.attempts,
      host.layout.config
    );
    if self.role == Role::Server {
      info!("Kubeconfig is written to {:?}", host.layout.kubeconfig);
    }

    Ok(InstallSummary {
      config,
      install,
      activation: report,
    })
  }
}
