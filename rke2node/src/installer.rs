use std::{
  path::PathBuf,
  process::{Command, Stdio},
};

use anyhow::{anyhow, Result};
use semver::Version;
use tracing::{debug, info};

use crate::{paths, utils, NodeError, Role};

pub const INSTALL_SCRIPT_URL: &str = "https://get.rke2.io";
pub const DEFAULT_CHANNEL: &str = "stable";

/// What to install and whether an existing install may be reused
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallPlan {
  pub role: Role,
  pub channel: String,
  pub version: Option<String>,
  pub force: bool,
}

impl InstallPlan {
  /// Environment selectors consumed by the vendor install script
  pub fn env(&self) -> Vec<(String, String)> {
    let mut env = vec![("INSTALL_RKE2_CHANNEL".to_owned(), self.channel.clone())];
    if let Some(version) = &self.version {
      env.push(("INSTALL_RKE2_VERSION".to_owned(), version.clone()));
    }
    env.push(("INSTALL_RKE2_TYPE".to_owned(), self.role.installer_type().to_owned()));

    env
  }
}

/// Outcome of `ensure_installed`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
  /// An existing install was reused without contacting the network
  Skipped(Version),
  Installed,
}

/// Delegate that places the RKE2 binary and units on the host
pub trait Installer {
  /// Version of the currently installed binary, if any
  fn installed_version(&self) -> Result<Option<Version>>;

  /// Run the vendor installer with the given environment
  fn run(&self, env: &[(String, String)]) -> Result<()>;
}

/// Streams the vendor install script from the network into `sh`
#[derive(Debug)]
pub struct ScriptInstaller {
  pub url: String,
  pub binary: PathBuf,
}

impl Default for ScriptInstaller {
  fn default() -> Self {
    ScriptInstaller {
      url: INSTALL_SCRIPT_URL.to_owned(),
      binary: PathBuf::from(paths::BINARY_PATH),
    }
  }
}

impl Installer for ScriptInstaller {
  fn installed_version(&self) -> Result<Option<Version>> {
    if !self.binary.is_file() {
      return Ok(None);
    }

    let binary = self.binary.to_string_lossy();
    let out = utils::cmd_check(&binary, vec!["--version"])?;
    debug!("rke2 version: {}", out.stdout.trim());

    utils::get_semver(&out.stdout).map(Some)
  }

  /// Equivalent of `curl -sfL <url> | <env> sh -`
  fn run(&self, env: &[(String, String)]) -> Result<()> {
    info!("Running installer from {} with {env:?}", self.url);

    let mut fetch = Command::new("curl")
      .args(["-sfL", &self.url])
      .stdout(Stdio::piped())
      .spawn()
      .map_err(|e| anyhow!("Error executing command curl: {e}"))?;
    let script = fetch.stdout.take().ok_or_else(|| anyhow!("Unable to read curl output"))?;

    let status = Command::new("sh")
      .arg("-")
      .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .stdin(script)
      .status()
      .map_err(|e| anyhow!("Error executing command sh: {e}"))?;
    let fetched = fetch.wait()?;

    if !fetched.success() {
      return Err(
        NodeError::CommandFailed {
          cmd: format!("curl -sfL {}", self.url),
          status: fetched.code().unwrap_or(1),
          stderr: String::new(),
        }
        .into(),
      );
    }
    if !status.success() {
      return Err(
        NodeError::CommandFailed {
          cmd: "sh -".to_owned(),
          status: status.code().unwrap_or(1),
          stderr: String::new(),
        }
        .into(),
      );
    }

    Ok(())
  }
}

/// Install RKE2 unless an existing install satisfies the plan
///
/// An existing install is reused only when neither `--force` nor an explicit
/// version was requested
pub fn ensure_installed(installer: &dyn Installer, plan: &InstallPlan) -> Result<InstallOutcome> {
  if !plan.force && plan.version.is_none() {
    if let Some(version) = installer.installed_version()? {
      info!("RKE2 {version} is already installed; skipping installation");
      return Ok(InstallOutcome::Skipped(version));
    }
  }

  installer.run(&plan.env())?;
  info!("Installed RKE2 {} from channel {}", plan.role, plan.channel);

  Ok(InstallOutcome::Installed)
}
