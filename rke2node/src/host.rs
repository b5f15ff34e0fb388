use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Result;
use nix::unistd::Uid;
use tracing::{debug, warn};

use crate::{utils, NodeError};

/// Architectures the vendor installer publishes artifacts for
pub const SUPPORTED_ARCHS: [&str; 4] = ["x86_64", "amd64", "aarch64", "arm64"];

/// Distributions RKE2 is tested against
pub const KNOWN_OS_IDS: [&str; 10] = [
  "ubuntu",
  "debian",
  "rhel",
  "centos",
  "rocky",
  "almalinux",
  "ol",
  "sles",
  "opensuse-leap",
  "amzn",
];

/// Read-only facts about the host used to gate mutations
#[derive(Clone, Debug, Default)]
pub struct HostFacts {
  pub is_root: bool,
  pub has_systemctl: bool,
  pub has_curl: bool,
  pub arch: String,
  pub os_id: Option<String>,
}

impl HostFacts {
  pub fn gather<P: AsRef<Path>>(os_release: P) -> Self {
    let arch = match utils::cmd_exec("uname", vec!["-m"]) {
      Ok(out) if out.success() => out.stdout.trim().to_owned(),
      _ => std::env::consts::ARCH.to_owned(),
    };

    let facts = HostFacts {
      is_root: Uid::effective().is_root(),
      has_systemctl: which::which("systemctl").is_ok(),
      has_curl: which::which("curl").is_ok(),
      arch,
      os_id: read_os_release(os_release).remove("ID"),
    };
    debug!("Host facts: {facts:#?}");

    facts
  }

  /// Preconditions for `install`
  pub fn validate_install(&self) -> Result<()> {
    if !self.is_root {
      return Err(NodeError::Permission.into());
    }
    self.require_systemctl()?;
    if !self.has_curl {
      return Err(NodeError::Environment("curl").into());
    }
    if !SUPPORTED_ARCHS.contains(&self.arch.as_str()) {
      return Err(NodeError::UnsupportedPlatform(self.arch.clone()).into());
    }

    match self.os_id.as_deref() {
      Some(id) if KNOWN_OS_IDS.contains(&id) => {}
      Some(id) => warn!("Operating system '{id}' is not a tested distribution; continuing"),
      None => warn!("Unable to determine operating system; continuing"),
    }

    Ok(())
  }

  /// Preconditions for querying the service manager
  pub fn require_systemctl(&self) -> Result<()> {
    match self.has_systemctl {
      true => Ok(()),
      false => Err(NodeError::Environment("systemctl").into()),
    }
  }

  /// Preconditions for a live (non dry-run) uninstall
  pub fn require_root(&self) -> Result<()> {
    match self.is_root {
      true => Ok(()),
      false => Err(NodeError::Permission.into()),
    }
  }
}

/// Parse `KEY=value` pairs from an os-release file
pub fn parse_os_release(contents: &str) -> BTreeMap<String, String> {
  contents
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .filter_map(|line| line.split_once('='))
    .map(|(key, value)| (key.to_owned(), value.trim_matches(|c| c == '"' || c == '\'').to_owned()))
    .collect()
}

/// Missing or unreadable files yield an empty map
pub fn read_os_release<P: AsRef<Path>>(path: P) -> BTreeMap<String, String> {
  match fs::read_to_string(path) {
    Ok(contents) => parse_os_release(&contents),
    Err(_) => BTreeMap::new(),
  }
}

#[cfg(test)]
mod tests {
  use rstest::*;

  use super::*;

  fn facts() -> HostFacts {
    HostFacts {
      is_root: true,
      has_systemctl: true,
      has_curl: true,
      arch: "x86_64".to_owned(),
      os_id: Some("ubuntu".to_owned()),
    }
  }

  #[test]
  fn it_passes_supported_host() {
    assert!(facts().validate_install().is_ok());
  }

  #[test]
  fn it_requires_root() {
    let host = HostFacts {
      is_root: false,
      ..facts()
    };
    let err = host.validate_install().unwrap_err();
    assert!(matches!(crate::error::kind(&err), Some(NodeError::Permission)));
  }

  #[rstest]
  #[case(false, true, "systemctl")]
  #[case(true, false, "curl")]
  fn it_requires_tooling(#[case] has_systemctl: bool, #[case] has_curl: bool, #[case] missing: &str) {
    let host = HostFacts {
      has_systemctl,
      has_curl,
      ..facts()
    };
    let err = host.validate_install().unwrap_err();
    match crate::error::kind(&err) {
      Some(NodeError::Environment(cmd)) => assert_eq!(*cmd, missing),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[rstest]
  #[case("x86_64", true)]
  #[case("amd64", true)]
  #[case("aarch64", true)]
  #[case("arm64", true)]
  #[case("armv7l", false)]
  #[case("s390x", false)]
  fn it_checks_architecture(#[case] arch: &str, #[case] supported: bool) {
    let host = HostFacts {
      arch: arch.to_owned(),
      ..facts()
    };
    assert_eq!(host.validate_install().is_ok(), supported);
  }

  #[test]
  fn it_warns_on_unknown_os() {
    let host = HostFacts {
      os_id: Some("gentoo".to_owned()),
      ..facts()
    };
    assert!(host.validate_install().is_ok());

    let host = HostFacts { os_id: None, ..facts() };
    assert!(host.validate_install().is_ok());
  }

  #[test]
  fn it_parses_os_release() {
    let contents = r#"
NAME="Ubuntu"
VERSION_ID="22.04"
# comment
ID=ubuntu
PRETTY_NAME="Ubuntu 22.04.3 LTS"
"#;
    let release = parse_os_release(contents);

    assert_eq!(release.get("ID").map(String::as_str), Some("ubuntu"));
    assert_eq!(release.get("PRETTY_NAME").map(String::as_str), Some("Ubuntu 22.04.3 LTS"));
    assert_eq!(release.len(), 4);
  }
}
