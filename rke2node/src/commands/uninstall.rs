use std::{
  io::{self, BufRead, Write},
  path::PathBuf,
};

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Args;
use tracing::{info, warn};

use crate::{
  backup::{self, BackupSet},
  cleanup,
  commands::{self, Host, System},
  paths::Layout,
  utils, Role,
};

#[derive(Args, Debug, Clone, Default)]
pub struct Uninstall {
  /// Role to remove; detected from the installed unit files when omitted
  #[arg(long, value_enum)]
  pub role: Option<Role>,

  /// Skip the confirmation prompt
  #[arg(long)]
  pub force: bool,

  /// Print what would be backed up and removed, then exit without changing anything
  #[arg(long)]
  pub dry_run: bool,

  /// Directory to copy config, token and unit files into before removal
  ///
  /// Defaults to /var/backups/rke2node-<YYYYmmdd-HHMMSS>
  #[arg(long)]
  pub backup_dir: Option<PathBuf>,

  /// Also remove every RKE2 data directory and the rke2 binary
  #[arg(long)]
  pub clean_data: bool,
}

/// Everything an uninstall would touch, computed without side effects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UninstallPlan {
  pub role: Role,
  pub backup_dir: PathBuf,
  /// Backup candidates that exist right now
  pub backup_files: Vec<PathBuf>,
  pub unit: String,
  pub script: PathBuf,
  pub script_present: bool,
  pub remove_dirs: Vec<PathBuf>,
  pub remove_files: Vec<PathBuf>,
}

impl UninstallPlan {
  pub fn new(role: Role, layout: &Layout, backup_dir: PathBuf, clean_data: bool) -> Self {
    let (remove_dirs, remove_files) = match clean_data {
      true => (layout.data_dirs.clone(), vec![layout.binary.clone()]),
      false => (Vec::new(), Vec::new()),
    };

    UninstallPlan {
      role,
      backup_dir,
      backup_files: backup::existing(&layout.backup_candidates(role)),
      unit: role.unit_name(),
      script: layout.uninstall_script.clone(),
      script_present: layout.uninstall_script.is_file(),
      remove_dirs,
      remove_files,
    }
  }

  pub fn print<W: Write>(&self, out: &mut W) -> Result<()> {
    writeln!(out, "Role: {}", self.role)?;
    writeln!(out, "Service: {}", self.unit)?;
    writeln!(out, "Backup directory: {}", self.backup_dir.display())?;

    writeln!(out, "Files to back up:")?;
    if self.backup_files.is_empty() {
      writeln!(out, "  (none)")?;
    }
    for file in &self.backup_files {
      writeln!(out, "  {}", file.display())?;
    }

    match self.script_present {
      true => writeln!(out, "Uninstall script: {}", self.script.display())?,
      false => writeln!(
        out,
        "Uninstall script: {} (missing; unit file would be removed directly)",
        self.script.display()
      )?,
    }

    writeln!(out, "Directories to remove:")?;
    if self.remove_dirs.is_empty() {
      writeln!(out, "  (none)")?;
    }
    for dir in &self.remove_dirs {
      writeln!(out, "  {}", dir.display())?;
    }

    writeln!(out, "Files to remove:")?;
    if self.remove_files.is_empty() {
      writeln!(out, "  (none)")?;
    }
    for file in &self.remove_files {
      writeln!(out, "  {}", file.display())?;
    }

    Ok(())
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UninstallOutcome {
  DryRun(UninstallPlan),
  Cancelled,
  Completed(BackupSet),
}

/// Ask the operator to type `yes`; anything else, including EOF, declines
fn confirm<R: BufRead, W: Write>(plan: &UninstallPlan, input: &mut R, out: &mut W) -> Result<bool> {
  write!(
    out,
    "This will remove {} from this host. Type 'yes' to continue: ",
    plan.unit
  )?;
  out.flush()?;

  let mut answer = String::new();
  input.read_line(&mut answer)?;

  Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

impl Uninstall {
  /// Remove RKE2 from this host, prompting on the terminal
  pub async fn uninstall(&self) -> Result<()> {
    let system = System::default();
    let stdin = io::stdin();
    let stdout = io::stdout();

    self
      .execute(&system.host(), &mut stdin.lock(), &mut stdout.lock(), Local::now())
      .await
      .map(|_| ())
  }

  pub async fn execute<R: BufRead, W: Write>(
    &self,
    host: &Host<'_>,
    input: &mut R,
    out: &mut W,
    now: DateTime<Local>,
  ) -> Result<UninstallOutcome> {
    let role = commands::resolve_role(self.role, &host.layout)?;
    let backup_dir = match &self.backup_dir {
      Some(dir) => dir.clone(),
      None => host.layout.default_backup_dir(now),
    };
    let plan = UninstallPlan::new(role, &host.layout, backup_dir, self.clean_data);

    if self.dry_run {
      plan.print(out)?;
      return Ok(UninstallOutcome::DryRun(plan));
    }

    host.facts.require_root()?;

    if !self.force {
      plan.print(out)?;
      if !confirm(&plan, input, out)? {
        writeln!(out, "Uninstall cancelled")?;
        info!("Uninstall cancelled; nothing was changed");
        return Ok(UninstallOutcome::Cancelled);
      }
    }

    let backup = backup::create(&plan.backup_dir, &host.layout.backup_candidates(role))?;

    self.remove_service(host, &plan);

    if self.clean_data {
      let failed = cleanup::destructive_cleanup(host.cleaner, &plan.remove_dirs, &plan.remove_files);
      if !failed.is_empty() {
        warn!("{} path(s) could not be removed: {failed:?}", failed.len());
      }
    }

    info!("Uninstalled {}; backup at {:?}", role.service_name(), backup.dir);

    Ok(UninstallOutcome::Completed(backup))
  }

  /// Stop, disable and unregister the role's service; every step is best effort
  fn remove_service(&self, host: &Host<'_>, plan: &UninstallPlan) {
    let unit = &plan.unit;

    if host.services.is_active(unit) {
      match host.services.stop(unit) {
        Ok(()) => info!("Stopped {unit}"),
        Err(e) => warn!("Unable to stop {unit}: {e}"),
      }
    }

    if host.services.is_enabled(unit) {
      match host.services.disable(unit) {
        Ok(()) => info!("Disabled {unit}"),
        Err(e) => warn!("Unable to disable {unit}: {e}"),
      }
    }

    if plan.script_present {
      let script = plan.script.to_string_lossy();
      match utils::cmd_exec(&script, vec![]) {
        Ok(out) if out.success() => info!("Ran {script}"),
        Ok(out) => warn!("{script} exited with status {}: {}", out.status, out.stderr.trim()),
        Err(e) => warn!("{e}"),
      }
      return;
    }

    warn!("{:?} not found; removing the unit file directly", plan.script);
    let unit_file = host.layout.unit_file(plan.role);
    if unit_file.exists() {
      if let Err(e) = host.cleaner.remove_file(&unit_file) {
        warn!("Unable to remove {unit_file:?}: {e}");
      }
    }
    if let Err(e) = host.services.daemon_reload() {
      warn!("Unable to reload systemd: {e}");
    }
  }
}
