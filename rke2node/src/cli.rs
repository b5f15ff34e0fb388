use std::process;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;

use crate::commands;

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Blue))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Blue))),
    )
    .placeholder(
      anstyle::Style::new()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(propagate_version = true)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  #[clap(flatten)]
  pub verbose: Verbosity,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Install RKE2 as a server or agent and start its service
  Install(commands::install::Install),

  /// Back up node state, then stop and remove RKE2
  Uninstall(commands::uninstall::Uninstall),

  /// Show the state of the installed RKE2 service
  Status(commands::status::Status),

  /// Print host details relevant to RKE2 as JSON
  Info(commands::info::Info),
}

/// Standalone entry point equivalent to `rke2node uninstall`
#[derive(Debug, Parser)]
#[command(name = "rke2node-uninstall", author, version)]
#[command(about = "Back up node state, then stop and remove RKE2")]
#[command(styles=get_styles())]
pub struct UninstallCli {
  #[command(flatten)]
  pub uninstall: commands::uninstall::Uninstall,

  #[clap(flatten)]
  pub verbose: Verbosity,
}

/// Parse the command line, exiting 1 on usage errors
///
/// Help and version output still exit 0
pub fn parse_args<T: Parser>() -> T {
  match T::try_parse() {
    Ok(args) => args,
    Err(e) if e.use_stderr() => {
      let _ = e.print();
      process::exit(1);
    }
    Err(e) => e.exit(),
  }
}
