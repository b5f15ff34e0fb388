use anyhow::Result;
use rke2node::{cli, Cli, Commands};
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli: Cli = cli::parse_args();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_writer(std::io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber)?;

  match &cli.command {
    Commands::Install(install) => install.install().await,
    Commands::Uninstall(uninstall) => uninstall.uninstall().await,
    Commands::Status(status) => status.status().await,
    Commands::Info(info) => info.info().await,
  }
}
