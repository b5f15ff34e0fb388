use anyhow::Result;
use rke2node::{cli, UninstallCli};
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli: UninstallCli = cli::parse_args();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_writer(std::io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber)?;

  cli.uninstall.uninstall().await
}
