//! Entry point wiring CLI dispatch to pipeline modules.

use anyhow::Result;
use reddream_extract::{cli::Cli, config::Settings, logging};
use tracing::{info, instrument};

#[instrument]
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_directive())?;
    let settings = Settings::load()?;

    info!(?cli, "starting command");
    cli.dispatch(settings)
}
