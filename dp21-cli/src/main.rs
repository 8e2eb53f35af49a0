//! DP21 CLI - Antarctic ice-sheet sea-level projections and localization.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "dp21",
    version,
    about = "DP21 Antarctic ice-sheet sea-level projection workflow"
)]
struct Cli {
    #[command(subcommand)]
    command: dp21_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("dp21 {}", env!("CARGO_PKG_VERSION"));
    dp21_cmd::run(cli.command)
}
