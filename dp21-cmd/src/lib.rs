//! Command implementations for the DP21 CLI.
//!
//! Provides subcommands for the full projection and localization workflow,
//! the projection stage alone, and a temperature covariate diagnostic.

use clap::Subcommand;

pub mod config;
pub mod covariate;
pub mod workflow;

use config::{CovariateConfig, LocalizeConfig, RunConfig};

#[derive(Subcommand)]
pub enum Command {
    /// Preprocess, project, localize and write every configured output
    Run {
        #[command(flatten)]
        run: RunConfig,

        #[command(flatten)]
        localize: LocalizeConfig,
    },

    /// Preprocess and project only, writing the global datasets
    Project {
        #[command(flatten)]
        run: RunConfig,
    },

    /// Print each temperature member's integrated temperature and the pool
    /// it would be assigned to
    Covariate {
        #[command(flatten)]
        covariate: CovariateConfig,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run { run, localize } => workflow::run_workflow(&run, &localize),
        Command::Project { run } => workflow::run_project(&run).map(|_| ()),
        Command::Covariate { covariate } => covariate::run_covariate(&covariate),
    }
}
