//! Command-line configuration. Every flag can also be supplied through the
//! matching `DP21_*` environment variable.

use clap::{ArgAction, Args};
use dp21_core::error::{Dp21Error, Result};
use dp21_core::{IceSheet, Scenario};
use dp21_localize::LocalizeOptions;
use dp21_project::preprocess::{ComponentInputs, PoolInputs};
use dp21_project::sampler::ProjectionWindow;
use dp21_utils::years::target_years;
use std::path::{Path, PathBuf};

/// Inputs and parameters of the preprocessing and projection stages.
#[derive(Args, Debug, Clone)]
pub struct RunConfig {
    /// Emission scenario, or the temperature key when a climate file is given
    #[arg(long, env = "DP21_SCENARIO", default_value = "rcp85")]
    pub scenario: String,

    /// Year every trajectory is rebased to
    #[arg(long, env = "DP21_BASEYEAR", default_value_t = 2000)]
    pub baseyear: i32,

    /// Surface temperature file; switches to the temperature-driven projection
    #[arg(long, env = "DP21_CLIMATE_DATA_FILE")]
    pub climate_data_file: Option<PathBuf>,

    #[arg(long, env = "DP21_INPUT_EAIS_RCP26_FILE")]
    pub input_eais_rcp26_file: PathBuf,
    #[arg(long, env = "DP21_INPUT_EAIS_RCP45_FILE")]
    pub input_eais_rcp45_file: PathBuf,
    #[arg(long, env = "DP21_INPUT_EAIS_RCP85_FILE")]
    pub input_eais_rcp85_file: PathBuf,
    #[arg(long, env = "DP21_INPUT_WAIS_RCP26_FILE")]
    pub input_wais_rcp26_file: PathBuf,
    #[arg(long, env = "DP21_INPUT_WAIS_RCP45_FILE")]
    pub input_wais_rcp45_file: PathBuf,
    #[arg(long, env = "DP21_INPUT_WAIS_RCP85_FILE")]
    pub input_wais_rcp85_file: PathBuf,

    /// Number of samples to draw (fixed-scenario runs; temperature-driven
    /// runs draw one sample per temperature member)
    #[arg(long, env = "DP21_NSAMPS")]
    pub nsamps: usize,

    #[arg(long, env = "DP21_PYEAR_START", default_value_t = 2020)]
    pub pyear_start: i32,
    #[arg(long, env = "DP21_PYEAR_END", default_value_t = 2100)]
    pub pyear_end: i32,
    #[arg(long, env = "DP21_PYEAR_STEP", default_value_t = 10)]
    pub pyear_step: i32,

    /// Sample ensemble members with replacement
    #[arg(long, env = "DP21_REPLACE", default_value_t = true, action = ArgAction::Set)]
    pub replace: bool,

    /// Seed for the projection random number generator
    #[arg(long = "rngseed", env = "DP21_RNGSEED", default_value_t = 1342)]
    pub seed: u64,

    /// Fail when a requested year is missing from the ensemble instead of
    /// dropping it
    #[arg(long, env = "DP21_STRICT_YEARS")]
    pub strict_years: bool,

    /// Identifier of this run, used to tag log output
    #[arg(long, env = "DP21_PIPELINE_ID")]
    pub pipeline_id: Option<String>,

    #[command(flatten)]
    pub global_outputs: GlobalOutputs,
}

/// Optional destinations for the global datasets.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOutputs {
    #[arg(long, env = "DP21_OUTPUT_EAIS_GSLR_FILE")]
    pub output_eais_gslr_file: Option<PathBuf>,
    #[arg(long, env = "DP21_OUTPUT_WAIS_GSLR_FILE")]
    pub output_wais_gslr_file: Option<PathBuf>,
    #[arg(long, env = "DP21_OUTPUT_AIS_GSLR_FILE")]
    pub output_ais_gslr_file: Option<PathBuf>,
}

impl GlobalOutputs {
    pub fn path(&self, sheet: IceSheet) -> Option<&Path> {
        match sheet {
            IceSheet::Eais => self.output_eais_gslr_file.as_deref(),
            IceSheet::Wais => self.output_wais_gslr_file.as_deref(),
            IceSheet::Ais => self.output_ais_gslr_file.as_deref(),
        }
    }
}

impl RunConfig {
    pub fn temperature_driven(&self) -> bool {
        self.climate_data_file.is_some()
    }

    pub fn pool_inputs(&self) -> PoolInputs {
        PoolInputs {
            rcp26: ComponentInputs {
                eais: self.input_eais_rcp26_file.clone(),
                wais: self.input_wais_rcp26_file.clone(),
            },
            rcp45: ComponentInputs {
                eais: self.input_eais_rcp45_file.clone(),
                wais: self.input_wais_rcp45_file.clone(),
            },
            rcp85: ComponentInputs {
                eais: self.input_eais_rcp85_file.clone(),
                wais: self.input_wais_rcp85_file.clone(),
            },
        }
    }

    pub fn window(&self) -> ProjectionWindow {
        ProjectionWindow {
            start: self.pyear_start,
            end: self.pyear_end,
            step: self.pyear_step,
            strict: self.strict_years,
        }
    }

    /// Prefix for log lines, `[<pipeline id>] ` or empty.
    pub fn tag(&self) -> String {
        self.pipeline_id
            .as_ref()
            .map(|id| format!("[{}] ", id))
            .unwrap_or_default()
    }

    /// Reject parameter combinations that cannot produce a projection,
    /// before any file is opened.
    pub fn validate(&self) -> Result<()> {
        target_years(self.pyear_start, self.pyear_end, self.pyear_step)?;
        if !self.temperature_driven() {
            self.scenario.parse::<Scenario>()?;
        } else if self.scenario.trim().is_empty() {
            return Err(Dp21Error::Configuration(
                "a temperature scenario key is required with a climate data file".to_string(),
            ));
        }
        Ok(())
    }
}

/// Inputs and outputs of the localization stage.
#[derive(Args, Debug, Clone)]
pub struct LocalizeConfig {
    /// Tab-separated name, id, lat, lon of every site
    #[arg(long = "locationfile", env = "DP21_LOCATIONFILE")]
    pub location_file: PathBuf,

    /// Number of locations processed per work item
    #[arg(long = "chunksize", env = "DP21_CHUNKSIZE", default_value_t = 50)]
    pub chunk_size: usize,

    /// Directory holding fprint_eais.json and fprint_wais.json
    #[arg(long, env = "DP21_FINGERPRINT_DIR")]
    pub fingerprint_dir: PathBuf,

    /// Process location chunks one after another on the calling thread
    #[arg(long, env = "DP21_SEQUENTIAL")]
    pub sequential: bool,

    #[command(flatten)]
    pub local_outputs: LocalOutputs,
}

/// Optional destinations for the localized datasets.
#[derive(Args, Debug, Clone, Default)]
pub struct LocalOutputs {
    #[arg(long, env = "DP21_OUTPUT_EAIS_LSLR_FILE")]
    pub output_eais_lslr_file: Option<PathBuf>,
    #[arg(long, env = "DP21_OUTPUT_WAIS_LSLR_FILE")]
    pub output_wais_lslr_file: Option<PathBuf>,
    #[arg(long, env = "DP21_OUTPUT_AIS_LSLR_FILE")]
    pub output_ais_lslr_file: Option<PathBuf>,
}

impl LocalOutputs {
    pub fn path(&self, sheet: IceSheet) -> Option<&Path> {
        match sheet {
            IceSheet::Eais => self.output_eais_lslr_file.as_deref(),
            IceSheet::Wais => self.output_wais_lslr_file.as_deref(),
            IceSheet::Ais => self.output_ais_lslr_file.as_deref(),
        }
    }
}

impl LocalizeConfig {
    pub fn options(&self) -> LocalizeOptions {
        LocalizeOptions {
            chunk_size: self.chunk_size,
            parallel: !self.sequential,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Dp21Error::Configuration(
                "chunksize must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the covariate diagnostic.
#[derive(Args, Debug, Clone)]
pub struct CovariateConfig {
    /// Surface temperature file
    #[arg(long, env = "DP21_CLIMATE_DATA_FILE")]
    pub climate_data_file: PathBuf,

    /// Temperature scenario key inside the file
    #[arg(long, env = "DP21_SCENARIO")]
    pub scenario: String,

    #[arg(long = "rngseed", env = "DP21_RNGSEED", default_value_t = 1342)]
    pub seed: u64,

    /// Write the per-member table here instead of stdout
    #[arg(short = 'o', long)]
    pub output_csv: Option<PathBuf>,
}
