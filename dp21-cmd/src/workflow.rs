//! Preprocess, project, localize and write: the DP21 ice-sheet workflow.

use crate::config::{GlobalOutputs, LocalizeConfig, RunConfig};
use anyhow::Context;
use dp21_core::{IceSheet, ProjectionResult, SiteSet};
use dp21_dataset::SeaLevelDataset;
use dp21_localize::{FingerprintCache, GridFileLookup, LocalRows, SiteFingerprints};
use dp21_project::preprocess::preprocess_pools;
use dp21_project::sampler::{project_icesheet, project_icesheet_temperature_driven};
use dp21_project::selector::scenario_counts;
use dp21_project::seeded_rng;
use dp21_project::temperature::TemperatureFile;
use log::{debug, info};

/// Build the pool and draw the global projection.
pub fn run_projection(config: &RunConfig) -> anyhow::Result<ProjectionResult> {
    config.validate()?;
    let tag = config.tag();
    let pool = preprocess_pools(
        &config.pool_inputs(),
        &config.scenario,
        config.baseyear,
        config.temperature_driven(),
    )
    .context("Failed to build the ensemble pool")?;

    let mut rng = seeded_rng(config.seed);
    let window = config.window();
    let projection = match &config.climate_data_file {
        Some(climate_file) => {
            let source = TemperatureFile::open(climate_file).with_context(|| {
                format!("Failed to read climate data {}", climate_file.display())
            })?;
            let (projection, assignment) =
                project_icesheet_temperature_driven(&pool, &source, &window, config.replace, &mut rng)?;
            let counts = scenario_counts(&assignment);
            info!(
                "{}Temperature-driven projection for {}: {} samples (rcp26={} rcp45={} rcp85={})",
                tag,
                config.scenario,
                projection.nsamps(),
                counts[0],
                counts[1],
                counts[2]
            );
            projection
        }
        None => {
            let projection =
                project_icesheet(&pool, &window, config.nsamps, config.replace, &mut rng)?;
            info!(
                "{}Projection for {}: {} samples x {} years",
                tag,
                config.scenario,
                projection.nsamps(),
                projection.targyears.len()
            );
            projection
        }
    };
    Ok(projection)
}

/// Write each global component that has an output path.
pub fn write_global(projection: &ProjectionResult, outputs: &GlobalOutputs) -> anyhow::Result<()> {
    for sheet in IceSheet::ALL {
        if let Some(path) = outputs.path(sheet) {
            SeaLevelDataset::global(
                sheet,
                projection.component(sheet),
                &projection.targyears,
                &projection.scenario,
                projection.baseyear,
            )?
            .write(path)
            .with_context(|| format!("Failed to write global {} to {}", sheet, path.display()))?;
        }
    }
    Ok(())
}

/// Sites and their fingerprints for a localization run.
#[derive(Debug, Clone)]
pub struct LocalizationInputs {
    pub sites: SiteSet,
    pub fingerprints: SiteFingerprints,
}

/// Read the site list and resolve both component fingerprints for it.
pub fn load_localization(config: &LocalizeConfig) -> anyhow::Result<LocalizationInputs> {
    config.validate()?;
    let sites = SiteSet::read_location_file(&config.location_file).with_context(|| {
        format!("Failed to read location file {}", config.location_file.display())
    })?;
    info!("Loaded {} sites from {}", sites.len(), config.location_file.display());
    let lookup = FingerprintCache::new(GridFileLookup);
    let fingerprints = SiteFingerprints::resolve(&sites, &config.fingerprint_dir, &lookup)
        .with_context(|| {
            format!(
                "Failed to localize with fingerprints from {}",
                config.fingerprint_dir.display()
            )
        })?;
    debug!("{} fingerprint grids loaded", lookup.cached_entries());
    Ok(LocalizationInputs {
        sites,
        fingerprints,
    })
}

/// Localize each component that has an output path, streaming rows
/// straight into its dataset so no `(sample, year, location)` field is
/// held in memory.
pub fn write_local(
    projection: &ProjectionResult,
    inputs: &LocalizationInputs,
    config: &LocalizeConfig,
) -> anyhow::Result<()> {
    let options = config.options();
    let rows = LocalRows::new(projection, &inputs.fingerprints, &options)?;
    if rows.nlocations() != inputs.sites.len() {
        anyhow::bail!(
            "{} fingerprint values for {} sites",
            rows.nlocations(),
            inputs.sites.len()
        );
    }
    for sheet in IceSheet::ALL {
        if let Some(path) = config.local_outputs.path(sheet) {
            SeaLevelDataset::write_local_rows(
                path,
                &inputs.sites,
                &projection.targyears,
                projection.nsamps(),
                &projection.scenario,
                projection.baseyear,
                |sample, year, row| rows.fill_row(sheet, sample, year, row),
            )
            .with_context(|| format!("Failed to write local {} to {}", sheet, path.display()))?;
        }
    }
    info!(
        "Localized {} samples x {} years to {} sites (chunk size {})",
        projection.nsamps(),
        projection.targyears.len(),
        inputs.sites.len(),
        options.chunk_size
    );
    Ok(())
}

/// Project and write the global datasets.
pub fn run_project(config: &RunConfig) -> anyhow::Result<ProjectionResult> {
    let projection = run_projection(config)?;
    write_global(&projection, &config.global_outputs)?;
    Ok(projection)
}

/// The full workflow. Outputs already written stay on disk if a later
/// stage fails.
pub fn run_workflow(config: &RunConfig, localize: &LocalizeConfig) -> anyhow::Result<()> {
    localize.validate()?;
    let projection = run_project(config)?;
    let inputs = load_localization(localize)?;
    write_local(&projection, &inputs, localize)?;
    info!(
        "{}Workflow complete: {} samples, {} years, {} sites",
        config.tag(),
        projection.nsamps(),
        projection.targyears.len(),
        inputs.sites.len()
    );
    Ok(())
}
