//! Projection stage of the DP21 Antarctic ice-sheet workflow.
//!
//! Turns an ensemble pool into resampled global sea-level trajectories,
//! either for a fixed scenario ([`sampler::project_icesheet`]) or with the
//! scenario chosen per sample from an external temperature ensemble
//! ([`sampler::project_icesheet_temperature_driven`]).

pub mod preprocess;
pub mod sampler;
pub mod selector;
pub mod temperature;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generator threaded through every random draw of a projection.
pub type ProjectionRng = ChaCha8Rng;

/// Seed the projection generator. Draw order from the returned handle is
/// part of the output contract: selector variates first (temperature-driven
/// runs only), then ensemble member indices.
pub fn seeded_rng(seed: u64) -> ProjectionRng {
    ChaCha8Rng::seed_from_u64(seed)
}
