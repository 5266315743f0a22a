// context.rs
//! Per-run reduction context.

use shade_frontend::ShadingLanguageVersion;

use crate::random::{IdGenerator, RandomSource};

/// Everything finders and the driver share for one run: the dialect, the
/// scope policy, the run's random stream and the fresh-name allocator.
#[derive(Debug, Clone)]
pub struct ReductionContext {
    pub version: ShadingLanguageVersion,
    pub reduce_everywhere: bool,
    pub rng: RandomSource,
    pub ids: IdGenerator,
}

impl ReductionContext {
    pub fn new(version: ShadingLanguageVersion, reduce_everywhere: bool, seed: u64) -> Self {
        Self {
            version,
            reduce_everywhere,
            rng: RandomSource::new(seed),
            ids: IdGenerator::new(),
        }
    }
}
