// config.rs
//! Run configuration for the reduction driver.

use clap::ValueEnum;

use crate::opportunities::OpportunityKind;

/// How the driver picks the next opportunities to try.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Uniformly at random from the remaining list
    #[default]
    Random,
    /// Lowest visitation depth first
    Shallowest,
}

/// What a judge failure means for the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OnJudgeError {
    /// Treat the candidate as uninteresting and keep going
    #[default]
    Reject,
    /// Abort the run
    Fatal,
}

#[derive(Debug, Clone)]
pub struct ReducerConfig {
    pub reduce_everywhere: bool,
    pub seed: u64,
    /// `None` runs until no opportunity is left.
    pub max_steps: Option<u32>,
    pub strategy: Strategy,
    /// Opportunities tried together per candidate; halves on rejection.
    pub chunk_size: usize,
    pub enabled: Vec<OpportunityKind>,
    pub on_judge_error: OnJudgeError,
    /// File name prefix for snapshots, e.g. `shader_reduced`.
    pub prefix: String,
    /// Shader file extension without the dot.
    pub ext: String,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            reduce_everywhere: false,
            seed: 0,
            max_steps: None,
            strategy: Strategy::default(),
            chunk_size: 1,
            enabled: OpportunityKind::ALL.to_vec(),
            on_judge_error: OnJudgeError::default(),
            prefix: "shader_reduced".to_string(),
            ext: "frag".to_string(),
        }
    }
}

impl ReducerConfig {
    pub fn with_reduce_everywhere(mut self, everywhere: bool) -> Self {
        self.reduce_everywhere = everywhere;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<u32>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_disabled(mut self, disabled: &[OpportunityKind]) -> Self {
        self.enabled.retain(|kind| !disabled.contains(kind));
        self
    }

    pub fn with_on_judge_error(mut self, policy: OnJudgeError) -> Self {
        self.on_judge_error = policy;
        self
    }

    pub fn with_output_names(mut self, prefix: impl Into<String>, ext: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.ext = ext.into();
        self
    }
}
