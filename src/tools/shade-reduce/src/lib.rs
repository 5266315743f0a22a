// lib.rs
//! shade-reduce: randomized greedy test case reduction for GLSL-style shaders.
//!
//! A run starts from a shader and its uniform bindings, discovers
//! [`opportunities`] (small semantics-agnostic simplifications), applies them
//! to copies of the program and keeps each copy a [`judge::Judge`] still
//! finds interesting. Every accepted step is recorded in a [`ledger::Ledger`]
//! so an interrupted run can pick up where it stopped.

pub mod analysis;
pub mod bindings;
pub mod cli;
pub mod config;
pub mod context;
pub mod driver;
pub mod errors;
pub mod judge;
pub mod ledger;
pub mod opportunities;
pub mod random;
pub mod scope;
pub mod state;
pub mod typer;

pub use bindings::{Binding, Bindings};
pub use config::{OnJudgeError, ReducerConfig, Strategy};
pub use driver::{DriverState, ReductionOutcome, resume, run_fresh};
pub use errors::ReduceError;
pub use judge::{Judge, JudgeError};
pub use ledger::{Ledger, Marker};
pub use opportunities::{Opportunity, OpportunityKind, find_opportunities};
pub use state::ReductionState;
