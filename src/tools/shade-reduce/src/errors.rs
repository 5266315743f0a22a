// errors.rs
//! Error type for reduction runs.

#![allow(unused_assignments)] // False positives from thiserror derive

use std::path::PathBuf;

use miette::Diagnostic;
use shade_frontend::ParserError;
use thiserror::Error;

use crate::judge::JudgeError;

#[derive(Error, Debug, Diagnostic)]
pub enum ReduceError {
    #[error("failed to access '{}'", path.display())]
    #[diagnostic(code(R0001))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Carries the source text so the caller can render the parser's label
    /// against it.
    #[error("failed to parse '{}': {error}", path.display())]
    #[diagnostic(code(R0002))]
    Parse {
        path: PathBuf,
        source_text: String,
        #[source]
        error: ParserError,
    },

    #[error("candidate for step {step} does not survive printing and re-parsing: {reason}")]
    #[diagnostic(
        code(R0003),
        help("an opportunity produced an ill-formed program; rerun with --disable to isolate it")
    )]
    InvalidCandidate { step: u32, reason: String },

    #[error("no reduction in progress: '{}' not found", path.display())]
    #[diagnostic(
        code(R0004),
        help("--continue-previous-reduction needs the marker left by a run that hit --max-steps")
    )]
    ResumeMarkerMissing { path: PathBuf },

    #[error("judge failed: {0}")]
    #[diagnostic(code(R0005))]
    Judge(#[from] JudgeError),

    #[error("every opportunity kind is disabled")]
    #[diagnostic(code(R0006))]
    NoOpportunityKinds,

    #[error("invalid JSON in '{}'", path.display())]
    #[diagnostic(code(R0007))]
    Bindings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt reduction marker '{}'", path.display())]
    #[diagnostic(
        code(R0008),
        help("delete the marker and start a fresh reduction")
    )]
    Marker {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReduceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReduceError::Io {
            path: path.into(),
            source,
        }
    }
}
