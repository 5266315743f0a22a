// ledger.rs
//! The run ledger in the output directory.
//!
//! Layout:
//!   <dir>/<prefix>_<step>.<ext>   - accepted shader for each step
//!   <dir>/<prefix>_<step>.json    - its bindings
//!   <dir>/<prefix>_final.<ext>    - result of an exhausted run
//!   <dir>/<prefix>_final.json
//!   <dir>/REDUCTION_INCOMPLETE    - `{ "step": K, "seed": S }` while a run
//!                                   can still be resumed
//!
//! Snapshots are append-only; the marker is the only file rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ReduceError;
use crate::state::ReductionState;

pub const MARKER_FILE: &str = "REDUCTION_INCOMPLETE";

/// Where an unfinished run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub step: u32,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
    prefix: String,
    ext: String,
}

impl Ledger {
    /// Open the ledger, creating `dir` if needed.
    pub fn create(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        ext: impl Into<String>,
    ) -> Result<Self, ReduceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| ReduceError::io(&dir, e))?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            ext: ext.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn shader_path(&self, step: u32) -> PathBuf {
        self.named(&step.to_string(), &self.ext)
    }

    pub fn bindings_path(&self, step: u32) -> PathBuf {
        self.named(&step.to_string(), "json")
    }

    pub fn final_shader_path(&self) -> PathBuf {
        self.named("final", &self.ext)
    }

    pub fn final_bindings_path(&self) -> PathBuf {
        self.named("final", "json")
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(MARKER_FILE)
    }

    fn named(&self, tag: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}_{tag}.{ext}", self.prefix))
    }

    // -- snapshots ------------------------------------------------------------

    pub fn write_snapshot(&self, step: u32, state: &ReductionState) -> Result<(), ReduceError> {
        write_state(&self.shader_path(step), &self.bindings_path(step), state)
    }

    pub fn write_final(&self, state: &ReductionState) -> Result<(), ReduceError> {
        write_state(&self.final_shader_path(), &self.final_bindings_path(), state)
    }

    pub fn load_snapshot(&self, step: u32) -> Result<ReductionState, ReduceError> {
        ReductionState::load(&self.shader_path(step), &self.bindings_path(step))
    }

    // -- marker ---------------------------------------------------------------

    /// Replace the marker atomically: write a temporary file, then rename it
    /// over the old one.
    pub fn write_marker(&self, marker: Marker) -> Result<(), ReduceError> {
        let path = self.marker_path();
        let json = serde_json::to_string(&marker).map_err(|source| ReduceError::Marker {
            path: path.clone(),
            source,
        })?;
        let tmp = self.dir.join(format!(".{MARKER_FILE}.tmp"));
        fs::write(&tmp, json).map_err(|e| ReduceError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| ReduceError::io(&path, e))
    }

    pub fn read_marker(&self) -> Result<Marker, ReduceError> {
        let path = self.marker_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReduceError::ResumeMarkerMissing { path });
            }
            Err(e) => return Err(ReduceError::io(&path, e)),
        };
        serde_json::from_str(&text).map_err(|source| ReduceError::Marker { path, source })
    }

    /// Delete the marker. Already gone is fine.
    pub fn remove_marker(&self) -> Result<(), ReduceError> {
        let path = self.marker_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReduceError::io(&path, e)),
        }
    }
}

fn write_state(shader: &Path, bindings: &Path, state: &ReductionState) -> Result<(), ReduceError> {
    fs::write(shader, state.source()).map_err(|e| ReduceError::io(shader, e))?;
    let json = state.bindings.to_json().map_err(|source| ReduceError::Bindings {
        path: bindings.to_path_buf(),
        source,
    })?;
    fs::write(bindings, json).map_err(|e| ReduceError::io(bindings, e))
}
