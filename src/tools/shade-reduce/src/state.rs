// state.rs
//! The accepted program plus its uniform bindings.

use std::path::Path;

use shade_frontend::TranslationUnit;

use crate::bindings::Bindings;
use crate::errors::ReduceError;

/// One accepted reduction state. The driver replaces it wholesale on every
/// accepted step and never edits it in place.
#[derive(Debug, Clone)]
pub struct ReductionState {
    pub tu: TranslationUnit,
    pub bindings: Bindings,
}

impl ReductionState {
    pub fn new(tu: TranslationUnit, bindings: Bindings) -> Self {
        Self { tu, bindings }
    }

    /// Read a shader and its sidecar. A missing sidecar means no bindings.
    pub fn load(shader: &Path, bindings: &Path) -> Result<Self, ReduceError> {
        let tu = parse_file(shader)?;
        let bindings = Bindings::load(bindings)?;
        Ok(Self::new(tu, bindings))
    }

    /// Printed shader source.
    pub fn source(&self) -> String {
        shade_frontend::print(&self.tu)
    }
}

pub fn parse_file(path: &Path) -> Result<TranslationUnit, ReduceError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReduceError::io(path, e))?;
    shade_frontend::parse(&text).map_err(|e| ReduceError::Parse {
        path: path.to_path_buf(),
        source_text: text,
        error: e.error,
    })
}
