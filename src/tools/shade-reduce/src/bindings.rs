// bindings.rs
//! Uniform bindings: the JSON sidecar that travels with a shader.
//!
//! The file maps uniform names to the GL call that sets them and its
//! arguments:
//!
//! ```json
//! { "injectionSwitch": { "func": "glUniform2f", "args": [0.0, 1.0] } }
//! ```
//!
//! A missing `args` means the uniform is unset. Before reduction starts every
//! unset uniform gets a synthesized value so each snapshot is renderable on
//! its own.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shade_frontend::{DeclKind, Declarator, Qualifier, TranslationUnit};

use crate::errors::ReduceError;
use crate::random::RandomSource;
use crate::scope::INJECTION_SWITCH;
use crate::typer::{BasicType, Type};

/// Exclusive upper bound for synthesized integer values.
const INT_RANGE: i64 = 1 << 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<f64>>,
}

/// Uniform name to binding, kept in name order so the written JSON is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    entries: BTreeMap<String, Binding>,
}

impl Bindings {
    /// Read a sidecar file. A missing file is an empty set of bindings.
    pub fn load(path: &Path) -> Result<Self, ReduceError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ReduceError::io(path, e)),
        };
        serde_json::from_str(&text).map_err(|source| ReduceError::Bindings {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, binding: Binding) {
        self.entries.insert(name.into(), binding);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Give every unset uniform declared in `tu` a value and a setter name.
    ///
    /// Values come from `rng` by declared type: floats in `[0, 1)`, integers
    /// in `[0, 2^15)`, booleans as 0 or 1, one draw per component.
    /// `injectionSwitch` is always `(0.0, 1.0)`. Uniforms of other types
    /// (samplers, structs) are left alone.
    pub fn synthesize_defaults(&mut self, tu: &TranslationUnit, rng: &mut RandomSource) {
        for (ty, declarator) in uniforms(tu) {
            let Some(ty) = Type::from_name(&ty) else {
                continue;
            };
            let Some(func) = setter_name(&ty, declarator.array_size.is_some()) else {
                continue;
            };
            let entry = self.entries.entry(declarator.name.clone()).or_default();
            if entry.func.is_none() {
                entry.func = Some(func);
            }
            if entry.args.is_some() {
                continue;
            }
            let args = if declarator.name == INJECTION_SWITCH {
                vec![0.0, 1.0]
            } else {
                let copies = declarator.array_size.unwrap_or(1);
                (0..copies).flat_map(|_| synthesize(&ty, rng)).collect()
            };
            tracing::debug!(uniform = %declarator.name, ?args, "synthesized binding");
            entry.args = Some(args);
        }
    }
}

fn uniforms(tu: &TranslationUnit) -> impl Iterator<Item = (String, &Declarator)> {
    tu.decls.iter().flat_map(move |&id| match tu.decl(id) {
        DeclKind::Variables(vars) if vars.ty.has_qualifier(&Qualifier::Uniform) => vars
            .declarators
            .iter()
            .map(|d| (vars.ty.name.clone(), d))
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    })
}

fn component_count(ty: &Type) -> Option<u8> {
    match ty {
        Type::Scalar(_) => Some(1),
        Type::Vector(_, n) => Some(*n),
        Type::Matrix { cols, rows } => Some(cols * rows),
        _ => None,
    }
}

fn synthesize(ty: &Type, rng: &mut RandomSource) -> Vec<f64> {
    let (Some(basic), Some(count)) = (ty.basic(), component_count(ty)) else {
        return Vec::new();
    };
    (0..count)
        .map(|_| match basic {
            BasicType::Float => rng.unit_f64(),
            BasicType::Int | BasicType::Uint => rng.int_below(INT_RANGE) as f64,
            BasicType::Bool => rng.int_below(2) as f64,
        })
        .collect()
}

/// `glUniform2f`, `glUniform3iv`, `glUniformMatrix2x3fv`, ...
fn setter_name(ty: &Type, array: bool) -> Option<String> {
    let suffix = if array { "v" } else { "" };
    match ty {
        Type::Scalar(basic) | Type::Vector(basic, _) => {
            let n = component_count(ty)?;
            let letter = match basic {
                BasicType::Float => "f",
                BasicType::Int | BasicType::Bool => "i",
                BasicType::Uint => "ui",
            };
            Some(format!("glUniform{n}{letter}{suffix}"))
        }
        Type::Matrix { cols, rows } if cols == rows => Some(format!("glUniformMatrix{cols}fv")),
        Type::Matrix { cols, rows } => Some(format!("glUniformMatrix{cols}x{rows}fv")),
        _ => None,
    }
}
