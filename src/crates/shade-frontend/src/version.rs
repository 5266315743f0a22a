// src/version.rs
//! Shading language dialects selected by `#version`.

use std::fmt;

/// A `#version N [es]` dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadingLanguageVersion {
    pub number: u32,
    pub es: bool,
}

impl Default for ShadingLanguageVersion {
    /// Desktop 110 is what a shader without `#version` is compiled as.
    fn default() -> Self {
        Self::new(110, false)
    }
}

impl ShadingLanguageVersion {
    pub const ESSL_100: Self = Self::new(100, true);
    pub const ESSL_300: Self = Self::new(300, true);
    pub const ESSL_310: Self = Self::new(310, true);
    pub const GLSL_440: Self = Self::new(440, false);

    pub const fn new(number: u32, es: bool) -> Self {
        Self { number, es }
    }

    /// Parse the text of a `#version` directive, e.g. `#version 310 es`.
    ///
    /// Returns `None` if the text is not a version directive.
    pub fn from_directive(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('#')?.trim_start();
        let rest = rest.strip_prefix("version")?;
        let mut words = rest.split_whitespace();
        let number = words.next()?.parse().ok()?;
        let es = match words.next() {
            None | Some("core") | Some("compatibility") => false,
            Some("es") => true,
            Some(_) => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Some(Self::new(number, es))
    }

    /// Whether `uint`, `uvecN` and `u`-suffixed literals exist in this dialect.
    pub fn supports_unsigned(&self) -> bool {
        if self.es {
            self.number >= 300
        } else {
            self.number >= 130
        }
    }
}

impl fmt::Display for ShadingLanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.es {
            write!(f, "#version {} es", self.number)
        } else {
            write!(f, "#version {}", self.number)
        }
    }
}
