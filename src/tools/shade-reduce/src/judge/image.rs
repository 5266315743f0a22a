// judge/image.rs
//! Judge by rendering the candidate and comparing with a reference image.
//!
//! The render command gets `{file}`, `{json}` and `{image}` placeholders and
//! must write a binary PPM (`P6`) to `{image}`. A candidate is interesting
//! when it renders and the picture matches the reference under the chosen
//! [`Tolerance`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;

use super::command::{expand_placeholders, path_arg, run_command, write_candidate};
use super::{Judge, JudgeError};
use crate::state::ReductionState;

/// Channel values closer than this count as equal under fuzzy comparison.
const CHANNEL_DELTA: u8 = 4;

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// An 8-bit RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    /// Row-major RGB triples.
    pub pixels: Vec<u8>,
}

impl Image {
    pub fn load(path: &Path) -> Result<Self, JudgeError> {
        let bytes = std::fs::read(path).map_err(|e| JudgeError::io(path, e))?;
        Self::parse_ppm(&bytes).map_err(|reason| JudgeError::Image {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a binary PPM with a maximum value of at most 255.
    pub fn parse_ppm(bytes: &[u8]) -> Result<Self, String> {
        let mut header = PpmHeader { bytes, pos: 0 };
        if header.token()? != "P6" {
            return Err("not a binary PPM (expected P6)".to_string());
        }
        let width = header.number()?;
        let height = header.number()?;
        let max = header.number()?;
        if max == 0 || max > 255 {
            return Err(format!("unsupported maximum value {max}"));
        }
        // Exactly one whitespace byte separates the header from the raster.
        let start = header.pos + 1;
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or("image dimensions overflow")?;
        let pixels = bytes
            .get(start..start + len)
            .ok_or_else(|| format!("expected {len} bytes of pixel data"))?
            .to_vec();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Fraction of channel values that differ by more than [`CHANNEL_DELTA`].
    /// Images of different sizes differ completely.
    pub fn difference(&self, other: &Image) -> f64 {
        if self.width != other.width || self.height != other.height || self.pixels.is_empty() {
            return if self == other { 0.0 } else { 1.0 };
        }
        let differing = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .filter(|(a, b)| a.abs_diff(**b) > CHANNEL_DELTA)
            .count();
        differing as f64 / self.pixels.len() as f64
    }
}

struct PpmHeader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl PpmHeader<'_> {
    /// Next whitespace-separated header token, skipping `#` comments.
    fn token(&mut self) -> Result<String, String> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b'#') => {
                    while self.bytes.get(self.pos).is_some_and(|&b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(_) => break,
                None => return Err("truncated header".to_string()),
            }
        }
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        Ok(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    fn number(&mut self) -> Result<usize, String> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|_| format!("invalid header number '{token}'"))
    }
}

// ---------------------------------------------------------------------------
// Judge
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tolerance {
    /// Every channel within [`CHANNEL_DELTA`] of the reference.
    Identical,
    /// At most this fraction of channels further than [`CHANNEL_DELTA`] away.
    Fuzzy { threshold: f64 },
}

/// CLI spelling of [`Tolerance`]; the fuzzy threshold is a separate flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ToleranceKind {
    #[default]
    Identical,
    Fuzzy,
}

impl Tolerance {
    pub fn matches(self, rendered: &Image, reference: &Image) -> bool {
        let difference = rendered.difference(reference);
        match self {
            Tolerance::Identical => difference == 0.0,
            Tolerance::Fuzzy { threshold } => difference <= threshold,
        }
    }
}

pub struct ImageJudge {
    template: String,
    scratch_dir: PathBuf,
    ext: String,
    reference: Image,
    tolerance: Tolerance,
    timeout: Option<Duration>,
}

impl ImageJudge {
    pub fn new(
        template: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
        ext: impl Into<String>,
        reference: Image,
        tolerance: Tolerance,
    ) -> Self {
        Self {
            template: template.into(),
            scratch_dir: scratch_dir.into(),
            ext: ext.into(),
            reference,
            tolerance,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Judge for ImageJudge {
    /// A candidate that fails to compile or render is uninteresting; a
    /// renderer that crashes, hangs or writes garbage is a judge failure.
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError> {
        let (file, json) = write_candidate(&self.scratch_dir, &self.ext, state)?;
        let image = self.scratch_dir.join("candidate.ppm");
        match std::fs::remove_file(&image) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(JudgeError::io(&image, e)),
        }

        let command = expand_placeholders(
            &self.template,
            &[
                ("{file}", path_arg(&file)),
                ("{json}", path_arg(&json)),
                ("{image}", path_arg(&image)),
            ],
        );
        let outcome = run_command(&command, &self.scratch_dir, self.timeout)?;
        if outcome.timed_out {
            return Err(JudgeError::Render(format!(
                "timed out after {:.1}s",
                outcome.duration.as_secs_f64()
            )));
        }
        if let Some(signal) = outcome.signal {
            return Err(JudgeError::Render(format!("killed by signal {signal}")));
        }
        if !outcome.success() {
            tracing::debug!(exit_code = ?outcome.exit_code, "render failed");
            return Ok(false);
        }

        let rendered = Image::load(&image)?;
        let difference = rendered.difference(&self.reference);
        tracing::debug!(difference, "compared with reference");
        Ok(self.tolerance.matches(&rendered, &self.reference))
    }
}
