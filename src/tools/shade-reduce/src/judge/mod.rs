// judge/mod.rs
//! Judges decide whether a candidate still shows the property being kept.
//!
//! The driver calls [`Judge::accepts`] once per candidate and treats it as a
//! blocking, possibly slow, possibly failing oracle. A judge must answer the
//! same way for the same program and bindings; a fixed-seed run is only
//! reproducible when it does.

mod command;
mod feature;
mod image;
mod random;

use std::path::PathBuf;

use thiserror::Error;

use crate::state::ReductionState;

pub use command::{CommandJudge, CommandOutcome};
pub use feature::{FeatureCheck, FeatureJudge};
pub use image::{Image, ImageJudge, Tolerance, ToleranceKind};
pub use random::RandomJudge;

/// A judge could not reach a verdict.
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("failed to access '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("render command failed: {0}")]
    Render(String),

    #[error("invalid image '{}': {reason}", path.display())]
    Image { path: PathBuf, reason: String },

    #[error("{0}")]
    Other(String),
}

impl JudgeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JudgeError::Io {
            path: path.into(),
            source,
        }
    }
}

pub trait Judge {
    /// `Ok(true)` when the candidate is still interesting.
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError>;
}

impl<F> Judge for F
where
    F: FnMut(&ReductionState) -> Result<bool, JudgeError>,
{
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError> {
        self(state)
    }
}

/// Interesting only if every inner judge agrees. Stops at the first
/// rejection or error.
pub struct AllOf(pub Vec<Box<dyn Judge>>);

impl Judge for AllOf {
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError> {
        for judge in &mut self.0 {
            if !judge.accepts(state)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Bindings;

    fn state() -> ReductionState {
        ReductionState::new(
            shade_frontend::parse("void main() {}").unwrap(),
            Bindings::default(),
        )
    }

    fn constant(answer: bool, calls: std::rc::Rc<std::cell::Cell<u32>>) -> Box<dyn Judge> {
        Box::new(move |_: &ReductionState| -> Result<bool, JudgeError> {
            calls.set(calls.get() + 1);
            Ok(answer)
        })
    }

    #[test]
    fn closures_are_judges() {
        let mut seen = 0;
        let mut judge = |_: &ReductionState| -> Result<bool, JudgeError> {
            seen += 1;
            Ok(true)
        };
        assert!(judge.accepts(&state()).unwrap());
        assert_eq!(seen, 1);
    }

    #[test]
    fn all_of_short_circuits() {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut judge = AllOf(vec![
            constant(true, calls.clone()),
            constant(false, calls.clone()),
            constant(true, calls.clone()),
        ]);
        assert!(!judge.accepts(&state()).unwrap());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn errors_name_what_failed() {
        let err = JudgeError::io(
            "/tmp/candidate.frag",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "failed to access '/tmp/candidate.frag'");
        assert_eq!(std::error::Error::source(&err).unwrap().to_string(), "gone");

        let err = JudgeError::Image {
            path: "ref.png".into(),
            reason: "truncated".to_string(),
        };
        assert_eq!(err.to_string(), "invalid image 'ref.png': truncated");
    }

    #[test]
    fn all_of_propagates_errors() {
        let failing: Box<dyn Judge> = Box::new(|_: &ReductionState| -> Result<bool, JudgeError> {
            Err(JudgeError::Other("renderer crashed".to_string()))
        });
        let mut judge = AllOf(vec![failing]);
        assert!(judge.accepts(&state()).is_err());
    }
}
