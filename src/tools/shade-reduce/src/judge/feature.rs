// judge/feature.rs
//! Judge by features of the candidate itself, without running anything.

use regex::Regex;

use super::{Judge, JudgeError};
use crate::state::ReductionState;

pub enum FeatureCheck {
    /// The printed source matches.
    Contains(Regex),
    /// A function with this name is still defined or declared.
    DefinesFunction(String),
    Custom(Box<dyn Fn(&ReductionState) -> bool>),
}

impl FeatureCheck {
    pub fn custom(check: impl Fn(&ReductionState) -> bool + 'static) -> Self {
        FeatureCheck::Custom(Box::new(check))
    }

    fn holds(&self, state: &ReductionState, source: &mut Option<String>) -> bool {
        match self {
            FeatureCheck::Contains(pattern) => {
                pattern.is_match(source.get_or_insert_with(|| state.source()))
            }
            FeatureCheck::DefinesFunction(name) => {
                state.tu.functions().any(|(_, func)| &func.name == name)
            }
            FeatureCheck::Custom(check) => check(state),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combine {
    All,
    Any,
}

/// Conjunction or disjunction of [`FeatureCheck`]s.
pub struct FeatureJudge {
    checks: Vec<FeatureCheck>,
    combine: Combine,
}

impl FeatureJudge {
    /// Interesting when every check holds. No checks accepts everything.
    pub fn all(checks: Vec<FeatureCheck>) -> Self {
        Self {
            checks,
            combine: Combine::All,
        }
    }

    /// Interesting when some check holds. No checks rejects everything.
    pub fn any(checks: Vec<FeatureCheck>) -> Self {
        Self {
            checks,
            combine: Combine::Any,
        }
    }
}

impl Judge for FeatureJudge {
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError> {
        let mut source = None;
        let mut results = self.checks.iter().map(|check| check.holds(state, &mut source));
        Ok(match self.combine {
            Combine::All => results.all(|held| held),
            Combine::Any => results.any(|held| held),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Bindings;

    fn state(source: &str) -> ReductionState {
        ReductionState::new(shade_frontend::parse(source).unwrap(), Bindings::default())
    }

    fn contains(pattern: &str) -> FeatureCheck {
        FeatureCheck::Contains(Regex::new(pattern).unwrap())
    }

    #[test]
    fn all_needs_every_check() {
        let candidate = state("float f() { return 1.0; }\nvoid main() { gl_FragColor = vec4(f()); }");
        let mut both = FeatureJudge::all(vec![
            contains(r"gl_FragColor"),
            FeatureCheck::DefinesFunction("f".to_string()),
        ]);
        assert!(both.accepts(&candidate).unwrap());

        let mut missing = FeatureJudge::all(vec![
            contains(r"gl_FragColor"),
            FeatureCheck::DefinesFunction("g".to_string()),
        ]);
        assert!(!missing.accepts(&candidate).unwrap());
    }

    #[test]
    fn any_needs_one_check() {
        let candidate = state("void main() { discard; }");
        let mut judge = FeatureJudge::any(vec![
            contains(r"\bdiscard\b"),
            FeatureCheck::DefinesFunction("helper".to_string()),
        ]);
        assert!(judge.accepts(&candidate).unwrap());
        assert!(!FeatureJudge::any(Vec::new()).accepts(&candidate).unwrap());
        assert!(FeatureJudge::all(Vec::new()).accepts(&candidate).unwrap());
    }

    #[test]
    fn custom_checks_see_the_tree() {
        let mut judge = FeatureJudge::all(vec![FeatureCheck::custom(|state| {
            state.tu.decls.len() >= 2
        })]);
        assert!(judge.accepts(&state("struct S { int a; };\nvoid main() {}")).unwrap());
        assert!(!judge.accepts(&state("void main() {}")).unwrap());
    }
}
