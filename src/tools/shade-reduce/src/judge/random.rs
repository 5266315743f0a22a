// judge/random.rs
//! A coin-flip judge for stress-testing the driver.

use super::{Judge, JudgeError};
use crate::random::RandomSource;
use crate::state::ReductionState;

/// Accepts with a fixed probability from its own seeded stream. Optionally
/// fails some calls, and can insist the candidate still round-trips so bad
/// rewrites surface as errors rather than silent acceptances.
#[derive(Debug, Clone)]
pub struct RandomJudge {
    rng: RandomSource,
    accept_probability: f64,
    error_probability: f64,
    check_round_trip: bool,
}

impl RandomJudge {
    pub fn new(seed: u64, accept_probability: f64) -> Self {
        Self {
            rng: RandomSource::new(seed),
            accept_probability,
            error_probability: 0.0,
            check_round_trip: false,
        }
    }

    pub fn with_error_probability(mut self, p: f64) -> Self {
        self.error_probability = p;
        self
    }

    pub fn with_round_trip_check(mut self, check: bool) -> Self {
        self.check_round_trip = check;
        self
    }
}

impl Judge for RandomJudge {
    fn accepts(&mut self, state: &ReductionState) -> Result<bool, JudgeError> {
        if self.check_round_trip {
            let printed = state.source();
            let reparsed = shade_frontend::parse(&printed)
                .map_err(|e| JudgeError::Other(format!("candidate does not parse: {e}")))?;
            if !reparsed.structural_eq(&state.tu) {
                return Err(JudgeError::Other(
                    "candidate changes when re-parsed".to_string(),
                ));
            }
        }
        if self.error_probability > 0.0 && self.rng.chance(self.error_probability) {
            return Err(JudgeError::Other("simulated judge failure".to_string()));
        }
        Ok(self.rng.chance(self.accept_probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Bindings;

    fn state() -> ReductionState {
        ReductionState::new(
            shade_frontend::parse("void main() { int a = 1; }").unwrap(),
            Bindings::default(),
        )
    }

    fn verdicts(judge: &mut RandomJudge, n: usize) -> Vec<Option<bool>> {
        (0..n).map(|_| judge.accepts(&state()).ok()).collect()
    }

    #[test]
    fn same_seed_same_verdicts() {
        let mut a = RandomJudge::new(11, 0.5).with_error_probability(0.2);
        let mut b = RandomJudge::new(11, 0.5).with_error_probability(0.2);
        assert_eq!(verdicts(&mut a, 50), verdicts(&mut b, 50));
    }

    #[test]
    fn extreme_probabilities() {
        let mut always = RandomJudge::new(1, 1.0);
        assert!(verdicts(&mut always, 20).iter().all(|v| *v == Some(true)));
        let mut never = RandomJudge::new(1, 0.0);
        assert!(verdicts(&mut never, 20).iter().all(|v| *v == Some(false)));
        let mut broken = RandomJudge::new(1, 1.0).with_error_probability(1.0);
        assert!(verdicts(&mut broken, 5).iter().all(Option::is_none));
    }

    #[test]
    fn round_trip_check_passes_valid_programs() {
        let mut judge = RandomJudge::new(3, 1.0).with_round_trip_check(true);
        assert!(judge.accepts(&state()).unwrap());
    }
}
