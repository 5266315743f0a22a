// driver.rs
//! The reduction driver: a randomized greedy loop over opportunities.
//!
//! Each pass discovers opportunities on the accepted tree, then repeatedly
//! picks a chunk of them, applies it to a deep clone and asks the judge. An
//! accepted clone is compacted and becomes the new accepted state, which
//! starts a new pass; a rejected one is dropped and the pass continues with
//! the opportunities that are left. The run is over when a pass runs dry
//! (`Exhausted`) or the step budget is spent (`BudgetExhausted`).

use shade_frontend::TranslationUnit;

use crate::config::{OnJudgeError, ReducerConfig, Strategy};
use crate::context::ReductionContext;
use crate::errors::ReduceError;
use crate::judge::Judge;
use crate::ledger::{Ledger, Marker};
use crate::opportunities::{Opportunity, find_opportunities};
use crate::random::derive_seed;
use crate::state::ReductionState;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    StepAccepted,
    /// No opportunity is left. The final state is written and the marker
    /// removed.
    Exhausted,
    /// The step budget ran out. The marker stays so the run can resume.
    BudgetExhausted,
    /// A fatal error ended the run; it is returned as `Err`.
    Failed,
}

#[derive(Debug)]
pub struct ReductionOutcome {
    pub state: DriverState,
    /// Number of the last accepted step, counted across resumptions.
    pub steps: u32,
    pub final_state: ReductionState,
}

/// Outcome of judging one candidate.
enum Verdict {
    Accepted,
    Rejected,
}

struct ReductionDriver<'a> {
    config: &'a ReducerConfig,
    ledger: &'a Ledger,
    judge: &'a mut dyn Judge,
    ctx: ReductionContext,
    /// Run seed, recorded in the marker.
    seed: u64,
    step: u32,
    /// Steps accepted by this invocation, checked against the budget.
    taken: u32,
    accepted: ReductionState,
    state: DriverState,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Start a reduction from `initial`.
///
/// Unset uniforms get synthesized values first; the result is step 0.
pub fn run_fresh(
    config: &ReducerConfig,
    ledger: &Ledger,
    judge: &mut dyn Judge,
    mut initial: ReductionState,
) -> Result<ReductionOutcome, ReduceError> {
    if config.enabled.is_empty() {
        return Err(ReduceError::NoOpportunityKinds);
    }
    let mut ctx = ReductionContext::new(
        initial.tu.language_version(),
        config.reduce_everywhere,
        config.seed,
    );
    let mut defaults = ctx.rng.child();
    initial
        .bindings
        .synthesize_defaults(&initial.tu, &mut defaults);
    let accepted = ReductionState::new(initial.tu.compact(), initial.bindings);

    let driver = ReductionDriver::new(config, ledger, judge, ctx, config.seed, 0, accepted);
    ledger.write_snapshot(0, &driver.accepted)?;
    driver.write_marker()?;
    driver.run()
}

/// Continue the run recorded in the ledger's marker from its last step.
pub fn resume(
    config: &ReducerConfig,
    ledger: &Ledger,
    judge: &mut dyn Judge,
) -> Result<ReductionOutcome, ReduceError> {
    if config.enabled.is_empty() {
        return Err(ReduceError::NoOpportunityKinds);
    }
    let marker = ledger.read_marker()?;
    let accepted = ledger.load_snapshot(marker.step)?;
    if marker.seed != config.seed {
        tracing::warn!(
            marker_seed = marker.seed,
            requested_seed = config.seed,
            "resuming with the seed recorded in the marker"
        );
    }
    // A fresh stream per resumption point; continuing the old stream would
    // need its full history.
    let ctx = ReductionContext::new(
        accepted.tu.language_version(),
        config.reduce_everywhere,
        derive_seed(marker.seed, u64::from(marker.step)),
    );
    tracing::info!(step = marker.step, "resuming reduction");
    ReductionDriver::new(config, ledger, judge, ctx, marker.seed, marker.step, accepted).run()
}

// ---------------------------------------------------------------------------
// Driver loop
// ---------------------------------------------------------------------------

impl<'a> ReductionDriver<'a> {
    fn new(
        config: &'a ReducerConfig,
        ledger: &'a Ledger,
        judge: &'a mut dyn Judge,
        ctx: ReductionContext,
        seed: u64,
        step: u32,
        accepted: ReductionState,
    ) -> Self {
        Self {
            config,
            ledger,
            judge,
            ctx,
            seed,
            step,
            taken: 0,
            accepted,
            state: DriverState::Running,
        }
    }

    #[tracing::instrument(skip_all, fields(seed = self.seed, start = self.step))]
    fn run(mut self) -> Result<ReductionOutcome, ReduceError> {
        tracing::info!(
            version = %self.ctx.version,
            everywhere = self.ctx.reduce_everywhere,
            kinds = self.config.enabled.len(),
            "reduction started"
        );
        match self.reduce() {
            Ok(state) => {
                tracing::info!(state = ?state, steps = self.step, "reduction finished");
                Ok(ReductionOutcome {
                    state,
                    steps: self.step,
                    final_state: self.accepted,
                })
            }
            Err(e) => {
                tracing::error!(
                    state = ?DriverState::Failed,
                    step = self.step,
                    error = %e,
                    "reduction failed"
                );
                Err(e)
            }
        }
    }

    fn budget_spent(&self) -> bool {
        self.config.max_steps.is_some_and(|max| self.taken >= max)
    }

    fn reduce(&mut self) -> Result<DriverState, ReduceError> {
        if self.budget_spent() {
            return Ok(DriverState::BudgetExhausted);
        }
        loop {
            self.state = DriverState::Running;
            let mut remaining = find_opportunities(
                &self.accepted.tu,
                self.ctx.reduce_everywhere,
                &self.config.enabled,
            );
            tracing::debug!(step = self.step, count = remaining.len(), "opportunities found");

            self.run_pass(&mut remaining)?;
            match self.state {
                DriverState::StepAccepted if self.budget_spent() => {
                    return Ok(DriverState::BudgetExhausted);
                }
                DriverState::StepAccepted => continue,
                _ => return self.finish_exhausted(),
            }
        }
    }

    /// Try chunks from `remaining` until one is accepted or none are left.
    fn run_pass(&mut self, remaining: &mut Vec<Opportunity>) -> Result<(), ReduceError> {
        let mut chunk = self.config.chunk_size.max(1);
        while !remaining.is_empty() {
            let selected = self.select(remaining, chunk);

            if chunk == 1 && !selected[0].precondition_holds(&self.accepted.tu) {
                tracing::debug!(opportunity = %selected[0], "discarding stale opportunity");
                continue;
            }

            let mut candidate = self.accepted.tu.clone();
            let applied = selected
                .iter()
                .filter(|op| op.try_apply(&mut candidate, &mut self.ctx.ids))
                .count();
            if applied == 0 {
                tracing::debug!(count = selected.len(), "discarding stale chunk");
                continue;
            }

            match self.judge_candidate(candidate)? {
                Verdict::Accepted => {
                    tracing::info!(
                        step = self.step,
                        applied,
                        opportunities = %describe(&selected),
                        "step accepted"
                    );
                    return Ok(());
                }
                Verdict::Rejected => {
                    tracing::debug!(
                        step = self.step + 1,
                        opportunities = %describe(&selected),
                        "candidate rejected"
                    );
                    if chunk > 1 {
                        restore(remaining, selected);
                        chunk = (chunk / 2).max(1);
                    }
                }
            }
        }
        Ok(())
    }

    /// Take up to `k` distinct opportunities out of `remaining`.
    fn select(&mut self, remaining: &mut Vec<Opportunity>, k: usize) -> Vec<Opportunity> {
        let k = k.min(remaining.len());
        match self.config.strategy {
            Strategy::Random => (0..k)
                .map(|_| {
                    let index = self.ctx.rng.below(remaining.len());
                    remaining.swap_remove(index)
                })
                .collect(),
            Strategy::Shallowest => remaining.drain(..k).collect(),
        }
    }

    fn judge_candidate(&mut self, candidate: TranslationUnit) -> Result<Verdict, ReduceError> {
        let step = self.step + 1;
        validate(&candidate, step)?;
        let candidate = ReductionState::new(candidate, self.accepted.bindings.clone());

        let interesting = match self.judge.accepts(&candidate) {
            Ok(interesting) => interesting,
            Err(e) => match self.config.on_judge_error {
                OnJudgeError::Reject => {
                    tracing::warn!(step, error = %e, "judge failed, treating candidate as rejected");
                    false
                }
                OnJudgeError::Fatal => return Err(e.into()),
            },
        };
        if !interesting {
            return Ok(Verdict::Rejected);
        }

        self.accepted = ReductionState::new(candidate.tu.compact(), candidate.bindings);
        self.step = step;
        self.taken += 1;
        self.state = DriverState::StepAccepted;
        self.ledger.write_snapshot(step, &self.accepted)?;
        self.write_marker()?;
        Ok(Verdict::Accepted)
    }

    fn write_marker(&self) -> Result<(), ReduceError> {
        self.ledger.write_marker(Marker {
            step: self.step,
            seed: self.seed,
        })
    }

    fn finish_exhausted(&mut self) -> Result<DriverState, ReduceError> {
        self.ledger.write_final(&self.accepted)?;
        self.ledger.remove_marker()?;
        Ok(DriverState::Exhausted)
    }
}

/// The candidate must print to source that parses back to the same tree.
fn validate(tu: &TranslationUnit, step: u32) -> Result<(), ReduceError> {
    let printed = shade_frontend::print(tu);
    let reparsed = shade_frontend::parse(&printed).map_err(|e| ReduceError::InvalidCandidate {
        step,
        reason: e.to_string(),
    })?;
    if !reparsed.structural_eq(tu) {
        return Err(ReduceError::InvalidCandidate {
            step,
            reason: "re-parsed program differs from the candidate".to_string(),
        });
    }
    Ok(())
}

/// Put a rejected chunk back, in front so depth order survives.
fn restore(remaining: &mut Vec<Opportunity>, mut selected: Vec<Opportunity>) {
    selected.append(remaining);
    *remaining = selected;
}

fn describe(selected: &[Opportunity]) -> String {
    selected
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
