// tests/driver.rs
//! End-to-end runs of the reduction driver against in-process judges.

use std::fs;

use shade_reduce::judge::{JudgeError, RandomJudge};
use shade_reduce::{
    Bindings, DriverState, Ledger, Marker, OnJudgeError, OpportunityKind, ReduceError,
    ReducerConfig, ReductionState, resume, run_fresh,
};

const TWO_HELPERS: &str = "float a() { return 1.0; }\n\
                           float b() { return 2.0; }\n\
                           void main() { gl_FragColor = vec4(1.0); }";

fn state(source: &str) -> ReductionState {
    ReductionState::new(shade_frontend::parse(source).unwrap(), Bindings::default())
}

fn declarations_only() -> ReducerConfig {
    let mut config = ReducerConfig::default().with_seed(7);
    config.enabled = vec![OpportunityKind::RemoveDeclaration];
    config
}

fn always(_: &ReductionState) -> Result<bool, JudgeError> {
    Ok(true)
}

#[test]
fn nothing_to_do_finishes_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "shader_reduced", "frag").unwrap();
    let mut judge = always;
    let outcome = run_fresh(
        &ReducerConfig::default(),
        &ledger,
        &mut judge,
        state("void main() {}"),
    )
    .unwrap();

    assert_eq!(outcome.state, DriverState::Exhausted);
    assert_eq!(outcome.steps, 0);
    assert!(ledger.shader_path(0).exists());
    assert!(ledger.final_shader_path().exists());
    assert!(ledger.final_bindings_path().exists());
    assert!(!ledger.marker_path().exists());
}

#[test]
fn single_opportunity_takes_one_step() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut judge = always;
    let outcome = run_fresh(
        &declarations_only(),
        &ledger,
        &mut judge,
        state("float a() { return 1.0; }\nvoid main() {}"),
    )
    .unwrap();

    assert_eq!(outcome.state, DriverState::Exhausted);
    assert_eq!(outcome.steps, 1);
    let before = fs::read_to_string(ledger.shader_path(0)).unwrap();
    let after = fs::read_to_string(ledger.final_shader_path()).unwrap();
    assert!(before.contains("float a()"));
    assert!(!after.contains("float a()"));
    assert_eq!(after, fs::read_to_string(ledger.shader_path(1)).unwrap());
}

#[test]
fn accepting_judge_removes_every_helper() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut judge = always;
    let outcome = run_fresh(
        &declarations_only(),
        &ledger,
        &mut judge,
        state(TWO_HELPERS),
    )
    .unwrap();

    assert_eq!(outcome.state, DriverState::Exhausted);
    assert_eq!(outcome.steps, 2);
    assert!(ledger.shader_path(1).exists());
    assert!(ledger.shader_path(2).exists());
    let result = fs::read_to_string(ledger.final_shader_path()).unwrap();
    assert!(!result.contains("float a()"));
    assert!(!result.contains("float b()"));
    assert!(result.contains("void main()"));
}

#[test]
fn rejected_candidates_leave_the_accepted_state_alone() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut judge =
        |state: &ReductionState| -> Result<bool, JudgeError> { Ok(state.source().contains("b()")) };
    let outcome = run_fresh(
        &declarations_only(),
        &ledger,
        &mut judge,
        state(TWO_HELPERS),
    )
    .unwrap();

    assert_eq!(outcome.state, DriverState::Exhausted);
    assert_eq!(outcome.steps, 1);
    let result = fs::read_to_string(ledger.final_shader_path()).unwrap();
    assert!(!result.contains("float a()"));
    assert!(result.contains("float b()"));
    assert!(!ledger.shader_path(2).exists());
}

#[test]
fn unset_uniforms_are_bound_before_step_zero() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut judge = always;
    run_fresh(
        &ReducerConfig::default(),
        &ledger,
        &mut judge,
        state("uniform vec2 injectionSwitch;\nvoid main() {}"),
    )
    .unwrap();

    let json = fs::read_to_string(ledger.bindings_path(0)).unwrap();
    let bindings: Bindings = serde_json::from_str(&json).unwrap();
    let switch = bindings.get("injectionSwitch").unwrap();
    assert_eq!(switch.func.as_deref(), Some("glUniform2f"));
    assert_eq!(switch.args.as_deref(), Some(&[0.0, 1.0][..]));
}

#[test]
fn same_seed_same_reduction() {
    let source = "uniform vec2 injectionSwitch;\n\
                  struct S { float x; };\n\
                  float helper(float v) { float t = v * 2.0 + 1.0; return t; }\n\
                  void main() {\n\
                      float k = 3.0 * (1.0 + 2.0);\n\
                      if (injectionSwitch.x > injectionSwitch.y) { k = helper(k); }\n\
                      gl_FragColor = vec4(k);\n\
                  }";
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
        let config = ReducerConfig::default()
            .with_seed(42)
            .with_reduce_everywhere(true);
        let mut judge = RandomJudge::new(9, 0.6).with_round_trip_check(true);
        let outcome = run_fresh(&config, &ledger, &mut judge, state(source)).unwrap();
        (outcome.steps, outcome.final_state.source())
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn budget_stops_and_resume_continues() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let config = declarations_only().with_max_steps(Some(1));
    let mut judge = always;

    let outcome = run_fresh(&config, &ledger, &mut judge, state(TWO_HELPERS)).unwrap();
    assert_eq!(outcome.state, DriverState::BudgetExhausted);
    assert_eq!(outcome.steps, 1);
    assert_eq!(ledger.read_marker().unwrap(), Marker { step: 1, seed: 7 });
    assert!(!ledger.final_shader_path().exists());
    let step_one = fs::read_to_string(ledger.shader_path(1)).unwrap();

    let config = declarations_only();
    let outcome = resume(&config, &ledger, &mut judge).unwrap();
    assert_eq!(outcome.state, DriverState::Exhausted);
    assert_eq!(outcome.steps, 2);
    assert_eq!(fs::read_to_string(ledger.shader_path(1)).unwrap(), step_one);
    assert!(ledger.shader_path(2).exists());
    assert!(ledger.final_shader_path().exists());
    assert!(!ledger.marker_path().exists());
}

#[test]
fn zero_budget_takes_no_step() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let config = declarations_only().with_max_steps(Some(0));
    let mut judge = always;

    let outcome = run_fresh(&config, &ledger, &mut judge, state(TWO_HELPERS)).unwrap();
    assert_eq!(outcome.state, DriverState::BudgetExhausted);
    assert_eq!(outcome.steps, 0);
    assert_eq!(ledger.read_marker().unwrap().step, 0);
    assert!(!ledger.shader_path(1).exists());
}

#[test]
fn resume_without_marker_fails() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut judge = always;
    let err = resume(&ReducerConfig::default(), &ledger, &mut judge).unwrap_err();
    assert!(matches!(err, ReduceError::ResumeMarkerMissing { .. }));
}

#[test]
fn judge_errors_follow_the_policy() {
    let failing = |_: &ReductionState| -> Result<bool, JudgeError> {
        Err(JudgeError::Other("renderer crashed".to_string()))
    };

    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut judge = failing;
    let outcome = run_fresh(&declarations_only(), &ledger, &mut judge, state(TWO_HELPERS)).unwrap();
    assert_eq!(outcome.state, DriverState::Exhausted);
    assert_eq!(outcome.steps, 0);

    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let config = declarations_only().with_on_judge_error(OnJudgeError::Fatal);
    let mut judge = failing;
    let err = run_fresh(&config, &ledger, &mut judge, state(TWO_HELPERS)).unwrap_err();
    assert!(matches!(err, ReduceError::Judge(_)));
    assert_eq!(ledger.read_marker().unwrap().step, 0);
}

#[test]
fn no_enabled_kinds_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create(dir.path(), "s", "frag").unwrap();
    let mut config = ReducerConfig::default();
    config.enabled.clear();
    let mut judge = always;
    let err = run_fresh(&config, &ledger, &mut judge, state("void main() {}")).unwrap_err();
    assert!(matches!(err, ReduceError::NoOpportunityKinds));
}
