// main.rs
//! shade-reduce: Randomized test case reducer for GLSL-style shaders.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use miette::NamedSource;
use regex::Regex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use shade_reduce::cli::{self, Cli, JudgeKind};
use shade_reduce::judge::{
    CommandJudge, FeatureCheck, FeatureJudge, Image, ImageJudge, RandomJudge, Tolerance,
    ToleranceKind,
};
use shade_reduce::random::derive_seed;
use shade_reduce::{
    DriverState, Judge, Ledger, ReduceError, ReducerConfig, ReductionOutcome, ReductionState,
};

/// Stream number for the random judge's seed, apart from the driver's.
const RANDOM_JUDGE_STREAM: u64 = 0x4a55_4447_45;

/// Subdirectory of the output directory where judges write candidates.
const SCRATCH_DIR: &str = ".judge";

struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(
        &self,
        _w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        Ok(())
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_timer(NoTimestamp)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// `<stem>_reduced` and the input's extension, `frag` when it has none.
fn output_names(input: &Path) -> (String, String) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shader".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frag".to_string());
    (format!("{stem}_reduced"), ext)
}

fn build_config(cli: &Cli) -> ReducerConfig {
    let (prefix, ext) = output_names(&cli.input);
    ReducerConfig::default()
        .with_reduce_everywhere(cli.reduce_everywhere)
        .with_seed(cli.seed)
        .with_max_steps(cli.step_budget())
        .with_strategy(cli.strategy)
        .with_chunk_size(cli.chunk_size)
        .with_disabled(&cli.disable)
        .with_on_judge_error(cli.on_judge_error)
        .with_output_names(prefix, ext)
}

fn build_judge(cli: &Cli, scratch: PathBuf, ext: &str) -> Result<Box<dyn Judge>, ReduceError> {
    let timeout = cli.timeout.map(Duration::from_secs_f64);
    let judge: Box<dyn Judge> = match cli.judge {
        JudgeKind::Command => {
            let Some(template) = cli.command.clone() else {
                return Err(ReduceError::Judge(missing("--command")));
            };
            Box::new(CommandJudge::new(template, scratch, ext).with_timeout(timeout))
        }
        JudgeKind::Render => {
            let Some(template) = cli.render_command.clone() else {
                return Err(ReduceError::Judge(missing("--render-command")));
            };
            let reference = match &cli.reference_image {
                Some(path) => Image::load(path)?,
                None => return Err(ReduceError::Judge(missing("--reference-image"))),
            };
            let tolerance = match cli.tolerance {
                ToleranceKind::Identical => Tolerance::Identical,
                ToleranceKind::Fuzzy => Tolerance::Fuzzy {
                    threshold: cli.fuzzy_threshold,
                },
            };
            Box::new(
                ImageJudge::new(template, scratch, ext, reference, tolerance)
                    .with_timeout(timeout),
            )
        }
        JudgeKind::Features => {
            let mut checks = Vec::with_capacity(cli.contains.len());
            for pattern in &cli.contains {
                let regex = Regex::new(pattern).map_err(|e| {
                    ReduceError::Judge(shade_reduce::JudgeError::Other(format!(
                        "invalid regex '{pattern}': {e}"
                    )))
                })?;
                checks.push(FeatureCheck::Contains(regex));
            }
            if cli.any {
                Box::new(FeatureJudge::any(checks))
            } else {
                Box::new(FeatureJudge::all(checks))
            }
        }
        JudgeKind::Random => Box::new(RandomJudge::new(
            derive_seed(cli.seed, RANDOM_JUDGE_STREAM),
            cli.accept_probability,
        )),
    };
    Ok(judge)
}

fn missing(flag: &str) -> shade_reduce::JudgeError {
    shade_reduce::JudgeError::Other(format!("{flag} is required"))
}

fn print_summary(cli: &Cli, ledger: &Ledger, config: &ReducerConfig) {
    println!("shade-reduce: Randomized shader reducer");
    println!();
    println!("  input:       {}", cli.input.display());
    println!("  output:      {}", ledger.dir().display());
    println!("  seed:        {}", config.seed);
    match config.max_steps {
        Some(n) => println!("  max steps:   {n}"),
        None => println!("  max steps:   unbounded"),
    }
    println!("  strategy:    {:?}", config.strategy);
    println!("  chunk size:  {}", config.chunk_size);
    println!("  judge:       {:?}", cli.judge);
    if let Some(ref command) = cli.command {
        println!("  command:     {command}");
    }
    if let Some(ref command) = cli.render_command {
        println!("  render:      {command}");
    }
    if cli.continue_previous_reduction {
        println!("  resuming from {}", ledger.marker_path().display());
    }
    println!();
}

fn print_outcome(outcome: &ReductionOutcome, ledger: &Ledger) {
    match outcome.state {
        DriverState::Exhausted => {
            println!("Reduction finished after step {}.", outcome.steps);
            println!("  result:      {}", ledger.final_shader_path().display());
            println!("  bindings:    {}", ledger.final_bindings_path().display());
        }
        DriverState::BudgetExhausted => {
            println!("Step budget spent at step {}.", outcome.steps);
            println!("  latest:      {}", ledger.shader_path(outcome.steps).display());
            println!("  resume with --continue-previous-reduction");
        }
        other => println!("Reduction stopped in state {other:?}."),
    }
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

fn run(cli: &Cli) -> Result<ReductionOutcome, ReduceError> {
    let config = build_config(cli);
    let ledger = Ledger::create(&cli.output, config.prefix.clone(), config.ext.clone())?;
    let mut judge = build_judge(cli, cli.output.join(SCRATCH_DIR), &config.ext)?;

    print_summary(cli, &ledger, &config);

    let outcome = if cli.continue_previous_reduction {
        shade_reduce::resume(&config, &ledger, judge.as_mut())?
    } else {
        let initial = ReductionState::load(&cli.input, &cli.input.with_extension("json"))?;
        shade_reduce::run_fresh(&config, &ledger, judge.as_mut(), initial)?
    };
    print_outcome(&outcome, &ledger);
    Ok(outcome)
}

/// Render an error with miette, attaching source text to parse errors.
fn report_error(err: ReduceError) {
    let report = match err {
        ReduceError::Parse {
            path,
            source_text,
            error,
        } => miette::Report::new(error)
            .with_source_code(NamedSource::new(path.display().to_string(), source_text)),
        other => miette::Report::new(other),
    };
    eprintln!("{report:?}");
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(msg) = cli::validate(&cli) {
        eprintln!("error: {}", msg);
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(outcome) => match outcome.state {
            DriverState::Exhausted | DriverState::BudgetExhausted => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        },
        Err(err) => {
            report_error(err);
            ExitCode::FAILURE
        }
    }
}
