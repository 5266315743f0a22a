// cli.rs
//! CLI argument parsing for shade-reduce.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{OnJudgeError, Strategy};
use crate::judge::ToleranceKind;
use crate::opportunities::OpportunityKind;

/// Randomized test case reducer for GLSL-style shaders.
///
/// Repeatedly applies small simplifications to a shader and keeps each one
/// the judge still finds interesting. Accepted steps are written to the
/// output directory as they happen, so an interrupted run can be resumed.
#[derive(Parser, Debug)]
#[command(name = "shade-reduce")]
#[command(version)]
#[command(about = "Randomized test case reducer for GLSL-style shaders")]
pub struct Cli {
    /// Shader to reduce; bindings are read from the `.json` file beside it
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory for snapshots and the resume marker
    #[arg(value_name = "OUTPUT_DIR")]
    pub output: PathBuf,

    // -- Reduction options --
    /// Also reduce reachable code, not just unreachable functions and
    /// injected dead code
    #[arg(long)]
    pub reduce_everywhere: bool,

    /// Seed for the run's random stream
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Stop after this many accepted steps; negative means unbounded
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_steps: Option<i64>,

    /// Resume the run recorded in OUTPUT_DIR
    #[arg(long)]
    pub continue_previous_reduction: bool,

    /// How to pick the next opportunities
    #[arg(long, value_enum, default_value_t = Strategy::Random)]
    pub strategy: Strategy,

    /// Opportunities applied together per candidate; halves on rejection
    #[arg(long, value_name = "K", default_value_t = 1)]
    pub chunk_size: usize,

    /// Opportunity kind to skip (repeatable)
    #[arg(long, value_enum, value_name = "KIND")]
    pub disable: Vec<OpportunityKind>,

    // -- Judge options --
    /// Which judge decides whether a candidate is interesting
    #[arg(long, value_enum, default_value_t = JudgeKind::Command)]
    pub judge: JudgeKind,

    /// Interestingness command for `--judge command` (exit 0 = interesting).
    /// `{file}` and `{json}` expand to the candidate's paths
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Kill the judge's command after N seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Render command for `--judge render`; must write a PPM to `{image}`
    #[arg(long, value_name = "CMD")]
    pub render_command: Option<String>,

    /// Reference PPM image for `--judge render`
    #[arg(long, value_name = "PATH")]
    pub reference_image: Option<PathBuf>,

    /// Image comparison mode
    #[arg(long, value_enum, default_value_t = ToleranceKind::Identical)]
    pub tolerance: ToleranceKind,

    /// Largest fraction of differing channels accepted by `--tolerance fuzzy`
    #[arg(long, value_name = "FRACTION", default_value_t = 0.01)]
    pub fuzzy_threshold: f64,

    /// Regex the printed candidate must match for `--judge features`
    /// (repeatable)
    #[arg(long, value_name = "REGEX")]
    pub contains: Vec<String>,

    /// With `--judge features`, one matching regex is enough
    #[arg(long)]
    pub any: bool,

    /// Acceptance probability for `--judge random`
    #[arg(long, value_name = "P", default_value_t = 0.5)]
    pub accept_probability: f64,

    /// What a judge failure means for the run
    #[arg(long, value_enum, default_value_t = OnJudgeError::Reject)]
    pub on_judge_error: OnJudgeError,

    /// Log every attempt, not just accepted steps
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum JudgeKind {
    /// Run a shell command; exit 0 means interesting
    #[default]
    Command,
    /// Render to an image and compare with a reference
    Render,
    /// Match regexes against the printed candidate
    Features,
    /// Accept at random (for testing the reducer itself)
    Random,
}

impl Cli {
    /// `--max-steps` with negative values meaning unbounded.
    pub fn step_budget(&self) -> Option<u32> {
        self.max_steps
            .filter(|&n| n >= 0)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    }
}

/// Validate the CLI arguments. Returns an error message if invalid.
pub fn validate(cli: &Cli) -> Result<(), String> {
    if OpportunityKind::ALL.iter().all(|kind| cli.disable.contains(kind)) {
        return Err("every opportunity kind is disabled".to_string());
    }

    match cli.judge {
        JudgeKind::Command if cli.command.is_none() => {
            return Err("--judge command requires --command <CMD>".to_string());
        }
        JudgeKind::Render if cli.render_command.is_none() || cli.reference_image.is_none() => {
            return Err(
                "--judge render requires --render-command <CMD> and --reference-image <PATH>"
                    .to_string(),
            );
        }
        JudgeKind::Features if cli.contains.is_empty() => {
            return Err("--judge features requires at least one --contains <REGEX>".to_string());
        }
        _ => {}
    }

    for pattern in &cli.contains {
        regex::Regex::new(pattern)
            .map_err(|e| format!("invalid --contains regex '{pattern}': {e}"))?;
    }

    if let Some(secs) = cli.timeout
        && secs <= 0.0
    {
        return Err(format!("--timeout must be positive, got {secs}"));
    }

    if !(0.0..=1.0).contains(&cli.fuzzy_threshold) {
        return Err(format!(
            "--fuzzy-threshold must be between 0 and 1, got {}",
            cli.fuzzy_threshold
        ));
    }
    if !(0.0..=1.0).contains(&cli.accept_probability) {
        return Err(format!(
            "--accept-probability must be between 0 and 1, got {}",
            cli.accept_probability
        ));
    }

    if !cli.continue_previous_reduction && !cli.input.is_file() {
        return Err(format!("input file does not exist: {}", cli.input.display()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("shade-reduce").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn negative_budget_is_unbounded() {
        let cli = parse(&["a.frag", "out", "--max-steps", "-1"]);
        assert_eq!(cli.step_budget(), None);
        let cli = parse(&["a.frag", "out", "--max-steps", "12"]);
        assert_eq!(cli.step_budget(), Some(12));
        assert_eq!(parse(&["a.frag", "out"]).step_budget(), None);
    }

    #[test]
    fn kinds_use_kebab_case() {
        let cli = parse(&[
            "a.frag",
            "out",
            "--disable",
            "remove-stmt",
            "--disable",
            "inline-structified-field",
        ]);
        assert_eq!(
            cli.disable,
            [OpportunityKind::RemoveStmt, OpportunityKind::InlineStructifiedField]
        );
    }

    #[test]
    fn judge_specific_flags_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.frag");
        std::fs::write(&input, "void main() {}").unwrap();
        let input = input.display().to_string();

        let cli = parse(&[input.as_str(), "out"]);
        assert!(validate(&cli).unwrap_err().contains("--command"));

        let cli = parse(&[input.as_str(), "out", "--judge", "features"]);
        assert!(validate(&cli).unwrap_err().contains("--contains"));

        let cli = parse(&[input.as_str(), "out", "--judge", "features", "--contains", "("]);
        assert!(validate(&cli).unwrap_err().contains("invalid --contains regex"));

        let cli = parse(&[input.as_str(), "out", "--command", "true"]);
        validate(&cli).unwrap();
    }

    #[test]
    fn missing_input_is_rejected_unless_resuming() {
        let cli = parse(&["/nonexistent/a.frag", "out", "--command", "true"]);
        assert!(validate(&cli).unwrap_err().contains("does not exist"));
        let cli = parse(&[
            "/nonexistent/a.frag",
            "out",
            "--command",
            "true",
            "--continue-previous-reduction",
        ]);
        validate(&cli).unwrap();
    }

    #[test]
    fn all_kinds_disabled_is_an_error() {
        let mut args = vec!["a.frag", "out", "--command", "true"];
        for kind in OpportunityKind::ALL {
            args.push("--disable");
            args.push(kind.as_str());
        }
        let cli = parse(&args);
        assert!(validate(&cli).unwrap_err().contains("disabled"));
    }
}
