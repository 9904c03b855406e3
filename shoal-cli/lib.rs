use std::io::Write;
use std::path::PathBuf;

use shoal::{Bm3d, Channels, DenoiseEngine, Job, MetricOutcome, Pipeline, RunConfig};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug, PartialEq)]
#[error(
    "Usage: {program} NoisyImage DenoisedImage sigma [color [twostep [quiet [ReferenceImage]]]]"
)]
pub struct UsageError {
    pub program: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sigma: f32,
    pub color: bool,
    pub two_step: bool,
    pub quiet: bool,
    pub reference: Option<PathBuf>,
}

/// Longest leading prefix that reads as a float, 0 when there is none.
pub fn parse_sigma(text: &str) -> f32 {
    let text = text.trim_start();
    (1..=text.len())
        .rev()
        .filter(|&end| text.is_char_boundary(end))
        .find_map(|end| text[..end].parse::<f32>().ok())
        .unwrap_or(0.0)
}

impl Args {
    pub fn parse(argv: &[String]) -> Result<Args, UsageError> {
        if argv.len() < 4 {
            return Err(UsageError {
                program: argv.first().cloned().unwrap_or_else(|| "shoal".into()),
            });
        }

        let flag = |i: usize, literal: &str| argv.get(i).is_some_and(|a| a == literal);

        Ok(Args {
            input: PathBuf::from(&argv[1]),
            output: PathBuf::from(&argv[2]),
            sigma: parse_sigma(&argv[3]),
            color: flag(4, "color"),
            two_step: flag(5, "twostep"),
            quiet: flag(6, "quiet"),
            reference: argv.get(7).map(PathBuf::from),
        })
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(
            Channels::from_color_flag(self.color),
            self.two_step,
            !self.quiet,
        )
    }

    pub fn job(&self) -> Job {
        Job {
            input: self.input.clone(),
            output: self.output.clone(),
            sigma: self.sigma,
            reference: self.reference.clone(),
        }
    }
}

/// `info` so the engine's per-step timings show up, `warn` when the run is quiet.
pub fn log_level(argv: &[String]) -> &'static str {
    if argv.get(6).is_some_and(|a| a == "quiet") {
        "warn"
    } else {
        "info"
    }
}

// stderr, `RUST_LOG` overrides `base_level`
pub fn setup_logging(base_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

    // a second call (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run<O: Write, E: Write>(argv: &[String], stdout: &mut O, stderr: &mut E) -> i32 {
    run_with(Bm3d::new(), argv, stdout, stderr)
}

pub fn run_with<D: DenoiseEngine, O: Write, E: Write>(
    engine: D,
    argv: &[String],
    stdout: &mut O,
    stderr: &mut E,
) -> i32 {
    let args = match Args::parse(argv) {
        Ok(args) => args,
        Err(e) => {
            let _ = writeln!(stderr, "{e}");
            return 1;
        }
    };

    let mut pipeline = Pipeline::new(engine, args.run_config());
    match pipeline.run(&args.job(), stdout) {
        Ok(report) => {
            if let Some(MetricOutcome::Failed(e)) = &report.metric {
                let _ = writeln!(stderr, "PSNR not computed: {e}");
            }
            0
        }
        Err(e) => {
            let _ = writeln!(stderr, "{e}");
            1
        }
    }
}
