//! Sequences one denoising run: load, colour transform, variance mapping, engine, inverse
//! transform, store and the optional PSNR against a reference.
//!
//! Stages run strictly in order and the first error ends the run. A failing reference comparison
//! happens after the output is stored, so it is reported as [`MetricOutcome::Failed`] instead of
//! failing the run.

use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::buffer::Raster;
use crate::color;
use crate::engine::{self, DenoiseEngine, DenoiseError};
use crate::io::{self, LoadError, StoreError};
use crate::metric::{self, MetricError};
use crate::types::RunConfig;
use crate::variance::{map_variance, VarianceVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Loaded,
    ColorTransformed,
    ColorUnchanged,
    VarianceComputed,
    Denoised,
    ColorRestored,
    PlaneExtracted,
    Stored,
    MetricReported,
    Done,
    Failed,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Could not open or find the image: {0}")]
    Load(#[from] LoadError),

    #[error("There was an error while processing image:\n{0}")]
    Denoise(#[from] DenoiseError),

    #[error("Could not save the denoised image: {0}")]
    Store(#[from] StoreError),

    #[error("failed to write diagnostics: {0}")]
    Diagnostics(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sigma: f32,
    pub reference: Option<PathBuf>,
}

#[derive(Debug)]
pub enum MetricOutcome {
    Psnr(f64),
    Failed(MetricError),
}

#[derive(Debug)]
pub struct Report {
    pub variances: VarianceVector,
    pub width: usize,
    pub height: usize,
    pub stages: Vec<Stage>,
    pub metric: Option<MetricOutcome>,
    pub output: Raster,
}

pub struct Pipeline<E: DenoiseEngine> {
    engine: E,
    config: RunConfig,
    stages: Vec<Stage>,
}

impl<E: DenoiseEngine> Pipeline<E> {
    pub fn new(engine: E, config: RunConfig) -> Self {
        Self {
            engine,
            config,
            stages: Vec::new(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn enter(&mut self, stage: Stage) {
        debug!(?stage, "pipeline stage");
        self.stages.push(stage);
    }

    // progress lines are gated by `verbose`, the PSNR line is not
    pub fn run<W: Write>(&mut self, job: &Job, out: &mut W) -> Result<Report, PipelineError> {
        self.stages.clear();
        self.enter(Stage::Start);

        match self.execute(job, out) {
            Ok(mut report) => {
                self.enter(Stage::Done);
                report.stages = self.stages.clone();
                Ok(report)
            }
            Err(e) => {
                self.enter(Stage::Failed);
                Err(e)
            }
        }
    }

    fn execute<W: Write>(&mut self, job: &Job, out: &mut W) -> Result<Report, PipelineError> {
        let config = self.config;
        let channels = config.channels;

        if config.verbose {
            writeln!(out, "Sigma = {}", job.sigma)?;
            writeln!(out, "Number of Steps: {}", config.steps())?;
            let color = if channels.is_color() { "yes" } else { "no" };
            writeln!(out, "Color denoising: {color}")?;
        }

        let raster = io::load(&job.input, channels)?;
        self.enter(Stage::Loaded);

        let samples = color::forward(&raster.to_samples(), channels);
        self.enter(if channels.is_color() {
            Stage::ColorTransformed
        } else {
            Stage::ColorUnchanged
        });
        drop(raster);

        let variances = map_variance(job.sigma, channels);
        self.enter(Stage::VarianceComputed);

        let (width, height) = (samples.width(), samples.height());
        if config.verbose {
            writeln!(
                out,
                "Noise variance for individual channels (YCrCb if color): {variances}"
            )?;
            writeln!(out, "width: {width} height: {height}")?;
        }

        self.engine.set_verbose(config.verbose);
        let denoised = engine::invoke(
            &mut self.engine,
            &config.denoise,
            &samples,
            channels,
            &variances,
            config.two_step,
        )?;
        self.enter(Stage::Denoised);
        drop(samples);

        let restored = color::inverse(&denoised, channels).to_raster();
        self.enter(if channels.is_color() {
            Stage::ColorRestored
        } else {
            Stage::PlaneExtracted
        });

        io::store(&job.output, &restored)?;
        self.enter(Stage::Stored);

        let metric = match &job.reference {
            None => None,
            Some(path) => {
                let outcome = io::load(path, channels)
                    .map_err(MetricError::from)
                    .and_then(|reference| metric::psnr(&reference, &restored));

                Some(match outcome {
                    Ok(psnr) => {
                        writeln!(out, "PSNR:{psnr}")?;
                        self.enter(Stage::MetricReported);
                        MetricOutcome::Psnr(psnr)
                    }
                    Err(e) => {
                        warn!(error = %e, "no PSNR, the denoised image is already stored");
                        MetricOutcome::Failed(e)
                    }
                })
            }
        };

        Ok(Report {
            variances,
            width,
            height,
            stages: Vec::new(),
            metric,
            output: restored,
        })
    }
}
