use std::io::Write;

pub mod buffer;
pub mod color;
pub mod engine;
pub mod io;
pub mod metric;
pub mod pipeline;
pub mod types;
pub mod variance;

pub use buffer::{PixelBuffer, Raster, Samples};
pub use engine::{Bm3d, DenoiseEngine, DenoiseError};
pub use io::{LoadError, StoreError};
pub use metric::MetricError;
pub use pipeline::{Job, MetricOutcome, Pipeline, PipelineError, Report, Stage};
pub use types::{Channels, DenoiseConfig, PassParams, RunConfig};
pub use variance::{map_variance, VarianceVector};

pub fn run<W: Write>(job: &Job, config: RunConfig, out: &mut W) -> Result<Report, PipelineError> {
    Pipeline::new(Bm3d::new(), config).run(job, out)
}

pub fn denoise_raster(
    raster: &Raster,
    sigma: f32,
    config: &RunConfig,
) -> Result<Raster, DenoiseError> {
    let channels = config.channels;
    if raster.channels() != channels.count() {
        return Err(DenoiseError::ChannelMismatch {
            expected: channels.count(),
            actual: raster.channels(),
        });
    }

    let samples = color::forward(&raster.to_samples(), channels);
    let variances = map_variance(sigma, channels);

    let mut engine = Bm3d::new();
    engine.set_verbose(config.verbose);
    let denoised = engine::invoke(
        &mut engine,
        &config.denoise,
        &samples,
        channels,
        &variances,
        config.two_step,
    )?;

    Ok(color::inverse(&denoised, channels).to_raster())
}
