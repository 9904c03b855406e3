use thiserror::Error;

use crate::buffer::Samples;
use crate::types::{Channels, DenoiseConfig, PassParams};
use crate::variance::VarianceVector;

pub mod bm3d;
pub mod matching;
pub mod transform;

pub use bm3d::Bm3d;

#[derive(Error, Debug)]
pub enum DenoiseError {
    #[error("output buffer is {output:?}, expected {input:?} (width, height, channels)")]
    ShapeMismatch {
        input: (usize, usize, usize),
        output: (usize, usize, usize),
    },

    #[error("buffer has {actual} channels but {expected} were requested")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("got {actual} variances for {expected} channels")]
    VarianceCount { expected: usize, actual: usize },

    #[error("image is {width}x{height}, smaller than the {patch}x{patch} patch")]
    TooSmall {
        width: usize,
        height: usize,
        patch: usize,
    },

    #[error("invalid pass parameters: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Engine(String),
}

/// A block-matching denoiser.
///
/// Both passes are always configured before [`denoise`](DenoiseEngine::denoise) is called; the
/// engine only runs the second one when `two_step` is set. `output` arrives zeroed with the
/// shape of `input` and is filled in place.
pub trait DenoiseEngine {
    fn configure_first_pass(&mut self, params: PassParams);
    fn configure_second_pass(&mut self, params: PassParams);
    fn set_verbose(&mut self, _verbose: bool) {}

    fn denoise(
        &mut self,
        input: &Samples,
        output: &mut Samples,
        channels: Channels,
        variances: &VarianceVector,
        two_step: bool,
    ) -> Result<(), DenoiseError>;
}

fn dims(buffer: &Samples) -> (usize, usize, usize) {
    (buffer.width(), buffer.height(), buffer.channels())
}

pub fn check_contract(
    input: &Samples,
    output: &Samples,
    channels: Channels,
    variances: &VarianceVector,
) -> Result<(), DenoiseError> {
    if !input.shape_eq(output) {
        return Err(DenoiseError::ShapeMismatch {
            input: dims(input),
            output: dims(output),
        });
    }
    if input.channels() != channels.count() {
        return Err(DenoiseError::ChannelMismatch {
            expected: channels.count(),
            actual: input.channels(),
        });
    }
    if variances.len() != channels.count() {
        return Err(DenoiseError::VarianceCount {
            expected: channels.count(),
            actual: variances.len(),
        });
    }
    Ok(())
}

pub fn invoke<E: DenoiseEngine + ?Sized>(
    engine: &mut E,
    config: &DenoiseConfig,
    input: &Samples,
    channels: Channels,
    variances: &VarianceVector,
    two_step: bool,
) -> Result<Samples, DenoiseError> {
    engine.configure_first_pass(config.first);
    engine.configure_second_pass(config.second);

    let mut output = Samples::zeros(input.width(), input.height(), input.channels());
    engine.denoise(input, &mut output, channels, variances, two_step)?;
    Ok(output)
}
