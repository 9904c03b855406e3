use num_enum::{IntoPrimitive, TryFromPrimitive};

// fixed-point scale of the luma/chroma coefficients (256 per axis)
pub const FIXED_POINT_SCALE: i64 = 256;

// rows of the RGB -> YCbCr transform, scaled by FIXED_POINT_SCALE
pub const LUMA_ROW: [i64; 3] = [66, 129, 25];
pub const CHROMA_BLUE_ROW: [i64; 3] = [-38, -74, 112];
pub const CHROMA_RED_ROW: [i64; 3] = [112, -94, -18];

pub const LUMA_OFFSET: f32 = 16.0;
pub const CHROMA_OFFSET: f32 = 128.0;

pub const SAMPLE_MAX: f32 = 255.0;

#[derive(IntoPrimitive, TryFromPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Channels {
    Gray = 1,
    Rgb = 3,
}

impl Channels {
    pub fn from_color_flag(color: bool) -> Self {
        if color {
            Channels::Rgb
        } else {
            Channels::Gray
        }
    }

    pub fn count(self) -> usize {
        u8::from(self) as usize
    }

    pub fn is_color(self) -> bool {
        self == Channels::Rgb
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassParams {
    pub search_window: usize, // side of the square search neighbourhood
    pub patch_size: usize,
    pub max_group: usize,      // rounded down to a power of two by the engine
    pub match_threshold: f32,  // max mean squared patch difference
    pub step: usize,           // stride between reference patches
    pub lambda_3d: Option<f32>, // None for the wiener pass
}

impl PassParams {
    pub const fn hard(
        search_window: usize,
        patch_size: usize,
        max_group: usize,
        match_threshold: f32,
        step: usize,
        lambda_3d: f32,
    ) -> Self {
        Self {
            search_window,
            patch_size,
            max_group,
            match_threshold,
            step,
            lambda_3d: Some(lambda_3d),
        }
    }

    pub const fn wiener(
        search_window: usize,
        patch_size: usize,
        max_group: usize,
        match_threshold: f32,
        step: usize,
    ) -> Self {
        Self {
            search_window,
            patch_size,
            max_group,
            match_threshold,
            step,
            lambda_3d: None,
        }
    }
}

pub const DEFAULT_FIRST_PASS: PassParams = PassParams::hard(19, 8, 16, 2500.0, 3, 2.7);
pub const DEFAULT_SECOND_PASS: PassParams = PassParams::wiener(19, 8, 32, 400.0, 3);

// `second` is always configured, the engine only uses it for two-step runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseConfig {
    pub first: PassParams,
    pub second: PassParams,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST_PASS,
            second: DEFAULT_SECOND_PASS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    pub channels: Channels,
    pub two_step: bool,
    pub verbose: bool,
    pub denoise: DenoiseConfig,
}

impl RunConfig {
    pub fn new(channels: Channels, two_step: bool, verbose: bool) -> Self {
        Self {
            channels,
            two_step,
            verbose,
            denoise: DenoiseConfig::default(),
        }
    }

    pub fn steps(&self) -> usize {
        if self.two_step {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_from_primitive() {
        assert_eq!(Channels::try_from(3u8).unwrap(), Channels::Rgb);
        assert_eq!(Channels::try_from(1u8).unwrap(), Channels::Gray);
        assert!(Channels::try_from(4u8).is_err());
        assert_eq!(Channels::from_color_flag(true).count(), 3);
    }

    #[test]
    fn default_passes() {
        let config = DenoiseConfig::default();
        assert_eq!(config.first.lambda_3d, Some(2.7));
        assert_eq!(config.second.lambda_3d, None);
        assert_eq!(config.first.max_group, 16);
        assert_eq!(config.second.max_group, 32);
        assert_eq!(config.first.patch_size, config.second.patch_size);
    }
}
