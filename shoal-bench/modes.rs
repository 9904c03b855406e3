use shoal::{Channels, RunConfig};
use strum_macros::{Display, EnumIter};

#[derive(Debug, Display, EnumIter, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Mode {
    #[strum(serialize = "gray-1")]
    GrayOneStep,
    #[strum(serialize = "gray-2")]
    GrayTwoStep,
    #[strum(serialize = "color-1")]
    ColorOneStep,
    #[strum(serialize = "color-2")]
    ColorTwoStep,
}

impl Mode {
    pub fn channels(&self) -> Channels {
        match self {
            Mode::GrayOneStep | Mode::GrayTwoStep => Channels::Gray,
            Mode::ColorOneStep | Mode::ColorTwoStep => Channels::Rgb,
        }
    }

    pub fn config(&self) -> RunConfig {
        let two_step = matches!(self, Mode::GrayTwoStep | Mode::ColorTwoStep);
        RunConfig::new(self.channels(), two_step, false)
    }
}
