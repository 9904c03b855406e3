use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

use crate::types::{Channels, CHROMA_BLUE_ROW, CHROMA_RED_ROW, FIXED_POINT_SCALE, LUMA_ROW};

/// One noise variance per channel, in the channel order of the buffer handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarianceVector(SmallVec<[u32; 3]>);

impl VarianceVector {
    pub fn sigma(&self, channel: usize) -> f32 {
        (self.0[channel] as f32).sqrt()
    }
}

impl Deref for VarianceVector {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.0
    }
}

impl From<&[u32]> for VarianceVector {
    fn from(values: &[u32]) -> Self {
        Self(SmallVec::from_slice(values))
    }
}

impl fmt::Display for VarianceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

// sum of squared coefficients times s, divided once by 256^2, saturating at u32::MAX
#[inline]
fn project(row: [i64; 3], s: i64) -> u32 {
    let s = s as i128;
    let acc: i128 = row.iter().map(|&c| c as i128 * c as i128 * s).sum();
    let scale = FIXED_POINT_SCALE as i128;
    u32::try_from(acc / (scale * scale)).unwrap_or(u32::MAX)
}

pub fn map_variance(sigma: f32, channels: Channels) -> VarianceVector {
    let sigma = if sigma.is_finite() { sigma.max(0.0) } else { 0.0 };
    let sigma2 = sigma as f64 * sigma as f64;

    let values: SmallVec<[u32; 3]> = match channels {
        Channels::Gray => smallvec::smallvec![sigma2.round() as u32],
        Channels::Rgb => {
            let s = sigma2 as i64;
            smallvec::smallvec![
                project(LUMA_ROW, s),
                project(CHROMA_BLUE_ROW, s),
                project(CHROMA_RED_ROW, s),
            ]
        }
    };

    VarianceVector(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_is_rounded_square() {
        assert_eq!(&*map_variance(25.0, Channels::Gray), &[625]);
        assert_eq!(&*map_variance(2.5, Channels::Gray), &[6]);
        assert_eq!(&*map_variance(0.7, Channels::Gray), &[0]);
        for i in 0..200 {
            let sigma = i as f32 * 0.37;
            let v = map_variance(sigma, Channels::Gray);
            assert_eq!(v.len(), 1);
            assert_eq!(v[0], (sigma as f64 * sigma as f64).round() as u32);
        }
    }

    #[test]
    fn color_uses_fixed_point_rows() {
        // s = 400
        // (66^2 + 129^2 + 25^2) * 400 / 65536 = 8648800 / 65536
        // (38^2 + 74^2 + 112^2) * 400 / 65536 = 7785600 / 65536
        // (112^2 + 94^2 + 18^2) * 400 / 65536 = 8681600 / 65536
        assert_eq!(&*map_variance(20.0, Channels::Rgb), &[131, 118, 132]);
    }

    #[test]
    fn zero_sigma_gives_zero_variances() {
        assert_eq!(&*map_variance(0.0, Channels::Rgb), &[0, 0, 0]);
        assert_eq!(&*map_variance(0.0, Channels::Gray), &[0]);
    }

    #[test]
    fn invalid_sigma_is_treated_as_zero() {
        assert_eq!(&*map_variance(-4.0, Channels::Rgb), &[0, 0, 0]);
        assert_eq!(&*map_variance(f32::NAN, Channels::Gray), &[0]);
    }

    #[test]
    fn color_length_and_monotonic() {
        let mut prev = map_variance(0.0, Channels::Rgb);
        for i in 1..100 {
            let v = map_variance(i as f32, Channels::Rgb);
            assert_eq!(v.len(), 3);
            for k in 0..3 {
                assert!(v[k] >= prev[k]);
            }
            prev = v;
        }
    }

    #[test]
    fn large_sigma_saturates() {
        let v = map_variance(2.0e5, Channels::Rgb);
        // luma row has the largest sum of squares, chroma-red next, chroma-blue last
        assert!(v[0] >= v[2] && v[2] >= v[1]);
        assert_eq!(v[0], u32::MAX);

        assert_eq!(&*map_variance(1.0e8, Channels::Rgb), &[u32::MAX; 3]);
        assert_eq!(&*map_variance(f32::MAX, Channels::Rgb), &[u32::MAX; 3]);
        assert_eq!(&*map_variance(1.0e5, Channels::Gray), &[u32::MAX]);

        let mut prev = map_variance(0.0, Channels::Rgb);
        for e in 0..40 {
            let v = map_variance(1.6f32.powi(e), Channels::Rgb);
            for k in 0..3 {
                assert!(v[k] >= prev[k], "sigma 1.6^{e}, channel {k}");
            }
            prev = v;
        }
    }

    #[test]
    fn display_is_space_separated() {
        assert_eq!(map_variance(20.0, Channels::Rgb).to_string(), "131 118 132");
        assert_eq!(map_variance(3.0, Channels::Gray).to_string(), "9");
    }
}
