//! CPU block-matching and 3D filtering.
//!
//! Patches are grouped on the first channel (luma for colour input) and every channel is
//! filtered with the same groups. The first pass hard-thresholds the 3D spectrum of each group,
//! the optional second pass applies empirical Wiener shrinkage driven by the first pass result.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use super::matching::{find_group, reference_positions, MatchParams, Plane};
use super::transform::{group_transform, Dct2};
use super::{DenoiseEngine, DenoiseError};
use crate::buffer::Samples;
use crate::types::{Channels, PassParams, DEFAULT_FIRST_PASS, DEFAULT_SECOND_PASS};
use crate::variance::VarianceVector;

#[derive(Debug, Clone)]
pub struct Bm3d {
    hard: PassParams,
    wiener: PassParams,
    verbose: bool,
}

impl Default for Bm3d {
    fn default() -> Self {
        Self {
            hard: DEFAULT_FIRST_PASS,
            wiener: DEFAULT_SECOND_PASS,
            verbose: false,
        }
    }
}

enum Filter<'a> {
    Hard { lambda: f32 },
    Wiener { basic: &'a [Plane] },
}

// filtered patches of one group, per channel, with their aggregation weights
struct GroupEstimate {
    positions: Vec<(usize, usize)>,
    patches: Vec<Vec<f32>>,
    weights: Vec<f32>,
}

struct Accumulator {
    numerator: Vec<Vec<f32>>,
    denominator: Vec<Vec<f32>>,
}

impl Accumulator {
    fn new(channels: usize, len: usize) -> Self {
        Self {
            numerator: vec![vec![0.0; len]; channels],
            denominator: vec![vec![0.0; len]; channels],
        }
    }

    fn add(&mut self, estimate: &GroupEstimate, width: usize, k: usize) {
        let patch_len = k * k;
        for (c, patches) in estimate.patches.iter().enumerate() {
            let w = estimate.weights[c];
            for (i, &(y, x)) in estimate.positions.iter().enumerate() {
                let patch = &patches[i * patch_len..(i + 1) * patch_len];
                for dy in 0..k {
                    let row = (y + dy) * width + x;
                    for dx in 0..k {
                        self.numerator[c][row + dx] += w * patch[dy * k + dx];
                        self.denominator[c][row + dx] += w;
                    }
                }
            }
        }
    }

    // pixels no group touched keep their input value
    fn finish(self, fallback: &[Plane]) -> Vec<Plane> {
        self.numerator
            .into_iter()
            .zip(self.denominator)
            .zip(fallback)
            .map(|((num, den), src)| Plane {
                width: src.width,
                height: src.height,
                data: num
                    .iter()
                    .zip(&den)
                    .zip(&src.data)
                    .map(|((n, d), s)| if *d > 0.0 { n / d } else { *s })
                    .collect(),
            })
            .collect()
    }
}

impl Bm3d {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(params: &PassParams, width: usize, height: usize) -> Result<(), DenoiseError> {
        if params.patch_size == 0 || params.step == 0 || params.max_group == 0 {
            return Err(DenoiseError::InvalidParams(format!(
                "patch size, step and group size must be positive: {params:?}"
            )));
        }
        if params.lambda_3d.is_some_and(|l| !(l > 0.0)) {
            return Err(DenoiseError::InvalidParams(format!(
                "threshold multiplier must be positive: {params:?}"
            )));
        }
        if width < params.patch_size || height < params.patch_size {
            return Err(DenoiseError::TooSmall {
                width,
                height,
                patch: params.patch_size,
            });
        }
        Ok(())
    }

    fn run_pass(
        &self,
        params: &PassParams,
        noisy: &[Plane],
        sigmas: &[f32],
        filter: Filter<'_>,
    ) -> Vec<Plane> {
        let guide = match &filter {
            Filter::Hard { .. } => &noisy[0],
            Filter::Wiener { basic } => &basic[0],
        };
        let (width, height) = (guide.width, guide.height);
        let k = params.patch_size;
        let matching = MatchParams {
            patch_size: k,
            search_window: params.search_window,
            max_group: params.max_group,
            threshold: params.match_threshold,
        };
        let dct = Dct2::new(k);

        let rows = reference_positions(height, k, params.step);
        let cols = reference_positions(width, k, params.step);
        let mut acc = Accumulator::new(noisy.len(), width * height);

        for &ry in &rows {
            let estimates: Vec<GroupEstimate> = cols
                .par_iter()
                .map(|&rx| {
                    let positions = find_group(guide, (ry, rx), &matching);
                    filter_group(&dct, positions, noisy, sigmas, &filter)
                })
                .collect();

            for estimate in &estimates {
                acc.add(estimate, width, k);
            }
        }

        acc.finish(noisy)
    }
}

fn stack(plane: &Plane, positions: &[(usize, usize)], dct: &Dct2, scratch: &mut [f32]) -> Vec<f32> {
    let k = dct.size();
    let patch_len = k * k;
    let mut group = vec![0.0; positions.len() * patch_len];
    for (i, &(y, x)) in positions.iter().enumerate() {
        let patch = &mut group[i * patch_len..(i + 1) * patch_len];
        plane.read_patch(y, x, k, patch);
        dct.forward(patch, scratch);
    }
    group
}

fn unstack(group: &mut [f32], dct: &Dct2, scratch: &mut [f32]) {
    let patch_len = dct.size() * dct.size();
    for patch in group.chunks_exact_mut(patch_len) {
        dct.inverse(patch, scratch);
    }
}

fn filter_group(
    dct: &Dct2,
    positions: Vec<(usize, usize)>,
    noisy: &[Plane],
    sigmas: &[f32],
    filter: &Filter<'_>,
) -> GroupEstimate {
    let patch_len = dct.size() * dct.size();
    let mut scratch = vec![0.0; patch_len];
    let mut column = Vec::with_capacity(positions.len());

    let mut patches = Vec::with_capacity(noisy.len());
    let mut weights = Vec::with_capacity(noisy.len());

    for (c, plane) in noisy.iter().enumerate() {
        let sigma = sigmas[c];
        let mut group = stack(plane, &positions, dct, &mut scratch);
        group_transform(&mut group, patch_len, &mut column);

        let weight = match filter {
            Filter::Hard { lambda } => {
                let threshold = lambda * sigma;
                let mut retained = 0usize;
                for v in group.iter_mut() {
                    if v.abs() <= threshold {
                        *v = 0.0;
                    } else {
                        retained += 1;
                    }
                }
                if retained > 0 {
                    1.0 / (sigma * sigma * retained as f32)
                } else {
                    1.0
                }
            }
            Filter::Wiener { basic } => {
                let mut estimate = stack(&basic[c], &positions, dct, &mut scratch);
                group_transform(&mut estimate, patch_len, &mut column);

                let sigma2 = sigma * sigma;
                let mut energy = 0.0;
                for (v, b) in group.iter_mut().zip(&estimate) {
                    let b2 = b * b;
                    let w = b2 / (b2 + sigma2);
                    *v *= w;
                    energy += w * w;
                }
                if energy > 0.0 {
                    1.0 / (sigma2 * energy)
                } else {
                    1.0
                }
            }
        };

        group_transform(&mut group, patch_len, &mut column);
        unstack(&mut group, dct, &mut scratch);
        patches.push(group);
        weights.push(weight);
    }

    GroupEstimate {
        positions,
        patches,
        weights,
    }
}

impl DenoiseEngine for Bm3d {
    fn configure_first_pass(&mut self, params: PassParams) {
        self.hard = params;
    }

    fn configure_second_pass(&mut self, params: PassParams) {
        self.wiener = params;
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    fn denoise(
        &mut self,
        input: &Samples,
        output: &mut Samples,
        channels: Channels,
        variances: &VarianceVector,
        two_step: bool,
    ) -> Result<(), DenoiseError> {
        super::check_contract(input, output, channels, variances)?;

        let (width, height) = (input.width(), input.height());
        Self::validate(&self.hard, width, height)?;
        if two_step {
            Self::validate(&self.wiener, width, height)?;
        }

        let lambda = self
            .hard
            .lambda_3d
            .ok_or_else(|| DenoiseError::InvalidParams("first pass needs a threshold".into()))?;

        let noisy: Vec<Plane> = (0..channels.count())
            .map(|c| Plane::from_array(input.plane(c)))
            .collect();

        // zero-variance channels pass through untouched
        let active: Vec<usize> = (0..noisy.len()).filter(|&c| variances[c] > 0).collect();
        if active.is_empty() {
            debug!("all variances are zero, copying input");
            output.view_mut().assign(&input.view());
            return Ok(());
        }

        // the guide channel must stay first so grouping happens on it
        let order: Vec<usize> = if active[0] == 0 {
            active.clone()
        } else {
            std::iter::once(0).chain(active.iter().copied()).collect()
        };
        let working: Vec<Plane> = order.iter().map(|&c| noisy[c].clone()).collect();
        let sigmas: Vec<f32> = order
            .iter()
            .map(|&c| variances.sigma(c).max(f32::EPSILON))
            .collect();

        let start = Instant::now();
        let basic = self.run_pass(&self.hard, &working, &sigmas, Filter::Hard { lambda });
        debug!(elapsed = ?start.elapsed(), "hard thresholding pass done");
        if self.verbose {
            info!("step 1 finished in {:?}", start.elapsed());
        }

        let result = if two_step {
            let start = Instant::now();
            let refined = self.run_pass(
                &self.wiener,
                &working,
                &sigmas,
                Filter::Wiener { basic: &basic },
            );
            debug!(elapsed = ?start.elapsed(), "wiener pass done");
            if self.verbose {
                info!("step 2 finished in {:?}", start.elapsed());
            }
            refined
        } else {
            basic
        };

        output.view_mut().assign(&input.view());
        for (plane, &c) in result.into_iter().zip(&order) {
            if variances[c] > 0 {
                output.set_plane(c, &plane.into_array());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::map_variance;

    // deterministic pseudo-noise in [-amp, amp]
    fn noise(i: usize, amp: f32) -> f32 {
        let mut z = (i as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        ((z >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0) * amp
    }

    fn noisy_gradient(width: usize, height: usize, channels: usize, amp: f32) -> (Samples, Samples) {
        let clean: Vec<f32> = (0..width * height * channels)
            .map(|i| 60.0 + ((i / channels) % width) as f32 * 2.0)
            .collect();
        let noisy = clean
            .iter()
            .enumerate()
            .map(|(i, v)| v + noise(i, amp))
            .collect();
        (
            Samples::from_raw(width, height, channels, clean).unwrap(),
            Samples::from_raw(width, height, channels, noisy).unwrap(),
        )
    }

    fn mse(a: &Samples, b: &Samples) -> f32 {
        let n = a.view().len() as f32;
        a.view()
            .iter()
            .zip(b.view().iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            / n
    }

    fn small_engine() -> Bm3d {
        let mut engine = Bm3d::new();
        engine.configure_first_pass(PassParams::hard(9, 4, 8, 2500.0, 2, 2.7));
        engine.configure_second_pass(PassParams::wiener(9, 4, 16, 400.0, 2));
        engine
    }

    #[test]
    fn reduces_noise_on_gray() {
        let (clean, noisy) = noisy_gradient(24, 24, 1, 30.0);
        let variances = map_variance(17.0, Channels::Gray);
        let mut out = Samples::zeros(24, 24, 1);

        small_engine()
            .denoise(&noisy, &mut out, Channels::Gray, &variances, false)
            .unwrap();

        assert!(mse(&clean, &out) < mse(&clean, &noisy));
    }

    #[test]
    fn two_step_reduces_noise() {
        let (clean, noisy) = noisy_gradient(24, 24, 1, 30.0);
        let variances = map_variance(17.0, Channels::Gray);
        let mut out = Samples::zeros(24, 24, 1);

        small_engine()
            .denoise(&noisy, &mut out, Channels::Gray, &variances, true)
            .unwrap();

        assert!(mse(&clean, &out) < mse(&clean, &noisy));
    }

    #[test]
    fn deterministic_output() {
        let (_, noisy) = noisy_gradient(20, 16, 3, 20.0);
        let variances = map_variance(12.0, Channels::Rgb);
        let mut engine = small_engine();

        let mut a = Samples::zeros(20, 16, 3);
        let mut b = Samples::zeros(20, 16, 3);
        engine.denoise(&noisy, &mut a, Channels::Rgb, &variances, false).unwrap();
        engine.denoise(&noisy, &mut b, Channels::Rgb, &variances, false).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn zero_variance_copies_input() {
        let (_, noisy) = noisy_gradient(16, 16, 3, 20.0);
        let variances = map_variance(0.0, Channels::Rgb);
        let mut out = Samples::zeros(16, 16, 3);

        small_engine()
            .denoise(&noisy, &mut out, Channels::Rgb, &variances, true)
            .unwrap();

        assert_eq!(out, noisy);
    }

    #[test]
    fn zero_variance_channel_is_untouched() {
        let (_, noisy) = noisy_gradient(16, 16, 3, 20.0);
        let variances = VarianceVector::from(&[0u32, 100, 100][..]);
        let mut out = Samples::zeros(16, 16, 3);

        small_engine()
            .denoise(&noisy, &mut out, Channels::Rgb, &variances, false)
            .unwrap();

        assert_eq!(out.plane(0), noisy.plane(0));
        assert_ne!(out.plane(1), noisy.plane(1));
    }

    #[test]
    fn rejects_image_smaller_than_patch() {
        let input = Samples::zeros(4, 4, 1);
        let mut out = Samples::zeros(4, 4, 1);
        let err = Bm3d::new()
            .denoise(&input, &mut out, Channels::Gray, &map_variance(5.0, Channels::Gray), false)
            .unwrap_err();
        assert!(matches!(err, DenoiseError::TooSmall { patch: 8, .. }));
    }

    #[test]
    fn rejects_zero_step() {
        let mut engine = Bm3d::new();
        engine.configure_first_pass(PassParams::hard(19, 8, 16, 2500.0, 0, 2.7));
        let input = Samples::zeros(16, 16, 1);
        let mut out = Samples::zeros(16, 16, 1);
        let err = engine
            .denoise(&input, &mut out, Channels::Gray, &map_variance(5.0, Channels::Gray), false)
            .unwrap_err();
        assert!(matches!(err, DenoiseError::InvalidParams(_)));
    }
}
