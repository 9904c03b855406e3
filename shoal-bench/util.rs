use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use shoal::Raster;

/// Adds white Gaussian noise with standard deviation `sigma` to every sample.
pub fn add_noise(clean: &Raster, sigma: f32, seed: u64) -> Raster {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut noisy = clean.clone();
    let Ok(normal) = Normal::new(0.0f32, sigma.max(0.0)) else {
        return noisy;
    };

    for v in noisy.view_mut().iter_mut() {
        *v = (*v as f32 + normal.sample(&mut rng)).round().clamp(0.0, 255.0) as u8;
    }
    noisy
}

pub fn to_dir(path: &str) -> String {
    path.split('/')
        .take(path.split('/').count() - 1)
        .collect::<Vec<&str>>()
        .join("/")
}

pub fn is_image(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".png", ".tif", ".tiff"].iter().any(|ext| lower.ends_with(ext))
}
