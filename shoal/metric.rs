use thiserror::Error;

use crate::buffer::Raster;
use crate::io::LoadError;

#[derive(Error, Debug)]
pub enum MetricError {
    #[error("reference image: {0}")]
    Reference(#[from] LoadError),

    #[error(
        "reference is {reference:?} but the output is {output:?} (width, height, channels)"
    )]
    ShapeMismatch {
        reference: (usize, usize, usize),
        output: (usize, usize, usize),
    },
}

fn dims(r: &Raster) -> (usize, usize, usize) {
    (r.width(), r.height(), r.channels())
}

// identical images give f64::INFINITY
pub fn psnr(reference: &Raster, image: &Raster) -> Result<f64, MetricError> {
    if !reference.shape_eq(image) {
        return Err(MetricError::ShapeMismatch {
            reference: dims(reference),
            output: dims(image),
        });
    }

    let (sum, count) = reference
        .view()
        .iter()
        .zip(image.view().iter())
        .fold((0u64, 0u64), |(sum, count), (a, b)| {
            let d = (*a as i64 - *b as i64).unsigned_abs();
            (sum + d * d, count + 1)
        });

    if sum == 0 || count == 0 {
        return Ok(f64::INFINITY);
    }

    let mse = sum as f64 / count as f64;
    Ok(10.0 * (255.0f64 * 255.0 / mse).log10())
}
