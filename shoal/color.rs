//! RGB <-> luma/chroma (YCbCr, BT.601 studio swing) conversion.
//!
//! The forward matrix uses the same fixed-point rows as the variance mapper, so the variances
//! handed to the engine describe exactly the basis the samples are expressed in. The samples
//! stay in `f32` until they are written back to a [`Raster`](crate::buffer::Raster).

use ndarray::Axis;

use crate::buffer::Samples;
use crate::types::{
    Channels, CHROMA_BLUE_ROW, CHROMA_OFFSET, CHROMA_RED_ROW, FIXED_POINT_SCALE, LUMA_OFFSET,
    LUMA_ROW,
};

type Matrix = [[f64; 3]; 3];

const OFFSETS: [f64; 3] = [LUMA_OFFSET as f64, CHROMA_OFFSET as f64, CHROMA_OFFSET as f64];

fn forward_matrix() -> Matrix {
    let scale = FIXED_POINT_SCALE as f64;
    [LUMA_ROW, CHROMA_BLUE_ROW, CHROMA_RED_ROW].map(|row| row.map(|c| c as f64 / scale))
}

fn invert(m: &Matrix) -> Matrix {
    let cofactor = |r: usize, c: usize| {
        let (r0, r1) = ((r + 1) % 3, (r + 2) % 3);
        let (c0, c1) = ((c + 1) % 3, (c + 2) % 3);
        m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
    };

    let det: f64 = (0..3).map(|c| m[0][c] * cofactor(0, c)).sum();

    let mut inv = [[0.0; 3]; 3];
    for (r, row) in inv.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            // transpose of the cofactor matrix
            *value = cofactor(c, r) / det;
        }
    }
    inv
}

fn apply(buffer: &Samples, matrix: &Matrix, pre: [f64; 3], post: [f64; 3]) -> Samples {
    let mut out = buffer.clone();
    if buffer.channels() != Channels::Rgb.count() {
        return out;
    }

    for mut px in out.view_mut().lanes_mut(Axis(2)) {
        let v = [
            px[0] as f64 - pre[0],
            px[1] as f64 - pre[1],
            px[2] as f64 - pre[2],
        ];
        for (k, row) in matrix.iter().enumerate() {
            px[k] = (row[0] * v[0] + row[1] * v[1] + row[2] * v[2] + post[k]) as f32;
        }
    }

    out
}

/// RGB to luma/chroma. Buffers that are not 3-channel come back unchanged.
pub fn to_luma_chroma(buffer: &Samples) -> Samples {
    apply(buffer, &forward_matrix(), [0.0; 3], OFFSETS)
}

/// Luma/chroma back to RGB, the exact inverse of [`to_luma_chroma`].
pub fn to_rgb(buffer: &Samples) -> Samples {
    apply(buffer, &invert(&forward_matrix()), OFFSETS, [0.0; 3])
}

pub fn forward(buffer: &Samples, channels: Channels) -> Samples {
    match channels {
        Channels::Rgb => to_luma_chroma(buffer),
        Channels::Gray => buffer.clone(),
    }
}

pub fn inverse(buffer: &Samples, channels: Channels) -> Samples {
    match channels {
        Channels::Rgb => to_rgb(buffer),
        Channels::Gray => buffer.clone(),
    }
}
