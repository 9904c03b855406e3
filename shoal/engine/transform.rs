use std::f32::consts::PI;

/// Separable orthonormal DCT-II over square `size x size` patches.
#[derive(Debug, Clone)]
pub struct Dct2 {
    size: usize,
    // basis[u * size + x]
    basis: Vec<f32>,
}

impl Dct2 {
    pub fn new(size: usize) -> Self {
        let n = size as f32;
        let mut basis = vec![0.0; size * size];
        for u in 0..size {
            let scale = if u == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            for x in 0..size {
                basis[u * size + x] =
                    scale * ((2.0 * x as f32 + 1.0) * u as f32 * PI / (2.0 * n)).cos();
            }
        }
        Self { size, basis }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn forward(&self, patch: &mut [f32], scratch: &mut [f32]) {
        self.pass(patch, scratch, false);
    }

    pub fn inverse(&self, coefs: &mut [f32], scratch: &mut [f32]) {
        self.pass(coefs, scratch, true);
    }

    // rows then columns; the inverse uses the transposed basis
    fn pass(&self, data: &mut [f32], scratch: &mut [f32], inverse: bool) {
        let n = self.size;
        let b = |u: usize, x: usize| {
            if inverse {
                self.basis[x * n + u]
            } else {
                self.basis[u * n + x]
            }
        };

        for row in 0..n {
            for u in 0..n {
                scratch[row * n + u] = (0..n).map(|x| b(u, x) * data[row * n + x]).sum();
            }
        }
        for col in 0..n {
            for u in 0..n {
                data[u * n + col] = (0..n).map(|y| b(u, y) * scratch[y * n + col]).sum();
            }
        }
    }
}

// normalised, self-inverse; length must be a power of two
pub fn walsh_hadamard(values: &mut [f32]) {
    let n = values.len();
    debug_assert!(n.is_power_of_two());

    let mut h = 1;
    while h < n {
        for i in (0..n).step_by(h * 2) {
            for j in i..i + h {
                let (a, b) = (values[j], values[j + h]);
                values[j] = a + b;
                values[j + h] = a - b;
            }
        }
        h *= 2;
    }

    let norm = 1.0 / (n as f32).sqrt();
    values.iter_mut().for_each(|v| *v *= norm);
}

// group is stored patch-major: group[i * patch_len + j]
pub fn group_transform(group: &mut [f32], patch_len: usize, column: &mut Vec<f32>) {
    let n = group.len() / patch_len;
    if n < 2 {
        return;
    }

    for j in 0..patch_len {
        column.clear();
        column.extend((0..n).map(|i| group[i * patch_len + j]));
        walsh_hadamard(column);
        for (i, v) in column.iter().enumerate() {
            group[i * patch_len + j] = *v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dct_round_trip() {
        let dct = Dct2::new(8);
        let original: Vec<f32> = (0..64).map(|i| ((i * 37) % 255) as f32).collect();
        let mut data = original.clone();
        let mut scratch = vec![0.0; 64];

        dct.forward(&mut data, &mut scratch);
        dct.inverse(&mut data, &mut scratch);

        for (a, b) in original.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn dct_of_flat_patch_is_dc_only() {
        let dct = Dct2::new(4);
        let mut data = vec![10.0; 16];
        let mut scratch = vec![0.0; 16];
        dct.forward(&mut data, &mut scratch);

        // orthonormal: DC = mean * size
        assert!((data[0] - 40.0).abs() < 1e-4);
        assert!(data[1..].iter().all(|v| v.abs() < 1e-4));
    }

    #[test]
    fn hadamard_is_self_inverse_and_energy_preserving() {
        let original = vec![1.0, -2.0, 3.5, 0.25, 8.0, -1.0, 0.0, 4.0];
        let mut data = original.clone();

        walsh_hadamard(&mut data);
        let energy: f32 = data.iter().map(|v| v * v).sum();
        let expected: f32 = original.iter().map(|v| v * v).sum();
        assert!((energy - expected).abs() < 1e-3);

        walsh_hadamard(&mut data);
        for (a, b) in original.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn single_patch_group_is_untouched() {
        let mut group = vec![1.0, 2.0, 3.0, 4.0];
        let mut column = Vec::new();
        group_transform(&mut group, 4, &mut column);
        assert_eq!(group, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
