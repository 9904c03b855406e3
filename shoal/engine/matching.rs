use ndarray::Array2;

#[derive(Debug, Clone)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn from_array(plane: Array2<f32>) -> Self {
        let (height, width) = plane.dim();
        Self {
            width,
            height,
            // standard layout, the array comes from `to_owned`
            data: plane.into_raw_vec(),
        }
    }

    pub fn into_array(self) -> Array2<f32> {
        Array2::from_shape_vec((self.height, self.width), self.data)
            .unwrap_or_else(|e| unreachable!("plane shape is fixed at construction: {e}"))
    }

    #[inline]
    pub fn at(&self, y: usize, x: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn read_patch(&self, y: usize, x: usize, size: usize, out: &mut [f32]) {
        for dy in 0..size {
            let start = (y + dy) * self.width + x;
            out[dy * size..(dy + 1) * size].copy_from_slice(&self.data[start..start + size]);
        }
    }

    fn distance(&self, a: (usize, usize), b: (usize, usize), size: usize) -> f32 {
        let mut acc = 0.0;
        for dy in 0..size {
            let ra = (a.0 + dy) * self.width + a.1;
            let rb = (b.0 + dy) * self.width + b.1;
            for dx in 0..size {
                let d = self.data[ra + dx] - self.data[rb + dx];
                acc += d * d;
            }
        }
        acc / (size * size) as f32
    }
}

// the last valid position is always included so the border is covered
pub fn reference_positions(extent: usize, patch: usize, step: usize) -> Vec<usize> {
    let last = extent - patch;
    let mut positions: Vec<usize> = (0..=last).step_by(step).collect();
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}

#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    pub patch_size: usize,
    pub search_window: usize,
    pub max_group: usize,
    pub threshold: f32,
}

// closest first, reference always first, count is a power of two
pub fn find_group(
    guide: &Plane,
    reference: (usize, usize),
    params: &MatchParams,
) -> Vec<(usize, usize)> {
    let k = params.patch_size;
    let radius = params.search_window / 2;
    let (ry, rx) = reference;

    let y0 = ry.saturating_sub(radius);
    let y1 = (ry + radius).min(guide.height - k);
    let x0 = rx.saturating_sub(radius);
    let x1 = (rx + radius).min(guide.width - k);

    let mut candidates: Vec<(f32, (usize, usize))> = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if (y, x) == reference {
                continue;
            }
            let d = guide.distance(reference, (y, x), k);
            if d <= params.threshold {
                candidates.push((d, (y, x)));
            }
        }
    }
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let cap = prev_power_of_two(params.max_group.max(1));
    let available = prev_power_of_two(candidates.len() + 1);
    let n = cap.min(available);

    std::iter::once(reference)
        .chain(candidates.into_iter().map(|(_, pos)| pos))
        .take(n)
        .collect()
}

#[inline]
fn prev_power_of_two(n: usize) -> usize {
    if n.is_power_of_two() {
        n
    } else {
        n.next_power_of_two() / 2
    }
}
