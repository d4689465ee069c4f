use palette::Srgb;

use crate::error::AnalyzeError;

/// Number of representative colors requested from [`median_cut`].
///
/// Only powers of two up to 256 are accepted, since every recursion level
/// doubles the number of buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteSize {
    depth: u32,
}

impl PaletteSize {
    pub const MAX: usize = 256;

    pub fn new(n_colors: usize) -> Result<Self, AnalyzeError> {
        if n_colors == 0 || n_colors > Self::MAX || !n_colors.is_power_of_two() {
            return Err(AnalyzeError::InvalidPaletteSize(n_colors));
        }
        Ok(Self {
            depth: n_colors.trailing_zeros(),
        })
    }

    pub fn depth(self) -> u32 {
        self.depth
    }

    pub fn colors(self) -> usize {
        1 << self.depth
    }
}

impl Default for PaletteSize {
    fn default() -> Self {
        Self { depth: 3 }
    }
}

/// Reduce `samples` to at most `size.colors()` representative colors.
///
/// The slice is reordered in place. Buckets holding a single sample stop
/// splitting early, so fewer colors come back when there are fewer samples
/// than requested. Duplicate colors are kept.
pub fn median_cut(samples: &mut [Srgb<u8>], size: PaletteSize) -> Vec<Srgb<u8>> {
    let mut out = Vec::with_capacity(size.colors());
    if !samples.is_empty() {
        split_bucket(samples, size.depth(), &mut out);
    }
    out
}

fn split_bucket(bucket: &mut [Srgb<u8>], depth: u32, out: &mut Vec<Srgb<u8>>) {
    if depth == 0 || bucket.len() <= 1 {
        out.push(bucket_mean(bucket));
        return;
    }

    let axis = widest_channel(bucket);
    // Stable sort keeps equal keys in input order, which makes the output deterministic.
    bucket.sort_by_key(|c| channel(c, axis));

    let mid = bucket.len() / 2;
    let (left, right) = bucket.split_at_mut(mid);
    split_bucket(left, depth - 1, out);
    split_bucket(right, depth - 1, out);
}

/// Channel index (0 = red, 1 = green, 2 = blue) with the largest value range.
/// Ties resolve to the lowest index.
fn widest_channel(bucket: &[Srgb<u8>]) -> usize {
    let mut min = [u8::MAX; 3];
    let mut max = [u8::MIN; 3];
    for c in bucket {
        for axis in 0..3 {
            let v = channel(c, axis);
            min[axis] = min[axis].min(v);
            max[axis] = max[axis].max(v);
        }
    }

    let mut best = 0;
    for axis in 1..3 {
        if max[axis] - min[axis] > max[best] - min[best] {
            best = axis;
        }
    }
    best
}

#[inline(always)]
fn channel(c: &Srgb<u8>, axis: usize) -> u8 {
    match axis {
        0 => c.red,
        1 => c.green,
        _ => c.blue,
    }
}

/// Channel-wise mean rounded half up. Only called on non-empty buckets.
fn bucket_mean(bucket: &[Srgb<u8>]) -> Srgb<u8> {
    debug_assert!(!bucket.is_empty());
    let n = bucket.len().max(1) as u64;
    let mut sum = [0u64; 3];
    for c in bucket {
        sum[0] += u64::from(c.red);
        sum[1] += u64::from(c.green);
        sum[2] += u64::from(c.blue);
    }
    let avg = |s: u64| ((2 * s + n) / (2 * n)) as u8;
    Srgb::new(avg(sum[0]), avg(sum[1]), avg(sum[2]))
}
