//! Signed Distance Fields
//!
//! Euclidean distance transform after Felzenszwalb & Huttenlocher, computed
//! separably (rows, then columns) over two seed grids built from the alpha
//! channel. Negative values are inside the shape, positive values outside.
//!
//! Seeds are soft: an outside pixel seeds the inner grid with `alpha²` and an
//! inside pixel seeds the outer grid with `(1 - alpha)²`, so partially covered
//! edge pixels start closer to the boundary than fully covered ones.

use crate::raster::RasterBuffer;

/// Stands in for "no seed". Larger than any squared distance inside a
/// realistic icon, small enough to never overflow when summed.
pub const SDF_SENTINEL: f64 = 1e30;

/// Distance (in pixels) mapped onto the full 8-bit range when encoding.
pub const DEFAULT_SDF_RADIUS: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl DistanceField {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.values[y as usize * self.width as usize + x as usize])
    }

    /// Quantize to one byte per pixel: inside is bright, the boundary sits at
    /// 128 and anything `radius` or further outside is 0.
    pub fn encode(&self, radius: f64) -> Vec<u8> {
        self.values.iter().map(|&d| encode_distance(d, radius)).collect()
    }

    /// RGBA tile carrying the encoded field in its alpha channel.
    pub fn to_raster(&self, radius: f64) -> RasterBuffer {
        let alphas = self.values.iter().map(|&d| encode_distance(d, radius));
        RasterBuffer::from_alphas(self.width, self.height, alphas)
    }
}

fn encode_distance(d: f64, radius: f64) -> u8 {
    let t = 0.5 - d / (2.0 * radius);
    (t * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Compute the signed distance field of `buffer`'s alpha channel.
pub fn compute_sdf(buffer: &RasterBuffer) -> DistanceField {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let len = width * height;

    let mut d_inner = vec![SDF_SENTINEL; len];
    let mut d_outer = vec![SDF_SENTINEL; len];

    for (i, a) in buffer.alphas().enumerate() {
        let alpha = a as f64 / 255.0;
        if alpha < 0.5 {
            d_inner[i] = alpha * alpha;
        } else {
            d_outer[i] = (1.0 - alpha) * (1.0 - alpha);
        }
    }

    let mut envelope = Envelope::with_capacity(width.max(height));
    transform_2d(&mut d_inner, width, height, &mut envelope);
    transform_2d(&mut d_outer, width, height, &mut envelope);

    let values = d_inner
        .iter()
        .zip(&d_outer)
        .map(|(&inner, &outer)| {
            if outer < inner {
                -inner.sqrt()
            } else {
                outer.sqrt()
            }
        })
        .collect();

    DistanceField {
        width: buffer.width(),
        height: buffer.height(),
        values,
    }
}

/// Scratch space for the lower envelope of parabolas.
///
/// Sized once for the longest row or column and reused for every line.
struct Envelope {
    /// Copy of the line being transformed.
    f: Vec<f64>,
    /// Parabola vertex positions.
    v: Vec<usize>,
    /// Boundaries between consecutive parabolas; one longer than `v`.
    z: Vec<f64>,
}

impl Envelope {
    fn with_capacity(n: usize) -> Self {
        Self {
            f: vec![0.0; n],
            v: vec![0; n],
            z: vec![0.0; n + 1],
        }
    }
}

fn transform_2d(grid: &mut [f64], width: usize, height: usize, envelope: &mut Envelope) {
    for y in 0..height {
        transform_1d(grid, y * width, 1, width, envelope);
    }
    for x in 0..width {
        transform_1d(grid, x, width, height, envelope);
    }
}

/// In-place 1D squared distance transform of `len` samples starting at
/// `offset`, `stride` apart: `out[q] = min_p f[p] + (q - p)²`.
fn transform_1d(grid: &mut [f64], offset: usize, stride: usize, len: usize, envelope: &mut Envelope) {
    if len == 0 {
        return;
    }
    let Envelope { f, v, z } = envelope;

    for q in 0..len {
        f[q] = grid[offset + q * stride];
    }

    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..len {
        let fq = f[q] + (q * q) as f64;
        let mut s = intersection(f, fq, q, v[k]);
        // z[0] is -inf, so the envelope never pops below its first parabola.
        while k > 0 && s <= z[k] {
            k -= 1;
            s = intersection(f, fq, q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    let mut k = 0usize;
    for q in 0..len {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let r = v[k];
        let d = q as f64 - r as f64;
        grid[offset + q * stride] = f[r] + d * d;
    }
}

/// Horizontal position where the parabola rooted at `q` (with `fq = f[q] + q²`)
/// overtakes the one rooted at `r < q`.
fn intersection(f: &[f64], fq: f64, q: usize, r: usize) -> f64 {
    (fq - f[r] - (r * r) as f64) / (2.0 * (q - r) as f64)
}
