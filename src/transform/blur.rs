//! Gaussian blur of a single-channel coverage plane, used for drop shadows.
//!
//! A shadow is one color, so only its coverage is blurred; the tint is applied afterwards.

use crate::foundation::error::{RounderError, RounderResult};

/// Pixels a blur of `blur_radius` spreads past a shape's edge.
pub(crate) fn blur_reach(blur_radius: f64) -> u32 {
    if !blur_radius.is_finite() || blur_radius <= 0.0 {
        return 0;
    }
    blur_radius.ceil() as u32
}

/// Blurred copy of `plane` (`width` x `height`, one byte per pixel), clamping at the edges.
pub(crate) fn blur_coverage(
    plane: &[u8],
    width: u32,
    height: u32,
    blur_radius: f64,
) -> RounderResult<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    if w.checked_mul(h) != Some(plane.len()) {
        return Err(RounderError::transform_failed(
            "coverage plane does not match width*height",
        ));
    }
    let reach = blur_reach(blur_radius);
    if reach == 0 || plane.is_empty() {
        return Ok(plane.to_vec());
    }
    let kernel = gaussian_weights(blur_radius, reach);

    let mut rows = vec![0f32; plane.len()];
    for (src, dst) in plane.chunks_exact(w).zip(rows.chunks_exact_mut(w)) {
        for (x, out) in dst.iter_mut().enumerate() {
            *out = convolve(&kernel, x, w, |i| f32::from(src[i]));
        }
    }

    let mut out = vec![0u8; plane.len()];
    for x in 0..w {
        for y in 0..h {
            let v = convolve(&kernel, y, h, |i| rows[i * w + x]);
            out[y * w + x] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

/// Normalized weights for offsets `-reach..=reach`; sigma is half the blur radius.
fn gaussian_weights(blur_radius: f64, reach: u32) -> Vec<f32> {
    let sigma = (blur_radius / 2.0).max(0.5);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let reach = i64::from(reach);
    let raw: Vec<f64> = (-reach..=reach)
        .map(|d| (-((d * d) as f64) / two_sigma_sq).exp())
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / total) as f32).collect()
}

/// Weighted sum centered on `center` along a line of `len` samples.
fn convolve(kernel: &[f32], center: usize, len: usize, sample: impl Fn(usize) -> f32) -> f32 {
    let reach = kernel.len() / 2;
    kernel
        .iter()
        .enumerate()
        .map(|(k, weight)| weight * sample((center + k).saturating_sub(reach).min(len - 1)))
        .sum()
}

#[cfg(test)]
#[path = "../../tests/unit/transform/blur.rs"]
mod tests;
