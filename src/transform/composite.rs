//! Premultiplied RGBA8 pixel arithmetic.

pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over with a coverage factor in `[0, 1]` applied to `src`.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, coverage: f32) -> PremulRgba8 {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 || src[3] == 0 {
        return dst;
    }

    let cov = ((coverage * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), cov);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), cov);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Scale every channel of a premultiplied pixel by `coverage`.
pub(crate) fn scale(px: PremulRgba8, coverage: f32) -> PremulRgba8 {
    let cov = ((coverage.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    px.map(|c| mul_div255(u16::from(c), cov))
}

/// Convert a straight-alpha pixel to premultiplied form.
pub(crate) fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    [
        mul_div255(u16::from(px[0]), a),
        mul_div255(u16::from(px[1]), a),
        mul_div255(u16::from(px[2]), a),
        px[3],
    ]
}

/// Convert a premultiplied pixel back to straight alpha.
pub(crate) fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    if a == 255 {
        return px;
    }
    let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), px[3]]
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/transform/composite.rs"]
mod tests;
