use crate::foundation::error::{RounderError, RounderResult};
use crate::transform::blur::{blur_coverage, blur_reach};
use crate::transform::composite::{over, premultiply, scale, unpremultiply};
use crate::transform::gateway::TransformStrategy;
use crate::transform::params::{BorderSpec, BorderStyle, TransformParams};
use kurbo::{Point, Rect, RoundedRect, Shape as _};
use std::f64::consts::FRAC_PI_2;
use std::io::Cursor;

const SUPERSAMPLE: usize = 4;

/// In-process rasterizer: rounded-corner mask, optional drop shadow and border, PNG output.
///
/// Always available; the gateway falls back to it when the external routine fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterStrategy;

impl TransformStrategy for RasterStrategy {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn apply(&self, input: &[u8], params: &TransformParams) -> RounderResult<Vec<u8>> {
        let img = image::load_from_memory(input)
            .map_err(|e| RounderError::transform_failed(format!("decode source image: {e}")))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(RounderError::transform_failed("source image has zero size"));
        }
        let canvas = render(img.as_raw(), w, h, params)?;
        encode_png(canvas)
    }
}

/// Rendered premultiplied RGBA8 canvas.
pub(crate) struct Canvas {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: Vec<u8>,
}

/// Padding around the source image on each side of the output canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Padding {
    pub(crate) left: u32,
    pub(crate) top: u32,
    pub(crate) right: u32,
    pub(crate) bottom: u32,
}

pub(crate) fn padding_for(params: &TransformParams) -> Padding {
    let border = params
        .border
        .map(|b| b.width.round().max(1.0) as u32)
        .unwrap_or(0);
    let (lead, trail) = match &params.shadow {
        Some(shadow) => {
            let k = blur_reach(shadow.blur_radius);
            let off = shadow.offset.round() as u32;
            (k.saturating_sub(off), off.saturating_add(k))
        }
        None => (0, 0),
    };
    Padding {
        left: border.saturating_add(lead),
        top: border.saturating_add(lead),
        right: border.saturating_add(trail),
        bottom: border.saturating_add(trail),
    }
}

/// Rasterize `src` (straight RGBA8, `w` x `h`) with the requested effects.
pub(crate) fn render(src: &[u8], w: u32, h: u32, params: &TransformParams) -> RounderResult<Canvas> {
    let pad = padding_for(params);
    let grown = |side: u32, a: u32, b: u32| side.checked_add(a)?.checked_add(b);
    let (Some(cw), Some(ch)) = (
        grown(w, pad.left, pad.right),
        grown(h, pad.top, pad.bottom),
    ) else {
        return Err(RounderError::transform_failed("output canvas size overflow"));
    };
    let len = (cw as usize)
        .checked_mul(ch as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| RounderError::transform_failed("output canvas size overflow"))?;

    let radius = params.effective_radius_px(w, h);
    let x0 = f64::from(pad.left);
    let y0 = f64::from(pad.top);
    let silhouette = Silhouette::new(
        Rect::new(x0, y0, x0 + f64::from(w), y0 + f64::from(h)),
        radius,
    );
    let border_width = params
        .border
        .map(|b| b.width.round().max(1.0))
        .unwrap_or(0.0);
    let outline = silhouette.expanded(border_width);

    let mut data = vec![0u8; len];

    if let Some(shadow) = &params.shadow {
        let off = shadow.offset.round();
        let shape = outline.translated(off, off);
        let mut plane = vec![0u8; len / 4];
        for (y, row) in (0..ch).zip(plane.chunks_exact_mut(cw as usize)) {
            for (x, cell) in (0..cw).zip(row.iter_mut()) {
                *cell = (shape.coverage(x, y) * 255.0).round() as u8;
            }
        }
        let plane = blur_coverage(&plane, cw, ch, shadow.blur_radius)?;
        let tint = shadow.color.to_premul();
        for (px, &a) in data.chunks_exact_mut(4).zip(&plane) {
            if a > 0 {
                px.copy_from_slice(&scale(tint, f32::from(a) / 255.0));
            }
        }
    }

    if let Some(border) = &params.border {
        let stroke = border.color.to_premul();
        let dash = DashPattern::new(border, &silhouette);
        for y in 0..ch {
            for x in 0..cw {
                let ring = outline.coverage(x, y) - silhouette.coverage(x, y);
                if ring <= 0.0 {
                    continue;
                }
                if let Some(dash) = &dash
                    && !dash.is_on(f64::from(x) + 0.5, f64::from(y) + 0.5)
                {
                    continue;
                }
                let i = pixel_index(cw, x, y);
                let dst = [data[i], data[i + 1], data[i + 2], data[i + 3]];
                data[i..i + 4].copy_from_slice(&over(dst, stroke, ring));
            }
        }
    }

    for y in 0..h {
        for x in 0..w {
            let (cx, cy) = (x + pad.left, y + pad.top);
            let cov = silhouette.coverage(cx, cy);
            if cov <= 0.0 {
                continue;
            }
            let s = pixel_index(w, x, y);
            let px = premultiply([src[s], src[s + 1], src[s + 2], src[s + 3]]);
            let i = pixel_index(cw, cx, cy);
            let dst = [data[i], data[i + 1], data[i + 2], data[i + 3]];
            data[i..i + 4].copy_from_slice(&over(dst, px, cov));
        }
    }

    Ok(Canvas {
        width: cw,
        height: ch,
        data,
    })
}

fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    ((y as usize) * (width as usize) + (x as usize)) * 4
}

fn encode_png(canvas: Canvas) -> RounderResult<Vec<u8>> {
    let Canvas {
        width,
        height,
        mut data,
    } = canvas;
    for px in data.chunks_exact_mut(4) {
        let straight = unpremultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&straight);
    }
    let img = image::RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| RounderError::transform_failed("output buffer does not match canvas"))?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RounderError::transform_failed(format!("encode png: {e}")))?;
    Ok(buf)
}

/// Axis-aligned rounded rectangle with anti-aliased pixel coverage.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Silhouette {
    rect: Rect,
    radius: f64,
    shape: RoundedRect,
}

impl Silhouette {
    pub(crate) fn new(rect: Rect, radius: f64) -> Self {
        let radius = radius.clamp(0.0, rect.width().min(rect.height()) / 2.0);
        Self {
            rect,
            radius,
            shape: RoundedRect::from_rect(rect, radius),
        }
    }

    fn expanded(&self, by: f64) -> Self {
        if by <= 0.0 {
            return *self;
        }
        Self::new(self.rect.inflate(by, by), self.radius + by)
    }

    fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.rect + kurbo::Vec2::new(dx, dy), self.radius)
    }

    /// Fraction of pixel `(x, y)` covered by the shape, in `[0, 1]`.
    pub(crate) fn coverage(&self, x: u32, y: u32) -> f32 {
        let (px, py) = (f64::from(x), f64::from(y));
        let r = self.rect;
        if px + 1.0 <= r.x0 || px >= r.x1 || py + 1.0 <= r.y0 || py >= r.y1 {
            return 0.0;
        }
        let inside_x = px >= r.x0 && px + 1.0 <= r.x1;
        let inside_y = py >= r.y0 && py + 1.0 <= r.y1;
        if inside_x && inside_y {
            let core_x = px >= r.x0 + self.radius && px + 1.0 <= r.x1 - self.radius;
            let core_y = py >= r.y0 + self.radius && py + 1.0 <= r.y1 - self.radius;
            if core_x || core_y {
                return 1.0;
            }
        }
        let step = 1.0 / SUPERSAMPLE as f64;
        let mut hits = 0usize;
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                let p = Point::new(
                    px + (sx as f64 + 0.5) * step,
                    py + (sy as f64 + 0.5) * step,
                );
                if self.shape.contains(p) {
                    hits += 1;
                }
            }
        }
        hits as f32 / (SUPERSAMPLE * SUPERSAMPLE) as f32
    }
}

/// On/off pattern along the border's center line, measured by arc length.
#[derive(Clone, Copy, Debug)]
struct DashPattern {
    center: Silhouette,
    on: f64,
    period: f64,
}

impl DashPattern {
    fn new(border: &BorderSpec, silhouette: &Silhouette) -> Option<Self> {
        let w = border.width.round().max(1.0);
        let (on, off) = match border.style {
            BorderStyle::Solid => return None,
            BorderStyle::Dashed => (3.0 * w, 2.0 * w),
            BorderStyle::Dotted => (w, w),
        };
        Some(Self {
            center: silhouette.expanded(w / 2.0),
            on,
            period: on + off,
        })
    }

    fn is_on(&self, x: f64, y: f64) -> bool {
        let s = arc_position(&self.center, x, y);
        s.rem_euclid(self.period) < self.on
    }
}

/// Clockwise arc length, starting at the end of the top-left corner, of the point on the
/// rounded rectangle's outline nearest to `(x, y)`.
fn arc_position(shape: &Silhouette, x: f64, y: f64) -> f64 {
    let r = shape.radius;
    let Rect { x0, y0, x1, y1 } = shape.rect;
    let (cx0, cy0, cx1, cy1) = (x0 + r, y0 + r, x1 - r, y1 - r);
    let top = (cx1 - cx0).max(0.0);
    let side = (cy1 - cy0).max(0.0);
    let arc = FRAC_PI_2 * r;

    let qx = x.clamp(cx0, cx1);
    let qy = y.clamp(cy0, cy1);
    let (dx, dy) = (x - qx, y - qy);

    match (sign(dx), sign(dy)) {
        (1, -1) => top + dx.atan2(-dy) * r,
        (1, 0) => top + arc + (qy - cy0),
        (1, 1) => top + arc + side + dy.atan2(dx) * r,
        (0, 1) => top + 2.0 * arc + side + (cx1 - qx),
        (-1, 1) => 2.0 * top + 2.0 * arc + side + (-dx).atan2(dy) * r,
        (-1, 0) => 2.0 * top + 3.0 * arc + side + (cy1 - qy),
        (-1, -1) => 2.0 * top + 3.0 * arc + 2.0 * side + (-dy).atan2(-dx) * r,
        _ => qx - cx0,
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/raster.rs"]
mod tests;
