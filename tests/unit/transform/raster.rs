use super::*;
use crate::foundation::error::FailureKind;
use crate::transform::color::Color;
use crate::transform::params::{BorderSpec, RadiusUnit, ShadowSpec};
use image::{Rgba, RgbaImage};

fn solid_png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[test]
fn rounds_corners_with_transparency() {
    let input = solid_png(40, 40, [255, 0, 0, 255]);
    let params = TransformParams::new(25.0, RadiusUnit::Percent);
    let out = decode(&RasterStrategy.apply(&input, &params).unwrap());

    assert_eq!(out.dimensions(), (40, 40));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
    assert_eq!(out.get_pixel(39, 39)[3], 0);
    assert_eq!(*out.get_pixel(20, 20), Rgba([255, 0, 0, 255]));
    assert_eq!(out.get_pixel(20, 0)[3], 255);
    assert_eq!(out.get_pixel(0, 20)[3], 255);
    let edge = out.get_pixel(2, 2)[3];
    assert!(edge < 255, "corner arc should be partially covered");
}

#[test]
fn zero_radius_keeps_every_pixel() {
    let input = solid_png(8, 6, [10, 20, 30, 255]);
    let params = TransformParams::new(0.0, RadiusUnit::Px);
    let out = decode(&RasterStrategy.apply(&input, &params).unwrap());
    assert!(out.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
}

#[test]
fn border_grows_canvas_and_stays_outside_silhouette() {
    let input = solid_png(30, 30, [255, 255, 255, 255]);
    let params = TransformParams::new(5.0, RadiusUnit::Px).with_border(BorderSpec {
        color: Color::rgba(0, 0, 255, 255),
        width: 3.0,
        style: BorderStyle::Solid,
    });
    let out = decode(&RasterStrategy.apply(&input, &params).unwrap());

    assert_eq!(out.dimensions(), (36, 36));
    assert_eq!(*out.get_pixel(1, 18), Rgba([0, 0, 255, 255]));
    assert_eq!(*out.get_pixel(18, 34), Rgba([0, 0, 255, 255]));
    assert_eq!(*out.get_pixel(18, 18), Rgba([255, 255, 255, 255]));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
}

#[test]
fn dashed_border_alternates_along_an_edge() {
    let src = [255u8; 40 * 20 * 4];
    let params = TransformParams::new(0.0, RadiusUnit::Px).with_border(BorderSpec {
        color: Color::BLACK,
        width: 2.0,
        style: BorderStyle::Dashed,
    });
    let canvas = render(&src, 40, 20, &params).unwrap();
    let top_row: Vec<u8> = (4..canvas.width - 4)
        .map(|x| canvas.data[((canvas.width + x) * 4 + 3) as usize])
        .collect();
    assert!(top_row.iter().any(|&a| a == 255));
    assert!(top_row.iter().any(|&a| a == 0));
}

#[test]
fn shadow_extends_past_the_image_towards_the_offset() {
    let input = solid_png(20, 20, [0, 255, 0, 255]);
    let params = TransformParams::new(0.0, RadiusUnit::Px).with_shadow(ShadowSpec {
        color: Color::BLACK,
        blur_radius: 2.0,
        offset: 4.0,
    });
    let pad = padding_for(&params);
    assert_eq!(
        pad,
        Padding {
            left: 0,
            top: 0,
            right: 6,
            bottom: 6
        }
    );

    let out = decode(&RasterStrategy.apply(&input, &params).unwrap());
    assert_eq!(out.dimensions(), (26, 26));
    assert_eq!(*out.get_pixel(10, 10), Rgba([0, 255, 0, 255]));
    let shadow = out.get_pixel(22, 22);
    assert!(shadow[3] > 0);
    assert_eq!(&shadow.0[..3], &[0, 0, 0]);
}

#[test]
fn undecodable_input_is_a_transform_failure() {
    let params = TransformParams::new(10.0, RadiusUnit::Px);
    let err = RasterStrategy.apply(b"not an image", &params).unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransformFailed);
}

#[test]
fn oversized_canvas_is_a_transform_failure() {
    let input = solid_png(4, 4, [1, 2, 3, 255]);
    let params = TransformParams::new(1.0, RadiusUnit::Px).with_border(BorderSpec {
        width: 5e9,
        ..BorderSpec::default()
    });
    let err = RasterStrategy.apply(&input, &params).unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransformFailed);
}
