use super::*;
use crate::foundation::error::FailureKind;
use crate::transform::params::RadiusUnit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Failing(AtomicUsize);

impl TransformStrategy for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn apply(&self, _input: &[u8], _params: &TransformParams) -> RounderResult<Vec<u8>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(RounderError::transform_failed("boom"))
    }
}

struct Garbage;

impl TransformStrategy for Garbage {
    fn name(&self) -> &'static str {
        "garbage"
    }

    fn apply(&self, _input: &[u8], _params: &TransformParams) -> RounderResult<Vec<u8>> {
        Ok(b"definitely not a png".to_vec())
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(10, 10, image::Rgba([9, 9, 9, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn in_process_gateway_is_not_degraded() {
    let gw = TransformGateway::in_process();
    let out = gw
        .apply(&png_bytes(), &TransformParams::new(20.0, RadiusUnit::Percent))
        .unwrap();
    assert_eq!(out.strategy, "raster");
    assert!(!out.degraded);
}

#[test]
fn failing_primary_falls_back_once() {
    let gw = TransformGateway::new(
        Some(Box::new(Failing(AtomicUsize::new(0)))),
        Box::new(RasterStrategy),
    );
    let out = gw
        .apply(&png_bytes(), &TransformParams::new(20.0, RadiusUnit::Percent))
        .unwrap();
    assert_eq!(out.strategy, "raster");
    assert!(out.degraded);
}

#[test]
fn invalid_primary_output_triggers_fallback() {
    let gw = TransformGateway::new(Some(Box::new(Garbage)), Box::new(RasterStrategy));
    let out = gw
        .apply(&png_bytes(), &TransformParams::new(2.0, RadiusUnit::Px))
        .unwrap();
    assert_eq!(out.strategy, "raster");
    assert!(validate_output(out.bytes).is_ok());
}

#[test]
fn fallback_failure_surfaces() {
    let gw = TransformGateway::new(None, Box::new(Garbage));
    let err = gw
        .apply(&png_bytes(), &TransformParams::new(2.0, RadiusUnit::Px))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::OutputInvalid);

    let gw = TransformGateway::new(
        Some(Box::new(Failing(AtomicUsize::new(0)))),
        Box::new(Failing(AtomicUsize::new(0))),
    );
    let err = gw
        .apply(&png_bytes(), &TransformParams::new(2.0, RadiusUnit::Px))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransformFailed);
}

#[test]
fn invalid_params_never_reach_a_strategy() {
    let primary = Failing(AtomicUsize::new(0));
    let gw = TransformGateway::new(None, Box::new(primary));
    let err = gw
        .apply(&png_bytes(), &TransformParams::new(-5.0, RadiusUnit::Px))
        .unwrap_err();
    assert!(matches!(err, RounderError::Validation(_)));
}

#[test]
fn empty_output_is_invalid() {
    let err = validate_output(Vec::new()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::OutputInvalid);
}

#[test]
fn from_config_uses_external_when_configured() {
    let mut cfg = RounderConfig::default();
    assert_eq!(TransformGateway::from_config(&cfg).primary_name(), None);
    cfg.external = Some(crate::foundation::config::ExternalCommand {
        program: "python3".to_string(),
        args: vec!["round_image.py".to_string()],
    });
    assert_eq!(
        TransformGateway::from_config(&cfg).primary_name(),
        Some("external")
    );
}
