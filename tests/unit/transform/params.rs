use super::*;

#[test]
fn effective_radius_never_exceeds_half_the_smaller_side() {
    let dims = [(1u32, 1u32), (10, 400), (400, 10), (333, 333), (1920, 1080)];
    let requests = [
        TransformParams::new(0.0, RadiusUnit::Percent),
        TransformParams::new(25.0, RadiusUnit::Percent),
        TransformParams::new(100.0, RadiusUnit::Percent),
        TransformParams::new(1000.0, RadiusUnit::Percent),
        TransformParams::new(3.0, RadiusUnit::Px),
        TransformParams::new(5000.0, RadiusUnit::Px),
    ];
    for (w, h) in dims {
        for p in &requests {
            let r = p.effective_radius_px(w, h);
            assert!(r >= 0.0);
            assert!(r <= f64::from(w.min(h)) / 2.0, "{p} on {w}x{h} gave {r}");
        }
    }
}

#[test]
fn percent_radius_scales_with_smaller_dimension() {
    let p = TransformParams::new(25.0, RadiusUnit::Percent);
    assert_eq!(p.effective_radius_px(200, 100), 25.0);
    let p = TransformParams::new(12.0, RadiusUnit::Px);
    assert_eq!(p.effective_radius_px(200, 100), 12.0);
}

#[test]
fn output_path_is_deterministic_png() {
    let p = TransformParams::new(25.0, RadiusUnit::Percent);
    assert_eq!(p.output_path("pics/cat.png"), "pics/cat-rounded-25p.png");
    assert_eq!(p.output_path("photo.jpeg"), "photo-rounded-25p.png");

    let p = TransformParams::new(12.5, RadiusUnit::Px);
    assert_eq!(
        p.output_path("a/b/my pic.webp"),
        "a/b/my pic-rounded-12.5px.png"
    );
}

#[test]
fn validate_rejects_out_of_range_values() {
    assert!(TransformParams::new(10.0, RadiusUnit::Px).validate().is_ok());
    assert!(TransformParams::new(-1.0, RadiusUnit::Px).validate().is_err());
    assert!(TransformParams::new(f64::NAN, RadiusUnit::Px).validate().is_err());

    let thin = TransformParams::new(10.0, RadiusUnit::Px).with_border(BorderSpec {
        width: 0.5,
        ..BorderSpec::default()
    });
    assert!(thin.validate().is_err());

    let bad_shadow = TransformParams::new(10.0, RadiusUnit::Px).with_shadow(ShadowSpec {
        offset: -2.0,
        ..ShadowSpec::default()
    });
    assert!(bad_shadow.validate().is_err());
}

#[test]
fn unit_and_style_parse_from_tokens() {
    assert_eq!("percent".parse::<RadiusUnit>(), Ok(RadiusUnit::Percent));
    assert_eq!("PX".parse::<RadiusUnit>(), Ok(RadiusUnit::Px));
    assert!("em".parse::<RadiusUnit>().is_err());
    assert_eq!("dotted".parse::<BorderStyle>(), Ok(BorderStyle::Dotted));
    assert!("wavy".parse::<BorderStyle>().is_err());
}

#[test]
fn params_deserialize_from_json() {
    let p: TransformParams = serde_json::from_str(
        r##"{"radius":8,"unit":"px","border":{"color":"#f00","width":3,"style":"dashed"}}"##,
    )
    .unwrap();
    assert_eq!(p.unit, RadiusUnit::Px);
    assert!(p.shadow.is_none());
    let border = p.border.unwrap();
    assert_eq!(border.color, Color::rgba(255, 0, 0, 255));
    assert_eq!(border.style, BorderStyle::Dashed);
}

#[test]
fn effect_sizes_have_an_upper_bound() {
    let base = || TransformParams::new(10.0, RadiusUnit::Px);
    let border = |width: f64| {
        base().with_border(BorderSpec {
            width,
            ..BorderSpec::default()
        })
    };
    assert!(border(MAX_EFFECT_PX).validate().is_ok());
    assert!(border(MAX_EFFECT_PX + 1.0).validate().is_err());
    assert!(border(5e9).validate().is_err());
    assert!(border(f64::INFINITY).validate().is_err());

    let shadow = |blur_radius: f64, offset: f64| {
        base().with_shadow(ShadowSpec {
            blur_radius,
            offset,
            ..ShadowSpec::default()
        })
    };
    assert!(shadow(MAX_EFFECT_PX, MAX_EFFECT_PX).validate().is_ok());
    assert!(shadow(5e9, 0.0).validate().is_err());
    assert!(shadow(0.0, 5e9).validate().is_err());
    assert!(shadow(f64::NAN, 0.0).validate().is_err());
}
