use super::*;

#[test]
fn parses_all_hex_forms() {
    assert_eq!(Color::parse_hex("#fff").unwrap(), Color::rgba(255, 255, 255, 255));
    assert_eq!(Color::parse_hex("#1A2b3C").unwrap(), Color::rgba(0x1a, 0x2b, 0x3c, 255));
    assert_eq!(Color::parse_hex("00000080").unwrap(), Color::rgba(0, 0, 0, 0x80));
}

#[test]
fn rejects_malformed_hex() {
    for bad in ["", "#12", "#12345", "#ggg", "#1234567", "#ééé"] {
        assert!(Color::parse_hex(bad).is_err(), "{bad}");
    }
}

#[test]
fn hex_output_drops_opaque_alpha() {
    assert_eq!(Color::rgba(255, 0, 16, 255).to_hex(), "#ff0010");
    assert_eq!(Color::rgba(255, 0, 16, 128).to_hex(), "#ff001080");
}

#[test]
fn premultiplies_by_alpha() {
    assert_eq!(Color::rgba(255, 128, 0, 255).to_premul(), [255, 128, 0, 255]);
    assert_eq!(Color::rgba(255, 255, 255, 0).to_premul(), [0, 0, 0, 0]);
    assert_eq!(Color::rgba(200, 100, 50, 128).to_premul(), [100, 50, 25, 128]);
}

#[test]
fn serde_uses_hex_strings() {
    let c: Color = serde_json::from_str("\"#336699\"").unwrap();
    assert_eq!(c, Color::rgba(0x33, 0x66, 0x99, 255));
    assert_eq!(serde_json::to_string(&c).unwrap(), "\"#336699\"");
    assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
}
