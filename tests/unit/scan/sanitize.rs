use super::*;

#[test]
fn plain_paths_pass_through() {
    assert_eq!(sanitize_path("pics/cat.png").as_deref(), Some("pics/cat.png"));
    assert_eq!(sanitize_path("  cat.png ").as_deref(), Some("cat.png"));
}

#[test]
fn decodes_and_normalizes() {
    assert_eq!(
        sanitize_path("./my%20pics\\cat%20one.png").as_deref(),
        Some("my pics/cat one.png")
    );
    assert_eq!(sanitize_path("./a/./b.png").as_deref(), Some("a/./b.png"));
}

#[test]
fn strips_wrapping_link_shells() {
    assert_eq!(sanitize_path("![[a.png|alt]]").as_deref(), Some("a.png"));
    assert_eq!(sanitize_path("[[dir/a.png]]").as_deref(), Some("dir/a.png"));
    assert_eq!(sanitize_path("![x](b.png)").as_deref(), Some("b.png"));
    assert_eq!(
        sanitize_path("![x](<b c.png> \"t\")").as_deref(),
        Some("b c.png")
    );
    assert_eq!(sanitize_path("<b c.png>").as_deref(), Some("b c.png"));
}

#[test]
fn falls_back_to_first_image_token_on_stray_delimiters() {
    assert_eq!(sanitize_path("junk]] img/a.png|300").as_deref(), Some("img/a.png"));
    assert_eq!(sanitize_path("[notes | x.jpg | y.png").as_deref(), Some("x.jpg"));
    assert_eq!(sanitize_path("[just | words]"), None);
}

#[test]
fn truncates_query_and_fragment_after_extension() {
    assert_eq!(sanitize_path("a.png?raw=1").as_deref(), Some("a.png"));
    assert_eq!(sanitize_path("a.JPG#frag").as_deref(), Some("a.JPG"));
    assert_eq!(sanitize_path("a#b.png").as_deref(), Some("a#b.png"));
}

#[test]
fn rejects_newlines_and_empty() {
    assert_eq!(sanitize_path("a\nb.png"), None);
    assert_eq!(sanitize_path("a%0Ab.png"), None);
    assert_eq!(sanitize_path("   "), None);
}

#[test]
fn remote_urls_are_kept_verbatim() {
    assert_eq!(
        sanitize_path("https://example.com/a%20b.png").as_deref(),
        Some("https://example.com/a%20b.png")
    );
    assert!(is_remote("HTTP://x/y.png"));
    assert!(!is_remote("httpfoo/x.png"));
}

#[test]
fn image_extension_detection() {
    assert!(has_image_extension("a/b.PNG"));
    assert!(has_image_extension("c.jpeg"));
    assert!(!has_image_extension("notes.md"));
    assert!(!has_image_extension("png"));
}
