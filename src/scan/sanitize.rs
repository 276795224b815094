/// File extensions treated as raster images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

/// Upper bound on tokens inspected by the delimiter fallback.
const MAX_FALLBACK_TOKENS: usize = 16;

const STRAY_DELIMITERS: &[char] = &['[', ']', '|', '<', '>', '"', '`'];

/// Return `true` for `http://` and `https://` references.
pub fn is_remote(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Return `true` when `path` ends in a known image extension (case-insensitive).
pub fn has_image_extension(path: &str) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
}

/// Normalize a raw captured link target into a vault-style path.
///
/// Returns `None` for targets that cannot be a single-line image reference.
pub fn sanitize_path(raw: &str) -> Option<String> {
    if raw.contains(['\n', '\r']) {
        return None;
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_remote(trimmed) {
        return Some(trimmed.to_string());
    }

    let mut s = strip_link_shell(trimmed).replace('\\', "/");

    if let Ok(decoded) = urlencoding::decode(&s) {
        s = decoded.into_owned();
    }
    if s.contains(['\n', '\r']) {
        return None;
    }

    if let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }

    if s.contains(STRAY_DELIMITERS) {
        s = first_image_token(&s)?;
    }

    let s = truncate_after_extension(s.trim());
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Remove an accidental `![[..]]`, `[[..]]`, `![..](..)` or `<..>` wrapper.
fn strip_link_shell(s: &str) -> String {
    if let Some(inner) = s
        .strip_prefix("![[")
        .or_else(|| s.strip_prefix("[["))
        .and_then(|rest| rest.strip_suffix("]]"))
    {
        let target = inner.split('|').next().unwrap_or(inner);
        return target.trim().to_string();
    }

    if s.starts_with("![")
        && s.ends_with(')')
        && let Some(open) = s.find("](")
    {
        let inner = &s[open + 2..s.len() - 1];
        let inner = inner.trim();
        let inner = inner
            .strip_prefix('<')
            .and_then(|v| v.split_once('>').map(|(t, _)| t))
            .unwrap_or_else(|| inner.split_whitespace().next().unwrap_or(inner));
        return inner.to_string();
    }

    if let Some(inner) = s.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
        return inner.trim().to_string();
    }

    s.to_string()
}

/// First delimiter-separated token that looks like an image path.
fn first_image_token(s: &str) -> Option<String> {
    s.split(STRAY_DELIMITERS)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_FALLBACK_TOKENS)
        .map(truncate_after_extension)
        .find(|t| has_image_extension(t))
        .map(|t| t.strip_prefix("./").unwrap_or(t).to_string())
}

/// Cut a trailing query string or fragment that follows an image extension.
fn truncate_after_extension(s: &str) -> &str {
    for (idx, ch) in s.char_indices() {
        if matches!(ch, '?' | '#') && has_image_extension(&s[..idx]) {
            return &s[..idx];
        }
    }
    s
}

#[cfg(test)]
#[path = "../../tests/unit/scan/sanitize.rs"]
mod tests;
