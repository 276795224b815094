use crate::scan::sanitize::is_remote;
use crate::vault::{AssetHandle, Vault};

/// Normalize a vault-relative path.
///
/// The result uses `/` separators, drops empty and `.` segments, applies `..` against earlier
/// segments, and strips a leading `/`. Returns `None` for empty paths or paths that climb above
/// the vault root.
pub fn normalize_vault_path(path: &str) -> Option<String> {
    let s = path.replace('\\', "/");
    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                out.pop()?;
            }
            _ => out.push(part),
        }
    }
    if out.is_empty() {
        return None;
    }
    Some(out.join("/"))
}

/// Folder part of a vault path (`""` for files at the root).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join a folder and a relative path, normalizing the result.
pub fn join_path(dir: &str, rel: &str) -> Option<String> {
    if dir.is_empty() {
        normalize_vault_path(rel)
    } else {
        normalize_vault_path(&format!("{dir}/{rel}"))
    }
}

/// Resolve a sanitized reference path to a file in `vault`.
///
/// Order: the vault's link index, the exact vault path, explicit `./`/`../` resolution against
/// the document's folder, then the document's folder without a prefix. Remote URLs never resolve.
pub fn resolve_asset(vault: &dyn Vault, path: &str, document_path: &str) -> Option<AssetHandle> {
    if path.trim().is_empty() || is_remote(path) {
        return None;
    }
    let doc_dir = parent_dir(document_path);

    if let Some(hit) = vault.resolve_link_path(path, document_path)
        && let Some(norm) = normalize_vault_path(&hit)
        && vault.exists(&norm)
    {
        return Some(AssetHandle::new(norm));
    }

    let explicit_relative = path.starts_with("./") || path.starts_with("../");

    if !explicit_relative
        && let Some(direct) = normalize_vault_path(path)
        && vault.exists(&direct)
    {
        return Some(AssetHandle::new(direct));
    }

    if explicit_relative
        && let Some(rel) = join_path(doc_dir, path)
        && vault.exists(&rel)
    {
        return Some(AssetHandle::new(rel));
    }

    if !doc_dir.is_empty()
        && let Some(local) = join_path(doc_dir, path)
        && vault.exists(&local)
    {
        return Some(AssetHandle::new(local));
    }

    None
}

fn comparable(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| path.to_string());
    let no_query = decoded.split('?').next().unwrap_or("");
    let mut s = no_query.to_lowercase().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    s.trim_start_matches('/').to_string()
}

/// Return `true` when two raw reference paths denote the same asset.
///
/// Both sides are percent-decoded, stripped of a query string, lowercased, slash-normalized and
/// stripped of a leading `./`; they match when equal or when one is a `/`-aligned suffix of the
/// other.
pub fn paths_match(a: &str, b: &str) -> bool {
    let a = comparable(a);
    let b = comparable(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.ends_with(&format!("/{b}")) || b.ends_with(&format!("/{a}"))
}

fn strip_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, _)) if !stem.ends_with('/') && !stem.is_empty() => stem,
        _ => path,
    }
}

fn shared_prefix_segments(a: &str, b: &str) -> usize {
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| !x.is_empty() && x == y)
        .count()
}

/// Link-index lookup over a file listing.
///
/// Explicitly relative links (`./`, `../`) are left to relative resolution. An exact
/// (case-insensitive) vault path wins outright. Otherwise candidates are files whose path ends
/// with the link on a `/` boundary, with or without the extension; the one sharing the most
/// leading folders with the referring document wins, then the shortest path, then lexicographic
/// order.
pub(crate) fn nearest_link_match(
    files: &[String],
    raw_link: &str,
    from_path: &str,
) -> Option<String> {
    if raw_link.starts_with("./") || raw_link.starts_with("../") || is_remote(raw_link) {
        return None;
    }
    let link = normalize_vault_path(raw_link)?.to_lowercase();
    let link_has_ext = link.rsplit('/').next().is_some_and(|name| name.contains('.'));

    if let Some(exact) = files.iter().find(|f| f.to_lowercase() == link) {
        return Some(exact.clone());
    }

    let from_dir = parent_dir(from_path).to_lowercase();
    let suffix = format!("/{link}");
    files
        .iter()
        .filter(|f| {
            let lower = f.to_lowercase();
            let key = if link_has_ext {
                lower.as_str()
            } else {
                strip_extension(&lower)
            };
            key == link || key.ends_with(&suffix)
        })
        .min_by(|a, b| {
            let da = shared_prefix_segments(parent_dir(&a.to_lowercase()), &from_dir);
            let db = shared_prefix_segments(parent_dir(&b.to_lowercase()), &from_dir);
            db.cmp(&da)
                .then_with(|| a.len().cmp(&b.len()))
                .then_with(|| a.cmp(b))
        })
        .cloned()
}

#[cfg(test)]
#[path = "../../tests/unit/vault/resolve.rs"]
mod tests;
