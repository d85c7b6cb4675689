// src/watch/path_utils.rs

use std::path::Path;

/// Convert an event path into a string relative to `root`, with forward slashes.
///
/// Tries a plain `strip_prefix` first; if that fails (symlinked temp dirs on
/// macOS report `/private/var/...`), both sides are canonicalized and the
/// strip is retried. A path that has since been deleted cannot be
/// canonicalized, so its parent is tried instead.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slashed(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(path_canon) = path.canonicalize() {
        return path_canon.strip_prefix(&root_canon).ok().map(slashed);
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let name = path.file_name()?;
    parent
        .join(name)
        .strip_prefix(&root_canon)
        .ok()
        .map(slashed)
}

fn slashed(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
