//! Logical path helpers.
//!
//! Resource paths are plain strings with `/` separators; these helpers never
//! touch the OS path machinery.

/// Replace every `\` with `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Lower-case with `/` separators: the form used for all matching.
pub fn normalize(path: &str) -> String {
    normalize_separators(path).to_lowercase()
}

/// Normalized folder prefix without leading or trailing separators.
pub fn normalize_folder(folder: &str) -> String {
    normalize(folder).trim_matches('/').to_string()
}

/// Last component of `path`, accepting either separator.
pub fn basename(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Join a relative directory and a child name with `/`.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Remove the first segment-aligned occurrence of `folder/` from `path`.
///
/// Both arguments must already be normalized. `en` matches `en/a.txt` and
/// `res/en/a.txt`, never `ten/a.txt`.
pub fn strip_segment(path: &str, folder: &str) -> Option<String> {
    if folder.is_empty() {
        return None;
    }

    let needle = format!("{folder}/");
    let mut from = 0;
    while let Some(found) = path[from..].find(&needle) {
        let start = from + found;
        if start == 0 || path.as_bytes()[start - 1] == b'/' {
            let mut stripped = String::with_capacity(path.len() - needle.len());
            stripped.push_str(&path[..start]);
            stripped.push_str(&path[start + needle.len()..]);
            return Some(stripped);
        }
        from = start + 1;
    }
    None
}

/// `path` with the leading `root/` removed, if it starts with it.
pub fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if root.is_empty() {
        return None;
    }
    path.strip_prefix(root)?.strip_prefix('/')
}
