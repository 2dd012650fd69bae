//! Slash-path helpers for the flat namespace.
//!
//! Store keys are normalized absolute paths: they start with `/`, contain no
//! duplicate or trailing slashes, and no `.`/`..` segments. These helpers do
//! the normalizing; the store itself only ever sees canonical keys.

/// Resolve `path` against `cwd`, producing a normalized absolute path.
///
/// Duplicate slashes are collapsed, `.` segments dropped, and `..` segments
/// pop their parent (stopping at the root). `cwd` must itself be absolute.
pub fn absolutize(cwd: &str, path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        components.extend(cwd.split('/').filter(|c| !c.is_empty()));
    }
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    if components.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", components.join("/"))
    }
}

/// Normalize an already-absolute path.
pub fn clean(path: &str) -> String {
    absolutize("/", path)
}

/// The parent of a normalized absolute path; `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Every prefix of a normalized absolute path, root first, the path last.
///
/// `/go/src/os` yields `/`, `/go`, `/go/src`, `/go/src/os`.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut result = vec!["/".to_string()];
    if path == "/" {
        return result;
    }
    let mut current = String::new();
    for segment in path.split('/').filter(|c| !c.is_empty()) {
        current.push('/');
        current.push_str(segment);
        result.push(current.clone());
    }
    result
}

/// Join a normalized absolute root with a relative archive key.
pub fn join(root: &str, key: &str) -> String {
    clean(&format!("{}/{}", root, key))
}
