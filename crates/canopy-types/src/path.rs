//! Helpers for logical namespace paths.
//!
//! Canopy paths are names in an abstract, `/`-separated namespace; they are
//! never OS paths, so they are plain strings rather than `PathBuf`. All paths
//! handed to the engine are absolute; `normalize` is the single place where
//! stray slashes are cleaned up.

/// Returns true if the path starts with `/`.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Normalize a path: ensure a leading `/`, collapse duplicate separators,
/// and strip any trailing `/` (except for the root itself).
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Returns the parent path, or `None` for the root.
///
/// The parent of a first-level path such as `/content` is `/`.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Returns the final segment of the path; empty for the root.
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Join a child name onto a base path.
pub fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Iterate the segments of a path, skipping empty ones.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Returns true if `path` equals `ancestor` or lies beneath it.
pub fn is_at_or_under(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return is_absolute(path);
    }
    path == ancestor || path.strip_prefix(ancestor).is_some_and(|r| r.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/b"), "/a/b");
        assert_eq!(normalize("a/b/"), "/a/b");
        assert_eq!(normalize("//a///b//"), "/a/b");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/a/b/c"), Some("/a/b"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn test_name() {
        assert_eq!(name("/a/b/c"), "c");
        assert_eq!(name("/a"), "a");
        assert_eq!(name("/"), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a/b", "c"), "/a/b/c");
    }

    #[test]
    fn test_segments() {
        let segs: Vec<_> = segments("/a/b/c").collect();
        assert_eq!(segs, vec!["a", "b", "c"]);
        assert_eq!(segments("/").count(), 0);
    }

    #[test]
    fn test_is_at_or_under() {
        assert!(is_at_or_under("/a/b", "/a"));
        assert!(is_at_or_under("/a", "/a"));
        assert!(is_at_or_under("/a", "/"));
        assert!(!is_at_or_under("/ab", "/a"));
        assert!(!is_at_or_under("/b", "/a"));
    }
}
