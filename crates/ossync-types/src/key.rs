//! Lexical helpers for slash-separated paths and remote keys.
//!
//! Nothing here touches the filesystem. Local paths and remote keys are both
//! handled as `/`-separated strings so that the same rules apply to each side
//! of a comparison.

/// Separator used by remote keys (and by local paths on supported platforms).
pub const SEPARATOR: char = '/';

/// Lexically clean a path.
///
/// Repeated separators collapse to one, `.` elements are dropped, `..`
/// removes the preceding element (or is dropped at the root of a rooted
/// path), and trailing separators are removed. An empty result becomes `.`
/// (or `/` for a rooted path).
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }
    let rooted = path.starts_with(SEPARATOR);
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".into(),
        (false, false) => joined,
    }
}

/// Prefix `path` with a separator if it does not start with one.
pub fn rooted(path: &str) -> String {
    if path.starts_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Last element of `path`, ignoring trailing separators.
///
/// `base_name("")` is `.` and a path made only of separators yields `/`.
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind(SEPARATOR) {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Everything but the last element of `path`, cleaned.
///
/// `parent("c")` is `.` and `parent("/c")` is `/`.
pub fn parent(path: &str) -> String {
    match path.rfind(SEPARATOR) {
        Some(0) => "/".into(),
        Some(i) => clean(&path[..i]),
        None => ".".into(),
    }
}

/// Lexical path of `target` relative to `base`.
///
/// Both inputs are cleaned first. Returns `None` when `target` does not lie
/// at or below `base`.
pub fn relative(base: &str, target: &str) -> Option<String> {
    let base = clean(base);
    let target = clean(target);
    if base == target {
        return Some(".".into());
    }
    if base == "." {
        return (!target.starts_with(SEPARATOR) && !target.starts_with("..")).then_some(target);
    }
    if base == "/" {
        return target.strip_prefix('/').map(str::to_string);
    }
    target
        .strip_prefix(base.as_str())
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .map(str::to_string)
}

/// The part of `name` after the first `offset` bytes.
///
/// Offsets strip a compared root so only the path below it participates in
/// equality. An offset past the end (or inside a multi-byte character)
/// yields an empty string rather than panicking.
pub fn relative_name(name: &str, offset: usize) -> &str {
    name.get(offset..).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clean_collapses_and_resolves() {
        assert_eq!(clean(""), ".");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("///remote//file////location/"), "/remote/file/location");
        assert_eq!(clean("local2//file"), "local2/file");
        assert_eq!(clean("/e/./c"), "/e/c");
        assert_eq!(clean("a/b/../c"), "a/c");
        assert_eq!(clean("/../a"), "/a");
        assert_eq!(clean("../a"), "../a");
        assert_eq!(clean("a/.."), ".");
        assert_eq!(clean("./"), ".");
    }

    #[test]
    fn rooted_adds_single_separator() {
        assert_eq!(rooted("file"), "/file");
        assert_eq!(rooted("/file"), "/file");
    }

    #[test]
    fn base_name_cases() {
        assert_eq!(base_name("root"), "root");
        assert_eq!(base_name("/root/my/file"), "file");
        assert_eq!(base_name("/root/my/"), "my");
        assert_eq!(base_name("///"), "/");
        assert_eq!(base_name(""), ".");
    }

    #[test]
    fn parent_cases() {
        assert_eq!(parent("test/fixtures/a/b/c"), "test/fixtures/a/b");
        assert_eq!(parent("c"), ".");
        assert_eq!(parent("/c"), "/");
        assert_eq!(parent("/a//b"), "/a");
    }

    #[test]
    fn relative_cases() {
        assert_eq!(relative("test", "test/fixtures/a/b/c").as_deref(), Some("fixtures/a/b/c"));
        assert_eq!(relative("test/fixtures/", "test/fixtures/f").as_deref(), Some("f"));
        assert_eq!(relative(".", "fixtures/f").as_deref(), Some("fixtures/f"));
        assert_eq!(relative("/", "/tmp/x").as_deref(), Some("tmp/x"));
        assert_eq!(relative("/tmp", "/tmp").as_deref(), Some("."));
        assert_eq!(relative("/tmp/a", "/tmp/ab/c"), None);
        assert_eq!(relative("/tmp", "/other"), None);
    }

    #[test]
    fn relative_name_is_total() {
        assert_eq!(relative_name("/home/x/a.txt", 7), "/a.txt");
        assert_eq!(relative_name("/a", 0), "/a");
        assert_eq!(relative_name("/a", 10), "");
        assert_eq!(relative_name("/é", 2), "");
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(path in "[/a-c.]{0,24}") {
            let once = clean(&path);
            prop_assert_eq!(clean(&once), once.clone());
            prop_assert!(!once.contains("//"));
        }
    }
}
