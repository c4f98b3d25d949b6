use std::fs;

use tempfile::TempDir;

/// `fixtures/{a/b/c, d/e, f}` under a fresh temp dir.
pub(crate) fn fixture_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("fixtures");
    fs::create_dir_all(root.join("a/b")).unwrap();
    fs::create_dir_all(root.join("d")).unwrap();
    fs::write(root.join("a/b/c"), b"c").unwrap();
    fs::write(root.join("d/e"), b"ee").unwrap();
    fs::write(root.join("f"), b"hello world").unwrap();
    dir
}
