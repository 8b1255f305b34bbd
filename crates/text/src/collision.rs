use std::path::{Path, PathBuf};

/// 为目标路径选择一个未被占用的名称
///
/// 目标不存在时原样返回，否则依次尝试 `stem (1).ext`、`stem (2).ext` …
/// 直到 `exists` 返回 false。
pub fn resolve_collision_with<F>(desired: &Path, exists: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    if !exists(desired) {
        return desired.to_path_buf();
    }

    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = desired
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    let mut n: u32 = 1;
    loop {
        let file_name = match &ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = desired.with_file_name(file_name);
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// 基于文件系统的冲突处理
///
/// 悬空的符号链接也视为已占用。
pub fn unique_path(desired: &Path) -> PathBuf {
    resolve_collision_with(desired, |p| p.symlink_metadata().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    #[test]
    fn test_free_name_unchanged() {
        let path = resolve_collision_with(Path::new("/lib/Book.pdf"), |_| false);
        assert_eq!(path, PathBuf::from("/lib/Book.pdf"));
    }

    #[test]
    fn test_counter_increments() {
        let taken: HashSet<PathBuf> = ["/lib/Book.pdf", "/lib/Book (1).pdf", "/lib/Book (2).pdf"]
            .iter()
            .map(|p| PathBuf::from(*p))
            .collect();
        let path = resolve_collision_with(Path::new("/lib/Book.pdf"), |p| taken.contains(p));
        assert_eq!(path, PathBuf::from("/lib/Book (3).pdf"));
    }

    #[test]
    fn test_no_extension() {
        let path = resolve_collision_with(Path::new("/lib/README"), |p| p == Path::new("/lib/README"));
        assert_eq!(path, PathBuf::from("/lib/README (1)"));
    }

    #[test]
    fn test_unique_path_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Book.pdf"), b"a").unwrap();
        fs::write(dir.path().join("Book (1).pdf"), b"b").unwrap();

        let path = unique_path(&dir.path().join("Book.pdf"));
        assert_eq!(path, dir.path().join("Book (2).pdf"));
        assert!(!path.exists());
    }
}
