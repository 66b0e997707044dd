//! Class-file discovery under a filesystem root

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks a directory tree and reports every `.class` file it finds.
///
/// Files are visited in file-name order so repeated scans of the same tree
/// see the same sequence.
#[derive(Debug, Clone, Default)]
pub struct ClassScanner {
    follow_links: bool,
}

impl ClassScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symbolic links while walking
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Call `visit` for every class file under `root` and return how many
    /// were visited.
    ///
    /// `root` may also name a single class file. The first error, from the
    /// walk or from `visit`, stops the scan and is returned.
    pub fn scan<F, E>(&self, root: &Path, mut visit: F) -> Result<usize, E>
    where
        F: FnMut(&Path) -> Result<(), E>,
        E: From<ScanError>,
    {
        if !root.exists() {
            return Err(ScanError::RootNotFound(root.display().to_string()).into());
        }

        let mut count = 0;

        for entry in WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                ScanError::Io(path, e.to_string())
            })?;

            if entry.file_type().is_file() && is_class_file(entry.path()) {
                visit(entry.path())?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Collect all class files under `root`
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let mut class_files = Vec::new();
        self.scan(root, |path| {
            class_files.push(path.to_path_buf());
            Ok::<(), ScanError>(())
        })?;
        Ok(class_files)
    }
}

/// Check whether a path has the `.class` extension
pub fn is_class_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "class")
}

/// Scan errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Scan root not found: {0}")]
    RootNotFound(String),

    #[error("Failed to read {0}: {1}")]
    Io(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_class_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b/Bar.class"));
        touch(&dir.path().join("a/Foo.class"));
        touch(&dir.path().join("a/Foo.java"));
        touch(&dir.path().join("a/nested/Baz.class"));
        touch(&dir.path().join("README.md"));

        let found = ClassScanner::new().discover(dir.path()).unwrap();
        let relative: Vec<PathBuf> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/Foo.class"),
                PathBuf::from("a/nested/Baz.class"),
                PathBuf::from("b/Bar.class"),
            ]
        );
    }

    #[test]
    fn single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Foo.class");
        touch(&file);

        let found = ClassScanner::new().discover(&file).unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn missing_root() {
        let err = ClassScanner::new()
            .discover(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, ScanError::RootNotFound(_)));
    }

    #[test]
    fn visitor_error_stops_scan() {
        #[derive(Debug)]
        enum StopError {
            Stop,
            Scan,
        }

        impl From<ScanError> for StopError {
            fn from(_: ScanError) -> Self {
                StopError::Scan
            }
        }

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("A.class"));
        touch(&dir.path().join("B.class"));

        let mut seen = 0;
        let result = ClassScanner::new().scan(dir.path(), |_| {
            seen += 1;
            Err(StopError::Stop)
        });

        assert!(matches!(result, Err(StopError::Stop)));
        assert_eq!(seen, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_need_follow_links() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        touch(&outside.path().join("lib/Shared.class"));
        touch(&dir.path().join("own/Foo.class"));
        std::os::unix::fs::symlink(outside.path().join("lib"), dir.path().join("linked")).unwrap();

        let plain = ClassScanner::new().discover(dir.path()).unwrap();
        assert_eq!(plain, vec![dir.path().join("own/Foo.class")]);

        let followed = ClassScanner::new().follow_links(true).discover(dir.path()).unwrap();
        assert_eq!(
            followed,
            vec![
                dir.path().join("linked/Shared.class"),
                dir.path().join("own/Foo.class"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        touch(&locked.join("Hidden.class"));
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still list the directory
        let still_readable = std::fs::read_dir(&locked).is_ok();
        let result = ClassScanner::new().discover(dir.path());

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if still_readable {
            return;
        }
        match result {
            Err(ScanError::Io(path, _)) => assert!(path.ends_with("locked")),
            other => panic!("expected an IO error, got {:?}", other),
        }
    }

    #[test]
    fn class_extension() {
        assert!(is_class_file(Path::new("a/Foo.class")));
        assert!(is_class_file(Path::new("a/Foo$1.class")));
        assert!(!is_class_file(Path::new("a/Foo.java")));
        assert!(!is_class_file(Path::new("a/class")));
    }
}
