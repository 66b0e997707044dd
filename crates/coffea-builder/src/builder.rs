//! Model construction from scanned class files

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use coffea_core::config::matches_any;
use coffea_core::{ClassNodeFactory, Config, Model, NodeFactory};
use coffea_java::{ClassFile, ClassFileError, ClassScanner, ScanError};

/// Builds a dependency model from class files under one or more roots.
///
/// Every `append` adds to the same model. A class file already merged
/// through an earlier root (same canonical path) is not merged again, so
/// overlapping roots do not inflate sizes. Distinct files that map to the
/// same key are still combined by the model.
#[derive(Debug)]
pub struct Builder {
    model: Model,
    node_factory: Box<dyn NodeFactory>,
    exclude: Vec<String>,
    follow_links: bool,
    merged_files: HashSet<PathBuf>,
}

impl Builder {
    /// Create a builder with an empty model
    pub fn new(node_factory: Box<dyn NodeFactory>) -> Self {
        Self {
            model: Model::new(),
            node_factory,
            exclude: Vec::new(),
            follow_links: false,
            merged_files: HashSet::new(),
        }
    }

    /// Create a builder using the granularity, size metric, exclude
    /// patterns and link handling from a config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.granularity.node_factory(config.size))
            .with_exclude(config.exclude.clone())
            .with_follow_links(config.follow_links)
    }

    /// Skip classes whose qualified name matches any of these glob patterns
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Descend into symlinked directories during scans
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Scan `root` and merge every class file found into the model.
    ///
    /// Returns the number of class files found. A class file that fails to
    /// parse aborts the scan; nodes merged before the failure stay in the
    /// model.
    pub fn append(&mut self, root: &Path) -> Result<usize, BuildError> {
        tracing::info!("Scanning path: {}", root.display());

        let scanner = ClassScanner::new().follow_links(self.follow_links);
        let classes = scanner.scan(root, |path| self.process_class(path))?;

        tracing::info!("Scan finished. Found {} class files.", classes);
        Ok(classes)
    }

    fn process_class(&mut self, path: &Path) -> Result<(), BuildError> {
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| ScanError::Io(path.display().to_string(), e.to_string()))?;
        if self.merged_files.contains(&canonical) {
            tracing::debug!("Skipping already merged class file: {}", path.display());
            return Ok(());
        }

        let artifact = ClassFile::from_file(path)
            .map_err(|source| BuildError::Parse {
                path: path.display().to_string(),
                source,
            })?
            .into_artifact();

        self.merged_files.insert(canonical);

        if matches_any(&artifact.name, &self.exclude) {
            tracing::debug!("Excluding class: {}", artifact.name);
            return Ok(());
        }

        let node = self.node_factory.get_node(&artifact);
        tracing::debug!("Processing node: {}", node);
        self.model.merge(node);

        Ok(())
    }

    /// Model accumulated so far
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Hand the model over to downstream consumers
    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn node_factory(&self) -> &dyn NodeFactory {
        self.node_factory.as_ref()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(Box::new(ClassNodeFactory::default()))
    }
}

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ClassFileError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffea_core::{Granularity, SizeMetric};
    use coffea_java::class_file::fixture::ClassFixture;

    fn write_class(root: &Path, fixture: ClassFixture, relative: &str) -> u64 {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bytes = fixture.to_bytes();
        std::fs::write(&path, &bytes).unwrap();
        bytes.len() as u64
    }

    #[test]
    fn default_builder_uses_class_nodes() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), ClassFixture::new("a/Foo").class_ref("b/Bar"), "a/Foo.class");

        let mut builder = Builder::default();
        assert_eq!(builder.append(dir.path()).unwrap(), 1);

        let node = builder.model().get("a.Foo").unwrap();
        assert!(node.dependencies.contains("b.Bar"));
        assert_eq!(node.size, 0);
    }

    #[test]
    fn from_config_applies_settings() {
        let mut config = Config::default();
        config.granularity = Granularity::Package;
        config.size = SizeMetric::Code;
        config.exclude = vec!["*Test".to_string()];

        let dir = tempfile::tempdir().unwrap();
        write_class(
            dir.path(),
            ClassFixture::new("a/Foo").method("run", "()V", Some(20)),
            "a/Foo.class",
        );
        write_class(
            dir.path(),
            ClassFixture::new("a/FooTest").method("test", "()V", Some(99)),
            "a/FooTest.class",
        );

        let mut builder = Builder::from_config(&config);
        assert_eq!(builder.node_factory().size_metric(), SizeMetric::Code);
        assert_eq!(builder.append(dir.path()).unwrap(), 2);

        let model = builder.into_model();
        assert_eq!(model.len(), 1);
        assert_eq!(model.get("a").unwrap().size, 20);
    }

    #[cfg(unix)]
    #[test]
    fn follow_links_reaches_symlinked_output() {
        let dir = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        write_class(shared.path(), ClassFixture::new("s/Shared"), "s/Shared.class");
        std::os::unix::fs::symlink(shared.path(), dir.path().join("shared")).unwrap();

        let mut plain = Builder::default();
        assert_eq!(plain.append(dir.path()).unwrap(), 0);

        let mut config = Config::default();
        config.follow_links = true;
        let mut following = Builder::from_config(&config);
        assert_eq!(following.append(dir.path()).unwrap(), 1);
        assert!(following.model().contains("s.Shared"));
    }

    #[test]
    fn parse_error_message_names_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.class"), b"garbage").unwrap();

        let err = Builder::default().append(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::Parse { .. }));
        assert!(err.to_string().contains("Broken.class"));
    }
}
