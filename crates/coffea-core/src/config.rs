//! Configuration schema (coffea.toml)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Level at which nodes are defined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One node per class, keyed by qualified class name
    #[default]
    Class,

    /// One node per package, keyed by package name
    Package,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" => Ok(Self::Class),
            "package" => Ok(Self::Package),
            _ => Err(ConfigError::InvalidGranularity(s.to_string())),
        }
    }
}

/// Which artifact size a node carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMetric {
    /// Always 0
    #[default]
    None,

    /// Size of the whole class file
    Class,

    /// Bytecode length of all method bodies
    Code,
}

impl SizeMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Class => "class",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for SizeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "class" => Ok(Self::Class),
            "code" => Ok(Self::Code),
            _ => Err(ConfigError::InvalidSizeMetric(s.to_string())),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Node granularity
    #[serde(default)]
    pub granularity: Granularity,

    /// Size metric attached to every node
    #[serde(default)]
    pub size: SizeMetric,

    /// Directories (or single class files) to scan
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Class names to leave out of the model (glob patterns)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Descend into symlinked directories while scanning
    #[serde(default)]
    pub follow_links: bool,

    /// Project root path (for resolving relative roots)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            size: SizeMetric::default(),
            roots: Vec::new(),
            exclude: Vec::new(),
            follow_links: false,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Scan roots, with relative paths resolved against the project root
    pub fn resolved_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| {
                if root.is_relative() {
                    self.project_root.join(root)
                } else {
                    root.clone()
                }
            })
            .collect()
    }

    /// Check if a class name matches any exclude pattern
    pub fn is_excluded(&self, class_name: &str) -> bool {
        matches_any(class_name, &self.exclude)
    }
}

/// Check a name against a list of glob patterns
pub fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if pattern.contains('*') {
            glob_match(pattern, name)
        } else {
            pattern == name
        }
    })
}

/// Simple glob matching (`*` matches any run of characters, including dots)
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');

    // split always yields at least one part
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = parts.collect();
    let Some((last, middle)) = middle.split_last() else {
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid size metric '{0}' (expected none, class or code)")]
    InvalidSizeMetric(String),

    #[error("Invalid granularity '{0}' (expected class or package)")]
    InvalidGranularity(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.granularity, Granularity::Class);
        assert_eq!(config.size, SizeMetric::None);
        assert!(config.roots.is_empty());
        assert!(!config.follow_links);
    }

    #[test]
    fn parse_toml() {
        let config = Config::from_toml(
            r#"
            granularity = "package"
            size = "code"
            roots = ["build/classes"]
            exclude = ["*Test"]
            follow_links = true
            "#,
        )
        .unwrap();

        assert_eq!(config.granularity, Granularity::Package);
        assert_eq!(config.size, SizeMetric::Code);
        assert_eq!(config.roots, vec![PathBuf::from("build/classes")]);
        assert!(config.is_excluded("a.FooTest"));
        assert!(!config.is_excluded("a.Foo"));
        assert!(config.follow_links);
    }

    #[test]
    fn unknown_size_in_toml_is_rejected() {
        let err = Config::from_toml(r#"size = "bytes""#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn size_metric_from_str() {
        assert_eq!("none".parse::<SizeMetric>().unwrap(), SizeMetric::None);
        assert_eq!("Class".parse::<SizeMetric>().unwrap(), SizeMetric::Class);
        assert_eq!("code".parse::<SizeMetric>().unwrap(), SizeMetric::Code);

        let err = "lines".parse::<SizeMetric>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSizeMetric(ref value) if value == "lines"));
    }

    #[test]
    fn granularity_from_str() {
        assert_eq!("package".parse::<Granularity>().unwrap(), Granularity::Package);
        assert!(matches!(
            "module".parse::<Granularity>(),
            Err(ConfigError::InvalidGranularity(_))
        ));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = Config::default();
        config.granularity = Granularity::Package;
        config.size = SizeMetric::Class;

        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(parsed.granularity, Granularity::Package);
        assert_eq!(parsed.size, SizeMetric::Class);
    }

    #[test]
    fn file_roots_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffea.toml");
        std::fs::write(&path, "roots = [\"out\", \"/abs/classes\"]\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(
            config.resolved_roots(),
            vec![dir.path().join("out"), PathBuf::from("/abs/classes")]
        );
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("com.acme.*", "com.acme.Foo"));
        assert!(glob_match("*Test", "a.FooTest"));
        assert!(glob_match("*.internal.*Impl", "a.internal.FooImpl"));
        assert!(!glob_match("com.acme.*", "org.acme.Foo"));
        assert!(!glob_match("*.internal.*Impl", "a.internal.Foo"));
        assert!(!glob_match("a.Foo", "a.FooBar"));
    }
}
