//! Parsed fact sheet for one compiled class

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Flat facts extracted from one class file.
///
/// Produced by the class-file parser; consumed by node factories. Names use
/// the dotted source form (`java.util.List`, `a.Outer$Inner`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassArtifact {
    /// Fully qualified class name
    pub name: String,

    /// Package name, empty for the default package
    pub package: String,

    /// Classes referenced by this class (never includes the class itself)
    pub class_dependencies: BTreeSet<String>,

    /// Packages referenced by this class (never includes its own package)
    pub package_dependencies: BTreeSet<String>,

    /// Size of the whole class file in bytes
    pub size: u64,

    /// Total bytecode length across all method bodies
    pub code_size: u64,
}

impl ClassArtifact {
    /// Build an artifact from a class name and its referenced classes.
    ///
    /// The package and the package-level dependencies are derived from the
    /// names: self references are dropped, and references into the own or the
    /// default package do not produce package dependencies.
    pub fn new<I, S>(
        name: impl Into<String>,
        class_dependencies: I,
        size: u64,
        code_size: u64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let package = package_of(&name).to_string();

        let class_dependencies: BTreeSet<String> = class_dependencies
            .into_iter()
            .map(Into::into)
            .filter(|dep| *dep != name)
            .collect();

        let package_dependencies = class_dependencies
            .iter()
            .map(|dep| package_of(dep))
            .filter(|dep_package| !dep_package.is_empty() && *dep_package != package)
            .map(str::to_string)
            .collect();

        Self {
            name,
            package,
            class_dependencies,
            package_dependencies,
            size,
            code_size,
        }
    }
}

/// Package part of a qualified class name (`""` for the default package)
pub fn package_of(class_name: &str) -> &str {
    class_name
        .rfind('.')
        .map(|idx| &class_name[..idx])
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_of_names() {
        assert_eq!(package_of("java.util.List"), "java.util");
        assert_eq!(package_of("a.Outer$Inner"), "a");
        assert_eq!(package_of("Main"), "");
    }

    #[test]
    fn derived_package_dependencies() {
        let artifact = ClassArtifact::new(
            "a.Foo",
            ["a.Foo", "a.Helper", "b.Bar", "b.sub.Baz", "Unpackaged"],
            100,
            40,
        );

        assert_eq!(artifact.package, "a");
        assert!(!artifact.class_dependencies.contains("a.Foo"));
        assert!(artifact.class_dependencies.contains("a.Helper"));
        assert_eq!(
            artifact.package_dependencies.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["b", "b.sub"]
        );
    }

    #[test]
    fn default_package_class() {
        let artifact = ClassArtifact::new("Main", ["java.lang.Object"], 10, 0);
        assert_eq!(artifact.package, "");
        assert!(artifact.package_dependencies.contains("java.lang"));
    }
}
