//! Path spec parsing and validation.
//!
//! A spec is a relative path template such as `a/*/b-*`. Segments containing
//! a `*` are dynamic and get filled by a generator; all others are literal.
//! A spec is resolved against a root once, when its factory is built, and
//! must land strictly below that root.

use crate::error::{Error, Result};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

/// Wildcard character in a spec segment.
pub const WILDCARD: char = '*';

/// One segment of a resolved spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// Template containing at least one `*`.
    Dynamic(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw.contains(WILDCARD) {
            Self::Dynamic(raw.to_string())
        } else {
            Self::Literal(raw.to_string())
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) | Self::Dynamic(s) => s,
        }
    }
}

/// A spec validated against its root and split into segments.
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    spec: String,
    segments: Vec<Segment>,
}

impl ResolvedSpec {
    /// Validate `spec` against `root` and split it.
    ///
    /// `root` must already be absolute and normalized.
    pub fn resolve(spec: &str, root: &Path) -> Result<Self> {
        let rel = Path::new(spec);
        if rel.has_root() || rel.is_absolute() {
            return Err(Error::AbsolutePathRejected {
                spec: spec.to_string(),
            });
        }

        let abs = normalize(&root.join(rel));
        let inside = abs
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty());

        let Some(inside) = inside else {
            return Err(Error::EscapesRoot {
                spec: spec.to_string(),
                root: root.to_path_buf(),
            });
        };

        let segments = split(spec, inside)?;
        Ok(Self {
            spec: spec.to_string(),
            segments,
        })
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn dynamic_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_dynamic()).count()
    }

    pub fn has_wildcards(&self) -> bool {
        self.dynamic_count() > 0
    }
}

/// Split a root-relative path into segments, refusing any that ascend.
fn split(spec: &str, rel: &Path) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => segments.push(Segment::parse(&s.to_string_lossy())),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::AscensionRejected {
                    spec: spec.to_string(),
                })
            }
        }
    }
    Ok(segments)
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// `..` at the root of an absolute path stays at the root; leading `..` of a
/// relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(s) => out.push(s),
        }
    }
    out
}

/// Spec used when none is given: `<package-name>/*`.
pub fn default_spec() -> Result<String> {
    package_name()
        .map(|name| format!("{name}/{WILDCARD}"))
        .ok_or(Error::NoDefaultSpec)
}

/// Name of the current package.
///
/// Prefers `CARGO_PKG_NAME` (set by cargo for run and test), then the nearest
/// `Cargo.toml` with a `[package]` table above the current directory.
fn package_name() -> Option<String> {
    if let Ok(name) = std::env::var("CARGO_PKG_NAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors().find_map(|dir| {
        let manifest = dir.join("Cargo.toml");
        if !manifest.is_file() {
            return None;
        }
        match read_package_name(&manifest) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(manifest = %manifest.display(), error = %e, "skipping manifest");
                None
            }
        }
    })
}

#[derive(Deserialize)]
struct Manifest {
    package: Option<ManifestPackage>,
}

#[derive(Deserialize)]
struct ManifestPackage {
    name: Option<String>,
}

fn read_package_name(manifest: &Path) -> anyhow::Result<Option<String>> {
    let content = std::fs::read_to_string(manifest)
        .with_context(|| format!("Failed to read manifest: {}", manifest.display()))?;
    let parsed: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", manifest.display()))?;
    Ok(parsed
        .package
        .and_then(|p| p.name)
        .filter(|name| !name.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/tmp/tmpgen-root")
    }

    fn strs(spec: &ResolvedSpec) -> Vec<&str> {
        spec.segments().iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_resolve_splits_segments() {
        let spec = ResolvedSpec::resolve("a/*/b-*", &root()).unwrap();
        assert_eq!(strs(&spec), ["a", "*", "b-*"]);
        assert_eq!(spec.dynamic_count(), 2);
        assert!(!spec.segments()[0].is_dynamic());
        assert!(spec.segments()[2].is_dynamic());
    }

    #[test]
    fn test_resolve_normalizes_dots() {
        let spec = ResolvedSpec::resolve("t/foo/../foo-*/../bar-*", &root()).unwrap();
        assert_eq!(strs(&spec), ["t", "bar-*"]);

        let spec = ResolvedSpec::resolve("./a//b/.", &root()).unwrap();
        assert_eq!(strs(&spec), ["a", "b"]);
        assert!(!spec.has_wildcards());
    }

    #[test]
    fn test_resolve_rejects_absolute() {
        assert!(matches!(
            ResolvedSpec::resolve("/home", &root()),
            Err(Error::AbsolutePathRejected { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_escape() {
        for spec in ["..", "foo/../..", ".", "foo/../.", "./foo/../.", "", "../elsewhere"] {
            let result = ResolvedSpec::resolve(spec, &root());
            assert!(
                matches!(result, Err(Error::EscapesRoot { .. })),
                "spec {spec:?} should escape, got {result:?}"
            );
        }
    }

    #[test]
    fn test_resolve_allows_reentering_root() {
        // Leaves the root and comes back in under the same name.
        let spec = ResolvedSpec::resolve("../tmpgen-root/x-*", &root()).unwrap();
        assert_eq!(strs(&spec), ["x-*"]);
    }

    #[test]
    fn test_split_rejects_parent_segment() {
        assert!(matches!(
            split("x", Path::new("a/../b")),
            Err(Error::AscensionRejected { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_read_package_name() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("Cargo.toml");

        std::fs::write(&manifest, "[package]\nname = \"demo-pkg\"\nversion = \"0.1.0\"\n").unwrap();
        assert_eq!(read_package_name(&manifest).unwrap().as_deref(), Some("demo-pkg"));

        std::fs::write(&manifest, "[workspace]\nmembers = []\n").unwrap();
        assert_eq!(read_package_name(&manifest).unwrap(), None);

        std::fs::write(&manifest, "not = [valid").unwrap();
        assert!(read_package_name(&manifest).is_err());
    }

    #[test]
    fn test_default_spec_uses_package_name() {
        // cargo sets CARGO_PKG_NAME for test binaries.
        assert_eq!(default_spec().unwrap(), "tmpgen/*");
    }
}
