//! The path factory.
//!
//! A `Factory` turns a resolved spec into fresh directories, one per call to
//! [`Factory::make`], and remembers what it created so [`Factory::del_all`]
//! can remove exactly that. Wildcards other than the last are resolved once
//! and reused, so only the trailing dynamic segment changes between calls.

use crate::config::{FactoryConfig, FactoryOptions};
use crate::error::{Error, Result};
use crate::fs::{make_dir_all, remove_dir_all};
use crate::generator::Generator;
use crate::spec::{default_spec, normalize, ResolvedSpec, Segment, WILDCARD};
use std::path::{Component, Path, PathBuf};

/// Attempts made by the repeat-escalation protocol, beyond the first.
pub const MAX_REPEAT: usize = 25;

/// Extra path components appended below a generated directory.
///
/// Parts may be nested; they are flattened in order before joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubPath {
    Part(PathBuf),
    Nested(Vec<SubPath>),
}

impl SubPath {
    pub fn flatten(self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                SubPath::Part(p) => out.push(p),
                SubPath::Nested(children) => stack.extend(children.into_iter().rev()),
            }
        }
        out
    }
}

impl From<&str> for SubPath {
    fn from(s: &str) -> Self {
        SubPath::Part(PathBuf::from(s))
    }
}

impl From<String> for SubPath {
    fn from(s: String) -> Self {
        SubPath::Part(PathBuf::from(s))
    }
}

impl From<&Path> for SubPath {
    fn from(p: &Path) -> Self {
        SubPath::Part(p.to_path_buf())
    }
}

impl From<PathBuf> for SubPath {
    fn from(p: PathBuf) -> Self {
        SubPath::Part(p)
    }
}

impl<T: Into<SubPath>> From<Vec<T>> for SubPath {
    fn from(parts: Vec<T>) -> Self {
        SubPath::Nested(parts.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SubPath>, const N: usize> From<[T; N]> for SubPath {
    fn from(parts: [T; N]) -> Self {
        SubPath::Nested(parts.into_iter().map(Into::into).collect())
    }
}

/// Generates unique directories below a root and tracks what it created.
///
/// Not meant to be shared between threads while in use: every operation that
/// touches the filesystem takes `&mut self`.
#[derive(Debug)]
pub struct Factory {
    root: PathBuf,
    spec: ResolvedSpec,
    gen: Generator,
    /// Paths this factory caused to exist, in creation order.
    created: Vec<PathBuf>,
    /// Resolved values for every wildcard but the last.
    fill: Vec<String>,
    clean: bool,
    always: bool,
}

impl Factory {
    /// Factory for `spec` below the default root.
    pub fn new(spec: &str) -> Result<Self> {
        Self::with_options(Some(spec), FactoryOptions::default())
    }

    /// Build a factory. A missing spec defaults to `<package-name>/*`.
    pub fn with_options(spec: Option<&str>, options: FactoryOptions) -> Result<Self> {
        let spec = match spec {
            Some(spec) => spec.to_string(),
            None => default_spec()?,
        };

        let (root, explicit) = match &options.root {
            Some(root) => (absolute_root(root)?, true),
            None => (absolute_root(&crate::default_root())?, false),
        };

        let factory = Self::build(&spec, root, options)?;

        // An explicit root is made eagerly and left out of `created`.
        if explicit {
            std::fs::create_dir_all(&factory.root)
                .map_err(|e| Error::io(&factory.root, e))?;
        }
        Ok(factory)
    }

    pub fn from_config(config: FactoryConfig) -> Result<Self> {
        let (spec, options) = config.into_parts()?;
        Self::with_options(spec.as_deref(), options)
    }

    fn build(spec: &str, root: PathBuf, options: FactoryOptions) -> Result<Self> {
        let spec = ResolvedSpec::resolve(spec, &root)?;
        let gen = options.gen.unwrap_or_default();

        tracing::debug!(
            root = %root.display(),
            spec = spec.spec(),
            gen = ?gen.kind(),
            "created path factory"
        );

        Ok(Self {
            root,
            spec,
            gen,
            created: Vec::new(),
            fill: Vec::new(),
            clean: options.clean.unwrap_or(false),
            always: options.always.unwrap_or(false),
        })
    }

    /// Build a child factory rooted at a fresh path from this one.
    pub fn sub(&mut self, spec: &str) -> Result<Factory> {
        self.sub_with(spec, FactoryOptions::default())
    }

    /// Like [`sub`](Self::sub) with options.
    ///
    /// The child inherits this factory's generator and cleanup settings
    /// unless `options` overrides them. `options.root` is ignored: the child's
    /// root is always a new directory from this factory.
    pub fn sub_with(&mut self, spec: &str, options: FactoryOptions) -> Result<Factory> {
        if spec.is_empty() {
            return Err(Error::EmptySubSpec);
        }
        let rel = Path::new(spec);
        if rel.has_root() || rel.is_absolute() {
            return Err(Error::AbsolutePathRejected {
                spec: spec.to_string(),
            });
        }
        // The child's root does not exist yet, so check the escape lexically
        // before this factory creates it.
        let lexical = normalize(rel);
        if matches!(
            lexical.components().next(),
            None | Some(Component::ParentDir)
        ) {
            return Err(Error::EscapesRoot {
                spec: spec.to_string(),
                root: self.root.clone(),
            });
        }

        let root = self.make()?;
        let options = FactoryOptions {
            root: None,
            gen: options.gen.or_else(|| Some(self.gen.clone())),
            clean: options.clean.or(Some(self.clean)),
            always: options.always.or(Some(self.always)),
        };
        Self::build(spec, root, options)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn spec(&self) -> &str {
        self.spec.spec()
    }

    /// The generator in use.
    pub fn gen(&self) -> &Generator {
        &self.gen
    }

    /// Paths currently tracked for deletion, in creation order.
    pub fn created(&self) -> &[PathBuf] {
        &self.created
    }

    /// Produce a new directory and return its absolute path.
    pub fn make(&mut self) -> Result<PathBuf> {
        self.produce(None)
    }

    /// Produce a new directory, then create `sub_path` below it and return
    /// that path.
    ///
    /// `sub_path` must stay strictly inside the generated directory.
    pub fn make_with(&mut self, sub_path: impl Into<SubPath>) -> Result<PathBuf> {
        let parts = sub_path.into().flatten();
        if parts.is_empty() {
            return self.produce(None);
        }

        let joined: PathBuf = parts.iter().collect();
        let rel = normalize(&joined);
        let escapes = rel.as_os_str().is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(Error::SubPathEscapes {
                sub_path: joined.display().to_string(),
            });
        }
        self.produce(Some(&rel))
    }

    /// Run one invocation, recording state only if it succeeds.
    ///
    /// Directories made by a failed invocation are removed again.
    fn produce(&mut self, sub_path: Option<&Path>) -> Result<PathBuf> {
        let mut staged = Vec::new();
        match self.resolve_next(sub_path, &mut staged) {
            Ok((path, fill)) => {
                self.fill = fill;
                for made in staged {
                    self.record(made);
                }
                if !self.owns(&path) {
                    self.record(path.clone());
                }
                Ok(path)
            }
            Err(e) => {
                for made in staged.iter().rev() {
                    if let Err(err) = remove_dir_all(made) {
                        tracing::warn!(path = %made.display(), error = %err, "failed to roll back directory");
                    }
                }
                Err(e)
            }
        }
    }

    /// Walk the spec, reusing cached wildcard values and generating the rest.
    ///
    /// Returns the final path and the fill cache to keep for the next call.
    fn resolve_next(
        &self,
        sub_path: Option<&Path>,
        staged: &mut Vec<PathBuf>,
    ) -> Result<(PathBuf, Vec<String>)> {
        let mut fill = self.fill.clone();
        let mut cached = self.fill.iter();
        let mut base = self.root.clone();
        // Literal segments joined since the last directory was created.
        let mut pending = false;

        for segment in self.spec.segments() {
            match segment {
                Segment::Literal(name) => {
                    base.push(name);
                    pending = true;
                }
                Segment::Dynamic(template) => match cached.next() {
                    Some(value) => {
                        base.push(value);
                        pending = true;
                    }
                    None => {
                        let (path, value) = self.expand(&base, template, staged)?;
                        fill.push(value);
                        base = path;
                        pending = false;
                    }
                },
            }
        }

        if pending {
            match make_dir_all(&base).map_err(|e| Error::io(&base, e))? {
                Some(made) => staged.push(made),
                None if !self.spec.has_wildcards() => {
                    return Err(Error::NoWildcardPathExists {
                        spec: self.spec.spec().to_string(),
                        path: base,
                    });
                }
                None => {}
            }
        }

        // The last wildcard is regenerated on every call.
        fill.pop();

        if let Some(sub_path) = sub_path {
            base.push(sub_path);
            if let Some(made) = make_dir_all(&base).map_err(|e| Error::io(&base, e))? {
                staged.push(made);
            }
        }

        Ok((base, fill))
    }

    /// Resolve one dynamic segment to a directory that did not exist before.
    ///
    /// The first two attempts use one generated value per `*`; after that the
    /// attempt number gives how many values are concatenated per `*`. An
    /// attempt that evaluates to the previous candidate is skipped without
    /// touching the filesystem.
    fn expand(
        &self,
        base: &Path,
        template: &str,
        staged: &mut Vec<PathBuf>,
    ) -> Result<(PathBuf, String)> {
        let mut previous: Option<String> = None;

        for attempt in 0..=MAX_REPEAT {
            let repeat = attempt.max(1);
            let evaluated = self.evaluate(template, repeat)?;

            if previous.as_deref() == Some(evaluated.as_str()) {
                tracing::trace!(attempt, repeat, candidate = %evaluated, "generator repeated itself");
                continue;
            }

            let candidate = base.join(&evaluated);
            tracing::trace!(attempt, repeat, candidate = %candidate.display(), "trying");

            match make_dir_all(&candidate).map_err(|e| Error::io(&candidate, e))? {
                Some(made) => {
                    tracing::debug!(path = %candidate.display(), "created directory");
                    staged.push(made);
                    return Ok((candidate, evaluated));
                }
                None => previous = Some(evaluated),
            }
        }

        Err(Error::GenerationExhausted {
            segment: template.to_string(),
            base: base.to_path_buf(),
            attempts: MAX_REPEAT + 1,
        })
    }

    /// Replace every `*` in `template` by `repeat` concatenated generator values.
    fn evaluate(&self, template: &str, repeat: usize) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        for c in template.chars() {
            if c == WILDCARD {
                for _ in 0..repeat {
                    out.push_str(&self.gen.next_name()?);
                }
            } else {
                out.push(c);
            }
        }

        // A whole segment of dots would walk the tree instead of naming a directory.
        if out == "." || out == ".." {
            return Err(Error::IllegalGeneratedCharacters { name: out });
        }
        Ok(out)
    }

    fn record(&mut self, path: PathBuf) {
        if !self.created.contains(&path) {
            tracing::debug!(path = %path.display(), "recorded path");
            self.created.push(path);
        }
    }

    fn owns(&self, path: &Path) -> bool {
        self.created.iter().any(|c| path.starts_with(c))
    }

    /// Delete everything this factory created.
    ///
    /// Entries nested under another tracked entry are covered by the outer
    /// delete. Entries that fail to delete stay tracked for a later retry.
    pub fn del_all(&mut self) -> Result<()> {
        for path in &self.created {
            self.ensure_deletable(path)?;
        }

        let tracked = std::mem::take(&mut self.created);
        let mut deleted: Vec<&Path> = Vec::new();

        for path in &tracked {
            let nested = tracked
                .iter()
                .any(|other| other != path && path.starts_with(other));
            if nested || deleted.iter().any(|d| path.starts_with(d)) {
                continue;
            }

            match remove_dir_all(path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "deleted");
                    deleted.push(path.as_path());
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete, keeping for retry");
                }
            }
        }

        let remaining: Vec<PathBuf> = tracked
            .iter()
            .filter(|p| !deleted.iter().any(|d| p.starts_with(d)))
            .cloned()
            .collect();
        self.created = remaining;
        Ok(())
    }

    /// Delete `path` if this factory created it or one of its ancestors.
    ///
    /// Relative paths resolve against the root. The first tracked entry that
    /// equals `path` or contains it decides: an exact match is deleted and
    /// forgotten, a path inside an entry is deleted while the entry stays
    /// tracked. Missing paths count as deleted.
    pub fn del(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let target = normalize(&self.root.join(path.as_ref()));

        let hit = self
            .created
            .iter()
            .enumerate()
            .find(|(_, tracked)| target.starts_with(tracked))
            .map(|(i, tracked)| (i, *tracked == target));

        let Some((index, exact)) = hit else {
            return Err(Error::NotOwnedByFactory { path: target });
        };

        self.ensure_deletable(&target)?;
        match remove_dir_all(&target) {
            Ok(()) => {
                tracing::debug!(path = %target.display(), "deleted");
                if exact {
                    self.created.remove(index);
                }
            }
            Err(e) => {
                tracing::warn!(path = %target.display(), error = %e, "failed to delete, keeping for retry");
            }
        }
        Ok(())
    }

    fn ensure_deletable(&self, path: &Path) -> Result<()> {
        if path != self.root && path.starts_with(&self.root) {
            Ok(())
        } else {
            Err(Error::UnsafeDeleteTarget {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })
        }
    }
}

impl Drop for Factory {
    fn drop(&mut self) {
        if !self.clean || (std::thread::panicking() && !self.always) {
            return;
        }
        if let Err(e) = self.del_all() {
            tracing::warn!(root = %self.root.display(), error = %e, "cleanup on drop failed");
        }
    }
}

/// Make `root` absolute and normalized, refusing empty and filesystem roots.
fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.as_os_str().is_empty() {
        return Err(Error::InvalidRoot {
            root: root.to_path_buf(),
        });
    }
    let abs = std::path::absolute(root).map_err(|e| Error::io(root, e))?;
    let abs = normalize(&abs);
    if abs.parent().is_none() {
        return Err(Error::InvalidRoot { root: abs });
    }
    Ok(abs)
}
