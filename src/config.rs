//! Factory options.
//!
//! `FactoryOptions` is the typed builder used from code. `FactoryConfig` is
//! the same set of options in a shape that can be deserialized (from JSON, a
//! test fixture, or any serde source) and validated into options.

use crate::error::{json_kind, Error, Result};
use crate::generator::Generator;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// Options for building a [`Factory`](crate::Factory).
///
/// Unset values fall back to the defaults, or for a sub-factory to the
/// parent's settings.
#[derive(Debug, Clone, Default)]
pub struct FactoryOptions {
    pub(crate) root: Option<PathBuf>,
    pub(crate) gen: Option<Generator>,
    pub(crate) clean: Option<bool>,
    pub(crate) always: Option<bool>,
}

impl FactoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit root directory. Created if missing, never deleted.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn gen(mut self, gen: Generator) -> Self {
        self.gen = Some(gen);
        self
    }

    /// Select a generator by alias (`timestamp`, `ts`, `random`, `hat`, `alpha`).
    pub fn gen_alias(self, alias: &str) -> Result<Self> {
        Ok(self.gen(Generator::from_alias(alias)?))
    }

    /// Delete everything the factory created when it is dropped.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = Some(clean);
        self
    }

    /// With `clean`, also clean up when dropped during a panic.
    pub fn always(mut self, always: bool) -> Self {
        self.always = Some(always);
        self
    }
}

/// Deserializable factory configuration.
///
/// ```json
/// { "spec": "build/*", "root": "/tmp/work", "gen": "hat", "clean": true }
/// ```
///
/// `spec` and `gen` are kept untyped so wrong kinds are reported as the
/// matching factory errors rather than as parse failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub spec: Value,
    pub root: Option<PathBuf>,
    pub gen: Value,
    pub clean: bool,
    pub always: bool,
}

impl FactoryConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Validate into a spec and typed options.
    pub fn into_parts(self) -> Result<(Option<String>, FactoryOptions)> {
        let spec = match self.spec {
            Value::Null => None,
            Value::String(spec) => Some(spec),
            other => {
                return Err(Error::InvalidSpecKind {
                    kind: json_kind(&other),
                })
            }
        };

        let options = FactoryOptions {
            root: self.root,
            gen: Some(Generator::from_value(&self.gen)?),
            clean: Some(self.clean),
            always: Some(self.always),
        };
        Ok((spec, options))
    }
}
