//! `tmpgen`: Generate unique directories from wildcard path specs and delete
//! exactly what was generated.
//!
//! Provides:
//! - `spec`: Validate a relative path template against a root and split it
//! - `generator`: Name generators that fill `*` wildcards
//! - `factory`: Produce fresh directories, sub-factories, and scoped deletion
//! - `config`: Builder and deserializable options for factories
//! - `fs`: The create/delete directory primitives underneath
//!
//! ```no_run
//! let mut tmp = tmpgen::Factory::new("my-tests/*")?;
//! let dir = tmp.make()?;
//! assert!(dir.is_dir());
//! tmp.del_all()?;
//! # Ok::<(), tmpgen::Error>(())
//! ```

use std::path::PathBuf;

pub mod config;
pub mod error;
pub mod factory;
pub mod fs;
pub mod generator;
pub mod spec;

pub use config::{FactoryConfig, FactoryOptions};
pub use error::{Error, Result};
pub use factory::{Factory, SubPath, MAX_REPEAT};
pub use generator::{GeneratedName, Generator, GeneratorKind};

/// Environment variable to override the default root directory.
const ROOT_ENV: &str = "TMPGEN_ROOT";

/// Root used when a factory is built without one.
/// Respects `TMPGEN_ROOT`, otherwise the system temp directory.
pub fn default_root() -> PathBuf {
    match std::env::var_os(ROOT_ENV) {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => std::env::temp_dir(),
    }
}
