//! Errors raised while resolving specs, generating names, and deleting paths.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure a factory can report.
///
/// All of them are raised synchronously by the call that broke the contract.
/// No state is recorded for an invocation that returns one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// The spec value was neither absent nor a string.
    #[error("tmpgen: path spec must be a string, got: {kind}")]
    InvalidSpecKind { kind: &'static str },

    #[error("tmpgen: path spec must be relative, got: {spec}")]
    AbsolutePathRejected { spec: String },

    /// The spec resolves to the root itself or somewhere outside it.
    #[error("tmpgen: spec \"{spec}\" resolves to a path outside or equal to the root folder \"{}\"", .root.display())]
    EscapesRoot { spec: String, root: PathBuf },

    #[error("tmpgen: spec \"{spec}\" goes outside of root")]
    AscensionRejected { spec: String },

    #[error("tmpgen: could not find a package name to build a default spec")]
    NoDefaultSpec,

    #[error("tmpgen: root is empty or the filesystem root: \"{}\"", .root.display())]
    InvalidRoot { root: PathBuf },

    #[error("tmpgen: path spec for child may not be empty")]
    EmptySubSpec,

    /// A spec without wildcards pointed at a directory that already existed.
    #[error("tmpgen: spec \"{spec}\" does not contain wildcards and resolves to existing path \"{}\"", .path.display())]
    NoWildcardPathExists { spec: String, path: PathBuf },

    #[error("tmpgen: sub-path \"{sub_path}\" resolves to a path outside or equal to the generated directory")]
    SubPathEscapes { sub_path: String },

    #[error("tmpgen: generated name must be a string or number, got: {kind}")]
    BadGeneratedValue { kind: &'static str },

    #[error("tmpgen: generated name is empty")]
    EmptyGeneratedValue,

    #[error("tmpgen: generated name contains illegal characters: {name}")]
    IllegalGeneratedCharacters { name: String },

    /// The repeat-escalation protocol ran out of attempts.
    #[error("tmpgen: failed to create a unique path for \"{segment}\" in \"{}\" after {attempts} attempts", .base.display())]
    GenerationExhausted {
        segment: String,
        base: PathBuf,
        attempts: usize,
    },

    #[error("tmpgen: unknown generator alias: \"{alias}\"")]
    UnknownGeneratorAlias { alias: String },

    #[error("tmpgen: expected function or string name of generator, got: {kind}")]
    InvalidGeneratorType { kind: &'static str },

    #[error("tmpgen: this factory did not create path \"{}\" or an ancestor", .path.display())]
    NotOwnedByFactory { path: PathBuf },

    #[error("tmpgen: path \"{}\" is not inside root \"{}\"", .path.display(), .root.display())]
    UnsafeDeleteTarget { path: PathBuf, root: PathBuf },

    #[error("tmpgen: filesystem operation failed on \"{}\"", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Name of a JSON value's kind, used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
