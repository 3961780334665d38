//! Name generators used to fill wildcards.
//!
//! A generator is resolved once, when a factory is built, from either an alias
//! (`timestamp`/`ts`, `random`/`hat`, `alpha`) or a caller-supplied function.
//! Cloning a generator shares its state, so a sub-factory that inherits its
//! parent's generator continues the same sequence.

use crate::error::{json_kind, Error, Result};
use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

/// Signature of a custom generator.
pub type GenFn = dyn Fn() -> GeneratedName + Send + Sync;

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Length of a `random` token in hex characters (128 bits).
const RANDOM_TOKEN_LEN: usize = 32;

/// One value produced by a generator.
///
/// Strings are used as-is and numbers by their decimal form. `Invalid` carries
/// the kind of a value that cannot name a directory and is rejected when the
/// name is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedName {
    Str(String),
    Num(i64),
    Invalid(&'static str),
}

impl From<String> for GeneratedName {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for GeneratedName {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<char> for GeneratedName {
    fn from(c: char) -> Self {
        Self::Str(c.to_string())
    }
}

impl From<i64> for GeneratedName {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for GeneratedName {
    fn from(n: i32) -> Self {
        Self::Num(n.into())
    }
}

impl From<u32> for GeneratedName {
    fn from(n: u32) -> Self {
        Self::Num(n.into())
    }
}

impl From<u64> for GeneratedName {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or_else(|_| Self::Str(n.to_string()), Self::Num)
    }
}

impl<T: Into<GeneratedName>> From<Option<T>> for GeneratedName {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Invalid("null"), Into::into)
    }
}

/// Untyped values, for generators driven by JSON data.
impl From<Value> for GeneratedName {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Str(s),
            Value::Number(n) => match n.as_i64() {
                Some(n) => Self::Num(n),
                None => Self::Str(n.to_string()),
            },
            other => Self::Invalid(json_kind(&other)),
        }
    }
}

/// Discriminant of a [`Generator`], for logging and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Timestamp,
    Random,
    Alpha,
    Custom,
}

#[derive(Clone, Default)]
pub enum Generator {
    /// Milliseconds since the epoch, strictly increasing within the process.
    #[default]
    Timestamp,
    /// 128 random bits as 32 hex characters.
    Random,
    /// Cycles `a` through `z`. Low entropy on purpose.
    Alpha(Arc<AtomicU8>),
    Custom(Arc<GenFn>),
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha(state) => f
                .debug_tuple("Alpha")
                .field(&(state.load(Ordering::SeqCst) as char))
                .finish(),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

impl Generator {
    /// Resolve a generator alias.
    pub fn from_alias(alias: &str) -> Result<Self> {
        match alias {
            "timestamp" | "ts" => Ok(Self::Timestamp),
            "random" | "hat" => Ok(Self::Random),
            "alpha" => Ok(Self::alpha()),
            _ => Err(Error::UnknownGeneratorAlias {
                alias: alias.to_string(),
            }),
        }
    }

    /// Resolve a generator from an untyped config value.
    ///
    /// `null` selects the default, a string is looked up as an alias, and
    /// anything else is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(alias) => Self::from_alias(alias),
            other => Err(Error::InvalidGeneratorType {
                kind: json_kind(other),
            }),
        }
    }

    /// A fresh `alpha` generator whose first value is `a`.
    pub fn alpha() -> Self {
        Self::Alpha(Arc::new(AtomicU8::new(b'a' - 1)))
    }

    /// Wrap a function returning anything convertible to [`GeneratedName`].
    pub fn custom<F, T>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Into<GeneratedName>,
    {
        Self::Custom(Arc::new(move || f().into()))
    }

    pub fn kind(&self) -> GeneratorKind {
        match self {
            Self::Timestamp => GeneratorKind::Timestamp,
            Self::Random => GeneratorKind::Random,
            Self::Alpha(_) => GeneratorKind::Alpha,
            Self::Custom(_) => GeneratorKind::Custom,
        }
    }

    /// True if both handles produce from the same source.
    ///
    /// Stateless variants compare by kind, stateful ones by shared state.
    pub fn same_as(&self, other: &Generator) -> bool {
        match (self, other) {
            (Self::Timestamp, Self::Timestamp) | (Self::Random, Self::Random) => true,
            (Self::Alpha(a), Self::Alpha(b)) => Arc::ptr_eq(a, b),
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Produce the next raw value.
    pub fn next_value(&self) -> GeneratedName {
        match self {
            Self::Timestamp => GeneratedName::Num(next_timestamp()),
            Self::Random => GeneratedName::Str(next_random()),
            Self::Alpha(state) => GeneratedName::from(next_alpha(state)),
            Self::Custom(f) => f(),
        }
    }

    /// Produce the next value and validate it as a directory name fragment.
    pub fn next_name(&self) -> Result<String> {
        validate_name(self.next_value())
    }
}

/// Convert a generated value to a name and check its characters.
pub(crate) fn validate_name(value: GeneratedName) -> Result<String> {
    let name = match value {
        GeneratedName::Str(s) => s,
        GeneratedName::Num(n) => n.to_string(),
        GeneratedName::Invalid(kind) => return Err(Error::BadGeneratedValue { kind }),
    };

    if name.is_empty() {
        return Err(Error::EmptyGeneratedValue);
    }
    if !name.chars().all(is_allowed_char) {
        return Err(Error::IllegalGeneratedCharacters { name });
    }
    Ok(name)
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ' ')
}

fn next_timestamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    // Closure always returns Some, so this cannot fail.
    let prev = LAST_TIMESTAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(prev + 1)
}

fn next_random() -> String {
    format!("{:0width$x}", rand::random::<u128>(), width = RANDOM_TOKEN_LEN)
}

fn next_alpha(state: &AtomicU8) -> char {
    let step = |n: u8| if n >= b'z' { b'a' } else { n + 1 };
    let prev = state
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(step(n)))
        .unwrap_or_else(|n| n);
    step(prev) as char
}
