//! Stage signatures
//!
//! A stage signature is a SHA256 digest over the stage's dependency values.
//! Dependency lists may nest; they are flattened before hashing so the
//! digest depends on the order and value of the scalars, not on how they
//! were grouped.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A single input to a stage signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Dependency {
    Null,
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<Dependency>),
}

impl Dependency {
    fn tag(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Str(_) => 1,
            Self::Int(_) => 2,
            Self::Bool(_) => 3,
            Self::List(_) => 4,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Bool(b) => write!(f, "{}", b),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Dependency {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Dependency {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for Dependency {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for Dependency {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Dependency {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&Signature> for Dependency {
    fn from(value: &Signature) -> Self {
        Self::Str(value.0.clone())
    }
}

impl<T: Into<Dependency>> From<Option<T>> for Dependency {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Dependency>> From<Vec<T>> for Dependency {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Cache-busting token from configuration.
///
/// Written as `1` or `"v1"` in TOML; the integer and string forms hash
/// differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheVersion {
    Int(i64),
    Str(String),
}

impl From<i64> for CacheVersion {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for CacheVersion {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for CacheVersion {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&CacheVersion> for Dependency {
    fn from(value: &CacheVersion) -> Self {
        match value {
            CacheVersion::Int(i) => Self::Int(*i),
            CacheVersion::Str(s) => Self::Str(s.clone()),
        }
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Hex-encoded SHA256 digest identifying a stage's cached output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for display
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flatten nested dependency lists into their scalar values, in order
pub fn flatten(dependencies: &[Dependency]) -> Vec<&Dependency> {
    let mut scalars = Vec::new();
    collect_scalars(dependencies, &mut scalars);
    scalars
}

fn collect_scalars<'a>(dependencies: &'a [Dependency], out: &mut Vec<&'a Dependency>) {
    for dependency in dependencies {
        match dependency {
            Dependency::List(items) => collect_scalars(items, out),
            scalar => out.push(scalar),
        }
    }
}

/// Digest an ordered sequence of dependencies.
///
/// Every scalar is written as a type tag plus a length-prefixed value so
/// that `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn hashsum(dependencies: &[Dependency]) -> Signature {
    let mut hasher = Sha256::new();

    for scalar in flatten(dependencies) {
        let value = match scalar {
            Dependency::Null => String::new(),
            Dependency::Str(s) => s.clone(),
            Dependency::Int(i) => i.to_string(),
            Dependency::Bool(b) => b.to_string(),
            Dependency::List(_) => continue,
        };
        hasher.update([scalar.tag()]);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value.as_bytes());
    }

    Signature(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(values: &[&str]) -> Vec<Dependency> {
        values.iter().map(|v| Dependency::from(*v)).collect()
    }

    #[test]
    fn hash_is_deterministic() {
        let a = hashsum(&deps(&["busybox:latest", "1", "v3"]));
        let b = hashsum(&deps(&["busybox:latest", "1", "v3"]));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn hash_is_order_sensitive() {
        let a = hashsum(&deps(&["a", "b"]));
        let b = hashsum(&deps(&["b", "a"]));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_changes_with_value() {
        let a = hashsum(&deps(&["busybox:latest", "1", "v3"]));
        let b = hashsum(&deps(&["busybox:latest", "1", "v4"]));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_ignores_nesting() {
        let flat = deps(&["a", "b", "c"]);
        let nested = vec![
            Dependency::from("a"),
            Dependency::List(vec![
                Dependency::from("b"),
                Dependency::List(vec![Dependency::from("c")]),
            ]),
        ];
        assert_eq!(hashsum(&flat), hashsum(&nested));
    }

    #[test]
    fn hash_has_no_concatenation_collisions() {
        assert_ne!(hashsum(&deps(&["ab", "c"])), hashsum(&deps(&["a", "bc"])));
    }

    #[test]
    fn null_differs_from_empty_string() {
        let null = vec![Dependency::Null, Dependency::from("v3")];
        let empty = vec![Dependency::from(""), Dependency::from("v3")];
        assert_ne!(hashsum(&null), hashsum(&empty));
    }

    #[test]
    fn typed_values_differ_from_strings() {
        assert_ne!(
            hashsum(&[Dependency::Int(1)]),
            hashsum(&[Dependency::from("1")])
        );
    }

    #[test]
    fn option_converts_to_null() {
        let none: Option<String> = None;
        assert_eq!(Dependency::from(none), Dependency::Null);
        assert_eq!(
            Dependency::from(Some("x")),
            Dependency::Str("x".to_string())
        );
    }

    #[test]
    fn cache_version_keeps_its_type() {
        assert_eq!(Dependency::from(&CacheVersion::from(1)), Dependency::Int(1));
        assert_eq!(
            Dependency::from(&CacheVersion::from("1")),
            Dependency::Str("1".to_string())
        );
        let none: Option<&CacheVersion> = None;
        assert_eq!(Dependency::from(none), Dependency::Null);
    }

    #[test]
    fn dependency_display() {
        let list = vec![
            Dependency::from("busybox:latest"),
            Dependency::Null,
            Dependency::List(vec![Dependency::Int(1), Dependency::Bool(true)]),
        ];
        assert_eq!(
            Dependency::List(list).to_string(),
            "[\"busybox:latest\", null, [1, true]]"
        );
    }

    #[test]
    fn flatten_keeps_order() {
        let nested = vec![
            Dependency::List(vec![Dependency::from("x"), Dependency::from("y")]),
            Dependency::from("z"),
        ];
        let flat: Vec<String> = flatten(&nested).iter().map(|d| d.to_string()).collect();
        assert_eq!(flat, vec!["\"x\"", "\"y\"", "\"z\""]);
    }
}
