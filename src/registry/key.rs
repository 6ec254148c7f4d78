//! Compound registration keys
//!
//! A [`RegistrationKey`] addresses a registered configuration by
//! `(name, namespace, tags)`. Its canonical string form is
//! `name:<name>--tags:<json tag list>--namespace:<namespace>`, with the tags
//! segment omitted when there are no tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Free-form key metadata. Kept sorted so equality and hashing ignore
/// construction order.
pub type Tags = BTreeSet<String>;

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "generic";

/// Tag added by [`RegistrationKey::as_default`]
pub const DEFAULT_TAG: &str = "default";

const NAME_MARKER: &str = "name:";
const TAGS_MARKER: &str = "--tags:";
const NAMESPACE_MARKER: &str = "--namespace:";

/// Compound key used for registration
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RegistrationKey {
    name: String,
    namespace: String,
    tags: Tags,
}

impl RegistrationKey {
    /// Create a key in the given namespace with no tags
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            tags: Tags::new(),
        }
    }

    /// Create a key in [`DEFAULT_NAMESPACE`]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_NAMESPACE)
    }

    /// Replace the key's tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Mark the key as the default registration of its name
    pub fn as_default(self) -> Self {
        self.with_tag(DEFAULT_TAG)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Partial identifier matching.
    ///
    /// Names and namespaces must be equal, and either both tag sets are empty
    /// or one side's tags are a subset of the other's. The subset test is
    /// deliberately two-sided.
    pub fn partial_match(&self, other: &RegistrationKey) -> bool {
        if self.name != other.name || self.namespace != other.namespace {
            return false;
        }
        if self.tags.is_empty() && other.tags.is_empty() {
            return true;
        }
        let shared: Tags = self.tags.intersection(&other.tags).cloned().collect();
        shared == other.tags || shared == self.tags
    }

    /// Parse a key from its canonical string form.
    ///
    /// The namespace is everything after the last `--namespace:` marker and
    /// the tags are the JSON list following the leftmost `--tags:` marker
    /// that parses, so names and tags may themselves contain `--`.
    pub fn from_string(string_format: &str) -> Result<Self> {
        let rest = string_format.strip_prefix(NAME_MARKER).ok_or_else(|| {
            Error::Parse(format!(
                "expected {:?} to start with `{}`",
                string_format, NAME_MARKER
            ))
        })?;

        let (head, namespace) = match rest.rsplit_once(NAMESPACE_MARKER) {
            Some((head, namespace)) => (head, namespace.to_string()),
            None => (rest, DEFAULT_NAMESPACE.to_string()),
        };
        let (name, tags) = split_tags(head)?;

        Ok(Self {
            name: name.to_string(),
            namespace,
            tags,
        })
    }
}

/// Split `<name>--tags:<json list>` into the name and its tags
fn split_tags(head: &str) -> Result<(&str, Tags)> {
    let mut invalid = None;
    for (at, _) in head.match_indices(TAGS_MARKER) {
        let list = &head[at + TAGS_MARKER.len()..];
        match serde_json::from_str::<Tags>(list) {
            Ok(tags) => return Ok((&head[..at], tags)),
            Err(e) => invalid = Some(format!("invalid tag list {:?}: {}", list, e)),
        }
    }
    match invalid {
        Some(reason) => Err(Error::Parse(reason)),
        None => Ok((head, Tags::new())),
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAME_MARKER, self.name)?;
        if !self.tags.is_empty() {
            let tags = serde_json::to_string(&self.tags).map_err(|_| fmt::Error)?;
            write!(f, "{}{}", TAGS_MARKER, tags)?;
        }
        write!(f, "{}{}", NAMESPACE_MARKER, self.namespace)
    }
}

impl fmt::Debug for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for RegistrationKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl From<RegistrationKey> for String {
    fn from(key: RegistrationKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for RegistrationKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_string(&value)
    }
}

/// Anything that can address a registration: a key or its canonical string
pub trait IntoKey {
    fn into_key(self) -> Result<RegistrationKey>;
}

impl IntoKey for RegistrationKey {
    fn into_key(self) -> Result<RegistrationKey> {
        Ok(self)
    }
}

impl IntoKey for &RegistrationKey {
    fn into_key(self) -> Result<RegistrationKey> {
        Ok(self.clone())
    }
}

impl IntoKey for &str {
    fn into_key(self) -> Result<RegistrationKey> {
        RegistrationKey::from_string(self)
    }
}

impl IntoKey for String {
    fn into_key(self) -> Result<RegistrationKey> {
        RegistrationKey::from_string(&self)
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Result<RegistrationKey> {
        RegistrationKey::from_string(self)
    }
}
