//! Avatar identifiers.
//!
//! Every packet, tick report and metric label names its avatar, so ids are
//! cloned once per frame. Cloning only bumps the `Arc<str>` count.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Name of one tracked skeleton inside a session.
///
/// Compares, orders and hashes like the underlying `str`, so session maps
/// keyed by `AvatarId` are queried with plain `&str`.
///
/// ```
/// use contracts::AvatarId;
///
/// let id: AvatarId = "performer".into();
/// assert_eq!(id.clone(), id);
/// assert!(!id.is_blank());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AvatarId(Arc<str>);

impl AvatarId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace only; such an id cannot label metrics or spans.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Deref for AvatarId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AvatarId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AvatarId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AvatarId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<AvatarId> for String {
    fn from(id: AvatarId) -> Self {
        id.0.to_string()
    }
}

impl PartialEq<&str> for AvatarId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvatarId({:?})", &*self.0)
    }
}
