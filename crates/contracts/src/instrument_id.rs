//! InstrumentId - CHORDS instrument identifier
//!
//! Configuration files write instrument ids either as integers (`3`) or as
//! strings (`"3"`); both normalize to the same value.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Instrument identifier with cheap cloning.
///
/// Every submitted record carries one, so the id is backed by `Arc<str>`.
///
/// # Examples
/// ```
/// use contracts::InstrumentId;
///
/// let id: InstrumentId = serde_json::from_str("7").unwrap();
/// assert_eq!(id, "7");
/// let id: InstrumentId = serde_json::from_str("\"7\"").unwrap();
/// assert_eq!(id.as_str(), "7");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InstrumentId(Arc<str>);

impl InstrumentId {
    /// Create a new InstrumentId from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for InstrumentId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for InstrumentId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for InstrumentId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<u64> for InstrumentId {
    fn from(n: u64) -> Self {
        Self::from(n.to_string())
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstrumentId({:?})", self.0)
    }
}

impl PartialEq<str> for InstrumentId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for InstrumentId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for InstrumentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

struct InstrumentIdVisitor;

impl Visitor<'_> for InstrumentIdVisitor {
    type Value = InstrumentId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an instrument id as a string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.trim().is_empty() {
            return Err(E::custom("instrument id cannot be empty"));
        }
        Ok(InstrumentId::from(v.trim()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(InstrumentId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(InstrumentId::from)
            .map_err(|_| E::custom(format!("instrument id must not be negative, got {v}")))
    }
}

impl<'de> Deserialize<'de> for InstrumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(InstrumentIdVisitor)
    }
}
