//! Type-safe channel identifier and its validator.
//!
//! A channel exists only as a key in the [`super::ChannelRegistry`]. The key
//! is parsed from the first URL path segment and must be a canonical,
//! hyphenated UUID v4. Everything else is rejected before the registry is
//! touched.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Length of the canonical hyphenated UUID text form.
const CANONICAL_LEN: usize = 36;

/// Byte offsets of the hyphens in the canonical UUID text form.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Reason a path segment is not a valid channel identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelIdError {
    /// Segment is not exactly 36 bytes long.
    #[error("channel id must be 36 bytes, got {0}")]
    Length(usize),

    /// Segment is not a hyphenated hexadecimal UUID.
    #[error("channel id must be a hyphenated UUID")]
    Format,

    /// Segment is a UUID but not version 4 / RFC 4122 variant.
    #[error("channel id must be a random (v4) UUID")]
    Version,
}

/// Identifier of a publish/subscribe channel.
///
/// Wraps a UUID v4. Parsing is case-insensitive; [`fmt::Display`] always
/// renders the lower-case canonical form, so `ABC…` and `abc…` address the
/// same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(uuid::Uuid);

impl ChannelId {
    /// Creates a new random `ChannelId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parses a path segment into a `ChannelId`.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelIdError`] describing the first rule the segment
    /// violates.
    pub fn parse(segment: &str) -> Result<Self, ChannelIdError> {
        if segment.len() != CANONICAL_LEN {
            return Err(ChannelIdError::Length(segment.len()));
        }

        let well_formed = segment.bytes().enumerate().all(|(i, b)| {
            if HYPHEN_POSITIONS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        });
        if !well_formed {
            return Err(ChannelIdError::Format);
        }

        let uuid = uuid::Uuid::try_parse(segment).map_err(|_| ChannelIdError::Format)?;
        if uuid.get_version() != Some(uuid::Version::Random)
            || uuid.get_variant() != uuid::Variant::RFC4122
        {
            return Err(ChannelIdError::Version);
        }

        Ok(Self(uuid))
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

/// Classifies a path segment as a well-formed channel id or not.
///
/// Pure; never touches shared state.
#[must_use]
pub fn validate(segment: &str) -> bool {
    ChannelId::parse(segment).is_ok()
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
