//! Object identity for tracks and tacks.
//!
//! Ids are UUIDs wrapped in one newtype per entity kind. At the boundary
//! (event payloads, scripts, saved selections) they travel as strings carrying
//! a kind prefix, e.g. `timeline_<uuid>` or `tack_<uuid>`. The prefix is
//! parsed exactly once into [`ObjectId`]; nothing inside the engine inspects
//! strings to decide what kind of object an id names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// String prefix for track ids.
pub const TRACK_ID_PREFIX: &str = "timeline_";

/// String prefix for tack ids.
pub const TACK_ID_PREFIX: &str = "tack_";

/// Identifier of a [`TimelineTrack`](crate::track::TimelineTrack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(Uuid);

/// Identifier of a [`Tack`](crate::tack::Tack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TackId(Uuid);

impl TrackId {
    /// Issue a fresh, never-before-seen track id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl TackId {
    /// Issue a fresh, never-before-seen tack id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for TackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TRACK_ID_PREFIX}{}", self.0)
    }
}

impl fmt::Display for TackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TACK_ID_PREFIX}{}", self.0)
    }
}

/// Any object that can be selected, deleted or named in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ObjectId {
    Track(TrackId),
    Tack(TackId),
}

impl ObjectId {
    /// The track id, if this names a track.
    pub fn as_track(self) -> Option<TrackId> {
        match self {
            Self::Track(id) => Some(id),
            Self::Tack(_) => None,
        }
    }

    /// The tack id, if this names a tack.
    pub fn as_tack(self) -> Option<TackId> {
        match self {
            Self::Tack(id) => Some(id),
            Self::Track(_) => None,
        }
    }
}

impl From<TrackId> for ObjectId {
    fn from(id: TrackId) -> Self {
        Self::Track(id)
    }
}

impl From<TackId> for ObjectId {
    fn from(id: TackId) -> Self {
        Self::Tack(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => id.fmt(f),
            Self::Tack(id) => id.fmt(f),
        }
    }
}

/// Errors produced when parsing an object id string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("unknown object id prefix: {0}")]
    UnknownPrefix(String),

    #[error("malformed uuid in object id: {0}")]
    MalformedUuid(String),
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |rest: &str| Uuid::parse_str(rest).map_err(|_| IdError::MalformedUuid(s.to_string()));

        if let Some(rest) = s.strip_prefix(TRACK_ID_PREFIX) {
            return Ok(Self::Track(TrackId(parse(rest)?)));
        }
        if let Some(rest) = s.strip_prefix(TACK_ID_PREFIX) {
            return Ok(Self::Tack(TackId(parse(rest)?)));
        }
        Err(IdError::UnknownPrefix(s.to_string()))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_string()
    }
}
