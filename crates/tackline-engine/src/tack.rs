//! Tacks: the frame intervals that live on a track.

use crate::id::{TackId, TrackId};

/// Highest frame a tack may cover. Frames past 2^53 lose precision once
/// converted to pixels.
pub const MAX_FRAME: i64 = (1 << 53) - 1;

/// Whether `[start, start + span - 1]` is a range a tack may hold.
pub fn is_valid_range(start: i64, span: i64) -> bool {
    start >= 0
        && span >= 1
        && start
            .checked_add(span - 1)
            .is_some_and(|end| end <= MAX_FRAME)
}

/// Pull a range back inside `[0, MAX_FRAME]` with a span of at least one frame.
pub fn clamp_range(start: i64, span: i64) -> (i64, i64) {
    let start = start.clamp(0, MAX_FRAME);
    (start, span.clamp(1, MAX_FRAME - start + 1))
}

/// A closed frame range `[start, start + span - 1]` on one track.
///
/// Tacks are never removed from their track's storage; deleting one flips
/// `exists` to false so ids and insertion indices stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tack {
    id: TackId,
    track_id: TrackId,
    pub title: String,
    start: i64,
    span: i64,
    exists: bool,
    active: bool,
}

impl Tack {
    /// Create a live tack. The range is pulled inside `[0, MAX_FRAME]` with
    /// a span of at least 1.
    pub fn new(track_id: TrackId, title: impl Into<String>, start: i64, span: i64) -> Self {
        let (start, span) = clamp_range(start, span);
        Self {
            id: TackId::new(),
            track_id,
            title: title.into(),
            start,
            span,
            exists: true,
            active: false,
        }
    }

    pub fn id(&self) -> TackId {
        self.id
    }

    /// Owning track.
    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub(crate) fn set_track_id(&mut self, track_id: TrackId) {
        self.track_id = track_id;
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn span(&self) -> i64 {
        self.span
    }

    /// Last frame covered (inclusive).
    pub fn end(&self) -> i64 {
        self.start.saturating_add(self.span).saturating_sub(1)
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Tombstone this tack. There is no way back.
    pub fn delete(&mut self) {
        self.exists = false;
        self.active = false;
    }

    pub fn contains_frame(&self, frame: i64) -> bool {
        self.start <= frame && frame <= self.end()
    }

    /// Whether the two closed ranges share at least one frame.
    pub fn overlaps(&self, other: &Tack) -> bool {
        !(self.end() < other.start || other.end() < self.start)
    }

    /// Replace the range.
    pub fn update_pos(&mut self, start: i64, span: i64) {
        self.start = start;
        self.span = span;
    }
}
