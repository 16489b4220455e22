//! Timeline tracks: ordered tack storage, overlap resolution and per-track
//! navigation lookups.

use tracing::debug;

use crate::event::{EventKind, EventQueue, TrackEvent};
use crate::id::{ObjectId, TackId, TrackId};
use crate::tack::{Tack, MAX_FRAME};

/// What a call to [`TimelineTrack::resolve_overlaps`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Neighbours whose range was shortened or shifted.
    pub trimmed: Vec<TackId>,
    /// Neighbours that were fully covered and tombstoned.
    pub deleted: Vec<TackId>,
}

impl Resolution {
    /// True when nothing on the track changed.
    pub fn is_noop(&self) -> bool {
        self.trimmed.is_empty() && self.deleted.is_empty()
    }
}

/// A named lane of tacks.
///
/// Tacks are kept in insertion order; ordering by start frame is computed on
/// demand for navigation. Deleted tacks stay in storage as tombstones.
#[derive(Debug, Clone)]
pub struct TimelineTrack {
    id: TrackId,
    index: usize,
    pub title: String,
    tacks: Vec<Tack>,
    exists: bool,
    active: bool,
}

impl TimelineTrack {
    /// Create an empty live track at display ordinal `index`.
    pub fn new(index: usize, title: impl Into<String>) -> Self {
        Self::with_tacks(index, title, Vec::new())
    }

    /// Create a live track owning `tacks`, re-pointing their back-references.
    pub fn with_tacks(index: usize, title: impl Into<String>, mut tacks: Vec<Tack>) -> Self {
        let id = TrackId::new();
        for tack in &mut tacks {
            tack.set_track_id(id);
        }
        Self {
            id,
            index,
            title: title.into(),
            tacks,
            exists: true,
            active: false,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Display ordinal, fixed at creation.
    pub fn index(&self) -> usize {
        self.index
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

    /// Tombstone the track. Its tacks are left untouched but become unreachable.
    pub fn delete(&mut self) {
        self.exists = false;
        self.active = false;
    }

    /// All tacks including tombstones, in insertion order.
    pub fn tacks(&self) -> &[Tack] {
        &self.tacks
    }

    /// Live tacks in insertion order.
    pub fn live_tacks(&self) -> impl Iterator<Item = &Tack> {
        self.tacks.iter().filter(|t| t.exists())
    }

    /// Live tacks ordered by start frame.
    fn live_by_start(&self) -> Vec<&Tack> {
        let mut live: Vec<&Tack> = self.live_tacks().collect();
        live.sort_by_key(|t| t.start());
        live
    }

    pub fn tack(&self, id: TackId) -> Option<&Tack> {
        self.tacks.iter().find(|t| t.id() == id)
    }

    pub fn tack_mut(&mut self, id: TackId) -> Option<&mut Tack> {
        self.tacks.iter_mut().find(|t| t.id() == id)
    }

    pub fn contains_tack(&self, id: TackId) -> bool {
        self.tacks.iter().any(|t| t.id() == id)
    }

    pub fn contains_active_tack(&self) -> bool {
        self.tacks.iter().any(Tack::is_active)
    }

    /// Whether a new tack may be created at `frame` (no live tack covers it).
    pub fn can_add_tack_at(&self, frame: i64) -> bool {
        self.exists
            && (0..=MAX_FRAME).contains(&frame)
            && !self.live_tacks().any(|t| t.contains_frame(frame))
    }

    /// Append a tack starting at `frame`. Refused when the frame is occupied
    /// or out of range. A span running past `MAX_FRAME` is shortened.
    pub fn add_tack(&mut self, frame: i64, title: &str, span: i64) -> Option<TackId> {
        if !self.can_add_tack_at(frame) {
            return None;
        }
        let tack = Tack::new(self.id, title, frame, span);
        let id = tack.id();
        self.tacks.push(tack);
        Some(id)
    }

    /// Tombstone a tack. Returns false if it was unknown or already deleted.
    pub fn delete_tack(&mut self, id: TackId) -> bool {
        match self.tack_mut(id) {
            Some(tack) if tack.exists() => {
                tack.delete();
                true
            }
            _ => false,
        }
    }

    /// Mark exactly the tacks named in `selected` as active.
    pub fn activate_tacks(&mut self, selected: &[ObjectId]) {
        for tack in &mut self.tacks {
            let active = selected.contains(&ObjectId::Tack(tack.id()));
            tack.set_active(active);
        }
    }

    pub fn deactivate_tacks(&mut self) {
        for tack in &mut self.tacks {
            tack.set_active(false);
        }
    }

    pub fn start_frame_of(&self, id: TackId) -> Option<i64> {
        self.tack(id).map(Tack::start)
    }

    /// The live tack after `id` in start order.
    pub fn next_tack_of(&self, id: TackId) -> Option<TackId> {
        let ordered = self.live_by_start();
        let pos = ordered.iter().position(|t| t.id() == id)?;
        ordered.get(pos + 1).map(|t| t.id())
    }

    /// The live tack before `id` in start order, or this track when `id` is
    /// the earliest one.
    ///
    /// "Earliest" is by start frame, not insertion order: a tack added first
    /// but moved behind a later one still steps back to that later tack.
    pub fn previous_of(&self, id: TackId) -> Option<ObjectId> {
        let ordered = self.live_by_start();
        let pos = ordered.iter().position(|t| t.id() == id)?;
        if pos == 0 {
            return Some(ObjectId::Track(self.id));
        }
        Some(ObjectId::Tack(ordered[pos - 1].id()))
    }

    /// First live tack by insertion order, or the track itself.
    pub fn default_selection(&self) -> ObjectId {
        self.live_tacks()
            .next()
            .map_or(ObjectId::Track(self.id), |t| ObjectId::Tack(t.id()))
    }

    /// The live tack whose start is nearest `frame`.
    ///
    /// Picks the first tack starting at or after `frame`, unless the tack
    /// before it already covers `frame`. When every tack starts before
    /// `frame`, the last one is returned.
    pub fn tack_nearest(&self, frame: i64) -> Option<TackId> {
        let ordered = self.live_by_start();
        match ordered.iter().position(|t| frame <= t.start()) {
            Some(i) if i > 0 && ordered[i - 1].contains_frame(frame) => Some(ordered[i - 1].id()),
            Some(i) => Some(ordered[i].id()),
            None => ordered.last().map(|t| t.id()),
        }
    }

    /// Restore the non-overlap invariant after `moved` was committed.
    ///
    /// The moved tack always wins. For each other live tack the first
    /// matching rule applies:
    /// 1. no overlap: untouched
    /// 2. fully covered by the mover: deleted, `TackDeleted` queued
    /// 3. its tail runs into the mover: cut to end just before the mover
    /// 4. its head runs into the mover: shifted to start just after the mover
    /// 5. it strictly contains the mover: cut to end just before the mover;
    ///    the part after the mover is dropped, tacks are never split
    pub fn resolve_overlaps(&mut self, moved: TackId, queue: &mut EventQueue) -> Resolution {
        let mut resolution = Resolution::default();

        let Some(mover) = self.tack(moved).filter(|t| t.exists()) else {
            return resolution;
        };
        let (m_start, m_end) = (mover.start(), mover.end());

        for target in &mut self.tacks {
            if target.id() == moved || !target.exists() {
                continue;
            }
            let (t_start, t_end) = (target.start(), target.end());

            if t_end < m_start || m_end < t_start {
                continue;
            }

            if m_start <= t_start && t_end <= m_end {
                debug!(tack = %target.id(), mover = %moved, "covered by moved tack, deleting");
                target.delete();
                queue.push(TrackEvent::new(EventKind::TackDeleted, target.id()));
                resolution.deleted.push(target.id());
                continue;
            }

            if m_start <= t_end && t_end <= m_end {
                target.update_pos(t_start, m_start - t_start);
                debug!(tack = %target.id(), start = t_start, span = target.span(), "tail trimmed");
                resolution.trimmed.push(target.id());
                continue;
            }

            if t_start <= m_end && m_start <= t_start {
                let new_start = m_end + 1;
                target.update_pos(new_start, t_end - new_start + 1);
                debug!(tack = %target.id(), start = new_start, span = target.span(), "head trimmed");
                resolution.trimmed.push(target.id());
                continue;
            }

            if t_start < m_start && m_end < t_end {
                target.update_pos(t_start, m_start - t_start);
                debug!(
                    tack = %target.id(),
                    start = t_start,
                    span = target.span(),
                    "contained the moved tack, right part dropped"
                );
                resolution.trimmed.push(target.id());
            }
        }

        resolution
    }

    /// Pairs of live tacks that currently overlap.
    pub fn overlapping_pairs(&self) -> Vec<(TackId, TackId)> {
        let live: Vec<&Tack> = self.live_tacks().collect();
        let mut pairs = Vec::new();
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                if a.overlaps(b) {
                    pairs.push((a.id(), b.id()));
                }
            }
        }
        pairs
    }
}
