//! Boards (scores): the ordered set of tracks a user edits at once, plus the
//! cross-track lookups used by keyboard navigation.

use std::fmt::{self, Write as _};

use crate::config::EngineConfig;
use crate::event::{EventKind, EventQueue, TrackEvent};
use crate::id::{ObjectId, TackId, TrackId};
use crate::tack::Tack;
use crate::track::TimelineTrack;

/// A broken invariant found by [`Board::violations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Two live tacks on one track share a frame.
    Overlap {
        track: TrackId,
        first: TackId,
        second: TackId,
    },
    /// A live tack with `start < 0` or `span < 1`.
    Geometry { tack: TackId, start: i64, span: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap {
                track,
                first,
                second,
            } => write!(f, "{track}: {first} overlaps {second}"),
            Self::Geometry { tack, start, span } => {
                write!(f, "{tack}: invalid range start={start} span={span}")
            }
        }
    }
}

/// An ordered collection of tracks.
#[derive(Debug, Clone)]
pub struct Board {
    id: String,
    pub title: String,
    tracks: Vec<TimelineTrack>,
    exists: bool,
    active: bool,
}

impl Board {
    /// Create an empty board. `id` is the persisted name, not a generated id.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tracks: Vec::new(),
            exists: true,
            active: false,
        }
    }

    /// Create a board owning `tracks`, in the given order.
    pub fn with_tracks(
        id: impl Into<String>,
        title: impl Into<String>,
        tracks: Vec<TimelineTrack>,
    ) -> Self {
        Self {
            tracks,
            ..Self::new(id, title)
        }
    }

    /// The starter board: one default track holding one default tack at frame 0.
    pub fn seeded(config: &EngineConfig) -> Self {
        let tack = Tack::new(
            TrackId::new(),
            config.default_tack_title.clone(),
            0,
            config.default_tack_span,
        );
        let track = TimelineTrack::with_tacks(0, config.default_track_title.clone(), vec![tack]);
        Self::with_tracks(
            config.default_board_id.clone(),
            config.default_board_title.clone(),
            vec![track],
        )
    }

    pub fn id(&self) -> &str {
        &self.id
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

    /// All tracks including tombstones, in creation order.
    pub fn tracks(&self) -> &[TimelineTrack] {
        &self.tracks
    }

    pub fn live_tracks(&self) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.iter().filter(|t| t.exists())
    }

    pub fn track(&self, id: TrackId) -> Option<&TimelineTrack> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut TimelineTrack> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    /// Append a new empty track and return its id.
    pub fn add_track(&mut self, title: impl Into<String>) -> TrackId {
        let track = TimelineTrack::new(self.tracks.len(), title);
        let id = track.id();
        self.tracks.push(track);
        id
    }

    /// The track that stores `tack`.
    pub fn track_of_tack(&self, tack: TackId) -> Option<&TimelineTrack> {
        self.tracks.iter().find(|t| t.contains_tack(tack))
    }

    pub fn track_of_tack_mut(&mut self, tack: TackId) -> Option<&mut TimelineTrack> {
        self.tracks.iter_mut().find(|t| t.contains_tack(tack))
    }

    pub fn tack(&self, id: TackId) -> Option<&Tack> {
        self.track_of_tack(id).and_then(|t| t.tack(id))
    }

    pub fn tack_mut(&mut self, id: TackId) -> Option<&mut Tack> {
        self.track_of_tack_mut(id).and_then(|t| t.tack_mut(id))
    }

    /// Whether `id` names a reachable object: a live track, or a live tack on a live track.
    pub fn contains(&self, id: ObjectId) -> bool {
        match id {
            ObjectId::Track(track) => self.track(track).is_some_and(TimelineTrack::exists),
            ObjectId::Tack(tack) => self
                .track_of_tack(tack)
                .is_some_and(|t| t.exists() && t.tack(tack).is_some_and(Tack::exists)),
        }
    }

    /// Live track at `offset` positions from `track` in ordinal order.
    fn neighbour_track(&self, track: TrackId, offset: isize) -> Option<&TimelineTrack> {
        let live: Vec<&TimelineTrack> = self.live_tracks().collect();
        let pos = live.iter().position(|t| t.id() == track)?;
        let target = pos.checked_add_signed(offset)?;
        live.get(target).copied()
    }

    fn vertical(&self, id: ObjectId, offset: isize) -> Option<ObjectId> {
        if !self.contains(id) {
            return None;
        }
        match id {
            ObjectId::Track(track) => self
                .neighbour_track(track, offset)
                .map(|t| ObjectId::Track(t.id())),
            ObjectId::Tack(tack) => {
                let own = self.track_of_tack(tack)?;
                let start = own.start_frame_of(tack)?;
                let neighbour = self.neighbour_track(own.id(), offset)?;
                Some(
                    neighbour
                        .tack_nearest(start)
                        .map_or(ObjectId::Track(neighbour.id()), ObjectId::Tack),
                )
            }
        }
    }

    /// Object one track up from `id`.
    pub fn above_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.vertical(id, -1)
    }

    /// Object one track down from `id`.
    pub fn below_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.vertical(id, 1)
    }

    /// Object to the left of `id`. Tracks have nothing to their left.
    pub fn previous_of(&self, id: ObjectId) -> Option<ObjectId> {
        if !self.contains(id) {
            return None;
        }
        let tack = id.as_tack()?;
        self.track_of_tack(tack)?.previous_of(tack)
    }

    /// Object to the right of `id`.
    pub fn next_of(&self, id: ObjectId) -> Option<ObjectId> {
        if !self.contains(id) {
            return None;
        }
        match id {
            ObjectId::Track(track) => self.track(track).map(TimelineTrack::default_selection),
            ObjectId::Tack(tack) => self
                .track_of_tack(tack)?
                .next_tack_of(tack)
                .map(ObjectId::Tack),
        }
    }

    /// What a click on the ruler at `frame` selects: the nearest tack on the
    /// first live track, or that track when it is empty.
    pub fn select_at_frame(&self, frame: i64) -> Option<ObjectId> {
        let first = self.live_tracks().next()?;
        Some(
            first
                .tack_nearest(frame)
                .map_or(ObjectId::Track(first.id()), ObjectId::Tack),
        )
    }

    /// True when the selection sits on the first live track.
    pub fn is_top_active(&self) -> bool {
        self.live_tracks()
            .next()
            .is_some_and(|t| t.is_active() || t.contains_active_tack())
    }

    pub fn start_frame_of(&self, id: ObjectId) -> Option<i64> {
        let tack = id.as_tack()?;
        self.tack(tack).filter(|t| t.exists()).map(Tack::start)
    }

    /// Set an object's title. Returns false when it is not reachable.
    pub fn rename(&mut self, id: ObjectId, title: impl Into<String>) -> bool {
        if !self.contains(id) {
            return false;
        }
        let title = title.into();
        let renamed = match id {
            ObjectId::Track(track) => self.track_mut(track).map(|t| t.title = title),
            ObjectId::Tack(tack) => self.tack_mut(tack).map(|t| t.title = title),
        };
        renamed.is_some()
    }

    /// Tombstone a track or tack and queue the matching deletion event.
    pub fn delete_object(&mut self, id: ObjectId, queue: &mut EventQueue) -> bool {
        if !self.contains(id) {
            return false;
        }
        match id {
            ObjectId::Track(track) => {
                let Some(track) = self.track_mut(track) else {
                    return false;
                };
                track.delete();
                queue.push(TrackEvent::new(EventKind::TrackDeleted, track.id()));
            }
            ObjectId::Tack(tack) => {
                let Some(track) = self.track_of_tack_mut(tack) else {
                    return false;
                };
                track.delete_tack(tack);
                queue.push(TrackEvent::new(EventKind::TackDeleted, tack));
            }
        }
        true
    }

    /// Make exactly the objects in `selected` active.
    pub fn activate_only(&mut self, selected: &[ObjectId]) {
        for track in &mut self.tracks {
            track.set_active(selected.contains(&ObjectId::Track(track.id())));
            track.activate_tacks(selected);
        }
    }

    pub fn deactivate_all(&mut self) {
        for track in &mut self.tracks {
            track.set_active(false);
            track.deactivate_tacks();
        }
    }

    /// Live-object invariant violations, track by track.
    pub fn violations(&self) -> Vec<Violation> {
        let mut found = Vec::new();
        for track in self.live_tracks() {
            for tack in track.live_tacks() {
                if tack.start() < 0 || tack.span() < 1 {
                    found.push(Violation::Geometry {
                        tack: tack.id(),
                        start: tack.start(),
                        span: tack.span(),
                    });
                }
            }
            for (first, second) in track.overlapping_pairs() {
                found.push(Violation::Overlap {
                    track: track.id(),
                    first,
                    second,
                });
            }
        }
        found
    }

    /// Human-readable listing of live tracks and tacks, with script-style refs.
    /// Active objects are marked with `*`.
    pub fn outline(&self) -> String {
        let mark = |active: bool| if active { " *" } else { "" };
        let mut out = String::new();
        let _ = writeln!(out, "{} ({}){}", self.title, self.id, mark(self.active));
        for (n, track) in self.live_tracks().enumerate() {
            let _ = writeln!(out, "  track:{n} {}{}", track.title, mark(track.is_active()));
            for (m, tack) in track.live_tacks().enumerate() {
                let _ = writeln!(
                    out,
                    "    tack:{n}.{m} {} [{}, {}]{}",
                    tack.title,
                    tack.start(),
                    tack.end(),
                    mark(tack.is_active())
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Board with one track per entry, each holding tacks at the given `(start, span)`s.
    fn board_with(layout: &[&[(i64, i64)]]) -> (Board, Vec<TrackId>, Vec<Vec<TackId>>) {
        let mut board = Board::new("b", "Board");
        let mut track_ids = Vec::new();
        let mut tack_ids = Vec::new();
        for (i, ranges) in layout.iter().enumerate() {
            let id = board.add_track(format!("track {i}"));
            let track = board.track_mut(id).unwrap();
            let ids = ranges
                .iter()
                .map(|&(start, span)| track.add_tack(start, "t", span).unwrap())
                .collect();
            track_ids.push(id);
            tack_ids.push(ids);
        }
        (board, track_ids, tack_ids)
    }

    #[test]
    fn test_seeded_board() {
        let board = Board::seeded(&EngineConfig::default());
        assert_eq!(board.id(), "New Score");
        let tracks: Vec<_> = board.live_tracks().collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "New Timeline");
        let tack = tracks[0].live_tacks().next().unwrap();
        assert_eq!((tack.start(), tack.end()), (0, 9));
        assert_eq!(tack.track_id(), tracks[0].id());
    }

    #[test]
    fn test_down_from_tack_onto_empty_track_selects_track() {
        let (board, tracks, tacks) = board_with(&[&[(0, 3)], &[]]);
        assert_eq!(
            board.below_of(ObjectId::Tack(tacks[0][0])),
            Some(ObjectId::Track(tracks[1]))
        );
    }

    #[test]
    fn test_vertical_from_tack_picks_nearest() {
        let (board, _, tacks) = board_with(&[&[(0, 5), (10, 5), (20, 1)], &[(12, 3)]]);
        assert_eq!(
            board.above_of(ObjectId::Tack(tacks[1][0])),
            Some(ObjectId::Tack(tacks[0][1]))
        );
        assert_eq!(
            board.below_of(ObjectId::Tack(tacks[0][0])),
            Some(ObjectId::Tack(tacks[1][0]))
        );
    }

    #[test]
    fn test_vertical_out_of_range_is_none() {
        let (board, tracks, tacks) = board_with(&[&[(0, 5)], &[(0, 5)]]);
        assert_eq!(board.above_of(ObjectId::Track(tracks[0])), None);
        assert_eq!(board.below_of(ObjectId::Tack(tacks[1][0])), None);
        assert_eq!(
            board.below_of(ObjectId::Track(tracks[0])),
            Some(ObjectId::Track(tracks[1]))
        );
    }

    #[test]
    fn test_vertical_skips_deleted_tracks() {
        let (mut board, tracks, _) = board_with(&[&[], &[], &[]]);
        board.delete_object(ObjectId::Track(tracks[1]), &mut EventQueue::new());
        assert_eq!(
            board.below_of(ObjectId::Track(tracks[0])),
            Some(ObjectId::Track(tracks[2]))
        );
        assert_eq!(board.below_of(ObjectId::Track(tracks[1])), None);
    }

    #[test]
    fn test_horizontal_navigation() {
        let (board, tracks, tacks) = board_with(&[&[(10, 2), (0, 2)], &[]]);
        let track = ObjectId::Track(tracks[0]);
        // right from a track: first tack by insertion order
        assert_eq!(board.next_of(track), Some(ObjectId::Tack(tacks[0][0])));
        assert_eq!(board.previous_of(track), None);
        // left from the earliest tack: its track
        assert_eq!(board.previous_of(ObjectId::Tack(tacks[0][1])), Some(track));
        assert_eq!(
            board.next_of(ObjectId::Tack(tacks[0][1])),
            Some(ObjectId::Tack(tacks[0][0]))
        );
        assert_eq!(board.next_of(ObjectId::Tack(tacks[0][0])), None);
        // an empty track selects itself
        let empty = ObjectId::Track(tracks[1]);
        assert_eq!(board.next_of(empty), Some(empty));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let (board, _, _) = board_with(&[&[(0, 2)]]);
        let stray = ObjectId::Tack(TackId::new());
        assert_eq!(board.above_of(stray), None);
        assert_eq!(board.next_of(stray), None);
        assert_eq!(board.previous_of(stray), None);
        assert_eq!(board.start_frame_of(stray), None);
    }

    #[test]
    fn test_select_at_frame_uses_first_live_track() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 5), (10, 5)], &[(0, 50)]]);
        assert_eq!(board.select_at_frame(7), Some(ObjectId::Tack(tacks[0][1])));

        board.delete_object(ObjectId::Track(tracks[0]), &mut EventQueue::new());
        assert_eq!(board.select_at_frame(7), Some(ObjectId::Tack(tacks[1][0])));

        let empty = Board::new("e", "Empty");
        assert_eq!(empty.select_at_frame(0), None);
    }

    #[test]
    fn test_top_active() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 5)], &[(0, 5)]]);
        assert!(!board.is_top_active());
        board.activate_only(&[ObjectId::Tack(tacks[0][0])]);
        assert!(board.is_top_active());
        board.activate_only(&[ObjectId::Track(tracks[1])]);
        assert!(!board.is_top_active());
        assert!(board.track(tracks[1]).unwrap().is_active());
        board.activate_only(&[ObjectId::Track(tracks[0])]);
        assert!(board.is_top_active());
        board.deactivate_all();
        assert!(!board.is_top_active());
    }

    #[test]
    fn test_delete_object_queues_event() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 5)]]);
        let mut queue = EventQueue::new();

        assert!(board.delete_object(ObjectId::Tack(tacks[0][0]), &mut queue));
        assert!(!board.delete_object(ObjectId::Tack(tacks[0][0]), &mut queue));
        assert!(board.delete_object(ObjectId::Track(tracks[0]), &mut queue));

        let kinds: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::TackDeleted, EventKind::TrackDeleted]);
        assert_eq!(board.tracks().len(), 1);
    }

    #[test]
    fn test_tacks_on_deleted_track_unreachable() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 5)]]);
        board.delete_object(ObjectId::Track(tracks[0]), &mut EventQueue::new());
        assert!(!board.contains(ObjectId::Tack(tacks[0][0])));
        assert!(board.tack(tacks[0][0]).unwrap().exists());
    }

    #[test]
    fn test_rename() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 5)]]);
        assert!(board.rename(ObjectId::Track(tracks[0]), "Camera"));
        assert!(board.rename(ObjectId::Tack(tacks[0][0]), "Pan"));
        assert_eq!(board.track(tracks[0]).unwrap().title, "Camera");
        assert_eq!(board.tack(tacks[0][0]).unwrap().title, "Pan");
        assert!(!board.rename(ObjectId::Tack(TackId::new()), "x"));
    }

    #[test]
    fn test_violations() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 5), (10, 5)]]);
        assert!(board.violations().is_empty());

        board.tack_mut(tacks[0][1]).unwrap().update_pos(3, 0);
        let found = board.violations();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Violation::Geometry {
            tack: tacks[0][1],
            start: 3,
            span: 0,
        }));
        assert!(found.contains(&Violation::Overlap {
            track: tracks[0],
            first: tacks[0][0],
            second: tacks[0][1],
        }));
    }

    #[test]
    fn test_outline() {
        let (mut board, tracks, tacks) = board_with(&[&[(0, 10), (12, 3)], &[], &[(4, 1)]]);
        board.delete_object(ObjectId::Track(tracks[1]), &mut EventQueue::new());
        board.activate_only(&[ObjectId::Tack(tacks[0][1])]);
        board.rename(ObjectId::Track(tracks[0]), "Camera");

        insta::assert_snapshot!(board.outline(), @r"
        Board (b)
          track:0 Camera
            tack:0.0 t [0, 9]
            tack:0.1 t [12, 14] *
          track:1 track 2
            tack:1.0 t [4, 4]
        ");
    }
}
