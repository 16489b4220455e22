//! The editor: top-level controller and command surface.
//!
//! An [`Editor`] owns every board, the selection, the drag controller and the
//! frame cursor. Each public command runs to completion: it mutates state,
//! queues notifications, then drains the queue. Draining applies the editor's
//! own reactions (selection bookkeeping, overlap resolution after a commit)
//! before handing each event to the injected [`EventSink`]. Events produced by
//! a reaction are appended to the same queue and delivered in order.

use thiserror::Error;
use tracing::{debug, warn};

use crate::board::Board;
use crate::config::EngineConfig;
use crate::drag::{DragBounds, DragController, DragOutcome, DragState, DragZone, Point, Rect};
use crate::event::{EventKind, EventQueue, EventSink, NullSink, TrackEvent};
use crate::id::{ObjectId, TackId, TrackId};
use crate::selection::Selection;
use crate::tack::{is_valid_range, Tack, MAX_FRAME};

/// Errors returned by editor commands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    /// No live board is active. Every command needs one.
    #[error("no active board")]
    NoActiveBoard,

    #[error("no live board at index {0}")]
    BoardOutOfRange(usize),

    #[error("invalid tack range: start={start} span={span}")]
    InvalidRange { start: i64, span: i64 },
}

/// Keyboard navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Top-level controller.
#[derive(Debug)]
pub struct Editor<S: EventSink = NullSink> {
    config: EngineConfig,
    boards: Vec<Board>,
    selection: Selection,
    drag: DragController,
    cursor_frame: i64,
    queue: EventQueue,
    sink: S,
}

impl Editor<NullSink> {
    /// Editor over the starter board that discards notifications.
    pub fn headless(config: EngineConfig) -> Self {
        Self::new(config, NullSink)
    }
}

impl<S: EventSink> Editor<S> {
    /// Editor over the starter board.
    pub fn new(config: EngineConfig, sink: S) -> Self {
        let board = Board::seeded(&config);
        Self::with_boards(config, vec![board], sink)
    }

    /// Editor over existing boards. The first active board stays active and
    /// any other is deactivated; with none active, the first live board is
    /// activated.
    pub fn with_boards(config: EngineConfig, mut boards: Vec<Board>, sink: S) -> Self {
        let active = boards
            .iter()
            .position(|b| b.exists() && b.is_active())
            .or_else(|| boards.iter().position(Board::exists));
        for (i, board) in boards.iter_mut().enumerate() {
            board.set_active(Some(i) == active);
        }
        Self {
            drag: DragController::new(&config),
            config,
            boards,
            selection: Selection::new(),
            cursor_frame: 0,
            queue: EventQueue::new(),
            sink,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn into_boards(self) -> Vec<Board> {
        self.boards
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// Pixel distance of the drag preview, for hosts that draw it.
    pub fn drag_distance(&self) -> f64 {
        self.drag.distance()
    }

    pub fn cursor_frame(&self) -> i64 {
        self.cursor_frame
    }

    pub fn set_cursor_frame(&mut self, frame: i64) {
        self.cursor_frame = frame.clamp(0, MAX_FRAME);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn active_index(&self) -> Result<usize, EditorError> {
        self.boards
            .iter()
            .position(|b| b.exists() && b.is_active())
            .ok_or(EditorError::NoActiveBoard)
    }

    /// The board every command targets.
    pub fn active_board(&self) -> Result<&Board, EditorError> {
        let idx = self.active_index()?;
        Ok(&self.boards[idx])
    }

    /// Switch to another board. A drag in progress is committed first and the
    /// selection is cleared.
    pub fn set_active_board(&mut self, index: usize) -> Result<(), EditorError> {
        if !self.boards.get(index).is_some_and(Board::exists) {
            return Err(EditorError::BoardOutOfRange(index));
        }
        if self.active_index().is_ok() {
            self.cancel_drag()?;
            if !self.selection.is_empty() {
                self.unselect_all()?;
            }
        }
        for (i, board) in self.boards.iter_mut().enumerate() {
            board.set_active(i == index);
        }
        debug!(board = %self.boards[index].id(), "active board changed");
        Ok(())
    }

    /// Append a track to the active board.
    pub fn add_track(&mut self) -> Result<TrackId, EditorError> {
        let idx = self.active_index()?;
        let title = self.config.default_track_title.clone();
        let id = self.boards[idx].add_track(title);
        self.queue.push(TrackEvent::new(EventKind::BoardAddTrack, id));
        self.drain();
        Ok(id)
    }

    /// Whether `add_tack(track, frame)` would succeed.
    pub fn can_add_tack_at(&self, track: TrackId, frame: i64) -> Result<bool, EditorError> {
        let board = self.active_board()?;
        Ok(board
            .track(track)
            .is_some_and(|t| t.can_add_tack_at(frame)))
    }

    /// Create a default tack at `frame`. Returns `None` when the frame is
    /// occupied or the track is not reachable. Neighbours are not resolved.
    pub fn add_tack(&mut self, track: TrackId, frame: i64) -> Result<Option<TackId>, EditorError> {
        let idx = self.active_index()?;
        let (title, span) = (
            self.config.default_tack_title.clone(),
            self.config.default_tack_span,
        );
        let Some(lane) = self.boards[idx].track_mut(track) else {
            return Ok(None);
        };
        let Some(id) = lane.add_tack(frame, &title, span) else {
            debug!(track = %track, frame, "add tack refused");
            return Ok(None);
        };
        self.queue
            .push(TrackEvent::new(EventKind::TrackAddTack, track).with_frame(frame));
        self.drain();
        Ok(Some(id))
    }

    /// Tombstone a track or tack.
    pub fn delete_object(&mut self, id: ObjectId) -> Result<bool, EditorError> {
        let idx = self.active_index()?;
        if self.drag.target().is_some_and(|t| self.moving_target_affected(idx, t, id)) {
            self.drag.reset();
            self.selection.set_dragging(None);
        }
        let deleted = self.boards[idx].delete_object(id, &mut self.queue);
        self.drain();
        Ok(deleted)
    }

    /// Whether deleting `id` takes the tack being dragged with it.
    fn moving_target_affected(&self, idx: usize, target: TackId, id: ObjectId) -> bool {
        match id {
            ObjectId::Tack(tack) => tack == target,
            ObjectId::Track(track) => self.boards[idx]
                .track(track)
                .is_some_and(|t| t.contains_tack(target)),
        }
    }

    /// Rename a track or tack, bracketed by `BeforeSave` / `Save`.
    pub fn rename_object(&mut self, id: ObjectId, title: &str) -> Result<bool, EditorError> {
        let idx = self.active_index()?;
        if !self.boards[idx].contains(id) {
            return Ok(false);
        }
        self.queue.push(TrackEvent::new(EventKind::BeforeSave, id));
        self.boards[idx].rename(id, title);
        self.queue.push(TrackEvent::new(EventKind::Save, id));
        self.drain();
        Ok(true)
    }

    /// Commit an explicit range to a tack, exactly as a finished drag would.
    /// The range must start at 0 or later, span at least one frame and end
    /// no later than `MAX_FRAME`.
    pub fn move_tack(&mut self, id: TackId, start: i64, span: i64) -> Result<bool, EditorError> {
        if !is_valid_range(start, span) {
            return Err(EditorError::InvalidRange { start, span });
        }
        let idx = self.active_index()?;
        let board = &mut self.boards[idx];
        if !board.contains(id.into()) {
            return Ok(false);
        }
        let Some(tack) = board.tack_mut(id) else {
            return Ok(false);
        };
        self.queue.push(TrackEvent::new(EventKind::TackMoved, id));
        tack.update_pos(start, span);
        self.queue.push(TrackEvent::new(EventKind::TackMovedAfter, id));
        self.drain();
        Ok(true)
    }

    /// Make `id` the single selection.
    pub fn select_object(&mut self, id: ObjectId) -> Result<bool, EditorError> {
        let idx = self.active_index()?;
        if !self.boards[idx].contains(id) {
            return Ok(false);
        }
        self.queue.push(TrackEvent::new(EventKind::ObjectSelected, id));
        self.drain();
        Ok(true)
    }

    pub fn unselect_all(&mut self) -> Result<(), EditorError> {
        self.active_index()?;
        self.queue.push(TrackEvent::global(EventKind::Unselected));
        self.drain();
        Ok(())
    }

    /// Start a gesture on `id` with an explicit zone.
    pub fn begin_drag(
        &mut self,
        id: TackId,
        zone: DragZone,
        point: Point,
    ) -> Result<DragOutcome, EditorError> {
        let idx = self.active_index()?;
        let board = &self.boards[idx];
        if !board.contains(id.into()) {
            return Ok(DragOutcome::Ignored);
        }
        match board.tack(id) {
            Some(tack) => Ok(self.drag.press(tack, zone, point)),
            None => Ok(DragOutcome::Ignored),
        }
    }

    /// Start a gesture from a press inside the tack's rendered `extent`.
    pub fn press_tack(
        &mut self,
        id: TackId,
        extent: Rect,
        point: Point,
    ) -> Result<DragOutcome, EditorError> {
        let span = self.active_board()?.tack(id).map(Tack::span);
        let zone = span.and_then(|span| DragZone::from_press(extent, point, self.config.frame_width, span));
        match zone {
            Some(zone) => self.begin_drag(id, zone, point),
            None => Ok(DragOutcome::Ignored),
        }
    }

    /// Feed a pointer move to the gesture in progress.
    pub fn update_drag(
        &mut self,
        point: Point,
        bounds: Option<&DragBounds>,
    ) -> Result<DragOutcome, EditorError> {
        self.drive_drag(|drag, tack, queue| drag.update(tack, point, bounds, queue))
    }

    /// Feed a pointer release to the gesture in progress.
    pub fn end_drag(&mut self, point: Point) -> Result<DragOutcome, EditorError> {
        self.drive_drag(|drag, tack, queue| drag.release(tack, point, queue))
    }

    /// Abandon the gesture in progress; a started drag commits where it is.
    pub fn cancel_drag(&mut self) -> Result<DragOutcome, EditorError> {
        self.drive_drag(DragController::cancel)
    }

    fn drive_drag<F>(&mut self, step: F) -> Result<DragOutcome, EditorError>
    where
        F: FnOnce(&mut DragController, &mut Tack, &mut EventQueue) -> DragOutcome,
    {
        let idx = self.active_index()?;
        let Some(target) = self.drag.target() else {
            return Ok(DragOutcome::Ignored);
        };
        let board = &mut self.boards[idx];
        let tack = if board.contains(target.into()) {
            board.tack_mut(target)
        } else {
            None
        };
        let Some(tack) = tack else {
            warn!(tack = %target, "drag target vanished, dropping gesture");
            self.drag.reset();
            self.selection.set_dragging(None);
            return Ok(DragOutcome::Ignored);
        };
        let outcome = step(&mut self.drag, tack, &mut self.queue);
        self.drain();
        Ok(outcome)
    }

    /// Move the selection (or the frame cursor) one step.
    ///
    /// Returns the newly selected object, if any.
    pub fn navigate(&mut self, direction: Direction) -> Result<Option<ObjectId>, EditorError> {
        let idx = self.active_index()?;
        let board = &self.boards[idx];

        if direction == Direction::Up && board.is_top_active() {
            self.queue.push(TrackEvent::global(EventKind::Unselected));
            self.drain();
            return Ok(None);
        }

        let target = match (direction, self.selection.single()) {
            (Direction::Up, Some(id)) => board.above_of(id),
            (Direction::Down, Some(id)) => board.below_of(id),
            (Direction::Left, Some(id)) => board.previous_of(id),
            (Direction::Right, Some(id)) => board.next_of(id),
            (Direction::Down, None) => board.select_at_frame(self.cursor_frame),
            (Direction::Left, None) => {
                self.cursor_frame = (self.cursor_frame - 1).max(0);
                None
            }
            (Direction::Right, None) => {
                self.cursor_frame = (self.cursor_frame + 1).min(MAX_FRAME);
                None
            }
            (Direction::Up, None) => None,
        };

        if let Some(id) = target {
            self.queue.push(TrackEvent::new(EventKind::ObjectSelected, id));
            self.drain();
        }
        Ok(target)
    }

    /// Start frame of a live tack; `None` for tracks.
    pub fn start_frame_of(&self, id: ObjectId) -> Result<Option<i64>, EditorError> {
        Ok(self.active_board()?.start_frame_of(id))
    }

    /// Deliver every pending event: react first, then notify the sink.
    fn drain(&mut self) {
        while let Some(event) = self.queue.pop() {
            self.react(&event);
            self.sink.emit(&event);
        }
    }

    fn react(&mut self, event: &TrackEvent) {
        let Ok(idx) = self.active_index() else {
            return;
        };
        let board = &mut self.boards[idx];

        match (event.kind, event.target) {
            (EventKind::ObjectSelected, Some(target)) => {
                self.selection.select_only(target);
                board.activate_only(self.selection.active());
            }
            (EventKind::Unselected, _) => {
                self.selection.clear();
                board.deactivate_all();
            }
            (EventKind::TackMoving, Some(target)) => {
                self.selection.set_dragging(target.as_tack());
            }
            (EventKind::TackMovedAfter, Some(ObjectId::Tack(tack))) => {
                if let Some(track) = board.track_of_tack_mut(tack) {
                    let resolution = track.resolve_overlaps(tack, &mut self.queue);
                    if !resolution.is_noop() {
                        debug!(
                            tack = %tack,
                            trimmed = resolution.trimmed.len(),
                            deleted = resolution.deleted.len(),
                            "overlaps resolved"
                        );
                    }
                }
                self.selection.set_dragging(None);
            }
            (EventKind::TackDeleted | EventKind::TrackDeleted, Some(target)) => {
                self.selection.remove(target);
                let stale: Vec<ObjectId> = self
                    .selection
                    .active()
                    .iter()
                    .copied()
                    .filter(|id| !board.contains(*id))
                    .collect();
                for id in stale {
                    self.selection.remove(id);
                }
                board.activate_only(self.selection.active());
            }
            _ => {}
        }
    }
}
