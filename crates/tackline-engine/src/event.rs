//! Notification channel between the engine and its host.
//!
//! Every state change the engine wants the outside world to know about is a
//! [`TrackEvent`]. Components push events onto an [`EventQueue`]; the
//! [`Editor`](crate::editor::Editor) drains the queue in FIFO order, applies
//! its own reactions (selection, overlap resolution) and then hands each event
//! to the single injected [`EventSink`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An object became the (single) selection.
    ObjectSelected,
    /// The selection was cleared.
    Unselected,
    /// A track was appended to the active board.
    BoardAddTrack,
    /// A tack was added to a track at `frame`.
    TrackAddTack,
    /// A track was tombstoned.
    TrackDeleted,
    /// A drag update is in flight for a tack.
    TackMoving,
    /// A drag is about to be committed to a tack.
    TackMoved,
    /// A drag was committed; persistence and overlap resolution follow.
    TackMovedAfter,
    /// A tack was tombstoned.
    TackDeleted,
    /// An object is about to be edited outside a drag (undo checkpoint).
    BeforeSave,
    /// An object was edited outside a drag.
    Save,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ObjectSelected => "object_selected",
            Self::Unselected => "unselected",
            Self::BoardAddTrack => "board_add_track",
            Self::TrackAddTack => "track_add_tack",
            Self::TrackDeleted => "track_deleted",
            Self::TackMoving => "tack_moving",
            Self::TackMoved => "tack_moved",
            Self::TackMovedAfter => "tack_moved_after",
            Self::TackDeleted => "tack_deleted",
            Self::BeforeSave => "before_save",
            Self::Save => "save",
        };
        f.write_str(name)
    }
}

/// A single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub kind: EventKind,
    /// Object the event is about; `None` for global events such as `Unselected`.
    pub target: Option<ObjectId>,
    /// Optional frame payload (e.g. where a tack was added).
    pub frame: Option<i64>,
}

impl TrackEvent {
    /// Event about a specific object.
    pub fn new(kind: EventKind, target: impl Into<ObjectId>) -> Self {
        Self {
            kind,
            target: Some(target.into()),
            frame: None,
        }
    }

    /// Event that targets no object.
    pub fn global(kind: EventKind) -> Self {
        Self {
            kind,
            target: None,
            frame: None,
        }
    }

    /// Attach a frame payload.
    #[must_use]
    pub fn with_frame(mut self, frame: i64) -> Self {
        self.frame = Some(frame);
        self
    }
}

impl fmt::Display for TrackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(target) = self.target {
            write!(f, " {target}")?;
        }
        if let Some(frame) = self.frame {
            write!(f, " @{frame}")?;
        }
        Ok(())
    }
}

/// Receiver of engine notifications. Exactly one per editor.
pub trait EventSink {
    fn emit(&mut self, event: &TrackEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&TrackEvent),
{
    fn emit(&mut self, event: &TrackEvent) {
        self(event);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &TrackEvent) {}
}

/// Sink that records every event, in delivery order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<TrackEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events.
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// Kinds of all recorded events, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// Recorded events of one kind.
    pub fn of_kind(&self, kind: EventKind) -> Vec<TrackEvent> {
        self.events.iter().filter(|e| e.kind == kind).copied().collect()
    }

    /// Take the recorded events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<TrackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &TrackEvent) {
        self.events.push(*event);
    }
}

/// FIFO buffer of events produced while a command runs.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<TrackEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TrackEvent) {
        self.pending.push_back(event);
    }

    /// Pop the oldest pending event.
    pub fn pop(&mut self) -> Option<TrackEvent> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{TackId, TrackId};

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = EventQueue::new();
        let first = TackId::new();
        let second = TackId::new();
        queue.push(TrackEvent::new(EventKind::TackMoved, first));
        queue.push(TrackEvent::new(EventKind::TackMovedAfter, second));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().target, Some(ObjectId::Tack(first)));
        assert_eq!(queue.pop().unwrap().target, Some(ObjectId::Tack(second)));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &TrackEvent| seen.push(event.kind);
            sink.emit(&TrackEvent::global(EventKind::Unselected));
        }
        assert_eq!(seen, vec![EventKind::Unselected]);
    }

    #[test]
    fn test_event_log_filters_by_kind() {
        let mut log = EventLog::new();
        let track = TrackId::new();
        log.emit(&TrackEvent::new(EventKind::TrackAddTack, track).with_frame(4));
        log.emit(&TrackEvent::global(EventKind::Unselected));

        assert_eq!(
            log.kinds(),
            vec![EventKind::TrackAddTack, EventKind::Unselected]
        );
        let adds = log.of_kind(EventKind::TrackAddTack);
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].frame, Some(4));

        assert_eq!(log.drain().len(), 2);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_display() {
        let event = TrackEvent::global(EventKind::Unselected);
        assert_eq!(event.to_string(), "unselected");

        let track = TrackId::new();
        let event = TrackEvent::new(EventKind::TrackAddTack, track).with_frame(12);
        assert_eq!(event.to_string(), format!("track_add_tack {track} @12"));
    }
}
