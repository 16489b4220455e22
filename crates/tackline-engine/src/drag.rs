//! Drag and resize gestures on a single tack.
//!
//! A gesture is press → move* → release. The controller turns the horizontal
//! pixel distance travelled since the press into a whole number of frames and
//! commits it to the tack's start and/or span when the gesture ends. Leaving
//! the allowed area ends the gesture the same way a release does: the last
//! valid distance is committed, nothing is rolled back.

use tracing::debug;

use crate::config::EngineConfig;
use crate::event::{EventKind, EventQueue, TrackEvent};
use crate::id::TackId;
use crate::tack::{clamp_range, Tack, MAX_FRAME};

/// A pointer position in host pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle; the left/top edges are inside, the right/bottom are not.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Where a drag is allowed to continue. Outside it the drag commits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBounds {
    /// The editing area of the track.
    pub area: Rect,
    /// Vertical band the pointer must stay within.
    pub min_y: f64,
    pub max_y: f64,
}

impl DragBounds {
    pub fn contains(&self, point: Point) -> bool {
        self.area.contains(point) && self.min_y <= point.y && point.y <= self.max_y
    }
}

/// Part of the tack that was grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragZone {
    /// Left edge: moves the start, keeps the end.
    Start,
    /// Interior: moves the whole tack.
    Body,
    /// Right edge: moves the end, keeps the start.
    End,
    /// Edge of a one-frame tack; becomes Start or End on the first move.
    Half,
}

impl DragZone {
    /// Classify a press against the tack's rendered extent.
    ///
    /// The first frame-width from the left is the start handle (or `Half`
    /// for one-frame tacks), the last frame-width is the end handle, anything
    /// else inside is the body. Presses outside the extent return `None`.
    pub fn from_press(extent: Rect, point: Point, frame_width: f64, span: i64) -> Option<Self> {
        if !extent.contains(point) {
            return None;
        }
        let start_handle = Rect::new(extent.x, extent.y, frame_width, extent.height);
        if start_handle.contains(point) {
            return Some(if span == 1 { Self::Half } else { Self::Start });
        }
        let end_handle = Rect::new(
            extent.x + extent.width - frame_width,
            extent.y,
            frame_width,
            extent.height,
        );
        if end_handle.contains(point) {
            return Some(Self::End);
        }
        Some(Self::Body)
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed, not moved yet.
    Grabbed(DragZone),
    /// Moving. The zone is never `Half` here.
    Dragging(DragZone),
}

/// Result of feeding one input to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Input had no effect in the current state.
    Ignored,
    /// Press accepted, or a `Half` grab has not picked a side yet.
    Grabbed,
    /// Drag in progress.
    Dragging,
    /// Press and release without movement.
    Clicked,
    /// The gesture ended and the tack now has this range.
    Committed { start: i64, span: i64 },
}

/// Convert a pixel distance into whole frames.
///
/// Truncates toward zero, then rounds away from zero once the leftover
/// reaches `snap_ratio` of a frame width. The result never exceeds
/// `MAX_FRAME + 1` in either direction.
pub fn frames_for_distance(distance: f64, frame_width: f64, snap_ratio: f64) -> i64 {
    let limit = MAX_FRAME as f64;
    let mut frames = (distance / frame_width).trunc().clamp(-limit, limit) as i64;
    let remainder = distance % frame_width;
    let threshold = frame_width * snap_ratio;
    if remainder >= threshold {
        frames += 1;
    }
    if remainder <= -threshold {
        frames -= 1;
    }
    frames
}

/// State machine for one gesture at a time.
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    target: Option<TackId>,
    origin: Point,
    distance: f64,
    frame_width: f64,
    snap_ratio: f64,
}

impl DragController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: DragState::Idle,
            target: None,
            origin: Point::default(),
            distance: 0.0,
            frame_width: config.frame_width,
            snap_ratio: config.snap_ratio,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    /// Tack the current gesture belongs to.
    pub fn target(&self) -> Option<TackId> {
        self.target
    }

    /// Horizontal pixel distance of the live preview.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Frames the preview currently represents.
    pub fn pending_frames(&self) -> i64 {
        self.to_frames(self.distance)
    }

    fn to_frames(&self, distance: f64) -> i64 {
        frames_for_distance(distance, self.frame_width, self.snap_ratio)
    }

    fn to_distance(&self, frames: i64) -> f64 {
        self.frame_width * frames as f64
    }

    /// Begin a gesture on `tack`. Ignored unless idle.
    pub fn press(&mut self, tack: &Tack, zone: DragZone, point: Point) -> DragOutcome {
        if !self.is_idle() || !tack.exists() {
            return DragOutcome::Ignored;
        }
        self.state = DragState::Grabbed(zone);
        self.target = Some(tack.id());
        self.origin = point;
        self.distance = 0.0;
        DragOutcome::Grabbed
    }

    /// Feed a pointer move.
    pub fn update(
        &mut self,
        tack: &mut Tack,
        point: Point,
        bounds: Option<&DragBounds>,
        queue: &mut EventQueue,
    ) -> DragOutcome {
        if self.target != Some(tack.id()) {
            return DragOutcome::Ignored;
        }
        match self.state {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Grabbed(zone) => {
                let resolved = match zone {
                    DragZone::Half if point.x < self.origin.x => Some(DragZone::Start),
                    DragZone::Half if point.x > self.origin.x => Some(DragZone::End),
                    DragZone::Half => None,
                    other => Some(other),
                };
                queue.push(TrackEvent::new(EventKind::ObjectSelected, tack.id()));
                match resolved {
                    Some(zone) => {
                        self.state = DragState::Dragging(zone);
                        DragOutcome::Dragging
                    }
                    None => DragOutcome::Grabbed,
                }
            }
            DragState::Dragging(zone) => {
                if bounds.is_some_and(|b| !b.contains(point)) {
                    return self.commit(zone, tack, queue);
                }
                queue.push(TrackEvent::new(EventKind::TackMoving, tack.id()));
                queue.push(TrackEvent::new(EventKind::ObjectSelected, tack.id()));
                self.distance = self.clamp_distance(zone, point.x - self.origin.x, tack);
                DragOutcome::Dragging
            }
        }
    }

    /// Feed a pointer release.
    pub fn release(&mut self, tack: &mut Tack, point: Point, queue: &mut EventQueue) -> DragOutcome {
        if self.target != Some(tack.id()) {
            return DragOutcome::Ignored;
        }
        match self.state {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Grabbed(_) => {
                self.reset();
                queue.push(TrackEvent::new(EventKind::ObjectSelected, tack.id()));
                DragOutcome::Clicked
            }
            DragState::Dragging(zone) => {
                self.distance = self.clamp_distance(zone, point.x - self.origin.x, tack);
                self.commit(zone, tack, queue)
            }
        }
    }

    /// Abandon the gesture. A drag in progress still commits its last preview.
    pub fn cancel(&mut self, tack: &mut Tack, queue: &mut EventQueue) -> DragOutcome {
        if self.target != Some(tack.id()) {
            return DragOutcome::Ignored;
        }
        match self.state {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Grabbed(_) => {
                self.reset();
                DragOutcome::Ignored
            }
            DragState::Dragging(zone) => self.commit(zone, tack, queue),
        }
    }

    /// Return to idle without touching any tack, e.g. when the target vanished.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.target = None;
        self.distance = 0.0;
    }

    /// Keep the preview inside valid geometry: start never below 0, span never
    /// below 1, end never past `MAX_FRAME`.
    fn clamp_distance(&self, zone: DragZone, distance: f64, tack: &Tack) -> f64 {
        let frames = self.to_frames(distance);
        let (start, span, end) = (tack.start(), tack.span(), tack.end());
        let mut distance = distance;
        match zone {
            DragZone::Start => {
                if start.saturating_add(frames) < 0 {
                    distance = -self.to_distance(start);
                }
                if span <= frames.saturating_add(1) {
                    distance = self.to_distance(span - 1);
                }
            }
            DragZone::Body => {
                if start.saturating_add(frames) < 0 {
                    distance = -self.to_distance(start);
                } else if end.saturating_add(frames) > MAX_FRAME {
                    distance = self.to_distance(MAX_FRAME - end);
                }
            }
            DragZone::End => {
                if span.saturating_add(frames) <= 1 {
                    distance = -self.to_distance(span - 1);
                } else if end.saturating_add(frames) > MAX_FRAME {
                    distance = self.to_distance(MAX_FRAME - end);
                }
            }
            DragZone::Half => {}
        }
        distance
    }

    fn commit(&mut self, zone: DragZone, tack: &mut Tack, queue: &mut EventQueue) -> DragOutcome {
        let frames = self.to_frames(self.distance);

        queue.push(TrackEvent::new(EventKind::TackMoved, tack.id()));

        let (start, span) = (tack.start(), tack.span());
        let (start, span) = match zone {
            DragZone::Start => (start.saturating_add(frames), span.saturating_sub(frames)),
            DragZone::Body => (start.saturating_add(frames), span),
            DragZone::End => (start, span.saturating_add(frames)),
            DragZone::Half => (start, span),
        };
        let (start, span) = clamp_range(start, span);
        tack.update_pos(start, span);
        debug!(tack = %tack.id(), ?zone, frames, start, span, "drag committed");

        queue.push(TrackEvent::new(EventKind::TackMovedAfter, tack.id()));

        self.reset();
        DragOutcome::Committed { start, span }
    }
}
