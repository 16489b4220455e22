//! tackline-engine: headless editing engine for frame-based timelines
//!
//! This crate holds the editing model behind a timeline editor, including:
//! - Tracks of non-overlapping frame intervals ("tacks") grouped into boards
//! - The drag/resize state machine with frame quantization
//! - Overlap resolution after every committed move
//! - Keyboard-style navigation across tracks and tacks
//! - An event channel for the hosting UI
//! - JSON project persistence and a small command-script language

pub mod board;
pub mod config;
pub mod drag;
pub mod editor;
pub mod event;
pub mod id;
pub mod persistence;
pub mod script;
pub mod selection;
pub mod tack;
pub mod track;

// Re-export commonly used types
pub use board::{Board, Violation};
pub use config::{ConfigError, EngineConfig};
pub use drag::{
    frames_for_distance, DragBounds, DragController, DragOutcome, DragState, DragZone, Point, Rect,
};
pub use editor::{Direction, Editor, EditorError};
pub use event::{EventKind, EventLog, EventQueue, EventSink, NullSink, TrackEvent};
pub use id::{IdError, ObjectId, TackId, TrackId};
pub use persistence::{PersistenceError, ProjectFile, ProjectStore};
pub use script::{parse_script, run_script, Command, ObjectRef, ScriptError};
pub use selection::Selection;
pub use tack::Tack;
pub use track::{Resolution, TimelineTrack};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
