//! Line-oriented command scripts.
//!
//! One command per line; blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! add-track
//! add-tack track:0 24
//! move tack:0.1 30 6
//! drag tack:0.0 end 95 125
//! nav down
//! rename track:0 Camera moves
//! ```
//!
//! Objects are named by position (`track:<n>` is the n-th live track,
//! `tack:<n>.<m>` the m-th live tack of that track in insertion order) or by
//! a full id such as `tack_<uuid>`. Positions are resolved against the active
//! board when the command runs, so they shift after deletions.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::board::Board;
use crate::drag::{DragZone, Point};
use crate::editor::{Direction, Editor, EditorError};
use crate::event::EventSink;
use crate::id::ObjectId;

/// A reference to a track or tack as written in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef {
    Track(usize),
    Tack(usize, usize),
    Id(ObjectId),
}

impl ObjectRef {
    /// Resolve against the live objects of `board`.
    pub fn resolve(&self, board: &Board) -> Option<ObjectId> {
        match *self {
            Self::Track(n) => board.live_tracks().nth(n).map(|t| ObjectId::Track(t.id())),
            Self::Tack(n, m) => board
                .live_tracks()
                .nth(n)?
                .live_tacks()
                .nth(m)
                .map(|t| ObjectId::Tack(t.id())),
            Self::Id(id) => board.contains(id).then_some(id),
        }
    }
}

impl FromStr for ObjectRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(n) = s.strip_prefix("track:") {
            let n = n.parse().map_err(|_| format!("bad track index in '{s}'"))?;
            return Ok(Self::Track(n));
        }
        if let Some(rest) = s.strip_prefix("tack:") {
            let (n, m) = rest
                .split_once('.')
                .ok_or_else(|| format!("expected tack:<track>.<tack>, got '{s}'"))?;
            let n = n.parse().map_err(|_| format!("bad track index in '{s}'"))?;
            let m = m.parse().map_err(|_| format!("bad tack index in '{s}'"))?;
            return Ok(Self::Tack(n, m));
        }
        s.parse().map(Self::Id).map_err(|e| e.to_string())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(n) => write!(f, "track:{n}"),
            Self::Tack(n, m) => write!(f, "tack:{n}.{m}"),
            Self::Id(id) => id.fmt(f),
        }
    }
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTrack,
    AddTack { track: ObjectRef, frame: i64 },
    Delete(ObjectRef),
    Select(ObjectRef),
    Unselect,
    Rename { target: ObjectRef, title: String },
    Move { tack: ObjectRef, start: i64, span: i64 },
    Drag { tack: ObjectRef, zone: DragZone, from_x: f64, to_x: f64 },
    Nav(Direction),
    Cursor(i64),
}

/// Errors from parsing or running a script. Lines are 1-based.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: '{target}' does not name a live object")]
    Unresolved { line: usize, target: String },

    #[error("line {line}: {source}")]
    Editor {
        line: usize,
        #[source]
        source: EditorError,
    },
}

impl ScriptError {
    pub fn line(&self) -> usize {
        match self {
            Self::Parse { line, .. } | Self::Unresolved { line, .. } | Self::Editor { line, .. } => {
                *line
            }
        }
    }
}

fn parse_zone(s: &str) -> Result<DragZone, String> {
    match s {
        "start" => Ok(DragZone::Start),
        "body" => Ok(DragZone::Body),
        "end" => Ok(DragZone::End),
        "half" => Ok(DragZone::Half),
        other => Err(format!("unknown drag zone '{other}'")),
    }
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    match s {
        "up" => Ok(Direction::Up),
        "down" => Ok(Direction::Down),
        "left" => Ok(Direction::Left),
        "right" => Ok(Direction::Right),
        other => Err(format!("unknown direction '{other}'")),
    }
}

fn parse_number<T: FromStr>(s: &str, what: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("{what} must be a number, got '{s}'"))
}

/// Parse a single line. Returns `Ok(None)` for blank lines and comments.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let args = &tokens[1..];
    let expect = |count: usize, usage: &str| {
        if args.len() == count {
            Ok(())
        } else {
            Err(format!("usage: {usage}"))
        }
    };

    let command = match tokens[0] {
        "add-track" => {
            expect(0, "add-track")?;
            Command::AddTrack
        }
        "add-tack" => {
            expect(2, "add-tack <track> <frame>")?;
            Command::AddTack {
                track: args[0].parse()?,
                frame: parse_number(args[1], "frame")?,
            }
        }
        "delete" => {
            expect(1, "delete <object>")?;
            Command::Delete(args[0].parse()?)
        }
        "select" => {
            expect(1, "select <object>")?;
            Command::Select(args[0].parse()?)
        }
        "unselect" => {
            expect(0, "unselect")?;
            Command::Unselect
        }
        "rename" => {
            if args.len() < 2 {
                return Err("usage: rename <object> <title...>".to_string());
            }
            Command::Rename {
                target: args[0].parse()?,
                title: args[1..].join(" "),
            }
        }
        "move" => {
            expect(3, "move <tack> <start> <span>")?;
            Command::Move {
                tack: args[0].parse()?,
                start: parse_number(args[1], "start")?,
                span: parse_number(args[2], "span")?,
            }
        }
        "drag" => {
            expect(4, "drag <tack> <start|body|end|half> <from-x> <to-x>")?;
            Command::Drag {
                tack: args[0].parse()?,
                zone: parse_zone(args[1])?,
                from_x: parse_number(args[2], "from-x")?,
                to_x: parse_number(args[3], "to-x")?,
            }
        }
        "nav" => {
            expect(1, "nav <up|down|left|right>")?;
            Command::Nav(parse_direction(args[0])?)
        }
        "cursor" => {
            expect(1, "cursor <frame>")?;
            Command::Cursor(parse_number(args[0], "frame")?)
        }
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

/// Parse a whole script into `(line, command)` pairs.
pub fn parse_script(text: &str) -> Result<Vec<(usize, Command)>, ScriptError> {
    let mut commands = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        match parse_command(raw) {
            Ok(Some(command)) => commands.push((line, command)),
            Ok(None) => {}
            Err(message) => return Err(ScriptError::Parse { line, message }),
        }
    }
    Ok(commands)
}

/// Run one command against the editor's active board.
pub fn execute<S: EventSink>(
    editor: &mut Editor<S>,
    line: usize,
    command: &Command,
) -> Result<(), ScriptError> {
    let editor_err = |source: EditorError| ScriptError::Editor { line, source };
    let resolve = |editor: &Editor<S>, target: &ObjectRef| -> Result<ObjectId, ScriptError> {
        let board = editor.active_board().map_err(editor_err)?;
        target.resolve(board).ok_or_else(|| ScriptError::Unresolved {
            line,
            target: target.to_string(),
        })
    };
    let resolve_tack = |editor: &Editor<S>, target: &ObjectRef| {
        resolve(editor, target)?
            .as_tack()
            .ok_or_else(|| ScriptError::Parse {
                line,
                message: format!("'{target}' is not a tack"),
            })
    };

    debug!(line, ?command, "script command");
    match command {
        Command::AddTrack => {
            editor.add_track().map_err(editor_err)?;
        }
        Command::AddTack { track, frame } => {
            let Some(track_id) = resolve(editor, track)?.as_track() else {
                return Err(ScriptError::Parse {
                    line,
                    message: format!("'{track}' is not a track"),
                });
            };
            if editor.add_tack(track_id, *frame).map_err(editor_err)?.is_none() {
                warn!(line, track = %track, frame, "frame already occupied, tack not added");
            }
        }
        Command::Delete(target) => {
            let id = resolve(editor, target)?;
            editor.delete_object(id).map_err(editor_err)?;
        }
        Command::Select(target) => {
            let id = resolve(editor, target)?;
            editor.select_object(id).map_err(editor_err)?;
        }
        Command::Unselect => editor.unselect_all().map_err(editor_err)?,
        Command::Rename { target, title } => {
            let id = resolve(editor, target)?;
            editor.rename_object(id, title).map_err(editor_err)?;
        }
        Command::Move { tack, start, span } => {
            let id = resolve_tack(editor, tack)?;
            editor.move_tack(id, *start, *span).map_err(editor_err)?;
        }
        Command::Drag {
            tack,
            zone,
            from_x,
            to_x,
        } => {
            let id = resolve_tack(editor, tack)?;
            editor
                .begin_drag(id, *zone, Point::new(*from_x, 0.0))
                .map_err(editor_err)?;
            editor
                .update_drag(Point::new(*to_x, 0.0), None)
                .map_err(editor_err)?;
            editor.end_drag(Point::new(*to_x, 0.0)).map_err(editor_err)?;
        }
        Command::Nav(direction) => {
            editor.navigate(*direction).map_err(editor_err)?;
        }
        Command::Cursor(frame) => editor.set_cursor_frame(*frame),
    }
    Ok(())
}

/// Parse and run a script. Stops at the first failing line.
///
/// Returns the number of commands executed.
pub fn run_script<S: EventSink>(editor: &mut Editor<S>, text: &str) -> Result<usize, ScriptError> {
    let commands = parse_script(text)?;
    for (line, command) in &commands {
        execute(editor, *line, command)?;
    }
    Ok(commands.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::event::{EventKind, EventLog};

    fn editor() -> Editor<EventLog> {
        Editor::new(EngineConfig::default(), EventLog::new())
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        let commands = parse_script("\n# setup\n  add-track  \n\nunselect\n").unwrap();
        assert_eq!(
            commands,
            vec![(3, Command::AddTrack), (5, Command::Unselect)]
        );
    }

    #[test]
    fn test_parse_object_refs() {
        assert_eq!("track:2".parse::<ObjectRef>(), Ok(ObjectRef::Track(2)));
        assert_eq!("tack:1.3".parse::<ObjectRef>(), Ok(ObjectRef::Tack(1, 3)));
        assert!("tack:1".parse::<ObjectRef>().is_err());
        assert!("score:1".parse::<ObjectRef>().is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("drag tack:0.0 half 10 -5.5").unwrap(),
            Some(Command::Drag {
                tack: ObjectRef::Tack(0, 0),
                zone: DragZone::Half,
                from_x: 10.0,
                to_x: -5.5,
            })
        );
        assert_eq!(
            parse_command("rename track:0   Camera  moves").unwrap(),
            Some(Command::Rename {
                target: ObjectRef::Track(0),
                title: "Camera moves".into(),
            })
        );
        assert_eq!(
            parse_command("nav left").unwrap(),
            Some(Command::Nav(Direction::Left))
        );
    }

    #[test]
    fn test_parse_error_carries_line() {
        let err = parse_script("add-track\nmove tack:0.0 1\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert!(err.to_string().starts_with("line 2: usage: move"));

        let err = parse_script("jump\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: unknown command 'jump'");

        let err = parse_script("\n\ncursor soon").unwrap_err();
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_run_script_edits_board() {
        let mut editor = editor();
        let script = "\
add-track
add-tack track:1 0
add-tack track:1 20
move tack:1.1 5 10
rename tack:1.0 Intro
";
        assert_eq!(run_script(&mut editor, script).unwrap(), 5);

        let board = editor.active_board().unwrap();
        let track = board.live_tracks().nth(1).unwrap();
        let ranges: Vec<_> = track
            .live_tacks()
            .map(|t| (t.title.as_str(), t.start(), t.end()))
            .collect();
        // the moved tack cut the first one short
        assert_eq!(ranges, vec![("Intro", 0, 4), ("New Tack", 5, 14)]);
    }

    #[test]
    fn test_run_script_drag_and_nav() {
        let mut editor = editor();
        run_script(&mut editor, "drag tack:0.0 body 0 30\nnav left\n").unwrap();
        let board = editor.active_board().unwrap();
        let track = board.live_tracks().next().unwrap();
        let tack = track.live_tacks().next().unwrap();
        assert_eq!((tack.start(), tack.span()), (3, 10));
        // left from the only tack selects its track
        assert_eq!(editor.selection().single(), Some(ObjectId::Track(track.id())));
    }

    #[test]
    fn test_refused_add_tack_is_not_an_error() {
        let mut editor = editor();
        run_script(&mut editor, "add-tack track:0 3\n").unwrap();
        assert!(editor.sink().of_kind(EventKind::TrackAddTack).is_empty());
    }

    #[test]
    fn test_out_of_range_frames_do_not_panic() {
        let mut editor = editor();
        let err = run_script(&mut editor, "move tack:0.0 9223372036854775800 100\n").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Editor {
                line: 1,
                source: EditorError::InvalidRange { .. }
            }
        ));

        run_script(&mut editor, "drag tack:0.0 body 0 1e300\n").unwrap();
        run_script(
            &mut editor,
            "add-tack track:0 9223372036854775800\nnav down\nnav right\nnav left\n",
        )
        .unwrap();

        let board = editor.active_board().unwrap();
        assert!(board.violations().is_empty());
        let track = board.live_tracks().next().unwrap();
        assert_eq!(track.live_tacks().count(), 1);
    }

    #[test]
    fn test_unresolved_reference() {
        let mut editor = editor();
        let err = run_script(&mut editor, "select tack:0.0\nselect tack:0.5\n").unwrap_err();
        assert!(matches!(err, ScriptError::Unresolved { line: 2, .. }));
        // the first line already ran
        assert_eq!(editor.sink().kinds(), vec![EventKind::ObjectSelected]);
    }

    #[test]
    fn test_full_id_reference() {
        let mut editor = editor();
        let id = editor
            .active_board()
            .unwrap()
            .live_tracks()
            .next()
            .unwrap()
            .id();
        run_script(&mut editor, &format!("delete {}\n", ObjectId::Track(id))).unwrap();
        assert_eq!(editor.active_board().unwrap().live_tracks().count(), 0);
    }

    #[test]
    fn test_move_on_track_is_rejected() {
        let mut editor = editor();
        let err = run_script(&mut editor, "move track:0 1 2\n").unwrap_err();
        assert!(matches!(err, ScriptError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_editor_error_is_wrapped() {
        let mut editor = editor();
        let err = run_script(&mut editor, "move tack:0.0 -2 4\n").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Editor {
                line: 1,
                source: EditorError::InvalidRange { .. }
            }
        ));
    }
}
