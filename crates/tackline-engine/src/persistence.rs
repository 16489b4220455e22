//! Project persistence.
//!
//! Boards are saved as a single JSON project file with an explicit schema.
//! Only live tracks and tacks are written; ids, tombstones and selection
//! flags are runtime state and are issued afresh on load. Writes are atomic
//! (temp file + fsync + rename).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::board::Board;
use crate::id::TrackId;
use crate::tack::{is_valid_range, Tack};
use crate::track::TimelineTrack;

/// Current schema version for project files.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Error type for persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid project data: {0}")]
    InvalidData(String),

    #[error("Unsupported schema version: {0} (max supported: {1})")]
    UnsupportedSchema(u32, u32),
}

/// On-disk project format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub schema_version: u32,
    pub last_modified: DateTime<Utc>,
    pub scores: Vec<BoardRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRecord {
    pub id: String,
    pub title: String,
    pub timelines: Vec<TrackRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub tacks: Vec<TackRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TackRecord {
    pub title: String,
    pub start: i64,
    pub span: i64,
}

impl ProjectFile {
    /// Snapshot the live content of `boards`, stamped with the current time.
    pub fn from_boards(boards: &[Board]) -> Self {
        let scores = boards
            .iter()
            .filter(|b| b.exists())
            .map(|board| BoardRecord {
                id: board.id().to_string(),
                title: board.title.clone(),
                timelines: board
                    .live_tracks()
                    .map(|track| TrackRecord {
                        title: track.title.clone(),
                        tacks: track
                            .live_tacks()
                            .map(|tack| TackRecord {
                                title: tack.title.clone(),
                                start: tack.start(),
                                span: tack.span(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            last_modified: Utc::now(),
            scores,
        }
    }

    /// Rebuild boards with fresh ids. Fails on impossible tack ranges.
    pub fn into_boards(self) -> Result<Vec<Board>, PersistenceError> {
        if self.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedSchema(
                self.schema_version,
                CURRENT_SCHEMA_VERSION,
            ));
        }

        self.scores
            .into_iter()
            .map(|score| -> Result<Board, PersistenceError> {
                let tracks = score
                    .timelines
                    .into_iter()
                    .enumerate()
                    .map(|(index, record)| -> Result<TimelineTrack, PersistenceError> {
                        let tacks = record
                            .tacks
                            .into_iter()
                            .map(|tack| {
                                if !is_valid_range(tack.start, tack.span) {
                                    return Err(PersistenceError::InvalidData(format!(
                                        "tack '{}' in '{}' has start={} span={}",
                                        tack.title, score.id, tack.start, tack.span
                                    )));
                                }
                                Ok(Tack::new(TrackId::new(), tack.title, tack.start, tack.span))
                            })
                            .collect::<Result<Vec<Tack>, PersistenceError>>()?;
                        Ok(TimelineTrack::with_tacks(index, record.title, tacks))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Board::with_tracks(score.id, score.title, tracks))
            })
            .collect()
    }
}

/// Reads and writes one project file.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    path: PathBuf,
}

impl ProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the project file. Returns `Ok(None)` if it does not exist.
    pub fn load(&self) -> Result<Option<ProjectFile>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;

        // Check the version before committing to the full schema
        let raw: serde_json::Value = serde_json::from_str(&content)?;
        let version_u64 = raw
            .get("schemaVersion")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| PersistenceError::InvalidData("missing schemaVersion".to_string()))?;
        let version = u32::try_from(version_u64)
            .map_err(|_| PersistenceError::InvalidData("schemaVersion too large".to_string()))?;

        if version > CURRENT_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedSchema(
                version,
                CURRENT_SCHEMA_VERSION,
            ));
        }

        let file: ProjectFile = serde_json::from_str(&content)?;
        info!(path = %self.path.display(), scores = file.scores.len(), "project loaded");
        Ok(Some(file))
    }

    /// Load and rebuild the boards. Returns `Ok(None)` if the file does not exist.
    pub fn load_boards(&self) -> Result<Option<Vec<Board>>, PersistenceError> {
        self.load()?.map(ProjectFile::into_boards).transpose()
    }

    /// Load only when the stored `lastModified` differs from `last_seen`.
    pub fn load_if_modified(
        &self,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<Option<ProjectFile>, PersistenceError> {
        match self.load()? {
            Some(file) if Some(file.last_modified) == last_seen => Ok(None),
            other => Ok(other),
        }
    }

    /// Save the live content of `boards`. Returns the stamp written.
    pub fn save(&self, boards: &[Board]) -> Result<DateTime<Utc>, PersistenceError> {
        let file = ProjectFile::from_boards(boards);
        self.save_file(&file)?;
        Ok(file.last_modified)
    }

    /// Write `file` as-is.
    pub fn save_file(&self, file: &ProjectFile) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(file)?;
        if let Err(e) = atomic_write(&self.path, json.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "project save failed");
            return Err(e.into());
        }
        info!(path = %self.path.display(), "project saved");
        Ok(())
    }
}

/// Write content atomically using temp file + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let pid = std::process::id();

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");
    let tmp_path = path.with_file_name(format!("{file_name}.{timestamp}.{pid}.tmp"));

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::event::EventQueue;
    use crate::id::ObjectId;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, ProjectStore) {
        let temp = TempDir::new().unwrap();
        let store = ProjectStore::new(temp.path().join("project.json"));
        (temp, store)
    }

    fn sample_board() -> Board {
        let mut board = Board::new("Intro", "Intro score");
        let camera = board.add_track("Camera");
        let track = board.track_mut(camera).unwrap();
        track.add_tack(0, "Pan", 10).unwrap();
        track.add_tack(12, "Zoom", 4).unwrap();
        board.add_track("Audio");
        board
    }

    #[test]
    fn test_missing_file_is_none() {
        let (_temp, store) = setup_store();
        assert!(store.load().unwrap().is_none());
        assert!(store.load_boards().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (_temp, store) = setup_store();
        let board = sample_board();
        store.save(std::slice::from_ref(&board)).unwrap();

        let boards = store.load_boards().unwrap().unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].id(), "Intro");
        assert_eq!(boards[0].outline(), board.outline());

        // ids are runtime-only
        let original = board.live_tracks().next().unwrap().id();
        let loaded = boards[0].live_tracks().next().unwrap().id();
        assert_ne!(original, loaded);
    }

    #[test]
    fn test_loaded_tacks_point_at_their_track() {
        let (_temp, store) = setup_store();
        store.save(&[sample_board()]).unwrap();
        let boards = store.load_boards().unwrap().unwrap();
        for track in boards[0].live_tracks() {
            for tack in track.live_tacks() {
                assert_eq!(tack.track_id(), track.id());
            }
        }
    }

    #[test]
    fn test_tombstones_are_not_saved() {
        let (_temp, store) = setup_store();
        let mut board = sample_board();
        let mut queue = EventQueue::new();
        let camera = board.live_tracks().next().unwrap();
        let pan = camera.live_tacks().next().unwrap().id();
        let audio = board.live_tracks().nth(1).unwrap().id();
        board.delete_object(ObjectId::Tack(pan), &mut queue);
        board.delete_object(ObjectId::Track(audio), &mut queue);

        store.save(&[board]).unwrap();
        let file = store.load().unwrap().unwrap();
        assert_eq!(file.scores[0].timelines.len(), 1);
        assert_eq!(
            file.scores[0].timelines[0].tacks,
            vec![TackRecord {
                title: "Zoom".into(),
                start: 12,
                span: 4,
            }]
        );
    }

    #[test]
    fn test_file_uses_camel_case_keys() {
        let (_temp, store) = setup_store();
        store.save(&[Board::seeded(&EngineConfig::default())]).unwrap();
        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\"schemaVersion\": 1"));
        assert!(content.contains("\"lastModified\""));
        assert!(content.contains("\"scores\""));
        assert!(content.contains("\"timelines\""));
        assert!(content.contains("\"New Score\""));
    }

    #[test]
    fn test_load_rejects_invalid_range() {
        let (_temp, store) = setup_store();
        let mut file = ProjectFile::from_boards(&[sample_board()]);
        file.scores[0].timelines[0].tacks[0].span = 0;
        store.save_file(&file).unwrap();

        let result = store.load_boards();
        assert!(matches!(result, Err(PersistenceError::InvalidData(_))));
    }

    #[test]
    fn test_load_rejects_range_past_max_frame() {
        let (_temp, store) = setup_store();
        let mut file = ProjectFile::from_boards(&[sample_board()]);
        let tack = &mut file.scores[0].timelines[0].tacks[0];
        tack.start = 9_223_372_036_854_775_800;
        tack.span = 100;
        store.save_file(&file).unwrap();

        let result = store.load_boards();
        assert!(matches!(result, Err(PersistenceError::InvalidData(_))));
    }

    #[test]
    fn test_load_unsupported_schema() {
        let (_temp, store) = setup_store();
        let mut file = ProjectFile::from_boards(&[]);
        file.schema_version = 99;
        store.save_file(&file).unwrap();

        let result = store.load();
        assert!(matches!(
            result,
            Err(PersistenceError::UnsupportedSchema(99, CURRENT_SCHEMA_VERSION))
        ));
    }

    #[test]
    fn test_load_missing_schema_version() {
        let (_temp, store) = setup_store();
        fs::write(store.path(), r#"{"lastModified": "2024-01-01T00:00:00Z", "scores": []}"#).unwrap();
        assert!(matches!(store.load(), Err(PersistenceError::InvalidData(_))));
    }

    #[test]
    fn test_load_corrupted_json() {
        let (_temp, store) = setup_store();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(PersistenceError::Json(_))));
    }

    #[test]
    fn test_load_if_modified() {
        let (_temp, store) = setup_store();
        let stamp = store.save(&[sample_board()]).unwrap();

        assert!(store.load_if_modified(None).unwrap().is_some());
        assert!(store.load_if_modified(Some(stamp)).unwrap().is_none());

        let mut file = store.load().unwrap().unwrap();
        file.last_modified = stamp + chrono::Duration::seconds(5);
        store.save_file(&file).unwrap();
        assert!(store.load_if_modified(Some(stamp)).unwrap().is_some());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let store = ProjectStore::new(temp.path().join("a").join("b").join("project.json"));
        store.save(&[]).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (temp, store) = setup_store();
        store.save(&[sample_board()]).unwrap();
        store.save(&[sample_board()]).unwrap();
        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["project.json".to_string()]);
    }
}
