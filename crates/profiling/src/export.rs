//! Session export.
//! Captured events are written as one JSON document per session, named
//! `profile_YYYY-MM-DD_HH-MM-SS.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ProfileEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub started: String,
    pub process_id: u32,
    pub events: Vec<ProfileEvent>,
}

/// Session file name for the current local time.
pub fn session_filename() -> String {
    let now = chrono::Local::now();
    format!("profile_{}.json", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write `events` to a new session file under `dir`, creating the directory
/// if needed. Returns the path written.
pub fn save_session(dir: &Path, events: Vec<ProfileEvent>) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let session = Session {
        started: chrono::Local::now().to_rfc3339(),
        process_id: std::process::id(),
        events,
    };
    let path = dir.join(session_filename());
    let json = serde_json::to_vec_pretty(&session).map_err(io::Error::other)?;
    fs::write(&path, json)?;
    Ok(path)
}

pub fn load_session(path: &Path) -> io::Result<Session> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_session() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("sessions");
        let event = ProfileEvent {
            name: "Window::frame".into(),
            thread_id: 1,
            thread_name: None,
            process_id: 2,
            parent_name: None,
            start_ns: 10,
            duration_ns: 20,
            depth: 0,
            location: None,
            metadata: None,
        };
        let path = save_session(&dir, vec![event.clone()]).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("profile_"));
        let session = load_session(&path).unwrap();
        assert_eq!(session.events, vec![event]);
    }
}
