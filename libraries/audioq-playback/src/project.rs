//! Project file persistence
//!
//! `.audioq` files are versioned JSON holding the project name, the buffer
//! size, and the ordered cue records (name + source path). Cue selection
//! state is UI-only and never stored. Saving writes to a sibling temp file
//! and renames it into place, so a failed save never leaves a half-written
//! project behind; loading parses and validates the whole file before
//! anything is handed back to the caller.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};
use crate::settings::Settings;
use crate::types::Cue;

/// Current project file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Serialized form of one cue.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CueRecord {
    name: String,
    path: PathBuf,
}

/// On-disk project record.
#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    version: u32,
    name: String,
    buffer_size_frames: u32,
    cues: Vec<CueRecord>,
}

/// Everything a load yields once the file has fully validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectData {
    pub settings: Settings,
    pub cues: Vec<Cue>,
}

/// Serialize settings and cues to `path`.
pub fn save(path: &Path, settings: &Settings, cues: &[Cue]) -> Result<()> {
    let record = ProjectFile {
        version: FORMAT_VERSION,
        name: settings.project_name.clone(),
        buffer_size_frames: settings.buffer_size_frames,
        cues: cues
            .iter()
            .map(|cue| CueRecord {
                name: cue.name.clone(),
                path: cue.source_path.clone(),
            })
            .collect(),
    };

    let content = serde_json::to_string_pretty(&record)
        .map_err(|e| PlaybackError::Serialization(e.to_string()))?;

    let tmp = temp_path(path);
    fs::write(&tmp, content)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

/// Read and validate the project at `path`.
pub fn load(path: &Path) -> Result<ProjectData> {
    let content = fs::read_to_string(path)?;

    let record: ProjectFile =
        serde_json::from_str(&content).map_err(|e| PlaybackError::Parse(e.to_string()))?;

    if record.version != FORMAT_VERSION {
        return Err(PlaybackError::VersionMismatch {
            found: record.version,
            expected: FORMAT_VERSION,
        });
    }

    let settings = Settings {
        project_name: record.name,
        buffer_size_frames: record.buffer_size_frames,
    };
    if settings.validate().is_err() {
        return Err(PlaybackError::Parse(format!(
            "buffer size {} frames is not usable",
            settings.buffer_size_frames
        )));
    }

    let cues = record
        .cues
        .into_iter()
        .map(|record| Cue::new(record.name, record.path))
        .collect();

    Ok(ProjectData { settings, cues })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("project.audioq"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}
