// Loaded on startup and saved on quit so recordings survive between sessions
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::project::ProjectState;

pub const PADLOOP_DIR: &str = ".padloop";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.padloop
pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(PADLOOP_DIR)
}

fn project_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(PROJECT_FILE)
}

/// `Ok(None)` when nothing has been saved yet
pub fn load_project(project_dir: &Path) -> Result<Option<ProjectState>> {
    let path = project_file_path(project_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let state: ProjectState = serde_json::from_str(&data)?;
    log::info!("loaded {} ({} slots)", path.display(), state.samples.len());
    Ok(Some(state))
}

// Write to a temp file first so a crash mid-save never leaves half a project
pub fn save_project(project_dir: &Path, state: &ProjectState) -> Result<()> {
    let path = project_file_path(project_dir);
    std::fs::create_dir_all(state_dir(project_dir))?;
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &path)?;
    log::info!("saved {}", path.display());
    Ok(())
}
