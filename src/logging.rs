// The terminal belongs to the UI, so log lines go to <project>/.padloop/padloop.log
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::pipeline::persistence::state_dir;

const LOG_FILE: &str = "padloop.log";

pub fn log_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(LOG_FILE)
}

/// Start logging to the project's log file. RUST_LOG overrides the level
/// from the config.
pub fn init(project_dir: &Path, config: &Config) -> anyhow::Result<PathBuf> {
    let path = log_path(project_dir);
    std::fs::create_dir_all(state_dir(project_dir))?;
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;

    log::info!("padloop {} starting in {}", env!("CARGO_PKG_VERSION"), project_dir.display());
    Ok(path)
}
