// Settings for the host, read from `<project>/.padloop/config.json`.
//
// Every field is optional in the file; anything left out takes its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PadloopError, Result};
use crate::pipeline::persistence::state_dir;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Samples per pitch-analysis frame, a power of two
    pub fft_size: usize,
    /// Sequencer ticks per quarter note
    pub ppq: u32,
    /// Loop length used for a new project
    pub loop_bars: u32,
    /// UI frame period; the tuner updates once per frame
    pub frame_interval_ms: u64,
    /// Voice pool size on the audio thread
    pub max_voices: usize,
    /// Open the default input device for the tuner
    pub input_enabled: bool,
    /// Default log filter, overridden by RUST_LOG
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            ppq: 192,
            loop_bars: 2,
            frame_interval_ms: 16,
            max_voices: 32,
            input_enabled: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(PadloopError::InvalidConfig(msg));
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return bad(format!("fft_size {} must be a power of two >= 32", self.fft_size));
        }
        if self.ppq == 0 {
            return bad("ppq must be > 0".into());
        }
        if self.loop_bars == 0 {
            return bad("loop_bars must be > 0".into());
        }
        if self.frame_interval_ms == 0 {
            return bad("frame_interval_ms must be > 0".into());
        }
        if self.max_voices == 0 {
            return bad("max_voices must be > 0".into());
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return bad(format!("unknown log_level {:?}", self.log_level));
        }
        Ok(())
    }
}

pub fn config_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(CONFIG_FILE)
}

/// Read and validate the config. A missing file gives the defaults.
pub fn load_config(project_dir: &Path) -> Result<Config> {
    let path = config_path(project_dir);
    let config = match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str::<Config>(&contents)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = serde_json::from_str(r#"{ "ppq": 96, "input_enabled": false }"#).unwrap();
        assert_eq!(config.ppq, 96);
        assert!(!config.input_enabled);
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.max_voices, 32);
    }

    #[test]
    fn rejects_bad_values() {
        let odd_fft = Config { fft_size: 1000, ..Config::default() };
        assert!(matches!(odd_fft.validate(), Err(PadloopError::InvalidConfig(_))));
        let no_voices = Config { max_voices: 0, ..Config::default() };
        assert!(no_voices.validate().is_err());
        let level = Config { log_level: "loud".into(), ..Config::default() };
        assert!(level.validate().is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = std::env::temp_dir().join(format!("padloop-config-{}", std::process::id()));
        assert_eq!(load_config(&dir).unwrap(), Config::default());
    }
}
