use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use padloop::audio::{self, AudioHandle};
use padloop::audio_api::AudioCommand;
use padloop::config::{self, Config};
use padloop::middle::Middle;
use padloop::pipeline::persistence;
use padloop::pipeline::project::ProjectState;
use padloop::pitch::PitchTracker;
use padloop::shared::InputEvent;
use padloop::{loader, logging, scale, tui};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("no current directory")?,
    };

    // logging is configured by the config, so report a bad config after
    let (config, config_err) = match config::load_config(&project_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let log_file = logging::init(&project_dir, &config)?;
    if let Some(e) = config_err {
        log::warn!("{}: {e}, using defaults", config::config_path(&project_dir).display());
    }

    scale::validate_scale_tables().context("scale tables")?;

    let audio = audio::start_audio(&config)?;
    let project = load_project(&project_dir, &config, &audio);

    let tracker = audio
        .input_sample_rate()
        .map(|rate| PitchTracker::new(config.fft_size, rate));
    let mut middle = Middle::new(project, tracker);

    terminal::enable_raw_mode()?;
    // real press/release detection where the terminal supports it
    let releases = terminal::supports_keyboard_enhancement().unwrap_or(false);
    if releases {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PushKeyboardEnhancementFlags(
                crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        );
    }
    let _guard = RawModeGuard; // auto drops when out of scope
    log::info!("key release events: {}", if releases { "yes" } else { "no, pads are taps" });

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let frame_interval = Duration::from_millis(config.frame_interval_ms);
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::new(releases);

    loop {
        if let Some(status) = audio.poll_status() {
            middle.apply_status(status);
        }
        audio.drain_input(|chunk| middle.push_input(chunk));
        middle.tick();

        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, blink_on);
        })?;

        for event in tui::input::poll_input(frame_interval, &mut tui_state)? {
            if event == InputEvent::Quit {
                // pick up anything the engine recorded since the last frame
                if let Some(status) = audio.poll_status() {
                    middle.apply_status(status);
                }
                if let Err(e) = persistence::save_project(&project_dir, &middle.project) {
                    log::error!("save failed: {e}");
                }
                drop(term);
                drop(audio);
                eprintln!("log: {}", log_file.display());
                return Ok(());
            }
            for cmd in middle.handle_input(event) {
                audio.send(cmd);
            }
        }
    }
}

// Scan the directory for samples, merge in the saved project and hand both
// the audio and the project to the engine.
fn load_project(project_dir: &Path, config: &Config, audio: &AudioHandle) -> ProjectState {
    let wav_paths = loader::index_wav_in_dir(project_dir).unwrap_or_else(|e| {
        log::warn!("could not list {}: {e}", project_dir.display());
        Vec::new()
    });

    let mut project = ProjectState::default();
    project.loops.bars = config.loop_bars;
    project.samples = loader::discover_slots(&wav_paths);
    match persistence::load_project(project_dir) {
        Ok(Some(saved)) => project.merge_saved(&saved, config.ppq),
        Ok(None) => log::info!("new project in {}", project_dir.display()),
        Err(e) => log::warn!("saved project ignored: {e}"),
    }

    for cmd in loader::load_slots(&mut project, project_dir, audio.sample_rate()) {
        audio.send(cmd);
    }
    audio.send(AudioCommand::LoadProject(Box::new(project.clone())));
    project
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
