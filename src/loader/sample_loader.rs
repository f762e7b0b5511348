use std::path::{Path, PathBuf};

use crate::audio::{next_sample_id, SampleBuffer, SampleId};
use crate::audio_api::AudioCommand;
use crate::error::{PadloopError, Result};
use crate::pipeline::project::{Availability, ProjectState, SampleSlot, SampleSource};
use crate::pitch::parse_note;
use crate::shared::NUM_SLOTS;

// Every .wav directly inside `dir`, sorted by file name
pub fn index_wav_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

// "piano_C#4" -> ("piano", 61); anything else is its own slot at C4
fn split_kit_name(stem: &str) -> (String, Option<u8>) {
    if let Some((kit, note)) = stem.rsplit_once('_') {
        if !kit.is_empty() {
            if let Ok(midi) = parse_note(note) {
                return (kit.to_string(), Some(midi));
            }
        }
    }
    (stem.to_string(), None)
}

/// Group WAV files into slots. `<kit>_<Note>.wav` files with the same kit
/// share a slot, one source per note.
pub fn discover_slots(paths: &[PathBuf]) -> Vec<SampleSlot> {
    let mut groups: Vec<(String, Vec<SampleSource>)> = Vec::new();
    for path in paths {
        let (Some(stem), Some(file)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        let (kit, note) = split_kit_name(stem);
        let source = SampleSource { path: file.to_string(), base_note: note.unwrap_or(60) };
        match (groups.iter().position(|(name, _)| *name == kit), note) {
            (Some(i), Some(_)) => groups[i].1.push(source),
            // a plain file whose name clashes with a kit keeps its full stem
            (Some(_), None) => groups.push((stem.to_string(), vec![source])),
            (None, _) => groups.push((kit, vec![source])),
        }
    }

    if groups.len() > NUM_SLOTS {
        log::warn!("{} samples found, only the first {NUM_SLOTS} get a slot", groups.len());
        groups.truncate(NUM_SLOTS);
    }
    groups
        .into_iter()
        .map(|(id, mut sources)| {
            sources.sort_by_key(|s| s.base_note);
            SampleSlot::new(id, sources)
        })
        .collect()
}

// Decode a WAV from disk, ready to register with the engine
pub fn load(path: &Path, target_rate: u32) -> Result<(SampleId, SampleBuffer)> {
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    Ok((next_sample_id(), buffer))
}

fn load_slot(project_dir: &Path, slot: &SampleSlot, target_rate: u32) -> Result<Vec<(SampleId, SampleBuffer)>> {
    if slot.sources.is_empty() {
        return Err(PadloopError::SampleUnavailable(format!("{}: no audio files", slot.id)));
    }
    slot.sources
        .iter()
        .map(|src| {
            let path = project_dir.join(&src.path);
            load(&path, target_rate).map_err(|e| {
                PadloopError::SampleUnavailable(format!("{}: {e}", path.display()))
            })
        })
        .collect()
}

/// Decode every slot's sources. Slots that fail are marked unavailable and
/// the rest carry on. Returns the commands that hand the audio over.
pub fn load_slots(project: &mut ProjectState, project_dir: &Path, target_rate: u32) -> Vec<AudioCommand> {
    let mut cmds = Vec::new();
    for slot in &mut project.samples {
        match load_slot(project_dir, slot, target_rate) {
            Ok(loaded) => {
                let ids = loaded.iter().map(|(id, _)| *id).collect();
                for (id, buffer) in loaded {
                    cmds.push(AudioCommand::RegisterSample { id, buffer });
                }
                log::info!("slot {}: {} source(s) ready", slot.id, slot.sources.len());
                slot.availability = Availability::Ready(ids);
            }
            Err(e) => {
                log::warn!("{e}");
                slot.availability = Availability::Unavailable(e.to_string());
            }
        }
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/songs/{n}"))).collect()
    }

    #[test]
    fn kit_files_share_a_slot() {
        let slots = discover_slots(&paths(&["kick.wav", "piano_C5.wav", "piano_C4.wav", "snare.wav"]));
        let ids: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["kick", "piano", "snare"]);

        let piano = &slots[1];
        let notes: Vec<u8> = piano.sources.iter().map(|s| s.base_note).collect();
        assert_eq!(notes, vec![60, 72]);
        assert_eq!(piano.settings.base_note, 60);
        assert_eq!(slots[0].sources[0].base_note, 60);
    }

    #[test]
    fn underscore_without_note_is_a_plain_name() {
        let slots = discover_slots(&paths(&["hi_hat.wav", "bass_Eb2.wav"]));
        assert_eq!(slots[0].id, "hi_hat");
        assert_eq!(slots[1].id, "bass");
        assert_eq!(slots[1].sources[0].base_note, 39);
    }

    #[test]
    fn slot_count_is_capped() {
        let names: Vec<String> = (0..20).map(|i| format!("s{i:02}.wav")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(discover_slots(&paths(&refs)).len(), NUM_SLOTS);
    }

    #[test]
    fn missing_file_marks_only_that_slot() {
        let dir = std::env::temp_dir().join(format!("padloop-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(dir.join("good.wav"), spec).unwrap();
        for _ in 0..100 {
            w.write_sample(1000i16).unwrap();
        }
        w.finalize().unwrap();

        let mut project = ProjectState::default();
        project.samples = discover_slots(&index_wav_in_dir(&dir).unwrap());
        project.samples.push(SampleSlot::new(
            "gone",
            vec![SampleSource { path: "gone.wav".into(), base_note: 60 }],
        ));

        let cmds = load_slots(&mut project, &dir, 48000);
        assert_eq!(cmds.len(), 1);
        assert!(project.samples[0].is_available());
        assert!(matches!(project.samples[1].availability, Availability::Unavailable(_)));
        std::fs::remove_dir_all(dir).ok();
    }
}
