pub mod sample_loader;

pub use sample_loader::{discover_slots, index_wav_in_dir, load, load_slots};
