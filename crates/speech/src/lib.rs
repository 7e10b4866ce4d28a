pub mod audio;
pub mod capture;
pub mod device;
pub mod playback;
pub mod synth;
pub mod transcribe;

pub use capture::{CaptureHandle, MAX_CAPTURE, SILENCE_TIMEOUT, run_capture};
pub use synth::{SynthClient, Synthesizer, Waveform};
pub use transcribe::{TranscribeConfig, TranscribeEvent, TRANSCRIBE_SAMPLE_RATE};
