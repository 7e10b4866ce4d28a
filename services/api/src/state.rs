use interview_core::{Interviewer, SessionStore};
use interview_speech::{CaptureHandle, Synthesizer, TranscribeConfig};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state behind every handler.
pub struct AppState {
    pub store: Mutex<SessionStore>,
    pub interviewer: Arc<dyn Interviewer + Send + Sync>,
    pub synthesizer: Arc<dyn Synthesizer + Send + Sync>,
    /// The active speech capture, if one is running. A per-session handle
    /// rather than process-wide flags, so stopping is always scoped to the
    /// capture it belongs to.
    pub capture: Mutex<Option<CaptureHandle>>,
    pub transcribe: TranscribeConfig,
    pub chat_model: String,
    pub default_speaker: String,
}

pub type SharedState = Arc<AppState>;
