//! Speech endpoints: synthesis with local playback, and speech-to-text
//! capture sessions.
//!
//! Runtime failures on these paths are reported as `{status: "error"}`
//! payloads with HTTP 200, never as 5xx.

use crate::state::SharedState;
use axum::Json;
use axum::extract::State;
use interview_speech::{CaptureHandle, playback, run_capture};
use serde::Deserialize;
use serde_json::json;

/// Sample rate requested from the synthesizer.
const SYNTH_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default = "default_tts_text")]
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

fn default_tts_text() -> String {
    "Hello from the interview server".to_string()
}

/// `POST /tts`: synthesizes the text and plays it on the server's output
/// device, blocking until playback completes.
pub async fn tts(
    State(state): State<SharedState>,
    payload: Option<Json<TtsRequest>>,
) -> Json<serde_json::Value> {
    let req = payload.map(|Json(r)| r).unwrap_or(TtsRequest {
        text: default_tts_text(),
        speaker: None,
    });
    let speaker = req
        .speaker
        .unwrap_or_else(|| state.default_speaker.clone());

    match synthesize_and_play(&state, &req.text, &speaker).await {
        Ok(()) => Json(json!({
            "status": "ok",
            "text": req.text,
            "speaker": speaker,
        })),
        Err(e) => {
            tracing::error!("TTS failed: {:#}", e);
            Json(json!({
                "status": "error",
                "message": format!("Speech synthesis error: {e}"),
            }))
        }
    }
}

async fn synthesize_and_play(state: &SharedState, text: &str, speaker: &str) -> anyhow::Result<()> {
    let waveform = state
        .synthesizer
        .synthesize(text, speaker, SYNTH_SAMPLE_RATE)
        .await?;
    tokio::task::spawn_blocking(move || playback::play_blocking(&waveform)).await??;
    Ok(())
}

/// `GET /stt`: runs a speech-capture session to completion and returns the
/// transcription. The watchdog stops a stalled session on its own.
pub async fn stt(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let handle = {
        let mut slot = state.capture.lock().await;
        if slot.as_ref().is_some_and(|h| h.is_streaming()) {
            return Json(json!({
                "status": "error",
                "message": "Speech capture already in progress",
            }));
        }
        let handle = CaptureHandle::new();
        *slot = Some(handle.clone());
        handle
    };

    tracing::info!("starting speech capture");
    let result = run_capture(&state.transcribe, handle).await;
    state.capture.lock().await.take();

    match result {
        Ok(Some(transcription)) => {
            tracing::info!(%transcription, "capture finished");
            Json(json!({ "status": "ok", "transcription": transcription }))
        }
        Ok(None) => Json(json!({
            "status": "error",
            "message": "No speech detected",
        })),
        Err(e) => {
            tracing::error!("STT failed: {:#}", e);
            Json(json!({
                "status": "error",
                "message": format!("Speech recognition error: {e}"),
            }))
        }
    }
}

/// `POST /stt/stop`: cancels an in-progress capture. Stopping while idle is
/// a no-op that still reports success.
pub async fn stt_stop(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let slot = state.capture.lock().await;
    match slot.as_ref() {
        Some(handle) if handle.is_streaming() => {
            tracing::info!("stopping speech capture");
            handle.stop();
            Json(json!({
                "status": "ok",
                "message": "Speech recognition stopped",
            }))
        }
        _ => Json(json!({
            "status": "ok",
            "message": "No capture in progress",
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::test_state;

    #[tokio::test]
    async fn stopping_while_idle_is_a_successful_no_op() {
        let state = test_state();
        let Json(body) = stt_stop(State(state)).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn stopping_cancels_an_active_capture() {
        let state = test_state();
        let handle = CaptureHandle::new();
        *state.capture.lock().await = Some(handle.clone());

        let Json(body) = stt_stop(State(state.clone())).await;
        assert_eq!(body["status"], "ok");
        assert!(handle.is_cancelled());
        assert!(!handle.is_streaming());
    }

    #[tokio::test]
    async fn second_capture_is_refused_while_one_is_running() {
        let state = test_state();
        *state.capture.lock().await = Some(CaptureHandle::new());

        let Json(body) = stt(State(state)).await;
        assert_eq!(body["status"], "error");
    }
}
