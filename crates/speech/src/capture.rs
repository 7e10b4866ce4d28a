//! Speech-capture sessions.
//!
//! One [`CaptureHandle`] exists per capture session. The whole flag bundle
//! (streaming, cancelled, start time, last activity) lives behind a single
//! lock, and cancellation additionally wakes waiters through a `Notify`, so
//! the HTTP handler, the watchdog task and the audio callback never race on
//! loose booleans.

use crate::audio;
use crate::device;
use crate::transcribe::{self, TranscribeConfig, TranscribeEvent, TRANSCRIBE_SAMPLE_RATE};
use anyhow::{Context, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, StreamTrait};
use rubato::Resampler;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Capture stops after this much time without recognized speech.
pub const SILENCE_TIMEOUT: Duration = Duration::from_secs(5);
/// Hard cap on a single capture session.
pub const MAX_CAPTURE: Duration = Duration::from_secs(30);

/// The size of each audio chunk drained from the microphone input stream.
const INPUT_CHUNK_SIZE: usize = 1024;

#[derive(Debug)]
struct CaptureState {
    streaming: bool,
    cancelled: bool,
    started_at: Instant,
    last_activity: Instant,
}

/// Shared handle to one capture session's state.
#[derive(Clone)]
pub struct CaptureHandle {
    state: Arc<Mutex<CaptureState>>,
    cancel: Arc<Notify>,
}

impl CaptureHandle {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: Arc::new(Mutex::new(CaptureState {
                streaming: true,
                cancelled: false,
                started_at: now,
                last_activity: now,
            })),
            cancel: Arc::new(Notify::new()),
        }
    }

    /// Cancels the capture and wakes anything waiting on it.
    pub fn stop(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.cancelled = true;
            state.streaming = false;
        }
        self.cancel.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().map(|s| s.cancelled).unwrap_or(true)
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().map(|s| s.streaming).unwrap_or(false)
    }

    /// Records speech activity, deferring the silence timeout.
    pub fn touch_activity(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.last_activity = Instant::now();
        }
    }

    /// Marks the capture finished without flagging it as cancelled.
    fn finish(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.streaming = false;
        }
        self.cancel.notify_waiters();
    }

    /// Resolves once the capture has been cancelled.
    pub async fn wait_cancelled(&self) {
        loop {
            let notified = self.cancel.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    fn timeout_reason(&self, silence_timeout: Duration, max_duration: Duration) -> Option<&'static str> {
        let state = self.state.lock().ok()?;
        if !state.streaming || state.cancelled {
            return None;
        }
        if state.last_activity.elapsed() >= silence_timeout {
            Some("silence timeout")
        } else if state.started_at.elapsed() >= max_duration {
            Some("max capture time")
        } else {
            None
        }
    }
}

impl Default for CaptureHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the watchdog for a capture session: polls every 100 ms and cancels
/// the capture once the silence window or the total-time cap is exceeded.
pub fn spawn_watchdog(
    handle: CaptureHandle,
    silence_timeout: Duration,
    max_duration: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(100));
        loop {
            tick.tick().await;
            if handle.is_cancelled() || !handle.is_streaming() {
                break;
            }
            if let Some(reason) = handle.timeout_reason(silence_timeout, max_duration) {
                tracing::info!(%reason, "watchdog stopping capture");
                handle.stop();
                break;
            }
        }
    })
}

/// Runs one speech-capture session to completion: microphone chunks stream to
/// the transcription provider until the watchdog fires, the handle is stopped,
/// or the provider terminates. Returns the final transcript, if any.
pub async fn run_capture(
    config: &TranscribeConfig,
    handle: CaptureHandle,
) -> Result<Option<String>> {
    let client = transcribe::connect(config.clone())
        .await
        .context("failed to connect to transcription service")?;
    let mut events = client.server_events()?;

    // Collects transcripts and feeds speech activity back into the handle.
    let ev_handle = handle.clone();
    let collector = tokio::spawn(async move {
        let mut latest = String::new();
        let mut finalized = String::new();
        loop {
            match events.recv().await {
                Ok(TranscribeEvent::Begin { id }) => {
                    tracing::info!(%id, "transcription session started");
                }
                Ok(TranscribeEvent::Turn {
                    transcript,
                    end_of_turn,
                }) => {
                    ev_handle.touch_activity();
                    if !transcript.trim().is_empty() {
                        tracing::debug!(%transcript, end_of_turn, "transcript update");
                        latest = transcript.clone();
                        if end_of_turn {
                            finalized = transcript;
                        }
                    }
                }
                Ok(TranscribeEvent::Termination {
                    audio_duration_seconds,
                }) => {
                    tracing::info!(audio_duration_seconds, "transcription session terminated");
                    break;
                }
                Ok(TranscribeEvent::Close { reason }) => {
                    tracing::info!(?reason, "transcription connection closed");
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "transcription event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
        if finalized.is_empty() { latest } else { finalized }
    });

    let watchdog = spawn_watchdog(handle.clone(), SILENCE_TIMEOUT, MAX_CAPTURE);

    // The microphone thread owns the cpal stream for the life of the capture.
    let (audio_tx, mut audio_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(64);
    let mic_handle = handle.clone();
    let mic_thread = tokio::task::spawn_blocking(move || run_microphone(mic_handle, audio_tx));

    // Forward audio frames, checking the cancellation signal before each one.
    loop {
        tokio::select! {
            chunk = audio_rx.recv() => {
                match chunk {
                    Some(pcm) => {
                        if handle.is_cancelled() {
                            break;
                        }
                        if let Err(e) = client.send_audio(pcm).await {
                            tracing::error!("failed to forward audio: {}", e);
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = handle.wait_cancelled() => break,
        }
    }

    // Ask the provider to finalize, then drop the client so the socket closes
    // and the collector can settle.
    if let Err(e) = client.terminate().await {
        tracing::debug!("terminate after capture failed: {}", e);
    }
    drop(client);

    let transcript = match tokio::time::timeout(Duration::from_secs(5), collector).await {
        Ok(Ok(transcript)) => transcript,
        Ok(Err(e)) => {
            tracing::error!("transcript collector failed: {}", e);
            String::new()
        }
        Err(_) => {
            tracing::warn!("timed out waiting for the final transcript");
            String::new()
        }
    };

    handle.finish();
    let mic_result = mic_thread.await;
    watchdog.abort();

    if transcript.trim().is_empty() {
        // Surface a device failure instead of pretending nothing was said.
        if let Ok(Err(e)) = mic_result {
            return Err(e);
        }
        Ok(None)
    } else {
        Ok(Some(transcript))
    }
}

/// Blocking microphone loop: downmix to mono, resample to the provider rate,
/// and push PCM16 frames into the channel until the capture ends.
fn run_microphone(handle: CaptureHandle, audio_tx: tokio::sync::mpsc::Sender<Vec<u8>>) -> Result<()> {
    let input = device::get_or_default_input(None)?;
    let default_config = input
        .default_input_config()
        .context("failed to get default input config")?;
    let channel_count = default_config.channels() as usize;
    let input_rate = default_config.sample_rate().0 as f64;

    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(INPUT_CHUNK_SIZE as u32),
    };
    tracing::info!("Using input device: {:?}", input.name()?);

    let mut resampler =
        audio::create_resampler(input_rate, TRANSCRIBE_SAMPLE_RATE as f64, INPUT_CHUNK_SIZE)?;
    let mut pending: VecDeque<f32> = VecDeque::with_capacity(INPUT_CHUNK_SIZE * 2);

    let cb_handle = handle.clone();
    let data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        if cb_handle.is_cancelled() {
            return;
        }
        pending.extend(audio::downmix(data, channel_count));
        while pending.len() >= INPUT_CHUNK_SIZE {
            let chunk: Vec<f32> = pending.drain(..INPUT_CHUNK_SIZE).collect();
            if let Ok(resampled) = resampler.process(&[chunk.as_slice()], None) {
                if let Some(samples) = resampled.first() {
                    if let Err(e) = audio_tx.try_send(audio::pcm16_bytes(samples)) {
                        tracing::warn!("failed to send audio chunk: {:?}", e);
                    }
                }
            }
        }
    };

    let stream = input.build_input_stream(
        &config,
        data_fn,
        move |err| tracing::error!("an error occurred on the input stream: {}", err),
        None,
    )?;
    stream.play()?;

    while handle.is_streaming() && !handle.is_cancelled() {
        std::thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flips_the_whole_bundle() {
        let handle = CaptureHandle::new();
        assert!(handle.is_streaming());
        assert!(!handle.is_cancelled());

        handle.stop();
        assert!(!handle.is_streaming());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn watchdog_cancels_after_silence() {
        let handle = CaptureHandle::new();
        let watchdog = spawn_watchdog(
            handle.clone(),
            Duration::from_millis(150),
            Duration::from_secs(10),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(handle.is_cancelled(), "silence timeout should cancel");
        watchdog.await.unwrap();
    }

    #[tokio::test]
    async fn watchdog_cancels_at_the_hard_cap_despite_activity() {
        let handle = CaptureHandle::new();
        let watchdog = spawn_watchdog(
            handle.clone(),
            Duration::from_secs(10),
            Duration::from_millis(200),
        );

        for _ in 0..6 {
            handle.touch_activity();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(handle.is_cancelled(), "hard cap should cancel");
        watchdog.await.unwrap();
    }

    #[tokio::test]
    async fn activity_defers_the_silence_timeout() {
        let handle = CaptureHandle::new();
        let _watchdog = spawn_watchdog(
            handle.clone(),
            Duration::from_millis(400),
            Duration::from_secs(10),
        );

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(120)).await;
            handle.touch_activity();
        }
        assert!(
            !handle.is_cancelled(),
            "activity within the window should keep the capture alive"
        );
        handle.stop();
    }

    #[tokio::test]
    async fn wait_cancelled_resolves_after_stop() {
        let handle = CaptureHandle::new();
        let waiter = handle.clone();
        let wait = tokio::spawn(async move { waiter.wait_cancelled().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("wait_cancelled should resolve")
            .unwrap();
    }
}
