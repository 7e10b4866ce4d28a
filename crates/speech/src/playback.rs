//! Blocking audio playback.
//!
//! The synthesized waveform is resampled to the output device rate, pushed
//! through a heap ring buffer into the cpal output stream, and the call
//! returns only after every sample has been consumed. No queuing, no
//! concurrency.

use crate::audio;
use crate::device;
use crate::synth::Waveform;
use anyhow::{Context, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// The size of each audio chunk for the output stream.
const OUTPUT_CHUNK_SIZE: usize = 1024;

/// Plays a waveform on the default output device, blocking until playback
/// completes. Intended to be called from `spawn_blocking`.
pub fn play_blocking(waveform: &Waveform) -> Result<()> {
    let output = device::get_or_default_output(None)?;
    let default_config = output
        .default_output_config()
        .context("failed to get default output config")?;
    let output_rate = default_config.sample_rate().0;
    let channel_count = default_config.channels() as usize;

    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(OUTPUT_CHUNK_SIZE as u32),
    };
    tracing::debug!("Using output device: {:?}", output.name()?);

    let samples = audio::resample(
        &waveform.samples,
        waveform.sample_rate as f64,
        output_rate as f64,
    )?;
    let total = samples.len();

    let buffer = HeapRb::<f32>::new(total.max(OUTPUT_CHUNK_SIZE * 2));
    let (mut producer, mut consumer) = buffer.split();
    for sample in &samples {
        if producer.try_push(*sample).is_err() {
            // Cannot happen with a buffer sized to the waveform.
            break;
        }
    }

    let played = Arc::new(AtomicUsize::new(0));
    let played_in_callback = played.clone();
    let data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut sample_index = 0;
        while sample_index < data.len() {
            let (sample, live) = match consumer.try_pop() {
                Some(sample) => (sample, true),
                None => (0.0, false),
            };
            if live {
                played_in_callback.fetch_add(1, Ordering::Relaxed);
            }
            // Left channel (ch:0).
            data[sample_index] = sample;
            sample_index += 1;
            // Right channel (ch:1), if it exists.
            if channel_count > 1 && sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            // Ignore other channels.
            sample_index += channel_count.saturating_sub(2);
        }
    };

    let stream = output.build_output_stream(
        &config,
        data_fn,
        move |err| tracing::error!("an error occurred on the output stream: {}", err),
        None,
    )?;
    stream.play()?;

    while played.load(Ordering::Relaxed) < total {
        std::thread::sleep(Duration::from_millis(20));
    }
    // Let the device-side buffer drain before tearing the stream down.
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);
    Ok(())
}
