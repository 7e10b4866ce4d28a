//! PCM conversion and resampling helpers shared by the capture and playback
//! paths.

use anyhow::Result;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits samples into fixed-size chunks, zero-padding the last one.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Resamples a whole buffer between two rates. A no-op when the rates match.
pub fn resample(samples: &[f32], in_rate: f64, out_rate: f64) -> Result<Vec<f32>> {
    if (in_rate - out_rate).abs() < f64::EPSILON {
        return Ok(samples.to_vec());
    }
    const CHUNK_SIZE: usize = 1024;
    let mut resampler = create_resampler(in_rate, out_rate, CHUNK_SIZE)?;
    let mut out = Vec::with_capacity((samples.len() as f64 * out_rate / in_rate) as usize + CHUNK_SIZE);
    for chunk in split_for_chunks(samples, CHUNK_SIZE) {
        let processed = resampler.process(&[chunk.as_slice()], None)?;
        if let Some(channel) = processed.first() {
            out.extend_from_slice(channel);
        }
    }
    Ok(out)
}

/// Averages interleaved multi-channel audio down to mono. Mono input is
/// returned as-is.
pub fn downmix(data: &[f32], channel_count: usize) -> Vec<f32> {
    if channel_count <= 1 {
        return data.to_vec();
    }
    data.chunks(channel_count)
        .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
        .collect()
}

/// Converts f32 samples to little-endian PCM16 bytes for the wire.
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&sample| {
            let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            v.to_le_bytes()
        })
        .collect()
}

/// Converts i16 PCM samples to normalized f32 samples.
pub fn samples_from_i16(pcm: &[i16]) -> Vec<f32> {
    pcm.iter().map(|&v| v as f32 / 32768.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_round_trips_within_quantization_error() {
        let samples = vec![0.0f32, 0.5, -0.5, 0.99, -0.99];
        let bytes = pcm16_bytes(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);

        let decoded: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        for (orig, back) in samples.iter().zip(samples_from_i16(&decoded)) {
            assert!((orig - back).abs() < 1.0 / 32000.0, "{orig} vs {back}");
        }
    }

    #[test]
    fn downmix_averages_stereo_frames() {
        let stereo = vec![0.2f32, 0.4, -1.0, 1.0];
        let mono = downmix(&stereo, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < f32::EPSILON);
        assert!(mono[1].abs() < f32::EPSILON);
    }

    #[test]
    fn split_pads_the_tail_chunk() {
        let chunks = split_for_chunks(&[1.0; 5], 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn resample_is_identity_for_equal_rates() {
        let samples = vec![0.1f32, 0.2, 0.3];
        let out = resample(&samples, 16_000.0, 16_000.0).unwrap();
        assert_eq!(out, samples);
    }
}
