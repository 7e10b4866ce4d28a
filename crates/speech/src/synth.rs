use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

/// Decoded audio ready for playback.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

// Anything that can turn text into speech. Abstracted so the TTS route can be
// exercised without a network or a sound card.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Synthesizer {
    /// text + speaker id + preferred sample rate → waveform. The returned
    /// waveform reports its actual sample rate, which may differ from the
    /// preference.
    async fn synthesize(&self, text: &str, speaker: &str, sample_rate: u32) -> Result<Waveform>;
}

/// Speech-synthesis client for an OpenAI-compatible `/v1/audio/speech`
/// endpoint. The response is a WAV payload.
pub struct SynthClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl SynthClient {
    pub fn new(api_key: SecretString, model: String) -> Self {
        Self::with_base_url(api_key, model, "https://api.openai.com".to_string())
    }

    pub fn with_base_url(api_key: SecretString, model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl Synthesizer for SynthClient {
    async fn synthesize(&self, text: &str, speaker: &str, _sample_rate: u32) -> Result<Waveform> {
        let body = serde_json::json!({
            "model": self.model,
            "voice": speaker,
            "input": text,
            "response_format": "wav"
        });

        let bytes = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        decode_wav(&bytes)
    }
}

/// Decodes a WAV payload into normalized mono f32 samples.
pub fn decode_wav(bytes: &[u8]) -> Result<Waveform> {
    let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Float, 32) => {
            reader.samples::<f32>().collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(anyhow::anyhow!(
                "unsupported WAV encoding: {:?} at {} bits",
                format,
                bits
            ));
        }
    };

    let samples = if spec.channels > 1 {
        crate::audio::downmix(&samples, spec.channels as usize)
    } else {
        samples
    };

    Ok(Waveform {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_mono_pcm16_wav() {
        let bytes = wav_bytes(&[0, 16384, -16384, 32767], 1, 24_000);
        let waveform = decode_wav(&bytes).unwrap();

        assert_eq!(waveform.sample_rate, 24_000);
        assert_eq!(waveform.samples.len(), 4);
        assert!((waveform.samples[1] - 0.5).abs() < 1e-3);
        assert!((waveform.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn stereo_wav_is_downmixed_to_mono() {
        let bytes = wav_bytes(&[16384, -16384, 8192, 8192], 2, 22_050);
        let waveform = decode_wav(&bytes).unwrap();

        assert_eq!(waveform.samples.len(), 2);
        assert!(waveform.samples[0].abs() < 1e-3);
        assert!((waveform.samples[1] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(decode_wav(b"definitely not a wav file").is_err());
    }
}
