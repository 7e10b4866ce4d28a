//! Streaming transcription client.
//!
//! Thin websocket client for the realtime speech-to-text provider: audio goes
//! up as binary PCM16 frames, transcript events come back as JSON. The socket
//! is split into a writer task fed by an mpsc channel and a reader task that
//! broadcasts parsed events to any number of subscribers.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

/// Sample rate the transcription provider expects on the wire.
pub const TRANSCRIBE_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    pub host: String,
    pub api_key: SecretString,
    pub sample_rate: u32,
}

impl TranscribeConfig {
    pub fn new(host: String, api_key: SecretString) -> Self {
        Self {
            host,
            api_key,
            sample_rate: TRANSCRIBE_SAMPLE_RATE,
        }
    }
}

/// Server-side transcription events.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TranscribeEvent {
    Begin {
        #[serde(default)]
        id: String,
    },
    Turn {
        #[serde(default)]
        transcript: String,
        #[serde(default)]
        end_of_turn: bool,
    },
    Termination {
        #[serde(default)]
        audio_duration_seconds: f64,
    },
    /// Synthesized locally when the websocket closes.
    Close { reason: Option<String> },
}

/// Messages the client can push to the provider.
#[derive(Debug)]
pub enum ClientCommand {
    /// A frame of little-endian PCM16 audio.
    Audio(Vec<u8>),
    /// Ask the provider to finalize and close the session.
    Terminate,
}

pub type ClientTx = tokio::sync::mpsc::Sender<ClientCommand>;
type ServerTx = tokio::sync::broadcast::Sender<TranscribeEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<TranscribeEvent>;

pub struct TranscribeClient {
    capacity: usize,
    config: TranscribeConfig,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
}

impl TranscribeClient {
    fn new(capacity: usize, config: TranscribeConfig) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let request = build_request(&self.config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx.clone());
        self.s_tx = Some(s_tx.clone());

        // Writer: drains client commands onto the socket.
        tokio::spawn(async move {
            while let Some(command) = c_rx.recv().await {
                let message = match command {
                    ClientCommand::Audio(pcm) => Message::Binary(pcm),
                    ClientCommand::Terminate => {
                        Message::Text(r#"{"type":"Terminate"}"#.to_string())
                    }
                };
                if let Err(e) = write.send(message).await {
                    tracing::error!("failed to send message: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        // Reader: parses server JSON and fans events out to subscribers.
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<TranscribeEvent>(&text) {
                            Ok(event) => {
                                if let Err(e) = s_tx.send(event) {
                                    tracing::debug!("no event subscribers: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!(
                                    "failed to deserialize event: {}, text=> {:?}",
                                    e,
                                    text
                                );
                            }
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("transcription connection closed: {:?}", reason);
                        let close_event = TranscribeEvent::Close {
                            reason: reason.map(|v| format!("{:?}", v)),
                        };
                        if let Err(e) = s_tx.send(close_event) {
                            tracing::debug!("no event subscribers for close: {}", e);
                        }
                        break;
                    }
                    _ => {}
                }
            }
            drop(c_tx);
            drop(s_tx);
        });
        Ok(())
    }

    /// A receiver for server-side transcription events.
    pub fn server_events(&self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    async fn send_command(&self, command: ClientCommand) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(command).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    /// Pushes one frame of PCM16 audio to the provider.
    pub async fn send_audio(&self, pcm: Vec<u8>) -> Result<()> {
        self.send_command(ClientCommand::Audio(pcm)).await
    }

    /// Asks the provider to finalize the session and close. Dropping the
    /// client afterwards closes the socket without waiting for a provider
    /// round-trip.
    pub async fn terminate(&self) -> Result<()> {
        self.send_command(ClientCommand::Terminate).await
    }
}

/// Connects a client with default channel capacity.
pub async fn connect(config: TranscribeConfig) -> Result<TranscribeClient> {
    let mut client = TranscribeClient::new(1024, config);
    client.connect().await?;
    Ok(client)
}

fn build_request(config: &TranscribeConfig) -> Result<Request> {
    let mut request = format!(
        "{}/v3/ws?sample_rate={}",
        config.host, config.sample_rate
    )
    .into_client_request()?;
    request
        .headers_mut()
        .insert("Authorization", config.api_key.expose_secret().parse()?);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_events_deserialize() {
        let json = r#"{"type":"Turn","transcript":"hello world","end_of_turn":true,"turn_is_formatted":true}"#;
        match serde_json::from_str::<TranscribeEvent>(json).unwrap() {
            TranscribeEvent::Turn {
                transcript,
                end_of_turn,
            } => {
                assert_eq!(transcript, "hello world");
                assert!(end_of_turn);
            }
            other => panic!("expected Turn, got {:?}", other),
        }
    }

    #[test]
    fn begin_and_termination_events_deserialize() {
        let begin = r#"{"type":"Begin","id":"abc-123","expires_at":171234}"#;
        assert!(matches!(
            serde_json::from_str::<TranscribeEvent>(begin).unwrap(),
            TranscribeEvent::Begin { .. }
        ));

        let term = r#"{"type":"Termination","audio_duration_seconds":12.5}"#;
        match serde_json::from_str::<TranscribeEvent>(term).unwrap() {
            TranscribeEvent::Termination {
                audio_duration_seconds,
            } => assert!((audio_duration_seconds - 12.5).abs() < f64::EPSILON),
            other => panic!("expected Termination, got {:?}", other),
        }
    }

    #[test]
    fn unknown_event_types_are_an_error_not_a_panic() {
        let json = r#"{"type":"SomethingNew","payload":1}"#;
        assert!(serde_json::from_str::<TranscribeEvent>(json).is_err());
    }

    #[test]
    fn request_carries_the_sample_rate_and_auth_header() {
        let config = TranscribeConfig::new(
            "wss://streaming.example.com".to_string(),
            SecretString::from("key-123".to_string()),
        );
        let request = build_request(&config).unwrap();
        assert!(request.uri().to_string().contains("sample_rate=16000"));
        assert!(request.headers().contains_key("Authorization"));
    }
}
