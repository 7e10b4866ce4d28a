pub mod interview;
pub mod speech;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::{AppState, SharedState};
    use anyhow::Result;
    use async_trait::async_trait;
    use interview_core::interviewer::Interviewer;
    use interview_core::session::QaPair;
    use interview_core::{CandidateProfile, InterviewParams, SessionStore};
    use interview_speech::{Synthesizer, TranscribeConfig, Waveform};
    use secrecy::SecretString;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    pub struct StubInterviewer;

    #[async_trait]
    impl Interviewer for StubInterviewer {
        async fn next_question(
            &self,
            _params: &InterviewParams,
            _last_answer: &str,
            _first_answer: bool,
        ) -> Result<String> {
            Ok("What is a lifetime?".to_string())
        }

        async fn closing_feedback(
            &self,
            _profile: &CandidateProfile,
            _qa_pairs: &[QaPair],
        ) -> Result<String> {
            Ok("Good interview.".to_string())
        }

        async fn farewell(&self) -> Result<String> {
            Ok("Goodbye!".to_string())
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["stub-model".to_string()])
        }
    }

    pub struct StubSynthesizer;

    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            _speaker: &str,
            sample_rate: u32,
        ) -> Result<Waveform> {
            Ok(Waveform {
                samples: vec![0.0; 8],
                sample_rate,
            })
        }
    }

    pub fn test_state() -> SharedState {
        Arc::new(AppState {
            store: Mutex::new(SessionStore::new(16, chrono::Duration::minutes(60))),
            interviewer: Arc::new(StubInterviewer),
            synthesizer: Arc::new(StubSynthesizer),
            capture: Mutex::new(None),
            transcribe: TranscribeConfig::new(
                "wss://streaming.example.com".to_string(),
                SecretString::from("test-key".to_string()),
            ),
            chat_model: "stub-model".to_string(),
            default_speaker: "alloy".to_string(),
        })
    }
}
