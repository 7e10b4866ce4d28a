use crate::prompt;
use crate::session::{CandidateProfile, InterviewParams, QaPair};
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

// The `Interviewer` trait is the contract for anything that can drive the
// interview dialogue. The dialogue state machine depends on this abstraction
// rather than a concrete HTTP client, so unit tests exercise the full state
// machine with `mockall`'s generated `MockInterviewer` and no network calls.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Interviewer {
    /// The interviewer's next message given the candidate's latest answer.
    /// `first_answer` selects the post-introduction prompt variant so the
    /// opening question is not re-asked.
    async fn next_question(
        &self,
        params: &InterviewParams,
        last_answer: &str,
        first_answer: bool,
    ) -> Result<String>;

    /// Structured feedback generated once an interview ends.
    async fn closing_feedback(
        &self,
        profile: &CandidateProfile,
        qa_pairs: &[QaPair],
    ) -> Result<String>;

    /// One-line farewell spoken when the candidate ends the interview.
    async fn farewell(&self) -> Result<String>;

    /// Models available from the backing provider.
    async fn list_models(&self) -> Result<Vec<String>>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct InterviewerClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl InterviewerClient {
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

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, prompt: &str, temperature: f64) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": temperature
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let answer = resp
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
            .message
            .content
            .trim()
            .to_string();
        Ok(answer)
    }
}

#[async_trait]
impl Interviewer for InterviewerClient {
    async fn next_question(
        &self,
        params: &InterviewParams,
        last_answer: &str,
        first_answer: bool,
    ) -> Result<String> {
        let prompt = if first_answer {
            prompt::first_question(params)
        } else {
            prompt::follow_up(params, last_answer)
        };
        self.chat(&prompt, 0.7).await
    }

    async fn closing_feedback(
        &self,
        profile: &CandidateProfile,
        qa_pairs: &[QaPair],
    ) -> Result<String> {
        let prompt = prompt::closing_feedback(profile, qa_pairs);
        self.chat(&prompt, 0.3).await
    }

    async fn farewell(&self) -> Result<String> {
        self.chat(prompt::farewell(), 0.5).await
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json::<ModelList>()
            .await?;
        Ok(resp.data.into_iter().map(|m| m.id).collect())
    }
}

/// Walks a candidate-model list and returns the first model that answers a
/// trivial prompt, or `None` when none of them do.
pub async fn find_working_model(
    api_key: &SecretString,
    base_url: &str,
    candidates: &[String],
) -> Option<String> {
    let client = Client::new();
    for model in candidates {
        tracing::info!(%model, "probing chat model");
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "user", "content": "Reply with the single word: ready." }
            ],
            "max_tokens": 8
        });
        let resp = client
            .post(format!("{base_url}/v1/chat/completions"))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await;
        match resp {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<ChatResponse>().await {
                    Ok(parsed)
                        if parsed
                            .choices
                            .first()
                            .is_some_and(|c| !c.message.content.is_empty()) =>
                    {
                        tracing::info!(%model, "selected chat model");
                        return Some(model.clone());
                    }
                    Ok(_) => tracing::warn!(%model, "model returned an empty completion"),
                    Err(e) => tracing::warn!(%model, error = %e, "failed to parse completion"),
                }
            }
            Ok(resp) => {
                tracing::warn!(%model, status = %resp.status(), "model probe rejected");
            }
            Err(e) => {
                tracing::warn!(%model, error = %e, "model probe failed");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Live integration test against the real API. Ignored by default so
    // `cargo test` runs without a key; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_farewell_live() {
        dotenvy::dotenv_override().ok();
        let api_key: SecretString = env::var("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY not set")
            .into();
        let client = InterviewerClient::new(api_key, "gpt-4o-mini".to_string());

        let farewell = client.farewell().await.expect("farewell call failed");
        assert!(!farewell.is_empty());
    }

    // Live integration test. See the note on `test_farewell_live`.
    #[tokio::test]
    #[ignore]
    async fn test_list_models_live() {
        dotenvy::dotenv_override().ok();
        let api_key: SecretString = env::var("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY not set")
            .into();
        let client = InterviewerClient::new(api_key, "gpt-4o-mini".to_string());

        let models = client.list_models().await.expect("list_models failed");
        assert!(!models.is_empty());
    }
}
