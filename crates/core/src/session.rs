use crate::prompt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Assistant,
    User,
}

/// One utterance in the conversation, tagged with its speaker and timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Interview parameters supplied at session creation. Never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewParams {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub techstack: Vec<String>,
    #[serde(default = "default_interview_type", rename = "type")]
    pub interview_type: String,
    /// Pre-authored questions. When non-empty they are the mandatory question
    /// scope for the whole interview.
    #[serde(default)]
    pub questions: Vec<String>,
}

fn default_role() -> String {
    "Software Engineer".to_string()
}

fn default_level() -> String {
    "intermediate".to_string()
}

fn default_interview_type() -> String {
    "Technical".to_string()
}

impl Default for InterviewParams {
    fn default() -> Self {
        Self {
            role: default_role(),
            level: default_level(),
            techstack: Vec::new(),
            interview_type: default_interview_type(),
            questions: Vec::new(),
        }
    }
}

impl InterviewParams {
    /// The tech stack as a display string for prompt templates.
    pub fn techstack_str(&self) -> String {
        self.techstack.join(", ")
    }
}

/// What the candidate has told us about themselves so far. Everything here is
/// advisory: harvested by substring scans, never validated.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateProfile {
    pub applied_role: String,
    pub introduction: String,
    pub skills_mentioned: Vec<String>,
    pub experience_level: String,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

impl CandidateProfile {
    fn seeded_from(params: &InterviewParams) -> Self {
        Self {
            applied_role: params.role.clone(),
            introduction: String::new(),
            skills_mentioned: params.techstack.iter().map(|t| t.to_lowercase()).collect(),
            experience_level: params.level.clone(),
            key_strengths: Vec::new(),
            areas_for_improvement: Vec::new(),
        }
    }
}

/// A question/answer pair recorded for the closing feedback.
#[derive(Debug, Clone, Serialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Returned by [`InterviewSession::push_turn`] once the completion flag is set.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("interview already completed")]
pub struct SessionCompleted;

// Skill tags we recognize in candidate responses. Plain lowercase substring
// match, same contract as the rest of the profile harvesting.
const KNOWN_SKILLS: &[&str] = &[
    "python",
    "java",
    "javascript",
    "typescript",
    "rust",
    "react",
    "node",
    "angular",
    "vue",
    "aws",
    "azure",
    "docker",
    "kubernetes",
    "sql",
    "nosql",
    "mongodb",
    "postgres",
    "redis",
    "rest",
    "graphql",
    "ci/cd",
    "git",
    "agile",
    "scrum",
    "machine learning",
    "data structures",
    "algorithms",
    "system design",
    "microservices",
];

const EXPERIENCE_INDICATORS: &[(&str, &[&str])] = &[
    (
        "junior",
        &["junior", "entry level", "fresh graduate", "starting my career"],
    ),
    (
        "mid-level",
        &["mid level", "mid-level", "intermediate", "few years of experience"],
    ),
    (
        "senior",
        &["senior", "lead", "extensive experience", "many years"],
    ),
];

/// One candidate's ongoing interview conversation.
///
/// Invariants: the first stored turn is always the system/instruction turn;
/// turns are append-only; once the completion flag is set no further turn may
/// be appended.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: String,
    turns: Vec<Turn>,
    pub question_count: u32,
    pub started_at: DateTime<Utc>,
    is_completed: bool,
    pub profile: CandidateProfile,
    pub params: InterviewParams,
    qa_pairs: Vec<QaPair>,
}

impl InterviewSession {
    /// Creates a session with the system/instruction turn already in place.
    pub fn new(id: String, params: InterviewParams) -> Self {
        let profile = CandidateProfile::seeded_from(&params);
        let system = prompt::system_prompt(&params);
        let mut session = Self {
            id,
            turns: Vec::new(),
            question_count: 0,
            started_at: Utc::now(),
            is_completed: false,
            profile,
            params,
            qa_pairs: Vec::new(),
        };
        session.turns.push(Turn {
            role: Role::System,
            text: system,
            timestamp: Utc::now(),
        });
        session
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn qa_pairs(&self) -> &[QaPair] {
        &self.qa_pairs
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Marks the session terminal. Irreversible.
    pub fn complete(&mut self) {
        self.is_completed = true;
    }

    /// Appends a turn, refusing once the session is completed.
    pub fn push_turn(
        &mut self,
        role: Role,
        text: impl Into<String>,
    ) -> Result<(), SessionCompleted> {
        if self.is_completed {
            return Err(SessionCompleted);
        }
        self.turns.push(Turn {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// The text of the most recent assistant turn, i.e. the question the
    /// candidate is currently answering.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.text.as_str())
    }

    /// Number of user turns recorded so far.
    pub fn user_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }

    pub fn record_qa(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.qa_pairs.push(QaPair {
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        });
    }

    /// Scans a candidate response for skill tags, experience level hints and
    /// an introduction. Substring matching only.
    pub fn harvest_candidate_info(&mut self, response: &str) {
        let lower = response.to_lowercase();

        if lower.contains("applied for") || lower.contains("role") {
            self.profile.applied_role = response.to_string();
        }

        if lower.contains("introduction") || lower.contains("name") || lower.contains("experience")
        {
            self.profile.introduction = response.to_string();
            for (level, indicators) in EXPERIENCE_INDICATORS {
                if indicators.iter().any(|i| lower.contains(i)) {
                    self.profile.experience_level = level.to_string();
                    break;
                }
            }
        }

        for skill in KNOWN_SKILLS {
            if lower.contains(skill) && !self.profile.skills_mentioned.iter().any(|s| s == skill) {
                self.profile.skills_mentioned.push(skill.to_string());
            }
        }
    }

    /// Minutes elapsed since the session started, rounded to two decimals.
    pub fn duration_minutes(&self) -> f64 {
        let secs = (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0;
        (secs / 60.0 * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> InterviewParams {
        InterviewParams {
            role: "Backend Engineer".to_string(),
            techstack: vec!["Rust".to_string(), "Postgres".to_string()],
            ..InterviewParams::default()
        }
    }

    #[test]
    fn first_turn_is_the_system_turn() {
        let session = InterviewSession::new("s-1".to_string(), params());
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].role, Role::System);
    }

    #[test]
    fn push_turn_is_refused_after_completion() {
        let mut session = InterviewSession::new("s-1".to_string(), params());
        session.push_turn(Role::Assistant, "Welcome!").unwrap();
        session.complete();

        let before = session.turns().len();
        assert_eq!(
            session.push_turn(Role::User, "one more thing"),
            Err(SessionCompleted)
        );
        assert_eq!(session.turns().len(), before);
    }

    #[test]
    fn profile_is_seeded_from_params() {
        let session = InterviewSession::new("s-1".to_string(), params());
        assert_eq!(session.profile.applied_role, "Backend Engineer");
        assert_eq!(session.profile.experience_level, "intermediate");
        assert!(session.profile.skills_mentioned.contains(&"rust".to_string()));
    }

    #[test]
    fn harvest_picks_up_skills_and_experience() {
        let mut session = InterviewSession::new("s-1".to_string(), params());
        session.harvest_candidate_info(
            "My name is Sam, I am a senior engineer with experience in Docker and GraphQL.",
        );
        assert!(session.profile.skills_mentioned.contains(&"docker".to_string()));
        assert!(session.profile.skills_mentioned.contains(&"graphql".to_string()));
        assert_eq!(session.profile.experience_level, "senior");
        assert!(!session.profile.introduction.is_empty());
    }

    #[test]
    fn harvest_does_not_duplicate_skills() {
        let mut session = InterviewSession::new("s-1".to_string(), params());
        session.harvest_candidate_info("I use Docker. Docker is great.");
        session.harvest_candidate_info("Did I mention Docker?");
        let count = session
            .profile
            .skills_mentioned
            .iter()
            .filter(|s| s.as_str() == "docker")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn last_assistant_text_finds_the_open_question() {
        let mut session = InterviewSession::new("s-1".to_string(), params());
        session.push_turn(Role::Assistant, "Tell me about yourself.").unwrap();
        session.push_turn(Role::User, "I am Sam.").unwrap();
        session.push_turn(Role::Assistant, "What is ownership in Rust?").unwrap();
        assert_eq!(
            session.last_assistant_text(),
            Some("What is ownership in Rust?")
        );
    }
}
