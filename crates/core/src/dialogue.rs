//! The dialogue state machine: Created → InProgress → Completed.
//!
//! All LLM calls happen with the store lock released; turns re-validate the
//! session on re-lock so the append-after-completion invariant holds even if
//! another request completed the session in the meantime.

use crate::intent;
use crate::interviewer::Interviewer;
use crate::prompt;
use crate::session::{InterviewParams, Role};
use crate::store::SessionStore;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error("Invalid session ID")]
    UnknownSession,
    #[error("Interview already completed")]
    AlreadyCompleted,
    #[error("Response is required")]
    EmptyResponse,
}

#[derive(Debug)]
pub struct StartOutcome {
    pub session_id: String,
    pub message: String,
    pub question_number: u32,
}

#[derive(Debug)]
pub enum RespondOutcome {
    /// The interview continues with the next interviewer message.
    Next { message: String, question_number: u32 },
    /// End-intent was detected; the interview is over.
    Completed {
        farewell: String,
        feedback: String,
        total_questions: u32,
        duration_minutes: f64,
    },
}

#[derive(Debug)]
pub struct EndOutcome {
    pub message: String,
    pub feedback: String,
    pub total_questions: u32,
    pub duration_minutes: f64,
}

// Canned replies used when the LLM is unavailable. The session still advances
// as if the turn had been answered.
const FALLBACK_RESPONSES: &[&str] = &[
    "Thank you for sharing that. What would you say is the most challenging aspect?",
    "I appreciate your response. Could you elaborate briefly?",
    "That's interesting. What factors would you consider?",
];

const FALLBACK_FEEDBACK: &str = "Thank you for completing the interview. Your responses have \
     been recorded and will be reviewed by our team.";

const FALLBACK_FAREWELL: &str =
    "Thank you for your time today. This concludes the interview.";

const END_FAREWELL: &str = "Thank you for your participation in this interview. The session \
     has been concluded.";

/// Creates a session and appends the templated greeting as the first
/// assistant turn. No LLM call is involved.
pub async fn start(
    store: &Mutex<SessionStore>,
    params: InterviewParams,
) -> Result<StartOutcome, DialogueError> {
    let mut guard = store.lock().await;
    let session = guard.create(params);

    let greeting = prompt::greeting(&session.params);
    session
        .push_turn(Role::Assistant, greeting.clone())
        .map_err(|_| DialogueError::AlreadyCompleted)?;
    session.question_count += 1;

    tracing::info!(session_id = %session.id, role = %session.params.role, "interview started");
    Ok(StartOutcome {
        session_id: session.id.clone(),
        message: greeting,
        question_number: session.question_count,
    })
}

/// Advances the dialogue with a candidate response: either the interview ends
/// (end-intent) or the next interviewer message is produced.
pub async fn respond<I>(
    store: &Mutex<SessionStore>,
    interviewer: &I,
    session_id: &str,
    response: &str,
) -> Result<RespondOutcome, DialogueError>
where
    I: Interviewer + Send + Sync + ?Sized,
{
    let response = response.trim();
    if response.is_empty() {
        return Err(DialogueError::EmptyResponse);
    }

    if intent::wants_to_end(response) {
        return finish_on_end_intent(store, interviewer, session_id, response).await;
    }

    // Record the user turn under the lock, snapshotting what the LLM call
    // needs so the lock is not held across the await.
    let (params, first_answer, fallback_idx) = {
        let mut guard = store.lock().await;
        let session = guard
            .get_mut(session_id)
            .ok_or(DialogueError::UnknownSession)?;
        if session.is_completed() {
            return Err(DialogueError::AlreadyCompleted);
        }

        session.harvest_candidate_info(response);
        if let Some(question) = session.last_assistant_text().map(str::to_string) {
            session.record_qa(question, response);
        }
        session
            .push_turn(Role::User, response)
            .map_err(|_| DialogueError::AlreadyCompleted)?;

        (
            session.params.clone(),
            session.user_turn_count() == 1,
            session.question_count as usize % FALLBACK_RESPONSES.len(),
        )
    };

    let reply = match interviewer
        .next_question(&params, response, first_answer)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(%session_id, error = %e, "LLM call failed, substituting filler");
            FALLBACK_RESPONSES[fallback_idx].to_string()
        }
    };

    let mut guard = store.lock().await;
    let session = guard
        .get_mut(session_id)
        .ok_or(DialogueError::UnknownSession)?;
    session
        .push_turn(Role::Assistant, reply.clone())
        .map_err(|_| DialogueError::AlreadyCompleted)?;
    session.question_count += 1;

    Ok(RespondOutcome::Next {
        message: reply,
        question_number: session.question_count,
    })
}

async fn finish_on_end_intent<I>(
    store: &Mutex<SessionStore>,
    interviewer: &I,
    session_id: &str,
    response: &str,
) -> Result<RespondOutcome, DialogueError>
where
    I: Interviewer + Send + Sync + ?Sized,
{
    let (profile, qa_pairs) = {
        let mut guard = store.lock().await;
        let session = guard
            .get_mut(session_id)
            .ok_or(DialogueError::UnknownSession)?;
        if session.is_completed() {
            return Err(DialogueError::AlreadyCompleted);
        }
        if let Some(question) = session.last_assistant_text().map(str::to_string) {
            session.record_qa(question, response);
        }
        (session.profile.clone(), session.qa_pairs().to_vec())
    };

    let feedback = match interviewer.closing_feedback(&profile, &qa_pairs).await {
        Ok(feedback) => feedback,
        Err(e) => {
            tracing::warn!(%session_id, error = %e, "feedback generation failed, using fallback");
            FALLBACK_FEEDBACK.to_string()
        }
    };
    let farewell = match interviewer.farewell().await {
        Ok(farewell) => farewell,
        Err(e) => {
            tracing::warn!(%session_id, error = %e, "farewell generation failed, using fallback");
            FALLBACK_FAREWELL.to_string()
        }
    };

    let mut guard = store.lock().await;
    let session = guard
        .get_mut(session_id)
        .ok_or(DialogueError::UnknownSession)?;
    if session.is_completed() {
        return Err(DialogueError::AlreadyCompleted);
    }
    // The farewell turn goes in before the flag flips; appends are refused
    // afterwards.
    session
        .push_turn(Role::Assistant, farewell.clone())
        .map_err(|_| DialogueError::AlreadyCompleted)?;
    session.complete();

    tracing::info!(%session_id, questions = session.question_count, "interview completed");
    Ok(RespondOutcome::Completed {
        farewell,
        feedback,
        total_questions: session.question_count,
        duration_minutes: session.duration_minutes(),
    })
}

/// Explicit termination. Errors when the session is unknown or already
/// completed; no farewell turn is appended on this path.
pub async fn end<I>(
    store: &Mutex<SessionStore>,
    interviewer: &I,
    session_id: &str,
) -> Result<EndOutcome, DialogueError>
where
    I: Interviewer + Send + Sync + ?Sized,
{
    let (profile, qa_pairs) = {
        let guard = store.lock().await;
        let session = guard.get(session_id).ok_or(DialogueError::UnknownSession)?;
        if session.is_completed() {
            return Err(DialogueError::AlreadyCompleted);
        }
        (session.profile.clone(), session.qa_pairs().to_vec())
    };

    let feedback = match interviewer.closing_feedback(&profile, &qa_pairs).await {
        Ok(feedback) => feedback,
        Err(e) => {
            tracing::warn!(%session_id, error = %e, "feedback generation failed, using fallback");
            FALLBACK_FEEDBACK.to_string()
        }
    };

    let mut guard = store.lock().await;
    let session = guard
        .get_mut(session_id)
        .ok_or(DialogueError::UnknownSession)?;
    if session.is_completed() {
        return Err(DialogueError::AlreadyCompleted);
    }
    session.complete();

    tracing::info!(%session_id, "interview force-completed");
    Ok(EndOutcome {
        message: END_FAREWELL.to_string(),
        feedback,
        total_questions: session.question_count,
        duration_minutes: session.duration_minutes(),
    })
}
