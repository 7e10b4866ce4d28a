//! Interview dialogue endpoints.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use interview_core::dialogue::{self, RespondOutcome};
use interview_core::{CandidateProfile, DialogueError, InterviewParams};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub message: String,
    pub question_number: u32,
    pub status: &'static str,
    pub has_question_limit: bool,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub response: String,
}

/// `POST /api/start-interview`
pub async fn start_interview(
    State(state): State<SharedState>,
    payload: Option<Json<InterviewParams>>,
) -> Result<Json<StartResponse>, ApiError> {
    let params = payload.map(|Json(p)| p).unwrap_or_default();
    let outcome = dialogue::start(&state.store, params).await?;

    Ok(Json(StartResponse {
        session_id: outcome.session_id,
        message: outcome.message,
        question_number: outcome.question_number,
        status: "started",
        has_question_limit: false,
    }))
}

/// `POST /api/respond`
pub async fn respond(
    State(state): State<SharedState>,
    Json(req): Json<RespondRequest>,
) -> Result<Response, ApiError> {
    let outcome = dialogue::respond(
        &state.store,
        state.interviewer.as_ref(),
        &req.session_id,
        &req.response,
    )
    .await?;

    let profile = profile_snapshot(&state, &req.session_id).await;
    let body = match outcome {
        RespondOutcome::Next {
            message,
            question_number,
        } => json!({
            "session_id": req.session_id,
            "message": message,
            "question_number": question_number,
            "status": "in_progress",
            "candidate_info": profile,
            "has_question_limit": false,
        }),
        RespondOutcome::Completed {
            farewell,
            feedback,
            total_questions,
            duration_minutes,
        } => json!({
            "session_id": req.session_id,
            "message": farewell,
            "feedback": feedback,
            "question_number": total_questions,
            "total_questions_asked": total_questions,
            "status": "completed",
            "is_final_message": true,
            "candidate_info": profile,
            "duration_minutes": duration_minutes,
        }),
    };
    Ok(Json(body).into_response())
}

/// `POST /api/end-interview/{session_id}`
pub async fn end_interview(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = dialogue::end(&state.store, state.interviewer.as_ref(), &session_id)
        .await
        .map_err(|e| match e {
            DialogueError::UnknownSession => ApiError::SessionNotFound,
            other => ApiError::Dialogue(other),
        })?;

    let profile = profile_snapshot(&state, &session_id).await;
    Ok(Json(json!({
        "message": outcome.message,
        "feedback": outcome.feedback,
        "session_id": session_id,
        "status": "ended",
        "total_questions_asked": outcome.total_questions,
        "candidate_info": profile,
        "duration_minutes": outcome.duration_minutes,
    }))
    .into_response())
}

/// `GET /api/interview-status/{session_id}`
pub async fn interview_status(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let guard = state.store.lock().await;
    let session = guard.get(&session_id).ok_or(ApiError::SessionNotFound)?;

    Ok(Json(json!({
        "session_id": session_id,
        "question_number": session.question_count,
        "is_completed": session.is_completed(),
        "start_time": session.started_at.to_rfc3339(),
        "duration_minutes": session.duration_minutes(),
        "candidate_info": session.profile,
        "has_question_limit": false,
    }))
    .into_response())
}

/// `GET /api/health`
pub async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "Interview API",
        "model": state.chat_model,
    }))
}

/// `GET /api/models`
pub async fn models(State(state): State<SharedState>) -> Response {
    match state.interviewer.list_models().await {
        Ok(models) => Json(json!({
            "available_models": models,
            "current_model": state.chat_model,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("failed to list models: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `GET /`
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Speech and Interview Server is running!",
        "routes": {
            "POST /tts": "Convert text to speech",
            "GET /stt": "Convert microphone speech to text",
            "POST /stt/stop": "Stop ongoing speech recognition",
            "POST /api/start-interview": "Start a new interview session",
            "POST /api/respond": "Respond to interview question",
            "GET /api/interview-status/{session_id}": "Get interview status",
            "POST /api/end-interview/{session_id}": "End interview session",
            "GET /api/health": "Health check",
            "GET /api/models": "Get available models",
        }
    }))
}

async fn profile_snapshot(state: &SharedState, session_id: &str) -> Option<CandidateProfile> {
    state
        .store
        .lock()
        .await
        .get(session_id)
        .map(|s| s.profile.clone())
}
