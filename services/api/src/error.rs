use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use interview_core::DialogueError;

/// Request-level errors surfaced as 4xx JSON payloads. Audio-path failures do
/// not go through here; they are reported as `{status: "error"}` bodies with
/// HTTP 200.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
    #[error("Session not found")]
    SessionNotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Dialogue(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialogue_errors_map_to_bad_request() {
        let response = ApiError::Dialogue(DialogueError::UnknownSession).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::Dialogue(DialogueError::AlreadyCompleted).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_sessions_map_to_not_found() {
        let response = ApiError::SessionNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
