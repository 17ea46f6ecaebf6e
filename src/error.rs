use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// One entry of the `{ "errors": [...] }` response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl FieldError {
    pub fn new(param: &str, msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
            param: Some(param.to_string()),
        }
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no token")]
    NoToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("user already exists")]
    Duplicate,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_errors(&self) -> (StatusCode, Vec<FieldError>) {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, errors.clone()),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                vec![FieldError::message("Invalid Credentials")],
            ),
            ApiError::NoToken => (
                StatusCode::UNAUTHORIZED,
                vec![FieldError::message("No token, authorization denied")],
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                vec![FieldError::message("Token is not valid")],
            ),
            ApiError::Duplicate => (
                StatusCode::BAD_REQUEST,
                vec![FieldError::message("User already exists")],
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, vec![FieldError::message(*msg)]),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, vec![FieldError::message(*msg)]),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                vec![FieldError::message("Server Error")],
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!(error = %e, "internal error");
        }
        let (status, errors) = self.status_and_errors();
        (status, Json(ErrorBody { errors })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let msg = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Request body must be JSON (Content-Type: application/json)".to_string()
            }
            other => other.body_text(),
        };
        ApiError::Validation(vec![FieldError::message(msg)])
    }
}

/// Turns a non-empty list of field errors into `ApiError::Validation`.
pub fn ensure_valid(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}
