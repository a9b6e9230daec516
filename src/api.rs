//! Request and response shapes of the HTTP API.

use crate::{
    db::user::UserId,
    error::{PollError, ValidationErrors},
    services::{Poll, PollStats},
};
use actix_web::{
    dev::Payload, error::JsonPayloadError, http::StatusCode, FromRequest, HttpRequest,
    HttpResponse, ResponseError,
};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::error;

/// Header carrying the subject authenticated by the upstream identity provider.
pub const IDENTITY_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VoteRequest {
    #[serde(rename = "optionId")]
    pub option_id: String,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub poll: Poll,
}

#[derive(Debug, Serialize)]
pub struct PollsResponse {
    pub polls: Vec<Poll>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: PollStats,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VoteStatusResponse {
    pub has_voted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ValidationErrors>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Poll(#[from] PollError),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Poll(PollError::Validation(errors))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Poll(PollError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Poll(PollError::VoteConflict) => StatusCode::CONFLICT,
            ApiError::Poll(PollError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Poll(PollError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Poll(PollError::Validation(errors)) => ErrorResponse {
                error: "Invalid input data".to_owned(),
                details: Some(errors.clone()),
            },
            ApiError::Poll(PollError::Storage(err)) => {
                // The cause stays in the logs
                error!(error = %err, "Request failed on storage");
                ErrorResponse {
                    error: "Internal server error".to_owned(),
                    details: None,
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                details: None,
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Caller identity taken from [`IDENTITY_HEADER`]; rejects with 401 when absent.
#[derive(Clone, Debug)]
pub struct Identity(pub UserId);

impl FromRequest for Identity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Identity(UserId::from(value)));
        ready(user.ok_or(ApiError::Unauthorized))
    }
}

pub fn parse_id<T: FromStr>(field: &str, raw: &str, message: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationErrors::single(field, message).into())
}

/// Maps undecodable JSON bodies onto the validation error shape.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::from(ValidationErrors::single("body", err.to_string())).into()
}
