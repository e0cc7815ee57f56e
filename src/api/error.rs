use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use snafu::{Location, Snafu};

use crate::auth::AuthError;
use crate::counter::CounterError;
use crate::database::DatabaseQueryError;

#[derive(Debug, Snafu, Serialize)]
#[serde(tag = "error", content = "data")]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    /// The body is malformed or breaks a validation rule.
    #[snafu(display("{message}"))]
    InvalidInput { message: String },

    /// The body refers to a record that does not exist.
    #[snafu(display("Invalid {entity}"))]
    InvalidReference { entity: &'static str, id: String },

    #[snafu(display("The {entity} was not found"))]
    NotFound { entity: &'static str, id: String },

    #[snafu(display("You are not allowed to change this {entity}"))]
    Forbidden { entity: &'static str, id: String },

    #[snafu(display("User already exists"))]
    UserExists { email: String },

    #[snafu(display("Invalid password or email"))]
    InvalidCredentials { email: String },

    #[snafu(display("You already sent a request"))]
    AlreadyRequested { recipient: String },

    #[snafu(display("{source}"), context(false))]
    Auth {
        #[serde(skip)]
        source: AuthError,
    },

    #[snafu(display("unexpected error occurred"), context(false))]
    Database {
        #[serde(skip)]
        source: DatabaseQueryError,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("unexpected error occurred"), context(false))]
    Counter {
        #[serde(skip)]
        source: CounterError,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput { .. }
            | ApiError::InvalidReference { .. }
            | ApiError::UserExists { .. }
            | ApiError::InvalidCredentials { .. }
            | ApiError::AlreadyRequested { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Auth { source } => source.status(),
            ApiError::Database { .. } | ApiError::Counter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput {
            message: rejection.body_text(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(flatten)]
    data: ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            ApiError::Database { source, location } => {
                tracing::error!(%source, %location, "request failed on a database query")
            }
            ApiError::Counter { source, location } => {
                tracing::error!(%source, %location, "request failed on a counter update")
            }
            other => tracing::debug!(error = %other, "request rejected"),
        }

        let status = self.status();
        let content = ErrorResponse {
            message: self.to_string(),
            data: self,
        };

        (status, Json(content)).into_response()
    }
}
