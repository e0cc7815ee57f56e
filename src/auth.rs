use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use snafu::{Location, OptionExt, ResultExt, Snafu};

use crate::model::User;

/// Alternative header carrying the raw token, without the `Bearer` prefix.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// What a token says about its bearer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// The user id.
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub exp: i64,
}

#[derive(Debug, Snafu, Serialize)]
#[serde(tag = "error", content = "data")]
#[snafu(visibility(pub(crate)))]
pub enum AuthError {
    #[snafu(display("Access denied. No token provided."))]
    MissingToken {
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid token"))]
    Decode {
        #[serde(skip)]
        source: jsonwebtoken::errors::Error,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to encode JWT token"))]
    Encode {
        #[serde(skip)]
        source: jsonwebtoken::errors::Error,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken { .. } => StatusCode::UNAUTHORIZED,
            AuthError::Decode { .. } => StatusCode::BAD_REQUEST,
            AuthError::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    message: String,
    #[serde(flatten)]
    data: AuthError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        if let AuthError::Encode { .. } = self {
            tracing::error!(error = %self, "could not issue a token");
        }

        let status = self.status();
        let content = AuthResponse {
            message: self.to_string(),
            data: self,
        };

        (status, Json(content)).into_response()
    }
}

/// Issues and verifies the HS256 tokens handed out on login.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: SecretString,
    ttl: Duration,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self {
            secret,
            ttl,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    fn header(&self) -> jsonwebtoken::Header {
        jsonwebtoken::Header::new(Algorithm::HS256)
    }

    pub fn expiration(&self) -> i64 {
        Utc::now().timestamp() + self.ttl.as_secs() as i64
    }

    pub fn claims(&self, user: &User) -> Claims {
        Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            exp: self.expiration(),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&self.header(), claims, &self.encoding_key()).context(EncodeSnafu)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .context(DecodeSnafu)
    }

    /// Reads the token from `Authorization: Bearer <token>` or from `x-auth-token`, in that order, and verifies it.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let token = bearer
            .or_else(|| headers.get(TOKEN_HEADER).and_then(|value| value.to_str().ok()))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .context(MissingTokenSnafu)?;

        self.decode(token)
    }
}

/// The authenticated caller of a request. Rejects the request when it carries no valid token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.sub
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<Authenticator>::from_ref(state);
        let claims = authenticator.authenticate(&parts.headers)?;

        Ok(AuthUser(claims))
    }
}
