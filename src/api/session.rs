use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::validate::{required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::{AuthUser, TOKEN_HEADER};
use crate::model::User;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), String> {
        required("email", &self.email)?;
        required("password", &self.password)
    }
}

#[derive(Debug, Serialize)]
pub struct Token {
    pub token: String,
}

/// Checks the credentials, marks the user online and hands out a token, both in the body and in `x-auth-token`.
#[instrument(skip(app))]
pub async fn login(
    State(app): State<App>,
    Valid(credentials): Valid<Credentials>,
) -> Result<impl IntoResponse> {
    let user = User::sign_in(&credentials.email, &credentials.password, &app.database)
        .await?
        .ok_or_else(|| ApiError::InvalidCredentials {
            email: credentials.email.clone(),
        })?;

    User::set_online(&user.id, true, &app.database).await?;

    let token = app.auth.encode(&app.auth.claims(&user))?;
    tracing::info!(user = %user.id, "signed in");

    Ok(([(TOKEN_HEADER, token.clone())], Json(Token { token })))
}

#[instrument(skip(app))]
pub async fn logout(State(app): State<App>, user: AuthUser) -> Result<Json<User>> {
    let user = User::set_online(user.id(), false, &app.database)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            entity: "user",
            id: user.id().to_string(),
        })?;

    Ok(Json(user))
}
