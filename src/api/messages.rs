use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use super::validate::{required, Valid, Validate};
use super::{ApiError, App, Result};
use crate::auth::AuthUser;
use crate::model::{self, Message, NewMessage, User};

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub recipient: String,
    pub message: String,
}

impl Validate for MessageBody {
    fn validate(&self) -> Result<(), String> {
        required("recipient", &self.recipient)?;
        required("message", &self.message)
    }
}

#[instrument(skip(app))]
pub async fn send(State(app): State<App>, user: AuthUser, Valid(body): Valid<MessageBody>) -> Result<Json<Message>> {
    if model::find::<User>(&body.recipient, &app.database).await?.is_none() {
        return Err(ApiError::InvalidReference {
            entity: "user",
            id: body.recipient,
        });
    }

    let message = NewMessage::new(user.id().to_string(), body.recipient, body.message);
    Ok(Json(model::insert(&message, &app.database).await?))
}

/// Messages between the caller and another user, oldest first.
#[instrument(skip(app))]
pub async fn conversation(
    State(app): State<App>,
    user: AuthUser,
    Path(other): Path<String>,
) -> Result<Json<Vec<Message>>> {
    Ok(Json(Message::conversation(user.id(), &other, &app.database).await?))
}
