use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, Timestamp};
use crate::{define_query, table};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub sent_by: String,
    pub recipient: String,
    pub message: String,
    pub created_at: Timestamp,
}

table!("messages": Message);

#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sent_by: String,
    pub recipient: String,
    pub message: String,
    #[new(default)]
    pub created_at: Timestamp,
}

define_query! {
    Message > conversation(user_id: &str, other_id: &str) > Vec<Message>
        where "SELECT * FROM messages WHERE (sentBy = $user_id AND recipient = $other_id) OR (sentBy = $other_id AND recipient = $user_id) ORDER BY createdAt ASC"
}
