use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, Timestamp};
use crate::{define_query, table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    #[default]
    Requested,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub requester: String,
    pub recipient: String,
    pub status: FriendStatus,
    pub created_at: Timestamp,
}

table!("friend_requests": FriendRequest);

#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewFriendRequest {
    pub requester: String,
    pub recipient: String,
    pub status: FriendStatus,
    #[new(default)]
    pub created_at: Timestamp,
}

define_query! {
    FriendRequest > between(requester: &str, recipient: &str) > Option<FriendRequest>
        where "SELECT * FROM friend_requests WHERE requester = $requester AND recipient = $recipient LIMIT 1"
}

define_query! {
    FriendRequest > involving(user_id: &str) > Vec<FriendRequest>
        where "SELECT * FROM friend_requests WHERE (requester = $user_id OR recipient = $user_id) AND status != 'rejected' ORDER BY createdAt ASC"
}

define_query! {
    FriendRequest > addressed_to(user_id: &str) > Vec<FriendRequest>
        where "SELECT * FROM friend_requests WHERE recipient = $user_id AND status != 'rejected' ORDER BY createdAt ASC"
}

define_query! {
    FriendRequest > set_status(id: &str, status: FriendStatus) > Option<FriendRequest>
        where "UPDATE friend_requests SET status = $status WHERE id = type::thing('friend_requests', $id) RETURN AFTER"
}
