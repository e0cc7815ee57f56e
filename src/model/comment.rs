use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, Author, Timestamp};
use crate::{define_query, table};

/// A comment on a post. Each one is a child record of the post's comment counter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub post_id: String,
    pub comment: String,
    pub created_by: Author,
    pub created_at: Timestamp,
}

table!("comments": Comment);

#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: String,
    pub comment: String,
    pub created_by: Author,
    #[new(default)]
    pub created_at: Timestamp,
}

define_query! {
    Comment > of_post(post_id: &str) > Vec<Comment>
        where "SELECT * FROM comments WHERE postId = $post_id ORDER BY createdAt ASC"
}

define_query! {
    Comment > remove_of_post(post_id: &str) > Vec<Comment>
        where "DELETE comments WHERE postId = $post_id RETURN BEFORE"
}
