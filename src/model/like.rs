use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{record_key, Timestamp};
use crate::{define_query, table};

/// A user's like on a post, at most one per pair. Each one is a child record of the post's like counter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(deserialize_with = "record_key")]
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: Timestamp,
}

table!("likes": Like);

#[derive(Debug, Clone, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct NewLike {
    pub post_id: String,
    pub user_id: String,
    #[new(default)]
    pub created_at: Timestamp,
}

define_query! {
    Like > find_pair(post_id: &str, user_id: &str) > Option<Like>
        where "SELECT * FROM likes WHERE postId = $post_id AND userId = $user_id LIMIT 1"
}

define_query! {
    Like > remove_pair(post_id: &str, user_id: &str) > Vec<Like>
        where "DELETE likes WHERE postId = $post_id AND userId = $user_id RETURN BEFORE"
}

define_query! {
    Like > remove_of_post(post_id: &str) > Vec<Like>
        where "DELETE likes WHERE postId = $post_id RETURN BEFORE"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;

    #[tokio::test]
    async fn second_like_of_a_pair_is_a_duplicate() {
        let database = crate::database::memory().await.unwrap();
        let like = NewLike::new("p1".into(), "u1".into());

        let _: Like = model::insert(&like, &database).await.unwrap();
        let error = model::insert::<Like, _>(&like, &database).await.unwrap_err();

        assert!(error.is_duplicate(), "{error}");
    }
}
