use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use serde::Serialize;

use crate::auth::Authenticator;
use crate::counter::{CounterError, CounterKind, CounterManager, SurrealStore};
use crate::database::Database;

pub type Counters = CounterManager<SurrealStore>;

/// Shared state of every route.
#[derive(Debug, Clone, FromRef)]
pub struct App {
    pub database: Database,
    pub auth: Arc<Authenticator>,
    #[from_ref(skip)]
    pub comments: Arc<Counters>,
    #[from_ref(skip)]
    pub likes: Arc<Counters>,
}

/// The derived counts shown next to a post. An absent counter reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub comment_count: u64,
    pub like_count: u64,
}

impl App {
    pub fn new(database: Database, auth: Authenticator, store_timeout: Duration) -> Self {
        let store = SurrealStore::new(database.clone());

        App {
            comments: Arc::new(CounterManager::new(store.clone(), CounterKind::Comments, store_timeout)),
            likes: Arc::new(CounterManager::new(store, CounterKind::Likes, store_timeout)),
            auth: Arc::new(auth),
            database,
        }
    }

    pub fn counter(&self, kind: CounterKind) -> &Counters {
        match kind {
            CounterKind::Comments => &self.comments,
            CounterKind::Likes => &self.likes,
        }
    }

    /// The child collections the counters are derived from.
    pub fn children(&self) -> SurrealStore {
        SurrealStore::new(self.database.clone())
    }

    pub async fn counts(&self, post_id: &str) -> Result<Counts, CounterError> {
        let (comment_count, like_count) =
            tokio::try_join!(self.comments.count(post_id), self.likes.count(post_id))?;

        Ok(Counts {
            comment_count,
            like_count,
        })
    }

    /// Accounts for a committed child insert. A failure leaves drift for the reconciler and does not fail the request.
    pub async fn child_created(&self, kind: CounterKind, subject: &str) {
        if let Err(error) = self.counter(kind).record_child_created(subject).await {
            tracing::warn!(%kind, %subject, %error, "counter not incremented, it will drift until recounted");
        }
    }

    /// Accounts for a committed child delete, see [App::child_created].
    pub async fn child_deleted(&self, kind: CounterKind, subject: &str) {
        if let Err(error) = self.counter(kind).record_child_deleted(subject).await {
            tracing::warn!(%kind, %subject, %error, "counter not decremented, it will drift until recounted");
        }
    }

    /// Drops the counter of a removed subject.
    pub async fn forget(&self, kind: CounterKind, subject: &str) {
        if let Err(error) = self.counter(kind).forget(subject).await {
            tracing::warn!(%kind, %subject, %error, "counter of a removed post was left behind");
        }
    }
}
