//! Derived per-subject counters (comments per post, likes per post).
//!
//! A counter lives in its own record next to the authoritative child collection and is kept in step with it by
//! the callers that create and delete children: [CounterManager::record_child_created] after every committed child
//! insert and [CounterManager::record_child_deleted] after every committed child delete. Both rely solely on the
//! store's per-record atomicity, there is no in-process locking. Drift left behind by a failed or interrupted
//! update is repaired with [CounterManager::recount], which the [Reconciler] also runs periodically.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::{Location, ResultExt, Snafu};
use tracing::instrument;

pub mod memory;
pub mod reconcile;
pub mod store;
pub mod surreal;

pub use memory::MemoryStore;
pub use reconcile::Reconciler;
pub use store::{ChildSource, CounterStore, StoreError};
pub use surreal::SurrealStore;

/// How many times a creation may lose the insert race before giving up.
const MAX_CREATE_ATTEMPTS: usize = 5;

/// How many times a recount may find the counter changed under it before giving up.
const MAX_RECOUNT_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Comments,
    Likes,
}

impl CounterKind {
    /// Table holding the counter records.
    pub fn table(self) -> &'static str {
        match self {
            CounterKind::Comments => "comment_counts",
            CounterKind::Likes => "like_counts",
        }
    }

    /// Table holding the child records being counted.
    pub fn children(self) -> &'static str {
        match self {
            CounterKind::Comments => "comments",
            CounterKind::Likes => "likes",
        }
    }
}

impl std::fmt::Display for CounterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterKind::Comments => write!(f, "comment"),
            CounterKind::Likes => write!(f, "like"),
        }
    }
}

/// The persisted aggregate holding the number of children of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub subject_id: String,
    pub count: u64,
}

/// Outcome of a [CounterManager::recount].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recount {
    pub subject_id: String,
    pub previous: Option<u64>,
    pub current: u64,
}

impl Recount {
    /// Whether the stored counter disagreed with the children.
    pub fn drifted(&self) -> bool {
        self.previous.unwrap_or(0) != self.current
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CounterError {
    #[snafu(display("could not reach the store while updating the {kind} counter of `{subject}`: {source}"))]
    StoreUnavailable {
        kind: CounterKind,
        subject: String,
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The counter was decremented more often than it was incremented, a caller is out of sequence.
    #[snafu(display("the {kind} counter of `{subject}` {reason}"))]
    InvariantViolation {
        kind: CounterKind,
        subject: String,
        reason: &'static str,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("gave up {action} the {kind} counter of `{subject}` after {attempts} conflicting attempts"))]
    Contended {
        kind: CounterKind,
        subject: String,
        action: &'static str,
        attempts: usize,
    },
}

/// Maintains the counters of one [CounterKind] on top of a [CounterStore].
#[derive(Debug, Clone)]
pub struct CounterManager<S> {
    store: S,
    kind: CounterKind,
    timeout: Duration,
}

impl<S: CounterStore> CounterManager<S> {
    pub fn new(store: S, kind: CounterKind, timeout: Duration) -> Self {
        Self {
            store,
            kind,
            timeout,
        }
    }

    pub fn kind(&self) -> CounterKind {
        self.kind
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bounds a single store call by the configured timeout.
    async fn call<T>(
        &self,
        subject: &str,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, CounterError> {
        let result = match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                after: self.timeout,
            }),
        };

        result.context(StoreUnavailableSnafu {
            kind: self.kind,
            subject,
        })
    }

    /// Returns the counter of `subject`, or `None` when it has no children (never a zero record).
    #[instrument(level = "debug", skip(self), fields(kind = %self.kind))]
    pub async fn get_count(&self, subject: &str) -> Result<Option<Counter>, CounterError> {
        self.call(subject, self.store.find(self.kind, subject)).await
    }

    /// Same as [CounterManager::get_count] but reads an absent counter as zero.
    pub async fn count(&self, subject: &str) -> Result<u64, CounterError> {
        let counter = self.get_count(subject).await?;
        Ok(counter.map_or(0, |counter| counter.count))
    }

    /// Accounts for a child of `subject` that was just created.
    ///
    /// The increment is tried first. When there is no counter yet one is inserted with a count of one; losing that
    /// insert to a concurrent creator sends us back to the increment, so simultaneous first children all count.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn record_child_created(&self, subject: &str) -> Result<u64, CounterError> {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let incremented = self
                .call(subject, self.store.increment(self.kind, subject, 1))
                .await?;

            if let Some(count) = incremented {
                tracing::debug!(count, "incremented counter");
                return Ok(count.max(0) as u64);
            }

            match tokio::time::timeout(self.timeout, self.store.insert(self.kind, subject, 1)).await {
                Ok(Ok(())) => {
                    tracing::debug!("created counter");
                    return Ok(1);
                }
                Ok(Err(StoreError::Conflict { .. })) => {
                    tracing::debug!(attempt, "counter was created concurrently, retrying the increment");
                }
                Ok(Err(source)) => {
                    return Err(source).context(StoreUnavailableSnafu {
                        kind: self.kind,
                        subject,
                    })
                }
                Err(_) => {
                    return Err(StoreError::Timeout {
                        after: self.timeout,
                    })
                    .context(StoreUnavailableSnafu {
                        kind: self.kind,
                        subject,
                    })
                }
            }
        }

        ContendedSnafu {
            kind: self.kind,
            subject,
            action: "creating",
            attempts: MAX_CREATE_ATTEMPTS,
        }
        .fail()
    }

    /// Accounts for a child of `subject` that was just deleted and returns the remaining count.
    ///
    /// When the decrement drains the counter it is removed with a conditional delete, which leaves it alone if a
    /// concurrent creation got in between.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn record_child_deleted(&self, subject: &str) -> Result<u64, CounterError> {
        let decremented = self
            .call(subject, self.store.increment(self.kind, subject, -1))
            .await?;

        let Some(count) = decremented else {
            tracing::error!("decremented a counter that does not exist");
            return InvariantViolationSnafu {
                kind: self.kind,
                subject,
                reason: "was decremented while absent",
            }
            .fail();
        };

        if count > 0 {
            tracing::debug!(count, "decremented counter");
            return Ok(count as u64);
        }

        let deleted = self
            .call(subject, self.store.delete_drained(self.kind, subject))
            .await?;
        tracing::debug!(deleted, "counter drained");

        if count < 0 {
            tracing::error!(count, "counter went below zero");
            return InvariantViolationSnafu {
                kind: self.kind,
                subject,
                reason: "went below zero",
            }
            .fail();
        }

        Ok(0)
    }

    /// Drops the counter of `subject` regardless of its value.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn forget(&self, subject: &str) -> Result<(), CounterError> {
        self.call(subject, self.store.overwrite(self.kind, subject, 0))
            .await
    }

    /// Recomputes the counter of `subject` from its children and replaces the stored value.
    ///
    /// The replacement only applies while the counter still holds the value read before counting, so an update
    /// landing in between sends us back to read and count again. A child committed before that read but not yet
    /// counted by its creator can still leave drift for the next recount.
    #[instrument(skip(self, children), fields(kind = %self.kind))]
    pub async fn recount<C: ChildSource>(
        &self,
        subject: &str,
        children: &C,
    ) -> Result<Recount, CounterError> {
        for attempt in 1..=MAX_RECOUNT_ATTEMPTS {
            let previous = self.get_count(subject).await?.map(|counter| counter.count);
            let current = self
                .call(subject, children.count_children(self.kind, subject))
                .await?;

            let unchanged = previous == Some(current) || (previous.is_none() && current == 0);
            let replaced = unchanged
                || self
                    .call(subject, self.store.replace(self.kind, subject, previous, current))
                    .await?;

            if !replaced {
                tracing::debug!(attempt, "counter changed while recounting, counting again");
                continue;
            }

            let recount = Recount {
                subject_id: subject.to_string(),
                previous,
                current,
            };

            if recount.drifted() {
                tracing::warn!(previous = ?recount.previous, current, "corrected counter drift");
            }

            return Ok(recount);
        }

        ContendedSnafu {
            kind: self.kind,
            subject,
            action: "recounting",
            attempts: MAX_RECOUNT_ATTEMPTS,
        }
        .fail()
    }
}
