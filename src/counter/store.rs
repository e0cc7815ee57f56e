use std::future::Future;
use std::time::Duration;

use snafu::{Location, Snafu};

use super::{Counter, CounterKind};
use crate::database::DatabaseQueryError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// A counter record for this subject already exists.
    #[snafu(display("a {kind} counter for `{subject}` already exists"))]
    Conflict { kind: CounterKind, subject: String },

    #[snafu(display("the store did not answer within {}", humantime::format_duration(*after)))]
    Timeout { after: Duration },

    #[snafu(display("the store failed at {location}: {source}"))]
    Query {
        source: DatabaseQueryError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Keyed storage for counter records.
///
/// Every method is a single operation against the store. Implementations must make `insert`, `increment` and
/// `delete_drained` atomic with respect to each other for the same subject.
pub trait CounterStore: Send + Sync {
    /// Looks up the counter of `subject`.
    fn find(
        &self,
        kind: CounterKind,
        subject: &str,
    ) -> impl Future<Output = Result<Option<Counter>, StoreError>> + Send;

    /// Creates the counter of `subject` with `count`, failing with [StoreError::Conflict] when one already exists.
    fn insert(
        &self,
        kind: CounterKind,
        subject: &str,
        count: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Adds `delta` to an existing counter and returns the value after the update, or `None` when the subject has no counter.
    fn increment(
        &self,
        kind: CounterKind,
        subject: &str,
        delta: i64,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Deletes the counter of `subject` only if its count is zero or below. Returns whether a record was deleted.
    fn delete_drained(
        &self,
        kind: CounterKind,
        subject: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Sets the counter of `subject` to `count`, creating it if needed. A count of zero removes the record.
    fn overwrite(
        &self,
        kind: CounterKind,
        subject: &str,
        count: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets the counter of `subject` to `count` only while it still holds `expected`, where `None` stands for an
    /// absent counter and negative values read as zero. A count of zero removes the record. Returns whether the
    /// counter was replaced.
    fn replace(
        &self,
        kind: CounterKind,
        subject: &str,
        expected: Option<u64>,
        count: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Lists every subject that currently has a counter record.
    fn subjects(&self, kind: CounterKind) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// The authoritative child collections a counter is derived from.
pub trait ChildSource: Send + Sync {
    /// Counts the child records currently associated with `subject`.
    fn count_children(
        &self,
        kind: CounterKind,
        subject: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Lists every subject that has at least one child record.
    fn parents(&self, kind: CounterKind) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}
