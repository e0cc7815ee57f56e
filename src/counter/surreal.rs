use std::collections::BTreeSet;

use derive_new::new;
use serde::Deserialize;
use snafu::ResultExt;

use super::store::{ChildSource, ConflictSnafu, CounterStore, QuerySnafu, StoreError};
use super::{Counter, CounterKind};
use crate::database::{is_duplicate, Database, MalformedQuerySnafu, Sql};

/// Counter records stored in SurrealDB, one record per subject with the subject as its key.
///
/// Every operation is a single SurrealQL statement, so it runs inside one transaction of the database.
#[derive(Debug, Clone, new)]
pub struct SurrealStore {
    database: Database,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct Total {
    total: u64,
}

impl CounterStore for SurrealStore {
    async fn find(&self, kind: CounterKind, subject: &str) -> Result<Option<Counter>, StoreError> {
        let query = format!(
            "SELECT subjectId, count FROM {} WHERE subjectId = $subject LIMIT 1",
            kind.table()
        );

        let row: Option<CountRow> = self
            .database
            .sql(&query)
            .bind(("subject", subject))
            .fetch_first()
            .await
            .context(QuerySnafu)?;

        Ok(row.map(|row| Counter {
            subject_id: subject.to_string(),
            count: row.count.max(0) as u64,
        }))
    }

    async fn insert(&self, kind: CounterKind, subject: &str, count: u64) -> Result<(), StoreError> {
        let mut response = self
            .database
            .sql("CREATE type::thing($table, $subject) SET subjectId = $subject, count = $count")
            .bind(("table", kind.table()))
            .bind(("subject", subject))
            .bind(("count", count))
            .execute()
            .await
            .context(QuerySnafu)?;

        match response.take::<Option<CountRow>>(0) {
            Ok(_) => Ok(()),
            Err(error) if is_duplicate(&error) => ConflictSnafu { kind, subject }.fail(),
            Err(error) => Err(error)
                .context(MalformedQuerySnafu)
                .context(QuerySnafu),
        }
    }

    async fn increment(
        &self,
        kind: CounterKind,
        subject: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let query = format!(
            "UPDATE {} SET count += $delta WHERE subjectId = $subject RETURN AFTER",
            kind.table()
        );

        let rows: Vec<CountRow> = self
            .database
            .sql(&query)
            .bind(("subject", subject))
            .bind(("delta", delta))
            .fetch_first()
            .await
            .context(QuerySnafu)?;

        Ok(rows.first().map(|row| row.count))
    }

    async fn delete_drained(&self, kind: CounterKind, subject: &str) -> Result<bool, StoreError> {
        let query = format!(
            "DELETE {} WHERE subjectId = $subject AND count <= 0 RETURN BEFORE",
            kind.table()
        );

        let rows: Vec<CountRow> = self
            .database
            .sql(&query)
            .bind(("subject", subject))
            .fetch_first()
            .await
            .context(QuerySnafu)?;

        Ok(!rows.is_empty())
    }

    async fn overwrite(&self, kind: CounterKind, subject: &str, count: u64) -> Result<(), StoreError> {
        let bindings = if count == 0 {
            let query = format!("DELETE {} WHERE subjectId = $subject", kind.table());
            self.database.sql(&query)
        } else {
            self.database
                .sql("UPDATE type::thing($table, $subject) SET subjectId = $subject, count = $count")
                .bind(("table", kind.table()))
                .bind(("count", count))
        };

        bindings
            .bind(("subject", subject))
            .execute()
            .await
            .and_then(|response| response.check().context(MalformedQuerySnafu))
            .context(QuerySnafu)?;

        Ok(())
    }

    async fn replace(
        &self,
        kind: CounterKind,
        subject: &str,
        expected: Option<u64>,
        count: u64,
    ) -> Result<bool, StoreError> {
        let Some(expected) = expected else {
            if count == 0 {
                return Ok(true);
            }

            return match self.insert(kind, subject, count).await {
                Ok(()) => Ok(true),
                Err(StoreError::Conflict { .. }) => Ok(false),
                Err(error) => Err(error),
            };
        };

        let query = if count == 0 {
            format!(
                "DELETE {} WHERE subjectId = $subject AND math::max([count, 0]) = $expected RETURN BEFORE",
                kind.table()
            )
        } else {
            format!(
                "UPDATE {} SET count = $count WHERE subjectId = $subject AND math::max([count, 0]) = $expected RETURN AFTER",
                kind.table()
            )
        };

        let rows: Vec<CountRow> = self
            .database
            .sql(&query)
            .bind(("subject", subject))
            .bind(("expected", expected))
            .bind(("count", count))
            .fetch_first()
            .await
            .context(QuerySnafu)?;

        Ok(!rows.is_empty())
    }

    async fn subjects(&self, kind: CounterKind) -> Result<Vec<String>, StoreError> {
        let query = format!("SELECT VALUE subjectId FROM {}", kind.table());

        self.database
            .sql(&query)
            .fetch_first()
            .await
            .context(QuerySnafu)
    }
}

impl ChildSource for SurrealStore {
    async fn count_children(&self, kind: CounterKind, subject: &str) -> Result<u64, StoreError> {
        let query = format!(
            "SELECT count() AS total FROM {} WHERE postId = $subject GROUP ALL",
            kind.children()
        );

        let total: Option<Total> = self
            .database
            .sql(&query)
            .bind(("subject", subject))
            .fetch_first()
            .await
            .context(QuerySnafu)?;

        Ok(total.map_or(0, |total| total.total))
    }

    async fn parents(&self, kind: CounterKind) -> Result<Vec<String>, StoreError> {
        let query = format!("SELECT VALUE postId FROM {}", kind.children());

        let parents: Vec<String> = self
            .database
            .sql(&query)
            .fetch_first()
            .await
            .context(QuerySnafu)?;

        let unique: BTreeSet<String> = parents.into_iter().collect();
        Ok(unique.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::counter::{CounterManager, MemoryStore};
    use std::time::Duration;

    async fn store() -> SurrealStore {
        SurrealStore::new(crate::database::memory().await.unwrap())
    }

    #[tokio::test]
    async fn lifecycle_against_the_database() {
        let counters = CounterManager::new(store().await, CounterKind::Comments, Duration::from_secs(5));

        assert_eq!(counters.get_count("p1").await.unwrap(), None);

        assert_eq!(counters.record_child_created("p1").await.unwrap(), 1);
        assert_eq!(counters.record_child_created("p1").await.unwrap(), 2);
        assert_eq!(
            counters.get_count("p1").await.unwrap(),
            Some(Counter {
                subject_id: "p1".into(),
                count: 2
            })
        );

        assert_eq!(counters.record_child_deleted("p1").await.unwrap(), 1);
        assert_eq!(counters.record_child_deleted("p1").await.unwrap(), 0);
        assert_eq!(counters.get_count("p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let store = store().await;

        store.insert(CounterKind::Likes, "p1", 1).await.unwrap();
        let error = store.insert(CounterKind::Likes, "p1", 1).await.unwrap_err();

        assert!(matches!(error, StoreError::Conflict { .. }), "{error}");
    }

    #[tokio::test]
    async fn increment_of_a_missing_counter_creates_nothing() {
        let store = store().await;

        assert_eq!(store.increment(CounterKind::Likes, "p1", 1).await.unwrap(), None);
        assert_eq!(store.find(CounterKind::Likes, "p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn conditional_delete_spares_a_live_counter() {
        let store = store().await;

        store.insert(CounterKind::Comments, "p1", 1).await.unwrap();
        assert!(!store.delete_drained(CounterKind::Comments, "p1").await.unwrap());

        store.increment(CounterKind::Comments, "p1", -1).await.unwrap();
        assert!(store.delete_drained(CounterKind::Comments, "p1").await.unwrap());
        assert_eq!(store.find(CounterKind::Comments, "p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_needs_the_expected_value() {
        let store = store().await;

        assert!(store.replace(CounterKind::Likes, "p1", None, 2).await.unwrap());
        assert!(!store.replace(CounterKind::Likes, "p1", None, 5).await.unwrap());
        assert!(!store.replace(CounterKind::Likes, "p1", Some(1), 5).await.unwrap());
        assert!(store.replace(CounterKind::Likes, "p1", Some(2), 5).await.unwrap());
        assert_eq!(
            store.find(CounterKind::Likes, "p1").await.unwrap(),
            Some(Counter {
                subject_id: "p1".into(),
                count: 5
            })
        );

        assert!(store.replace(CounterKind::Likes, "p1", Some(5), 0).await.unwrap());
        assert_eq!(store.find(CounterKind::Likes, "p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn kinds_are_kept_apart() {
        let store = store().await;

        store.insert(CounterKind::Comments, "p1", 3).await.unwrap();

        assert_eq!(store.find(CounterKind::Likes, "p1").await.unwrap(), None);
        assert_eq!(store.subjects(CounterKind::Comments).await.unwrap(), vec!["p1".to_string()]);
        assert!(store.subjects(CounterKind::Likes).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recount_uses_the_child_table() {
        let database = crate::database::memory().await.unwrap();
        let store = SurrealStore::new(database.clone());

        for _ in 0..3 {
            database
                .sql("CREATE comments SET postId = 'p1', comment = 'hi'")
                .execute()
                .await
                .unwrap();
        }

        assert_eq!(store.count_children(CounterKind::Comments, "p1").await.unwrap(), 3);
        assert_eq!(store.count_children(CounterKind::Comments, "p2").await.unwrap(), 0);
        assert_eq!(store.parents(CounterKind::Comments).await.unwrap(), vec!["p1".to_string()]);

        let counters = CounterManager::new(store.clone(), CounterKind::Comments, Duration::from_secs(5));
        let recount = counters.recount("p1", &store).await.unwrap();

        assert_eq!(recount.previous, None);
        assert_eq!(recount.current, 3);
        assert_eq!(counters.count("p1").await.unwrap(), 3);

        // the memory store has no children of its own, the database does
        let detached = CounterManager::new(MemoryStore::new(), CounterKind::Comments, Duration::from_secs(5));
        assert_eq!(detached.recount("p1", &store).await.unwrap().current, 3);
    }
}
