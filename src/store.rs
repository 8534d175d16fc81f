//! store.rs - SQLite-backed log table

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{LogQueryError, Result};
use crate::model::{LogEntry, Stats};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS logs (
    region  TEXT NOT NULL,
    time    INTEGER NOT NULL,
    message TEXT NOT NULL
)";
const COUNT_LOGS_SQL: &str = "SELECT COUNT(*) FROM logs";
const INSERT_LOG_SQL: &str = "INSERT INTO logs (region, time, message) VALUES (?1, ?2, ?3)";
const SELECT_LOGS_SQL: &str =
    "SELECT region, time, message FROM logs WHERE region = ?1 AND time BETWEEN ?2 AND ?3";
const STATS_SQL: &str = "SELECT region, COUNT(*) FROM logs GROUP BY region";

/// Owner of the log database file. Every operation opens its own connection
/// on the blocking pool; SQLite's locking arbitrates concurrent requests.
#[derive(Debug, Clone)]
pub struct LogStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl LogStore {
    /// Open (or create) the database and make sure the `logs` table exists.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let store = Self {
            db_path: config.db_path.clone(),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        };
        store.create_schema_if_absent()?;
        info!(db_path = %store.db_path.display(), "log store opened");
        Ok(store)
    }

    fn open_conn(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.db_path, flags).map_err(|e| {
            LogQueryError::Storage(format!("open {} failed: {e}", self.db_path.display()))
        })?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(conn)
    }

    pub fn create_schema_if_absent(&self) -> Result<()> {
        let conn = self.open_conn()?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(())
    }

    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.open_conn()?;
            f(conn)
        })
        .await
        .map_err(|e| LogQueryError::Internal(e.to_string()))?
    }

    /// Rows of `region` (exact match) with `start <= time <= end`, unordered.
    pub async fn query(&self, region: &str, start: i64, end: i64) -> Result<Vec<LogEntry>> {
        let region = region.to_string();
        let logs = self
            .run_blocking(move |conn| {
                let mut stmt = conn.prepare(SELECT_LOGS_SQL)?;
                let rows = stmt
                    .query_map(params![region, start, end], |row| {
                        Ok(LogEntry {
                            region: row.get(0)?,
                            time: row.get(1)?,
                            message: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        debug!(count = logs.len(), start, end, "log query finished");
        Ok(logs)
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.run_blocking(|conn| {
            let mut stmt = conn.prepare(STATS_SQL)?;
            let rows = stmt.query_map([], |row| {
                let region: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((region, count.max(0) as u64))
            })?;
            let mut stats = Stats::new();
            for row in rows {
                let (region, count) = row?;
                stats.insert(region, count);
            }
            Ok(stats)
        })
        .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.run_blocking(|conn| {
            let count: i64 = conn.query_row(COUNT_LOGS_SQL, [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    pub async fn insert(&self, entry: LogEntry) -> Result<()> {
        self.run_blocking(move |conn| {
            conn.execute(INSERT_LOG_SQL, params![entry.region, entry.time, entry.message])?;
            Ok(())
        })
        .await
    }

    /// Insert `(time, message)` pairs for one region in a single transaction.
    /// Nothing is kept if any statement fails.
    pub async fn insert_batch(&self, region: &str, rows: Vec<(i64, String)>) -> Result<usize> {
        let region = region.to_string();
        self.run_blocking(move |mut conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(INSERT_LOG_SQL)?;
                for (time, message) in rows.iter() {
                    stmt.execute(params![region.as_str(), time, message])?;
                }
            }
            tx.commit()?;
            Ok(rows.len())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn open_temp() -> (TempDir, LogStore) {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig {
            db_path: dir.path().join("logs.db"),
            ..StoreConfig::default()
        };
        let store = LogStore::open(&cfg).unwrap();
        (dir, store)
    }

    fn entry(region: &str, time: i64, message: &str) -> LogEntry {
        LogEntry {
            region: region.to_string(),
            time,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn query_bounds_are_inclusive() {
        let (_dir, store) = open_temp();
        for t in [100, 200, 300] {
            store.insert(entry("NA", t, "m")).await.unwrap();
        }

        let exact = store.query("NA", 200, 200).await.unwrap();
        assert_eq!(exact, vec![entry("NA", 200, "m")]);

        let mut all: Vec<i64> = store
            .query("NA", 100, 300)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.time)
            .collect();
        all.sort();
        assert_eq!(all, vec![100, 200, 300]);

        assert!(store.query("NA", 301, 1000).await.unwrap().is_empty());
        assert!(store.query("NA", 300, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn region_match_is_exact() {
        let (_dir, store) = open_temp();
        store.insert(entry("NA", 1, "upper")).await.unwrap();
        store.insert(entry("na", 1, "lower")).await.unwrap();

        let hits = store.query("NA", 0, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message, "upper");
        assert!(store.query("N", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_are_sparse_and_sum_to_count() {
        let (_dir, store) = open_temp();
        assert!(store.stats().await.unwrap().is_empty());

        store.insert(entry("NA", 1, "a")).await.unwrap();
        store.insert(entry("NA", 1, "a")).await.unwrap();
        store.insert(entry("AP", 2, "")).await.unwrap();
        store.insert(entry("XX-custom", 3, "c")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.get("NA"), Some(&2));
        assert_eq!(stats.get("AP"), Some(&1));
        assert_eq!(stats.get("XX-custom"), Some(&1));
        assert!(!stats.contains_key("EU"));
        assert_eq!(stats.values().sum::<u64>(), store.count().await.unwrap());
    }

    #[tokio::test]
    async fn duplicates_and_empty_messages_are_kept() {
        let (_dir, store) = open_temp();
        store.insert(entry("EU", 5, "")).await.unwrap();
        store.insert(entry("EU", 5, "")).await.unwrap();
        assert_eq!(store.query("EU", 5, 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn insert_batch_commits_all_rows() {
        let (_dir, store) = open_temp();
        let rows = vec![(10, "a".to_string()), (20, "b".to_string()), (i64::MIN, "c".to_string())];
        assert_eq!(store.insert_batch("EU", rows).await.unwrap(), 3);
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.query("EU", i64::MIN, i64::MAX).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reopen_keeps_rows_and_schema() {
        let (dir, store) = open_temp();
        store.insert(entry("NA", 1, "persisted")).await.unwrap();
        drop(store);

        let cfg = StoreConfig {
            db_path: dir.path().join("logs.db"),
            ..StoreConfig::default()
        };
        let reopened = LogStore::open(&cfg).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[test]
    fn open_fails_for_unwritable_location() {
        let dir = tempdir().unwrap();
        let cfg = StoreConfig {
            db_path: dir.path().join("missing-dir").join("logs.db"),
            ..StoreConfig::default()
        };
        assert!(matches!(LogStore::open(&cfg), Err(LogQueryError::Storage(_))));
    }
}
