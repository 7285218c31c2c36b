use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};
use tokio::sync::{Mutex, MutexGuard};

use crate::app_config::DatabaseSettings;

pub mod events;
pub mod purchases;

// Error types for database operations

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event not found: {id}")]
    EventNotFound { id: i64 },

    #[error("Not enough tickets available: requested {requested}, available {available}")]
    InsufficientTickets { requested: i64, available: i64 },

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Per-event purchase locks, created on demand
type EventLocks = Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>;

/// Handle on one event's purchase lock
///
/// Dropping the handle removes the registry entry once no other handle for
/// the same event is alive, including when the owning future is cancelled.
pub(crate) struct EventLockHandle {
    event_id: i64,
    lock: Arc<Mutex<()>>,
    registry: EventLocks,
}

impl EventLockHandle {
    /// Wait for exclusive access to the event
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for EventLockHandle {
    fn drop(&mut self) {
        let mut locks = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Handles are only cloned under the registry lock, so two references
        // mean the registry and this handle are the last holders
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.event_id);
        }
    }
}

/// Database connection manager
///
/// Cloning is cheap and every clone shares the same pool, so one handle is
/// opened at startup and passed to whatever needs it.
#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
    event_locks: EventLocks,
}

impl Database {
    /// Open the configured database and run migrations
    pub async fn new(settings: &DatabaseSettings) -> Result<Self, PersistenceError> {
        let database_url = settings.url.as_str();
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)?;

        if database_url.starts_with("sqlite:") && !in_memory {
            let db_path = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
                .unwrap_or(database_url);
            let db_path = db_path.split('?').next().unwrap_or(db_path);

            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        PersistenceError::Migration(format!(
                            "Failed to create database directory: {}",
                            e
                        ))
                    })?;
                }
            }

            options = options
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        log::info!("Opened database {}", database_url);

        Self::migrate(pool).await
    }

    /// Create a new in-memory database for testing
    ///
    /// The pool holds a single connection that never expires, because the
    /// in-memory database disappears with its last connection.
    pub async fn new_test() -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, PersistenceError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Migration(e.to_string()))?;

        Ok(Self {
            pool,
            event_locks: Arc::new(StdMutex::new(HashMap::new())),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the lock serializing purchases against one event
    pub(crate) fn event_lock(&self, event_id: i64) -> EventLockHandle {
        let mut locks = self
            .event_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let lock = locks.entry(event_id).or_default().clone();

        EventLockHandle {
            event_id,
            lock,
            registry: self.event_locks.clone(),
        }
    }

    #[cfg(test)]
    fn registered_event_locks(&self) -> usize {
        self.event_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_database_creation() {
        let db = Database::new_test()
            .await
            .expect("Failed to create test database");

        // Test that we can get a pool reference
        let _pool = db.pool();

        db.close().await;
    }

    #[tokio::test]
    async fn test_database_migrations() {
        let db = Database::new_test()
            .await
            .expect("Failed to create test database");

        let event_count = sqlx::query("SELECT COUNT(*) as count FROM events")
            .fetch_one(db.pool())
            .await
            .expect("Failed to query events table");

        assert_eq!(event_count.get::<i64, _>("count"), 0);

        let purchase_count = sqlx::query("SELECT COUNT(*) as count FROM purchases")
            .fetch_one(db.pool())
            .await
            .expect("Failed to query purchases table");

        assert_eq!(purchase_count.get::<i64, _>("count"), 0);

        db.close().await;
    }

    #[tokio::test]
    async fn test_event_locks_are_released() {
        let db = Database::new_test()
            .await
            .expect("Failed to create test database");

        let first = db.event_lock(7);
        let second = db.event_lock(7);
        assert_eq!(db.registered_event_locks(), 1);

        drop(first);
        assert_eq!(db.registered_event_locks(), 1);

        drop(second);
        assert_eq!(db.registered_event_locks(), 0);

        db.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_purchase_releases_event_lock() {
        let db = Database::new_test()
            .await
            .expect("Failed to create test database");

        let held = db.event_lock(7);
        let guard = held.lock().await;

        // The purchase waits on the held lock and is dropped by the timeout
        let result =
            tokio::time::timeout(Duration::from_millis(20), db.purchase(7, "Alice", 1)).await;
        assert!(result.is_err());
        assert_eq!(db.registered_event_locks(), 1);

        drop(guard);
        drop(held);
        assert_eq!(db.registered_event_locks(), 0);

        db.close().await;
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = std::env::temp_dir().join(format!("ticket-desk-{}", uuid::Uuid::new_v4()));
        let settings = DatabaseSettings {
            url: format!("sqlite:{}", dir.join("nested").join("tickets.db").display()),
            ..DatabaseSettings::default()
        };

        let db = Database::new(&settings)
            .await
            .expect("Failed to open file database");
        assert_eq!(db.count_events().await.unwrap(), 0);
        db.close().await;

        assert!(dir.join("nested").join("tickets.db").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
