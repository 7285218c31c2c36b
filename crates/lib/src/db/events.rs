use super::{Database, PersistenceError};

use crate::models::{sample_events, Event, NewEvent};

use sqlx::Row;

impl Database {
    /// List all events
    pub async fn list_events(&self) -> Result<Vec<Event>, PersistenceError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, name, date, price, available_tickets FROM events ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get a single event by id
    pub async fn get_event(&self, event_id: i64) -> Result<Event, PersistenceError> {
        sqlx::query_as::<_, Event>(
            "SELECT id, name, date, price, available_tickets FROM events WHERE id = ?",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PersistenceError::EventNotFound { id: event_id })
    }

    /// Count the stored events
    pub async fn count_events(&self) -> Result<i64, PersistenceError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }

    /// Insert an event and return its assigned id
    pub async fn create_event(&self, event: &NewEvent) -> Result<i64, PersistenceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO events (name, date, price, available_tickets)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&event.name)
        .bind(&event.date)
        .bind(event.price)
        .bind(event.available_tickets)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.try_get("id")?)
    }

    /// Insert the sample events if the events table is empty
    ///
    /// Returns how many events were inserted, which is zero once seeded.
    pub async fn seed_events_if_empty(&self) -> Result<usize, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query("SELECT COUNT(*) as count FROM events")
            .fetch_one(&mut *tx)
            .await?
            .try_get("count")?;

        if count > 0 {
            return Ok(0);
        }

        let events = sample_events();
        for event in &events {
            sqlx::query(
                "INSERT INTO events (name, date, price, available_tickets) VALUES (?, ?, ?, ?)",
            )
            .bind(&event.name)
            .bind(&event.date)
            .bind(event.price)
            .bind(event.available_tickets)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::info!("Seeded {} sample events", events.len());
        Ok(events.len())
    }
}
