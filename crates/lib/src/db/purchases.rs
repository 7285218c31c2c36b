use super::{Database, PersistenceError};

use crate::models::{format_timestamp, Purchase, PurchaseView};

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Database {
    /// Buy `qty` tickets for an event as one atomic unit
    ///
    /// Purchases against the same event are serialized; the availability
    /// check, the decrement and the purchase row all happen inside a single
    /// transaction that is rolled back on every failure path.
    pub async fn purchase(
        &self,
        event_id: i64,
        buyer_name: &str,
        qty: i64,
    ) -> Result<Purchase, PersistenceError> {
        let lock = self.event_lock(event_id);
        let _guard = lock.lock().await;

        self.purchase_in_transaction(event_id, buyer_name, qty)
            .await
    }

    async fn purchase_in_transaction(
        &self,
        event_id: i64,
        buyer_name: &str,
        qty: i64,
    ) -> Result<Purchase, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        // Writing first takes the write lock before availability is read,
        // so the check and the decrement see the same row state
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE events SET available_tickets = available_tickets - ?
            WHERE id = ? AND available_tickets >= ?
            RETURNING available_tickets
            "#,
        )
        .bind(qty)
        .bind(event_id)
        .bind(qty)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(remaining) = remaining else {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT available_tickets FROM events WHERE id = ?")
                    .bind(event_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Err(match available {
                None => PersistenceError::EventNotFound { id: event_id },
                Some(available) => PersistenceError::InsufficientTickets {
                    requested: qty,
                    available,
                },
            });
        };

        let purchase = Purchase::new(event_id, buyer_name, qty);

        sqlx::query(
            "INSERT INTO purchases (id, event_id, buyer_name, qty, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&purchase.id)
        .bind(purchase.event_id)
        .bind(&purchase.buyer_name)
        .bind(purchase.qty)
        .bind(format_timestamp(&purchase.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Purchase {} committed: {} ticket(s) for event {}, {} remaining",
            purchase.id,
            qty,
            event_id,
            remaining
        );

        Ok(purchase)
    }

    /// List all purchases with their event names, most recent first
    pub async fn list_purchases(&self) -> Result<Vec<PurchaseView>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.event_id, e.name AS event_name, p.buyer_name, p.qty, p.created_at
            FROM purchases p
            LEFT JOIN events e ON p.event_id = e.id
            ORDER BY p.created_at DESC, p.rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut purchases = Vec::with_capacity(rows.len());
        for row in rows {
            purchases.push(PurchaseView {
                id: row.try_get("id")?,
                event_id: row.try_get("event_id")?,
                event_name: row.try_get("event_name")?,
                buyer_name: row.try_get("buyer_name")?,
                qty: row.try_get("qty")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(purchases)
    }

    /// List the purchases recorded against one event, most recent first
    pub async fn list_purchases_for_event(
        &self,
        event_id: i64,
    ) -> Result<Vec<Purchase>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, buyer_name, qty, created_at
            FROM purchases
            WHERE event_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(purchase_from_row)
            .collect::<Result<_, sqlx::Error>>()
            .map_err(PersistenceError::from)
    }
}

fn purchase_from_row(row: &SqliteRow) -> Result<Purchase, sqlx::Error> {
    Ok(Purchase {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        buyer_name: row.try_get("buyer_name")?,
        qty: row.try_get("qty")?,
        created_at: row.try_get("created_at")?,
    })
}
