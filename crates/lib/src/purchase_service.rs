//! Purchase coordinator that validates requests before they reach the store

use crate::{
    db::{Database, PersistenceError},
    models::Purchase,
};

#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Event not found")]
    NotFound,

    #[error("Not enough tickets available")]
    InsufficientInventory,

    #[error("Storage error: {0}")]
    Storage(#[source] PersistenceError),
}

impl PurchaseError {
    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, PurchaseError::Storage(_))
    }
}

impl From<PersistenceError> for PurchaseError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::EventNotFound { .. } => PurchaseError::NotFound,
            PersistenceError::InsufficientTickets { .. } => PurchaseError::InsufficientInventory,
            other => PurchaseError::Storage(other),
        }
    }
}

/// Service for recording ticket purchases
#[derive(Clone, Debug)]
pub struct PurchaseService {
    db: Database,
}

impl PurchaseService {
    /// Create a new purchase service
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Validate a purchase intent and record it against the event's inventory
    pub async fn submit_purchase(
        &self,
        event_id: i64,
        buyer_name: &str,
        qty: i64,
    ) -> Result<Purchase, PurchaseError> {
        Self::validate(event_id, buyer_name, qty)?;

        match self.db.purchase(event_id, buyer_name, qty).await {
            Ok(purchase) => Ok(purchase),
            Err(err) => {
                let err = PurchaseError::from(err);
                if err.is_client_fault() {
                    log::debug!("Purchase for event {} rejected: {}", event_id, err);
                } else {
                    log::error!("Purchase for event {} failed: {}", event_id, err);
                }
                Err(err)
            }
        }
    }

    fn validate(event_id: i64, buyer_name: &str, qty: i64) -> Result<(), PurchaseError> {
        if event_id <= 0 {
            return Err(PurchaseError::InvalidRequest(
                "Invalid purchase data: eventId must be a positive integer".to_string(),
            ));
        }
        if buyer_name.trim().is_empty() {
            return Err(PurchaseError::InvalidRequest(
                "Invalid purchase data: buyerName is required".to_string(),
            ));
        }
        if qty <= 0 {
            return Err(PurchaseError::InvalidRequest(
                "Invalid purchase data: qty must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEvent;

    async fn setup() -> (Database, PurchaseService, i64) {
        let db = Database::new_test()
            .await
            .expect("Failed to create test database");
        let event_id = db
            .create_event(&NewEvent::new("Konser B - Rock Live", "2026-04-10", 200_000, 3))
            .await
            .expect("Failed to create test event");
        let service = PurchaseService::new(db.clone());
        (db, service, event_id)
    }

    #[tokio::test]
    async fn test_submit_purchase() {
        let (db, service, event_id) = setup().await;

        let purchase = service
            .submit_purchase(event_id, "Alice", 2)
            .await
            .expect("Purchase should succeed");
        assert_eq!(purchase.event_id, event_id);
        assert_eq!(purchase.qty, 2);
        assert_eq!(db.get_event(event_id).await.unwrap().available_tickets, 1);

        db.close().await;
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let (db, service, event_id) = setup().await;

        for (id, buyer, qty) in [
            (0, "Alice", 1),
            (-4, "Alice", 1),
            (event_id, "", 1),
            (event_id, "   ", 1),
            (event_id, "Alice", 0),
            (event_id, "Alice", -2),
        ] {
            let result = service.submit_purchase(id, buyer, qty).await;
            assert!(
                matches!(result, Err(PurchaseError::InvalidRequest(_))),
                "expected invalid request for ({}, {:?}, {})",
                id,
                buyer,
                qty
            );
        }

        assert_eq!(db.get_event(event_id).await.unwrap().available_tickets, 3);
        assert!(db.list_purchases().await.unwrap().is_empty());

        db.close().await;
    }

    #[tokio::test]
    async fn test_validation_happens_before_store_access() {
        let (db, service, _) = setup().await;
        db.close().await;

        // The pool is closed, so anything reaching the store would fail as storage
        let result = service.submit_purchase(0, "Alice", 1).await;
        assert!(matches!(result, Err(PurchaseError::InvalidRequest(_))));

        let result = service.submit_purchase(1, "Alice", 1).await;
        assert!(matches!(result, Err(PurchaseError::Storage(_))));
        assert!(!result.unwrap_err().is_client_fault());
    }

    #[tokio::test]
    async fn test_store_failures_map_to_error_kinds() {
        let (db, service, event_id) = setup().await;

        let result = service.submit_purchase(event_id, "Bob", 5).await;
        assert!(matches!(result, Err(PurchaseError::InsufficientInventory)));
        assert!(result.unwrap_err().is_client_fault());

        let result = service.submit_purchase(event_id + 100, "Bob", 1).await;
        assert!(matches!(result, Err(PurchaseError::NotFound)));
        assert!(result.unwrap_err().is_client_fault());

        assert_eq!(db.get_event(event_id).await.unwrap().available_tickets, 3);

        db.close().await;
    }
}
