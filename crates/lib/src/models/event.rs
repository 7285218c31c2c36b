use serde::{Deserialize, Serialize};

/// A ticketed occurrence with a finite inventory
///
/// `available_tickets` is the only field that changes after creation, and only
/// successful purchases decrement it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    /// Calendar date, stored and returned as given
    pub date: String,
    /// Price in the smallest currency unit
    pub price: i64,
    pub available_tickets: i64,
}

/// Values for inserting a new event; the id is assigned by the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub date: String,
    pub price: i64,
    pub available_tickets: i64,
}

impl NewEvent {
    pub fn new(name: &str, date: &str, price: i64, available_tickets: i64) -> Self {
        Self {
            name: name.to_string(),
            date: date.to_string(),
            price,
            available_tickets,
        }
    }
}

/// Events inserted into an empty database at first startup
pub fn sample_events() -> Vec<NewEvent> {
    vec![
        NewEvent::new("Konser A - Pop Night", "2026-03-20", 150_000, 100),
        NewEvent::new("Konser B - Rock Live", "2026-04-10", 200_000, 80),
        NewEvent::new("Konser C - Jazz Evening", "2026-05-05", 120_000, 50),
    ]
}
