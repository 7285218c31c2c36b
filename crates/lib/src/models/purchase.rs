use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// A record of tickets bought against one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Random identifier used as the external reference
    pub id: String,
    pub event_id: i64,
    pub buyer_name: String,
    pub qty: i64,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// Build a purchase with a fresh identifier and the current time
    pub fn new(event_id: i64, buyer_name: &str, qty: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id,
            buyer_name: buyer_name.to_string(),
            qty,
            created_at: current_timestamp(),
        }
    }
}

/// Read-only projection of a purchase joined with its event's name
///
/// `event_name` is `None` when the referenced event no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseView {
    pub id: String,
    pub event_id: i64,
    pub event_name: Option<String>,
    pub buyer_name: String,
    pub qty: i64,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Current UTC time at the precision timestamps are stored with
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 form, so text ordering matches time ordering
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_purchase_has_unique_id() {
        let a = Purchase::new(1, "Alice", 2);
        let b = Purchase::new(1, "Alice", 2);
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
        assert_eq!(a.event_id, 1);
        assert_eq!(a.buyer_name, "Alice");
        assert_eq!(a.qty, 2);
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 3, 20, 19, 0, 0).unwrap();
        assert_eq!(format_timestamp(&whole), "2026-03-20T19:00:00.000000Z");

        let later = whole + chrono::Duration::microseconds(1);
        assert!(format_timestamp(&later) > format_timestamp(&whole));
    }

    #[test]
    fn test_purchase_view_serializes_missing_event_as_null() {
        let view = PurchaseView {
            id: "abc".to_string(),
            event_id: 42,
            event_name: None,
            buyer_name: "Bob".to_string(),
            qty: 1,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&view).unwrap();
        assert!(value["event_name"].is_null());
        assert_eq!(value["created_at"], "2026-01-01T00:00:00.000000Z");
    }
}
