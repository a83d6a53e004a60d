//! Gateway event envelope.

use chrono::{DateTime, Utc};
use domain::{PaymentMeta, PaymentOutcome};
use serde::{Deserialize, Serialize};

/// The only event type that carries payment outcomes.
pub const TRANSACTION_UPDATED: &str = "transaction.updated";

/// An event posted by the gateway.
///
/// The transaction is only parsed for `transaction.updated` events. Other
/// event types may carry differently shaped data and are kept without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGatewayEvent")]
pub struct GatewayEvent {
    pub event_type: String,
    pub transaction: Option<TransactionData>,
}

#[derive(Deserialize)]
struct RawGatewayEvent {
    #[serde(alias = "event")]
    event_type: String,
    #[serde(default)]
    transaction: Option<serde_json::Value>,
}

impl TryFrom<RawGatewayEvent> for GatewayEvent {
    type Error = serde_json::Error;

    fn try_from(raw: RawGatewayEvent) -> Result<Self, Self::Error> {
        let transaction = match raw.transaction {
            Some(value) if raw.event_type == TRANSACTION_UPDATED => {
                Some(serde_json::from_value(value)?)
            }
            _ => None,
        };
        Ok(Self {
            event_type: raw.event_type,
            transaction,
        })
    }
}

impl GatewayEvent {
    pub fn transaction_updated(transaction: TransactionData) -> Self {
        Self {
            event_type: TRANSACTION_UPDATED.to_string(),
            transaction: Some(transaction),
        }
    }

    pub fn is_transaction_update(&self) -> bool {
        self.event_type == TRANSACTION_UPDATED
    }
}

/// The transaction an event reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    /// Gateway transaction id.
    pub id: String,
    /// The `ORDER-{id}` reference the checkout was opened with.
    pub reference: String,
    /// Gateway status, e.g. `APPROVED`.
    pub status: String,
    /// Amount in minor units.
    #[serde(default, alias = "amount_in_cents")]
    pub amount: Option<i64>,
    #[serde(default)]
    pub payment_method_type: Option<String>,
    /// When the gateway finalized the transaction.
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl TransactionData {
    /// The details recorded on the order alongside the outcome.
    pub fn payment_meta(&self) -> PaymentMeta {
        PaymentMeta {
            transaction_id: Some(self.id.clone()),
            payment_method_type: self.payment_method_type.clone(),
            finalized_at: self.finalized_at,
        }
    }
}

/// Maps a gateway transaction status to a payment outcome.
///
/// Statuses that are not final (or unknown) map to `None`.
pub fn map_status(status: &str) -> Option<PaymentOutcome> {
    match status {
        "APPROVED" => Some(PaymentOutcome::Paid),
        "DECLINED" | "ERROR" => Some(PaymentOutcome::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_map_status() {
        assert_eq!(map_status("APPROVED"), Some(PaymentOutcome::Paid));
        assert_eq!(map_status("DECLINED"), Some(PaymentOutcome::Failed));
        assert_eq!(map_status("ERROR"), Some(PaymentOutcome::Failed));
        assert_eq!(map_status("PENDING"), None);
        assert_eq!(map_status("VOIDED"), None);
        assert_eq!(map_status("approved"), None);
    }

    #[test]
    fn test_parses_envelope() {
        let json = r#"{
            "event_type": "transaction.updated",
            "transaction": {
                "id": "1234-1610641025-49201",
                "reference": "ORDER-7d0c6b2e-2c43-4a7e-9b7f-52b1d2d5f0a1",
                "status": "APPROVED",
                "amount": 4500000,
                "payment_method_type": "CARD",
                "finalized_at": "2024-05-01T12:30:00Z"
            }
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();

        assert!(event.is_transaction_update());
        let tx = event.transaction.unwrap();
        assert_eq!(tx.status, "APPROVED");
        assert_eq!(tx.amount, Some(4500000));
        assert_eq!(
            tx.finalized_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
        );

        let meta = tx.payment_meta();
        assert_eq!(meta.transaction_id.as_deref(), Some("1234-1610641025-49201"));
        assert_eq!(meta.payment_method_type.as_deref(), Some("CARD"));
    }

    #[test]
    fn test_optional_fields_and_aliases() {
        let json = r#"{
            "event": "transaction.updated",
            "transaction": {
                "id": "t-1",
                "reference": "ORDER-x",
                "status": "DECLINED",
                "amount_in_cents": 100
            }
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();

        assert!(event.is_transaction_update());
        let tx = event.transaction.unwrap();
        assert_eq!(tx.amount, Some(100));
        assert!(tx.finalized_at.is_none());
        assert!(tx.payment_method_type.is_none());
    }

    #[test]
    fn test_other_events_skip_transaction_parsing() {
        let json = r#"{
            "event_type": "payment_link.updated",
            "transaction": {"id": "pl-1", "status": "ACTIVE"}
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.event_type, "payment_link.updated");
        assert!(event.transaction.is_none());
    }

    #[test]
    fn test_malformed_transaction_update_is_rejected() {
        let json = r#"{
            "event_type": "transaction.updated",
            "transaction": {"id": "t-1", "status": "APPROVED"}
        }"#;

        assert!(serde_json::from_str::<GatewayEvent>(json).is_err());
    }

    #[test]
    fn test_event_without_transaction() {
        let event: GatewayEvent =
            serde_json::from_str(r#"{"event_type": "transaction.updated"}"#).unwrap();
        assert!(event.transaction.is_none());
    }
}
