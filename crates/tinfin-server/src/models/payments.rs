//! Payment provider webhook payloads

use serde::Deserialize;
use time::OffsetDateTime;
use tinfin_registry::{PaymentRecord, PaymentStatus};

/// A payment event, tagged by `type` with the order under `data`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    #[serde(rename = "order.paid")]
    OrderPaid(OrderData),

    #[serde(rename = "order.refunded")]
    OrderRefunded(OrderData),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderData {
    /// Provider order id
    pub id: String,
    pub user_id: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
}

impl PaymentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentEvent::OrderPaid(_) => "order.paid",
            PaymentEvent::OrderRefunded(_) => "order.refunded",
        }
    }

    /// The payment record this event leaves behind
    pub fn into_record(self, now: OffsetDateTime) -> PaymentRecord {
        let (status, order) = match self {
            PaymentEvent::OrderPaid(order) => (PaymentStatus::Paid, order),
            PaymentEvent::OrderRefunded(order) => (PaymentStatus::Refunded, order),
        };

        PaymentRecord {
            id: order.id,
            user_id: order.user_id,
            status,
            amount: order.amount,
            currency: order.currency,
            created_at: now,
        }
    }
}
