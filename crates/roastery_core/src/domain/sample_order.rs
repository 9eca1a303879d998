//! Sample-order documents and the fulfillment status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on line items in one sample request.
pub const MAX_SAMPLE_ITEMS: usize = 10;

/// Fulfillment status of a sample order.
///
/// `Pending -> Processing -> Shipped -> Delivered`, with `Cancelled`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

text_enum!(OrderStatus {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Position along the fulfillment chain; `None` for `Cancelled`.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// Forward moves may skip steps. Re-setting the current status is allowed
    /// and treated as a no-op by the service.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

/// One requested sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SampleItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ShippingDetails {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub company: Option<String>,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SampleOrder {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub items: Vec<SampleItem>,
    pub shipping: ShippingDetails,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the cart checkout submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewSampleOrder {
    pub items: Vec<SampleItem>,
    pub shipping: ShippingDetails,
}

/// Admin sample-order panel filter. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct SampleOrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
}

impl SampleOrderFilter {
    pub fn accepts(&self, order: &SampleOrder) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self.user_id.map_or(true, |u| order.user_id == u)
    }
}

/// Human-readable label for an order id, e.g. `SMP-3F2A-91C0-77DE`.
pub fn order_number_for(id: Uuid) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("SMP-{}-{}-{}", &hex[0..4], &hex[4..8], &hex[8..12])
}
