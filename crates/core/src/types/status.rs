//! Order fulfillment status.

use serde::{Deserialize, Serialize};

/// Fulfillment progress of an order, independent of payment state.
///
/// Advances monotonically by administrative action; backward transitions
/// are rejected by [`OrderStatus::can_transition_to`]. Re-asserting the
/// current status is allowed so retried updates stay idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Processing,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    /// Position in the fulfillment sequence.
    const fn rank(self) -> u8 {
        match self {
            Self::Processing => 0,
            Self::OutForDelivery => 1,
            Self::Delivered => 2,
        }
    }

    /// Whether an administrative update from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "Processing"),
            Self::OutForDelivery => write!(f, "Out for Delivery"),
            Self::Delivered => write!(f, "Delivered"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Out for Delivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_from_str_round_trip() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("Cancelled".parse::<OrderStatus>().is_err());
        assert!("processing".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::OutForDelivery));
        assert!(OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Delivered));
        // Skipping a step is fine
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::OutForDelivery));
        assert!(!OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_same_status_is_a_no_op_transition() {
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
    }
}
