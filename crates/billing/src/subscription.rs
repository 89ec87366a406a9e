//! Business account snapshot: subscription fields as persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::BusinessId;

/// Subscription lifecycle status, mirroring the payment platform's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    Unpaid,
    /// No subscription on record.
    None,
}

impl SubscriptionStatus {
    /// Lenient parse from a stored status string.
    ///
    /// Unknown strings map to `None` so a new platform-side status can never
    /// widen access by accident.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "unpaid" => Self::Unpaid,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::Unpaid => "unpaid",
            Self::None => "none",
        }
    }

    /// Statuses that grant unrestricted access on their own.
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Validated business account snapshot, as consumed by [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessAccount {
    pub id: BusinessId,
    pub subscription_status: SubscriptionStatus,
    pub subscription_current_period_end: Option<DateTime<Utc>>,
    pub grandfathered: bool,
    pub non_profit: bool,
    /// When the business was first approved; anchors the grace period.
    pub approved_at: Option<DateTime<Utc>>,
}

/// Lenient view of the stored account document.
///
/// Documents written over the life of the product are missing fields and carry
/// free-form status strings; everything here is optional and coerced once at
/// this boundary instead of trusting ambient shape downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBusinessAccount {
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub subscription_current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub grandfathered: Option<bool>,
    #[serde(default)]
    pub non_profit: Option<bool>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

impl RawBusinessAccount {
    /// Coerce into a validated snapshot. Missing booleans default to `false`,
    /// a missing or unknown status to [`SubscriptionStatus::None`].
    pub fn into_account(self, id: BusinessId) -> BusinessAccount {
        BusinessAccount {
            id,
            subscription_status: self
                .subscription_status
                .as_deref()
                .map(SubscriptionStatus::parse)
                .unwrap_or(SubscriptionStatus::None),
            subscription_current_period_end: self.subscription_current_period_end,
            grandfathered: self.grandfathered.unwrap_or(false),
            non_profit: self.non_profit.unwrap_or(false),
            approved_at: self.approved_at,
        }
    }
}
