//! Access classification for business accounts.
//!
//! `classify` is a total, side-effect-free function: any missing or malformed
//! field degrades to the most restrictive applicable state, never an error.

use chrono::{DateTime, Utc};

use storefront_core::Clock;

use crate::subscription::BusinessAccount;

const MS_PER_DAY: i64 = 86_400_000;

/// Grace window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracePolicy {
    /// Days of access after the grace anchor once the subscription lapses.
    pub window_days: u32,
}

impl Default for GracePolicy {
    fn default() -> Self {
        Self { window_days: 14 }
    }
}

/// Access state of a business account at an evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// Exempt from subscription enforcement entirely.
    Exempt,
    /// Subscription in good standing.
    Active,
    /// Lapsed, but still within the grace window.
    GracePeriod,
    /// No access; a subscription is required.
    Blocked,
}

/// Classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub state: AccessState,
    pub reason: Option<&'static str>,
    /// Whole days left in the grace window; set only for `GracePeriod`,
    /// always within `1..=window_days`.
    pub days_remaining: Option<i64>,
}

impl AccessDecision {
    fn exempt() -> Self {
        Self {
            state: AccessState::Exempt,
            reason: None,
            days_remaining: None,
        }
    }

    fn active() -> Self {
        Self {
            state: AccessState::Active,
            reason: None,
            days_remaining: None,
        }
    }

    fn grace(days_remaining: i64) -> Self {
        Self {
            state: AccessState::GracePeriod,
            reason: Some("Subscription inactive. Access continues until the grace period ends."),
            days_remaining: Some(days_remaining),
        }
    }

    fn blocked() -> Self {
        Self {
            state: AccessState::Blocked,
            reason: Some("An active subscription is required to continue accepting orders."),
            days_remaining: None,
        }
    }

    /// Whether order acceptance is permitted under this decision.
    pub fn allows_orders(&self) -> bool {
        !matches!(self.state, AccessState::Blocked)
    }
}

/// Classify `account` at instant `now` under `policy`.
///
/// Rules, in order:
/// 1. Non-profit or grandfathered accounts are exempt; these flags override
///    every other field.
/// 2. An `active` or `trialing` subscription grants unrestricted access.
/// 3. Otherwise the account gets a grace window of `policy.window_days`
///    measured from the grace anchor: the more recent of `approved_at` and
///    `subscription_current_period_end`. A missing `approved_at` means no
///    grace period at all (fail safe toward restriction).
/// 4. Past the window, the account is blocked.
///
/// All instants are compared as epoch milliseconds within the single call, so
/// day boundaries cannot shift with timezone truncation.
pub fn classify(account: &BusinessAccount, now: DateTime<Utc>, policy: &GracePolicy) -> AccessDecision {
    if account.non_profit || account.grandfathered {
        return AccessDecision::exempt();
    }

    if account.subscription_status.grants_access() {
        return AccessDecision::active();
    }

    let Some(approved_at) = account.approved_at else {
        return AccessDecision::blocked();
    };

    let mut anchor_ms = approved_at.timestamp_millis();
    if let Some(period_end) = account.subscription_current_period_end {
        anchor_ms = anchor_ms.max(period_end.timestamp_millis());
    }

    let window_ms = i64::from(policy.window_days).saturating_mul(MS_PER_DAY);
    let window_end_ms = anchor_ms.saturating_add(window_ms);
    let remaining_ms = window_end_ms.saturating_sub(now.timestamp_millis());

    if remaining_ms <= 0 {
        return AccessDecision::blocked();
    }

    // Ceiling division: a partial day still counts as a remaining day.
    // Div-plus-remainder form so a saturated remaining_ms cannot wrap.
    let days_remaining = remaining_ms / MS_PER_DAY + i64::from(remaining_ms % MS_PER_DAY != 0);
    AccessDecision::grace(days_remaining.min(i64::from(policy.window_days)))
}

/// Classify against the current wall-clock time.
///
/// Thin convenience over [`classify`] for callers holding a [`Clock`];
/// classification itself stays pure.
pub fn classify_now<C: Clock>(
    account: &BusinessAccount,
    clock: &C,
    policy: &GracePolicy,
) -> AccessDecision {
    classify(account, clock.now(), policy)
}
