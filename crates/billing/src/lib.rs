//! `storefront-billing` — subscription access gating.
//!
//! Classifies a business account into an access state (exempt / active /
//! grace-period / blocked) from persisted subscription fields and an explicit
//! evaluation instant. Pure domain logic; enforcement (refusing orders,
//! rendering banners) is the caller's concern.

pub mod gate;
pub mod subscription;

pub use gate::{AccessDecision, AccessState, GracePolicy, classify, classify_now};
pub use subscription::{BusinessAccount, RawBusinessAccount, SubscriptionStatus};
