//! Subscription price mapping.
//!
//! Payment-processor price ids map to the credits and plan they grant.
//! The table is fixed at compile time; an id missing from it is a known,
//! non-fatal condition handled by the webhook reconciler.

// ---------------------------------------------------------------------------
// Plan names
// ---------------------------------------------------------------------------

/// Implicit tier for users with no account record.
pub const PLAN_FREE: &str = "free";
pub const PLAN_BASIC: &str = "basic";
pub const PLAN_PRO: &str = "pro";
pub const PLAN_PREMIUM: &str = "premium";

// ---------------------------------------------------------------------------
// Price table
// ---------------------------------------------------------------------------

/// What one subscription renewal at a given price grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditGrant {
    pub price_id: &'static str,
    pub credits: i64,
    pub plan: &'static str,
}

/// Processor price id → grant. One row per purchasable tier.
pub const PRICE_GRANTS: &[CreditGrant] = &[
    CreditGrant {
        price_id: "price_1RZGxARrjDStXR6K6i5k60QI",
        credits: 600,
        plan: PLAN_PRO,
    },
    CreditGrant {
        price_id: "price_1ObKABC123xyzEXAMPLE1",
        credits: 300,
        plan: PLAN_BASIC,
    },
    CreditGrant {
        price_id: "price_1ObKXYZ789defEXAMPLE2",
        credits: 1000,
        plan: PLAN_PREMIUM,
    },
];

/// Look up the grant for a processor price id.
pub fn grant_for_price(price_id: &str) -> Option<&'static CreditGrant> {
    PRICE_GRANTS.iter().find(|grant| grant.price_id == price_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
