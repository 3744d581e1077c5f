//! Credit budgeting.
//!
//! Every page request is billed a fixed number of credits, whatever it
//! returns. A city is charged for its tier's full page budget, reserved up
//! front, even when the page loop stops early. The ledger therefore never
//! trails what was actually billed, and the run stops before the first city
//! it cannot pay for in full.

use std::collections::BTreeMap;

use crate::models::{City, PopulationTier, TierPages};

/// Credits billed per page request.
pub const CREDITS_PER_PAGE: u64 = 3;

/// Credits reserved for a city with the given page budget.
pub fn cost(pages: u32) -> u64 {
    CREDITS_PER_PAGE * u64::from(pages)
}

/// Credits reserved for a city under the given tier budgets.
pub fn city_cost(city: &City, pages: &TierPages) -> u64 {
    cost(pages.for_tier(city.tier()))
}

/// Whether `cost` more credits fit under `max_budget`.
pub fn can_afford(current_spend: u64, cost: u64, max_budget: u64) -> bool {
    current_spend
        .checked_add(cost)
        .is_some_and(|total| total <= max_budget)
}

/// Cumulative spend against a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditBudget {
    max_credits: u64,
    spent: u64,
}

impl CreditBudget {
    /// Start a ledger, optionally carrying spend from an earlier run.
    pub fn new(max_credits: u64, spent: u64) -> Self {
        Self { max_credits, spent }
    }

    pub fn max_credits(&self) -> u64 {
        self.max_credits
    }

    pub fn spent(&self) -> u64 {
        self.spent
    }

    pub fn remaining(&self) -> u64 {
        self.max_credits.saturating_sub(self.spent)
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        can_afford(self.spent, cost, self.max_credits)
    }

    /// Record spend. Callers check [`CreditBudget::can_afford`] first.
    pub fn charge(&mut self, cost: u64) {
        debug_assert!(self.can_afford(cost), "charge would exceed the budget");
        self.spent = self.spent.saturating_add(cost);
    }
}

/// Credits needed to visit every city once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditEstimate {
    /// Per tier: (city count, credits)
    pub by_tier: BTreeMap<PopulationTier, (usize, u64)>,
    pub total: u64,
}

/// Sum the reserved cost over the whole city list.
pub fn estimate_total_credits(cities: &[City], pages: &TierPages) -> CreditEstimate {
    let mut estimate = CreditEstimate::default();
    for city in cities {
        let credits = city_cost(city, pages);
        let slot = estimate.by_tier.entry(city.tier()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += credits;
        estimate.total += credits;
    }
    estimate
}
