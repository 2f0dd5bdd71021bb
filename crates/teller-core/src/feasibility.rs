//! # Feasibility Analysis
//!
//! Answers the UI's question: "which payout buttons may I show right now?"
//!
//! ## How a Denomination Becomes Offerable
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  limit = 100, credit = 20, inventory = [5 × 10, 20 × 5], virtual {25}   │
//! │                                                                         │
//! │  1. base = compute_distribution(credit)   → [5 × 10, 20 × 4] remain     │
//! │     (None → the credit itself cannot be paid → whole answer is None)   │
//! │                                                                         │
//! │  2. remaining_limit = limit - credit = 80                               │
//! │                                                                         │
//! │  3. physical d:  remaining count > 0  AND  d ≤ remaining_limit          │
//! │       5 → true,  20 → true                                              │
//! │                                                                         │
//! │  4. virtual v:   v ≤ remaining_limit  AND                               │
//! │                  compute_distribution(v, base.remaining()) is Some      │
//! │       25 → 20 + 5 still available → true                                │
//! │                                                                         │
//! │  isEmpty: no cartridge has notes left after the base distribution       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches live inventory; the base distribution is only ever
//! hypothetical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cartridge::CartridgeInventory;
use crate::distribution::compute_distribution;
use crate::money::Money;

/// Which denominations can be offered at the current credit level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActiveDenominations {
    /// Denomination (physical or virtual) → may it be offered.
    pub active_map: BTreeMap<Money, bool>,

    /// True when no cartridge has notes left once the current credit is paid.
    /// Independent of the limit.
    pub is_empty: bool,
}

impl ActiveDenominations {
    /// Whether `denomination` is currently offerable. Unknown denominations
    /// are never offerable.
    pub fn is_active(&self, denomination: Money) -> bool {
        self.active_map.get(&denomination).copied().unwrap_or(false)
    }

    /// Offerable denominations in ascending order.
    pub fn offerable(&self) -> impl Iterator<Item = Money> + '_ {
        self.active_map
            .iter()
            .filter(|(_, &active)| active)
            .map(|(&denomination, _)| denomination)
    }
}

/// Computes which denominations are offerable given a transaction `limit`
/// and the `current_credit` already committed.
///
/// Returns `None` when `current_credit` itself cannot be paid out exactly.
/// When a virtual denomination coincides with a physical one, the virtual
/// verdict is the one reported.
///
/// ## Example
/// ```rust
/// use teller_core::cartridge::{Cartridge, CartridgeInventory, SetupData};
/// use teller_core::feasibility::active_denominations;
/// use teller_core::money::Money;
///
/// let inventory = CartridgeInventory::from_setup(SetupData {
///     cartridges: vec![
///         Cartridge::new(Money::from_minor(5), 10),
///         Cartridge::new(Money::from_minor(20), 5),
///     ],
///     virtual_cartridges: vec![Money::from_minor(25)],
///     currency: "EUR".into(),
/// }).unwrap();
///
/// let active = active_denominations(&inventory, Money::from_minor(100), Money::from_minor(20)).unwrap();
/// assert!(active.is_active(Money::from_minor(25)));
/// assert!(!active.is_empty);
/// ```
pub fn active_denominations(
    inventory: &CartridgeInventory,
    limit: Money,
    current_credit: Money,
) -> Option<ActiveDenominations> {
    let base = compute_distribution(current_credit, inventory.cartridges())?;
    let remaining_limit = limit.saturating_sub(current_credit);

    let mut active_map = BTreeMap::new();
    let mut is_empty = true;

    for entry in base.entries() {
        if entry.count > 0 {
            is_empty = false;
        }
        active_map.insert(
            entry.denomination,
            entry.count > 0 && entry.denomination <= remaining_limit,
        );
    }

    let after_credit = base.remaining();
    for &denomination in inventory.virtual_denominations() {
        let offerable = denomination <= remaining_limit
            && compute_distribution(denomination, &after_credit).is_some();
        active_map.insert(denomination, offerable);
    }

    Some(ActiveDenominations {
        active_map,
        is_empty,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{Cartridge, SetupData};

    fn inventory(cartridges: &[(i64, u32)], virtuals: &[i64]) -> CartridgeInventory {
        CartridgeInventory::from_setup(SetupData {
            cartridges: cartridges
                .iter()
                .map(|&(d, c)| Cartridge::new(Money::from_minor(d), c))
                .collect(),
            virtual_cartridges: virtuals.iter().copied().map(Money::from_minor).collect(),
            currency: "EUR".to_string(),
        })
        .unwrap()
    }

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    #[test]
    fn test_virtual_denomination_uses_post_credit_inventory() {
        let inv = inventory(&[(5, 10), (20, 5)], &[25]);
        let active = active_denominations(&inv, m(100), m(20)).unwrap();

        assert!(active.is_active(m(5)));
        assert!(active.is_active(m(20)));
        assert!(active.is_active(m(25)));
        assert!(!active.is_empty);
    }

    #[test]
    fn test_virtual_denomination_blocked_by_inventory_not_limit() {
        // Only one 5 loaded; a credit of 5 consumes it, so 25 = 20 + 5 is gone
        // even though 25 is well under the remaining limit.
        let inv = inventory(&[(5, 1), (20, 5)], &[25]);

        let before_credit = active_denominations(&inv, m(100), m(0)).unwrap();
        assert!(before_credit.is_active(m(25)));

        let after_credit = active_denominations(&inv, m(100), m(5)).unwrap();
        assert!(!after_credit.is_active(m(25)));
        assert!(!after_credit.is_active(m(5)));
        assert!(after_credit.is_active(m(20)));
    }

    #[test]
    fn test_limit_caps_denominations() {
        let inv = inventory(&[(5, 10), (20, 5)], &[25]);
        let active = active_denominations(&inv, m(40), m(20)).unwrap();

        assert!(active.is_active(m(5)));
        assert!(active.is_active(m(20)));
        assert!(!active.is_active(m(25)));

        let exhausted = active_denominations(&inv, m(20), m(20)).unwrap();
        assert_eq!(exhausted.offerable().count(), 0);
        assert!(!exhausted.is_empty);
    }

    #[test]
    fn test_credit_over_limit_offers_nothing() {
        let inv = inventory(&[(5, 10), (20, 5)], &[25]);
        let active = active_denominations(&inv, m(20), m(40)).unwrap();
        assert_eq!(active.offerable().count(), 0);
    }

    #[test]
    fn test_extreme_limit_saturates() {
        let inv = inventory(&[(5, 10), (20, 5)], &[25]);

        let active = active_denominations(&inv, m(i64::MIN), m(5)).unwrap();
        assert_eq!(active.offerable().count(), 0);

        let active = active_denominations(&inv, m(i64::MAX), m(0)).unwrap();
        assert_eq!(active.offerable().count(), 3);
    }

    #[test]
    fn test_unpayable_credit_is_none() {
        let inv = inventory(&[(5, 10), (20, 5)], &[]);
        assert!(active_denominations(&inv, m(100), m(7)).is_none());
        assert!(active_denominations(&inv, m(500), m(155)).is_none());
    }

    #[test]
    fn test_is_empty_when_credit_drains_everything() {
        let inv = inventory(&[(5, 2), (20, 1)], &[25]);
        let active = active_denominations(&inv, m(1000), m(30)).unwrap();

        assert!(active.is_empty);
        assert_eq!(active.offerable().count(), 0);
    }

    #[test]
    fn test_active_never_exceeds_remaining_limit() {
        let inv = inventory(&[(5, 10), (10, 4), (20, 5), (50, 2)], &[15, 25, 70]);

        for limit in (0..=300).step_by(5) {
            for credit in (0..=limit).step_by(5) {
                if let Some(active) = active_denominations(&inv, m(limit), m(credit)) {
                    for denomination in active.offerable() {
                        assert!(denomination <= m(limit) - m(credit));
                    }
                }
            }
        }
    }

    #[test]
    fn test_does_not_mutate_inventory() {
        let inv = inventory(&[(5, 10), (20, 5)], &[25]);
        let before = inv.clone();
        let _ = active_denominations(&inv, m(100), m(60));
        assert_eq!(inv, before);
    }

    #[test]
    fn test_serializes_camel_case() {
        let inv = inventory(&[(5, 1)], &[]);
        let active = active_denominations(&inv, m(10), m(0)).unwrap();
        let json = serde_json::to_string(&active).unwrap();
        assert_eq!(json, r#"{"activeMap":{"5":true},"isEmpty":false}"#);
    }
}
