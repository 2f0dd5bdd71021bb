//! # Distribution Engine
//!
//! Computes how many notes to take from each cartridge to pay out an exact
//! amount.
//!
//! ## Algorithm (greedy, highest denomination first)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  target = 100, cartridges = [5.00 × 10, 20.00 × 5]  (amounts in minor)  │
//! │                                                                         │
//! │  walk high → low:                                                       │
//! │    20 × min(100 / 20, 5)  = 5 notes   remaining = 0                     │
//! │     5 × min(0 / 5, 10)    = 0 notes   remaining = 0                     │
//! │                                                                         │
//! │  output keeps the input order (low → high):                             │
//! │    [{5, count: 10, dispense: 0}, {20, count: 0, dispense: 5}]           │
//! │                                                                         │
//! │  remaining ≠ 0 after the walk  →  None (never over- or under-pay)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Greedy minimizes the note count and is exact for the small, "friendly"
//! denomination sets dispensers carry. It is not a general coin-change
//! solver: `[3 × 2, 5 × 1]` reports 6 as infeasible even though `3 + 3`
//! would work.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cartridge::Cartridge;
use crate::money::Money;

// =============================================================================
// Distribution Types
// =============================================================================

/// One cartridge's share of a proposed payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DistributionEntry {
    pub denomination: Money,

    /// Notes left in the cartridge after this payout.
    pub count: u32,

    /// Notes to dispense now.
    pub dispense: u32,
}

impl DistributionEntry {
    /// The cartridge as it would look after the payout.
    #[inline]
    pub const fn remaining(&self) -> Cartridge {
        Cartridge::new(self.denomination, self.count)
    }
}

/// A proposed payout: one entry per cartridge, in cartridge order.
///
/// A distribution is a proposal, never inventory. Nothing in this crate
/// mutates one after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Distribution(Vec<DistributionEntry>);

impl Distribution {
    #[inline]
    pub fn entries(&self) -> &[DistributionEntry] {
        &self.0
    }

    /// Σ dispense × denomination; equals the requested amount by construction.
    pub fn total(&self) -> Money {
        self.0.iter().map(|e| e.denomination.times(e.dispense)).sum()
    }

    /// Per-cartridge dispense counts, the shape a device command takes.
    pub fn note_counts(&self) -> Vec<u32> {
        self.0.iter().map(|e| e.dispense).collect()
    }

    /// Total notes in the payout.
    pub fn note_total(&self) -> u64 {
        self.0.iter().map(|e| u64::from(e.dispense)).sum()
    }

    /// The post-payout cartridges; can be fed back into
    /// [`compute_distribution`].
    pub fn remaining(&self) -> Vec<Cartridge> {
        self.0.iter().map(DistributionEntry::remaining).collect()
    }
}

impl IntoIterator for Distribution {
    type Item = DistributionEntry;
    type IntoIter = std::vec::IntoIter<DistributionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Computes an exact-change distribution of `target` over `cartridges`.
///
/// `cartridges` must be ascending by denomination (a
/// [`CartridgeInventory`](crate::cartridge::CartridgeInventory) guarantees
/// this). Returns `None` when the greedy walk cannot hit `target` exactly,
/// including for negative targets.
///
/// ## Example
/// ```rust
/// use teller_core::cartridge::Cartridge;
/// use teller_core::distribution::compute_distribution;
/// use teller_core::money::Money;
///
/// let cartridges = [
///     Cartridge::new(Money::from_minor(5), 10),
///     Cartridge::new(Money::from_minor(20), 5),
/// ];
///
/// let distribution = compute_distribution(Money::from_minor(100), &cartridges).unwrap();
/// assert_eq!(distribution.note_counts(), vec![0, 5]);
///
/// assert!(compute_distribution(Money::from_minor(107), &cartridges).is_none());
/// ```
pub fn compute_distribution(target: Money, cartridges: &[Cartridge]) -> Option<Distribution> {
    if target.is_negative() {
        return None;
    }

    let mut remaining = target;
    let mut entries = vec![DistributionEntry {
        denomination: Money::zero(),
        count: 0,
        dispense: 0,
    }; cartridges.len()];

    for (slot, cartridge) in entries.iter_mut().zip(cartridges).rev() {
        let wanted = remaining.whole_multiples_of(cartridge.denomination);
        let take = wanted.min(u64::from(cartridge.count)) as u32;

        remaining -= cartridge.denomination.times(take);
        *slot = DistributionEntry {
            denomination: cartridge.denomination,
            count: cartridge.count - take,
            dispense: take,
        };
    }

    if !remaining.is_zero() {
        return None;
    }

    Some(Distribution(entries))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cartridges(layout: &[(i64, u32)]) -> Vec<Cartridge> {
        layout
            .iter()
            .map(|&(d, c)| Cartridge::new(Money::from_minor(d), c))
            .collect()
    }

    fn entry(denomination: i64, count: u32, dispense: u32) -> DistributionEntry {
        DistributionEntry {
            denomination: Money::from_minor(denomination),
            count,
            dispense,
        }
    }

    #[test]
    fn test_highest_denomination_first() {
        let loaded = cartridges(&[(5, 10), (20, 5)]);
        let distribution = compute_distribution(Money::from_minor(100), &loaded).unwrap();

        assert_eq!(
            distribution.entries(),
            &[entry(5, 10, 0), entry(20, 0, 5)]
        );

        let by_denomination: Vec<(i64, u32)> = distribution
            .into_iter()
            .map(|e| (e.denomination.minor(), e.dispense))
            .collect();
        assert_eq!(by_denomination, vec![(5, 0), (20, 5)]);
    }

    #[test]
    fn test_unrepresentable_amount() {
        let loaded = cartridges(&[(5, 10), (20, 5)]);
        assert!(compute_distribution(Money::from_minor(107), &loaded).is_none());
    }

    #[test]
    fn test_falls_back_to_lower_denomination_when_exhausted() {
        let loaded = cartridges(&[(5, 10), (20, 2)]);
        let distribution = compute_distribution(Money::from_minor(60), &loaded).unwrap();

        assert_eq!(distribution.entries(), &[entry(5, 6, 4), entry(20, 0, 2)]);
    }

    #[test]
    fn test_more_than_inventory_is_infeasible() {
        let loaded = cartridges(&[(5, 10), (20, 5)]);
        assert!(compute_distribution(Money::from_minor(155), &loaded).is_none());
        assert!(compute_distribution(Money::from_minor(150), &loaded).is_some());
    }

    #[test]
    fn test_zero_and_negative_targets() {
        let loaded = cartridges(&[(5, 10), (20, 5)]);

        let zero = compute_distribution(Money::zero(), &loaded).unwrap();
        assert_eq!(zero.note_total(), 0);
        assert_eq!(zero.remaining(), loaded);

        assert!(compute_distribution(Money::from_minor(-20), &loaded).is_none());
    }

    #[test]
    fn test_empty_cartridge_list() {
        assert_eq!(
            compute_distribution(Money::zero(), &[]),
            Some(Distribution(vec![]))
        );
        assert!(compute_distribution(Money::from_minor(5), &[]).is_none());
    }

    #[test]
    fn test_greedy_is_not_general_coin_change() {
        let loaded = cartridges(&[(3, 2), (5, 1)]);
        assert!(compute_distribution(Money::from_minor(6), &loaded).is_none());
    }

    #[test]
    fn test_exactness_and_conservation() {
        let loaded = cartridges(&[(1, 3), (5, 4), (10, 2), (50, 1)]);
        let capacity: i64 = loaded.iter().map(|c| c.value().minor()).sum();

        for amount in 0..=capacity + 5 {
            let target = Money::from_minor(amount);
            if let Some(distribution) = compute_distribution(target, &loaded) {
                assert_eq!(distribution.total(), target);
                for (entry, before) in distribution.entries().iter().zip(&loaded) {
                    assert_eq!(entry.denomination, before.denomination);
                    assert_eq!(entry.dispense + entry.count, before.count);
                }
            }
        }
    }

    #[test]
    fn test_idempotent_and_non_mutating() {
        let loaded = cartridges(&[(5, 10), (20, 5)]);
        let snapshot = loaded.clone();

        let first = compute_distribution(Money::from_minor(45), &loaded);
        let second = compute_distribution(Money::from_minor(45), &loaded);

        assert_eq!(first, second);
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_remaining_feeds_back_in() {
        let loaded = cartridges(&[(5, 10), (20, 5)]);
        let after_credit = compute_distribution(Money::from_minor(20), &loaded).unwrap();

        let next = compute_distribution(Money::from_minor(25), &after_credit.remaining()).unwrap();
        assert_eq!(next.entries(), &[entry(5, 9, 1), entry(20, 3, 1)]);
    }

    #[test]
    fn test_serializes_as_array() {
        let loaded = cartridges(&[(5, 1)]);
        let distribution = compute_distribution(Money::from_minor(5), &loaded).unwrap();
        let json = serde_json::to_string(&distribution).unwrap();
        assert_eq!(json, r#"[{"denomination":5,"count":0,"dispense":1}]"#);
    }
}
