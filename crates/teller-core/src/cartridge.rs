//! # Cartridge Inventory
//!
//! The data model for what is physically loaded in the dispenser, plus the
//! "virtual" denominations that are offered to users but paid out by
//! combining notes from real cartridges.
//!
//! ## Inventory Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CartridgeInventory                                │
//! │                                                                         │
//! │  cartridges (strictly ascending by denomination)                        │
//! │  ┌──────────────┐ ┌──────────────┐                                      │
//! │  │ 5.00 × 10    │ │ 20.00 × 5    │   ◄── physical, counted              │
//! │  └──────────────┘ └──────────────┘                                      │
//! │                                                                         │
//! │  virtual_denominations                                                  │
//! │  { 25.00 }                            ◄── synthesized (20.00 + 5.00)    │
//! │                                                                         │
//! │  currency: EUR                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The controller in `teller-dispenser` is the only writer; everything else
//! reads snapshots.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{normalize_cartridges, validate_currency_code, validate_virtual_denominations};

// =============================================================================
// Cartridge
// =============================================================================

/// A physical note reservoir holding `count` notes of one denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cartridge {
    /// Value of a single note, in minor units.
    pub denomination: Money,

    /// Notes currently loaded.
    pub count: u32,
}

impl Cartridge {
    #[inline]
    pub const fn new(denomination: Money, count: u32) -> Self {
        Cartridge {
            denomination,
            count,
        }
    }

    /// Total value held by this cartridge.
    #[inline]
    pub const fn value(&self) -> Money {
        self.denomination.times(self.count)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// A validated, upper-case three-letter currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_currency_code(s).map(Currency)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Setup Data
// =============================================================================

/// Starting inventory as delivered by configuration or an upstream server.
///
/// Unvalidated: turn it into a [`CartridgeInventory`] with
/// [`CartridgeInventory::from_setup`].
///
/// ## Example
/// ```rust
/// use teller_core::cartridge::SetupData;
///
/// let setup: SetupData = serde_json::from_str(
///     r#"{
///         "cartridges": [{"denomination": 500, "count": 10}],
///         "virtualCartridges": [2500],
///         "currency": "EUR"
///     }"#,
/// ).unwrap();
/// assert_eq!(setup.virtual_cartridges.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupData {
    /// Physical cartridges, any order.
    pub cartridges: Vec<Cartridge>,

    /// Amounts offered without a dedicated cartridge.
    #[serde(default, alias = "virtualCartridges")]
    pub virtual_cartridges: Vec<Money>,

    /// Currency code (e.g. "EUR").
    pub currency: String,
}

// =============================================================================
// Cartridge Inventory
// =============================================================================

/// Live note inventory.
///
/// ## Invariants
/// - `cartridges` is non-empty and strictly ascending by denomination
/// - every denomination (physical and virtual) is positive
/// - counts only ever go down through [`apply_dispensed`](Self::apply_dispensed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartridgeInventory {
    cartridges: Vec<Cartridge>,
    virtual_denominations: BTreeSet<Money>,
    currency: Currency,
}

impl CartridgeInventory {
    /// Validates and normalizes setup data into an inventory.
    ///
    /// ```rust
    /// use teller_core::cartridge::{Cartridge, CartridgeInventory, SetupData};
    /// use teller_core::money::Money;
    ///
    /// let inventory = CartridgeInventory::from_setup(SetupData {
    ///     cartridges: vec![
    ///         Cartridge::new(Money::from_minor(20), 5),
    ///         Cartridge::new(Money::from_minor(5), 10),
    ///     ],
    ///     virtual_cartridges: vec![],
    ///     currency: "eur".into(),
    /// }).unwrap();
    ///
    /// assert_eq!(inventory.cartridges()[0].denomination, Money::from_minor(5));
    /// assert_eq!(inventory.currency().as_str(), "EUR");
    /// ```
    pub fn from_setup(setup: SetupData) -> CoreResult<Self> {
        let currency: Currency = setup.currency.parse()?;
        let cartridges = normalize_cartridges(setup.cartridges)?;
        validate_virtual_denominations(&setup.virtual_cartridges)?;

        Ok(CartridgeInventory {
            cartridges,
            virtual_denominations: setup.virtual_cartridges.into_iter().collect(),
            currency,
        })
    }

    /// Physical cartridges, ascending by denomination.
    #[inline]
    pub fn cartridges(&self) -> &[Cartridge] {
        &self.cartridges
    }

    #[inline]
    pub fn virtual_denominations(&self) -> &BTreeSet<Money> {
        &self.virtual_denominations
    }

    #[inline]
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Σ denomination × count over all cartridges.
    pub fn total_value(&self) -> Money {
        self.cartridges.iter().map(Cartridge::value).sum()
    }

    /// Total notes loaded across all cartridges.
    pub fn note_count(&self) -> u64 {
        self.cartridges.iter().map(|c| u64::from(c.count)).sum()
    }

    /// Removes confirmed payouts from the inventory.
    ///
    /// `dispensed` holds one count per cartridge, in cartridge order. The
    /// whole list is checked before anything is written, so an error leaves
    /// the inventory untouched.
    pub fn apply_dispensed(&mut self, dispensed: &[u32]) -> CoreResult<()> {
        if dispensed.len() != self.cartridges.len() {
            return Err(CoreError::DispenseShapeMismatch {
                expected: self.cartridges.len(),
                actual: dispensed.len(),
            });
        }

        for (cartridge, &requested) in self.cartridges.iter().zip(dispensed) {
            if requested > cartridge.count {
                return Err(CoreError::InsufficientNotes {
                    denomination: cartridge.denomination,
                    available: cartridge.count,
                    requested,
                });
            }
        }

        for (cartridge, &taken) in self.cartridges.iter_mut().zip(dispensed) {
            cartridge.count -= taken;
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
