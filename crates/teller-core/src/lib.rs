//! # teller-core: Pure Inventory Logic for Teller
//!
//! This crate is the **heart** of the Teller cash dispenser. It decides how
//! an amount is paid out and which amounts may be offered, as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Teller Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Upstream transaction logic / UI                 │   │
//! │  │    payout buttons ──► credit ──► dispense request               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          teller-dispenser (DispenserController)                 │   │
//! │  │    init / reset / dispense, exclusive device sessions           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ teller-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌──────────────┐  ┌─────────────┐  ┌───────┐  │   │
//! │  │   │ cartridge │  │ distribution │  │ feasibility │  │ money │  │   │
//! │  │   │ Inventory │  │ greedy exact │  │ active      │  │ Money │  │   │
//! │  │   │ SetupData │  │ change       │  │ denoms      │  │       │  │   │
//! │  │   └───────────┘  └──────────────┘  └─────────────┘  └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DEVICE • NO ASYNC • PURE FUNCTIONS                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`cartridge`] - Cartridges, setup data and the live inventory model
//! - [`distribution`] - Exact-change distribution engine
//! - [`feasibility`] - Which denominations can be offered right now
//! - [`validation`] - Setup data validation and normalization
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Exact or nothing**: a payout is proposed only if it hits the amount exactly
//! 2. **Pure Functions**: same inventory + same amount = same answer
//! 3. **Integer Money**: all amounts are minor units (i64)
//! 4. **Proposals are not inventory**: a `Distribution` never mutates stock
//!
//! ## Example Usage
//!
//! ```rust
//! use teller_core::{compute_distribution, Cartridge, Money};
//!
//! let loaded = [
//!     Cartridge::new(Money::from_minor(5), 10),
//!     Cartridge::new(Money::from_minor(20), 5),
//! ];
//!
//! let payout = compute_distribution(Money::from_minor(100), &loaded).unwrap();
//! assert_eq!(payout.total(), Money::from_minor(100));
//! assert_eq!(payout.note_counts(), vec![0, 5]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cartridge;
pub mod distribution;
pub mod error;
pub mod feasibility;
pub mod money;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cartridge::{Cartridge, CartridgeInventory, Currency, SetupData};
pub use distribution::{compute_distribution, Distribution, DistributionEntry};
pub use error::{CoreError, CoreResult, ValidationError};
pub use feasibility::{active_denominations, ActiveDenominations};
pub use money::Money;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of physical cartridges a dispenser can carry.
///
/// ## Hardware Reason
/// Common note dispensers expose between two and six cassette slots; eight
/// leaves room for larger units without accepting absurd setup data.
pub const MAX_CARTRIDGES: usize = 8;
