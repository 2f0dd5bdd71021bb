//! # Validation Module
//!
//! Setup-data validation for Teller.
//!
//! The distribution engine walks cartridges from the highest denomination
//! down and relies on them being strictly ascending. Rather than trusting
//! whoever assembled the setup data, ordering is enforced here, once, when
//! an inventory is built.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Setup Ingestion                                    │
//! │                                                                         │
//! │  SetupData (config file / upstream server)                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE                                                            │
//! │  ├── currency: three ASCII letters, upper-cased                         │
//! │  ├── cartridges: non-empty, at most MAX_CARTRIDGES                      │
//! │  ├── denominations: positive, unique                                    │
//! │  ├── order: normalized to ascending                                     │
//! │  └── virtual denominations: positive                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  CartridgeInventory (ordering invariant now holds)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use teller_core::validation::validate_currency_code;
//!
//! assert_eq!(validate_currency_code(" eur ").unwrap(), "EUR");
//! assert!(validate_currency_code("EURO").is_err());
//! ```

use crate::cartridge::Cartridge;
use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_CARTRIDGES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Currency
// =============================================================================

/// Validates a currency code and returns it upper-cased.
///
/// ## Rules
/// - Must not be empty
/// - Must be exactly three ASCII letters (ISO 4217 style)
pub fn validate_currency_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter code such as EUR or USD".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

// =============================================================================
// Denominations
// =============================================================================

/// Validates a single denomination (physical or virtual).
///
/// ```rust
/// use teller_core::money::Money;
/// use teller_core::validation::validate_denomination;
///
/// assert!(validate_denomination(Money::from_minor(2000)).is_ok());
/// assert!(validate_denomination(Money::zero()).is_err());
/// ```
pub fn validate_denomination(denomination: Money) -> ValidationResult<()> {
    if !denomination.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "denomination".to_string(),
        });
    }

    Ok(())
}

/// Validates cartridges and returns them in strictly ascending order.
///
/// ## Rules
/// - At least one cartridge
/// - At most [`MAX_CARTRIDGES`]
/// - Every denomination positive
/// - No two cartridges share a denomination
/// - Each cartridge's value, and the total, fit in [`Money`]
///
/// Out-of-order input is sorted, not rejected: order carries no meaning in
/// the setup data, only in the engine.
pub fn normalize_cartridges(mut cartridges: Vec<Cartridge>) -> ValidationResult<Vec<Cartridge>> {
    if cartridges.is_empty() {
        return Err(ValidationError::Required {
            field: "cartridges".to_string(),
        });
    }

    if cartridges.len() > MAX_CARTRIDGES {
        return Err(ValidationError::OutOfRange {
            field: "cartridges".to_string(),
            min: 1,
            max: MAX_CARTRIDGES as i64,
        });
    }

    let mut total = Money::zero();
    for cartridge in &cartridges {
        validate_denomination(cartridge.denomination)?;

        total = cartridge
            .denomination
            .checked_times(cartridge.count)
            .and_then(|value| total.checked_add(value))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "cartridge value".to_string(),
                min: 0,
                max: i64::MAX,
            })?;
    }

    cartridges.sort_by_key(|c| c.denomination);

    if let Some(pair) = cartridges
        .windows(2)
        .find(|pair| pair[0].denomination == pair[1].denomination)
    {
        return Err(ValidationError::Duplicate {
            field: "denomination".to_string(),
            value: pair[0].denomination.to_string(),
        });
    }

    Ok(cartridges)
}

/// Validates virtual denominations. Duplicates are harmless and are merged
/// by the caller's set.
pub fn validate_virtual_denominations(denominations: &[Money]) -> ValidationResult<()> {
    for denomination in denominations {
        if !denomination.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "virtual denomination".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cartridge(denomination: i64, count: u32) -> Cartridge {
        Cartridge::new(Money::from_minor(denomination), count)
    }

    #[test]
    fn test_validate_currency_code() {
        assert_eq!(validate_currency_code("USD").unwrap(), "USD");
        assert_eq!(validate_currency_code("eur").unwrap(), "EUR");

        assert!(validate_currency_code("").is_err());
        assert!(validate_currency_code("   ").is_err());
        assert!(validate_currency_code("US").is_err());
        assert!(validate_currency_code("U$D").is_err());
    }

    #[test]
    fn test_normalize_sorts_ascending() {
        let sorted = normalize_cartridges(vec![cartridge(20, 5), cartridge(5, 10)]).unwrap();
        let denominations: Vec<i64> = sorted.iter().map(|c| c.denomination.minor()).collect();
        assert_eq!(denominations, vec![5, 20]);
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert_eq!(
            normalize_cartridges(vec![]),
            Err(ValidationError::Required {
                field: "cartridges".to_string()
            })
        );
        assert!(normalize_cartridges(vec![cartridge(0, 1)]).is_err());
        assert!(normalize_cartridges(vec![cartridge(-5, 1)]).is_err());
        assert!(matches!(
            normalize_cartridges(vec![cartridge(20, 1), cartridge(5, 1), cartridge(20, 2)]),
            Err(ValidationError::Duplicate { .. })
        ));

        let too_many = (1..=(MAX_CARTRIDGES as i64 + 1))
            .map(|d| cartridge(d * 100, 1))
            .collect();
        assert!(matches!(
            normalize_cartridges(too_many),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_normalize_rejects_overflowing_value() {
        let half = i64::MAX / 2;

        assert!(matches!(
            normalize_cartridges(vec![cartridge(half, 3)]),
            Err(ValidationError::OutOfRange { .. })
        ));
        // Each cartridge fits on its own; the sum does not.
        assert!(matches!(
            normalize_cartridges(vec![cartridge(half, 1), cartridge(half + 1, 1), cartridge(5, 1)]),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(normalize_cartridges(vec![cartridge(half, 2)]).is_ok());
    }

    #[test]
    fn test_empty_cartridge_is_allowed() {
        // A drained cartridge is still a valid slot.
        assert!(normalize_cartridges(vec![cartridge(5, 0)]).is_ok());
    }

    #[test]
    fn test_validate_virtual_denominations() {
        assert!(validate_virtual_denominations(&[Money::from_minor(25)]).is_ok());
        assert!(validate_virtual_denominations(&[]).is_ok());
        assert!(validate_virtual_denominations(&[Money::from_minor(25), Money::zero()]).is_err());
    }
}
