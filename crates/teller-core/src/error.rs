//! # Error Types
//!
//! Domain-specific error types for teller-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  teller-core errors (this file)                                         │
//! │  ├── CoreError        - Inventory / distribution failures               │
//! │  └── ValidationError  - Malformed setup data                            │
//! │                                                                         │
//! │  teller-dispenser errors (separate crate)                               │
//! │  ├── DeviceError      - What the hardware collaborator reports          │
//! │  └── DispenserError   - What controller callers see                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DispenserError → Caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Inventory and distribution errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The amount cannot be paid out exactly from the current inventory.
    ///
    /// ## User Workflow
    /// ```text
    /// Request payout 107.00 with only 5s and 20s loaded
    ///      │
    ///      ▼
    /// compute_distribution → None
    ///      │
    ///      ▼
    /// UnrepresentableAmount { amount: 107.00 }
    ///      │
    ///      ▼
    /// UI asks the customer to pick a different amount
    /// ```
    #[error("Amount {amount} cannot be dispensed exactly from the loaded notes")]
    UnrepresentableAmount { amount: Money },

    /// A per-cartridge count list does not line up with the cartridges.
    #[error("Expected counts for {expected} cartridges, got {actual}")]
    DispenseShapeMismatch { expected: usize, actual: usize },

    /// A cartridge would go below zero notes.
    #[error("Cartridge {denomination} holds {available} notes, cannot remove {requested}")]
    InsufficientNotes {
        denomination: Money,
        available: u32,
        requested: u32,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Setup data validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. a currency code that is not three letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. two cartridges with the same denomination).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
