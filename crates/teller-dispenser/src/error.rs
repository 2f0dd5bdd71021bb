//! # Dispenser Error Types
//!
//! Error types for device and controller operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Dispenser Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────┐  ┌────────────────┐  │
//! │  │  Payout             │  │   Device            │  │ Configuration  │  │
//! │  │                     │  │                     │  │                │  │
//! │  │  Unrepresentable    │  │  SessionAcquisition │  │ InvalidConfig  │  │
//! │  │  Amount             │  │  DeviceCommand      │  │ ConfigLoad     │  │
//! │  │                     │  │  Failure            │  │ ConfigSave     │  │
//! │  │  → pick another     │  │  → abort, outcome   │  │ InvalidSetup   │  │
//! │  │    amount           │  │    unconfirmed      │  │                │  │
//! │  └─────────────────────┘  └─────────────────────┘  └────────────────┘  │
//! │                                                                         │
//! │  None of these are retried here; retry policy belongs upstream.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use teller_core::{CoreError, Money};
use thiserror::Error;

/// Result type alias for controller operations.
pub type DispenserResult<T> = Result<T, DispenserError>;

/// Result type alias for device collaborator calls.
pub type DeviceResult<T> = Result<T, DeviceError>;

// =============================================================================
// Device Error
// =============================================================================

/// What the hardware collaborator reports.
///
/// Any of these after a dispense command means the physical outcome is
/// unconfirmed: notes may or may not have left the machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The transport could not be opened.
    #[error("Failed to open device session: {0}")]
    OpenFailed(String),

    /// The device rejected or failed a command.
    #[error("Device {command} failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// The device did not answer in time.
    #[error("Device {command} timed out after {after_ms}ms")]
    Timeout { command: String, after_ms: u64 },

    /// The transport went away mid-session.
    #[error("Device disconnected")]
    Disconnected,
}

// =============================================================================
// Dispenser Error
// =============================================================================

/// Controller error type covering every failure a caller can see.
#[derive(Debug, Error)]
pub enum DispenserError {
    // =========================================================================
    // Payout Errors
    // =========================================================================
    /// The amount cannot be made exactly from the loaded notes. Raised before
    /// the device is touched; nothing changed.
    #[error("Amount {amount} cannot be dispensed exactly from the loaded notes")]
    UnrepresentableAmount { amount: Money },

    // =========================================================================
    // Device Errors
    // =========================================================================
    /// The device failed a command. Inventory was not changed.
    #[error("Device command '{command}' failed: {source}")]
    DeviceCommandFailure {
        command: &'static str,
        #[source]
        source: DeviceError,
    },

    /// The device session could not be opened.
    #[error("Could not acquire device session: {0}")]
    SessionAcquisitionFailure(#[source] DeviceError),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// No inventory has been adopted yet; call `init` first.
    #[error("Dispenser is not initialized")]
    NotInitialized,

    /// Setup data was rejected during `init`.
    #[error("Invalid setup data: {0}")]
    InvalidSetup(#[source] CoreError),

    /// A confirmed device report could not be applied to the inventory.
    #[error("Inventory update rejected: {0}")]
    Inventory(#[source] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid dispenser configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for DispenserError {
    fn from(err: std::io::Error) -> Self {
        DispenserError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DispenserError {
    fn from(err: toml::de::Error) -> Self {
        DispenserError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for DispenserError {
    fn from(err: toml::ser::Error) -> Self {
        DispenserError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl DispenserError {
    /// The caller can recover by choosing a different amount.
    pub fn is_unrepresentable(&self) -> bool {
        matches!(self, DispenserError::UnrepresentableAmount { .. })
    }

    /// The device was involved and its physical state is unconfirmed.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            DispenserError::DeviceCommandFailure { .. }
                | DispenserError::SessionAcquisitionFailure(_)
                | DispenserError::Inventory(_)
        )
    }

    /// The error comes from configuration or setup data.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DispenserError::InvalidConfig(_)
                | DispenserError::ConfigLoadFailed(_)
                | DispenserError::ConfigSaveFailed(_)
                | DispenserError::InvalidSetup(_)
        )
    }

    /// The underlying device error, if any.
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            DispenserError::DeviceCommandFailure { source, .. } => Some(source),
            DispenserError::SessionAcquisitionFailure(source) => Some(source),
            _ => None,
        }
    }
}
