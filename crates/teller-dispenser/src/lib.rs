//! # teller-dispenser: Device Session Controller for Teller
//!
//! This crate owns the live note inventory and every interaction with the
//! physical dispenser. The pure payout logic lives in `teller-core`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Dispenser Controller Architecture                   │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 DispenserController (Arc-shared)                 │  │
//! │  │                                                                  │  │
//! │  │  init / reset / dispense         bill_distribution /             │  │
//! │  │  (serialized, touch device)      active_denominations / status   │  │
//! │  │                                  (read-only, never touch device) │  │
//! │  └───────────────┬───────────────────────────────┬──────────────────┘  │
//! │                  │                               │                      │
//! │                  ▼                               ▼                      │
//! │  ┌────────────────────────────┐   ┌────────────────────────────────┐   │
//! │  │ SessionGate / Session      │   │ CartridgeInventory (RwLock)    │   │
//! │  │ one open session at a time │   │ mutated only from confirmed    │   │
//! │  │ release() on every exit    │   │ device reports                 │   │
//! │  └──────────────┬─────────────┘   └────────────────────────────────┘   │
//! │                 ▼                                                       │
//! │  ┌────────────────────────────┐                                         │
//! │  │ dyn Device                 │  SimulatedDevice for tests and the      │
//! │  │ open/reset/dispense/release│  dispenser-sim binary                   │
//! │  └────────────────────────────┘                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Device settings and starting inventory (TOML + env)
//! - [`controller`] - `DispenserController` state machine
//! - [`device`] - `Device` trait, dispense reports, diagnostic events
//! - [`error`] - Device and controller error types
//! - [`session`] - Exclusive, self-releasing device sessions
//! - [`simulated`] - In-memory device with fault injection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teller_core::Money;
//! use teller_dispenser::{DispenserConfig, DispenserController, SimulatedDevice};
//!
//! # async fn run() -> teller_dispenser::DispenserResult<()> {
//! let config = DispenserConfig::load(None)?;
//! let device = Arc::new(SimulatedDevice::new(config.device.name.clone()));
//! let controller = DispenserController::from_settings(device, &config.device);
//!
//! controller.init(config.setup.clone()).await?;
//!
//! let receipt = controller.dispense(Money::from_major(100)).await?;
//! println!("Dispensed {:?}", receipt.report.dispensed);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod session;
pub mod simulated;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DeviceSettings, DispenserConfig};
pub use controller::{
    ControllerStatus, DispenseConfirmation, DispenserController, InitOutcome, Lifecycle,
    ResetStatus,
};
pub use device::{Device, DeviceEvent, DeviceEventKind, DispenseReport};
pub use error::{DeviceError, DeviceResult, DispenserError, DispenserResult};
pub use session::{Session, SessionGate};
pub use simulated::{SimCommand, SimulatedDevice};
