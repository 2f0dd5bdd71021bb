//! # Device Collaborator
//!
//! The boundary to the physical note dispenser. The byte-level serial
//! protocol lives behind this trait; the controller only sees sessions and
//! commands.
//!
//! ## Session Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open() ──Ok──► exactly one command ──► release()   (always, once)     │
//! │     │                  │                                                │
//! │     │                  ├── reset(cartridges, currency)                  │
//! │     │                  └── dispense(notes per cartridge)                │
//! │     │                                                                   │
//! │     └──Err──► no release(): nothing was acquired                        │
//! │                                                                         │
//! │   subscribe() ──► out-of-band diagnostics (observability only)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers never pair `open`/`release` by hand; [`SessionGate`](crate::session::SessionGate)
//! does it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teller_core::{Cartridge, Currency};
use tokio::sync::broadcast;

use crate::error::DeviceResult;

// =============================================================================
// Device Trait
// =============================================================================

/// A physical (or simulated) note dispenser.
#[async_trait]
pub trait Device: Send + Sync + 'static {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Acquires the transport.
    ///
    /// Must be cancel-safe: the session gate drops this future when the open
    /// deadline fires and then never calls [`release`](Device::release). An
    /// implementation that has already acquired the transport when dropped
    /// must give it back itself.
    async fn open(&self) -> DeviceResult<()>;

    /// Ends the session started by a successful [`open`](Device::open).
    ///
    /// Synchronous so it can run from a guard's `Drop`.
    fn release(&self);

    /// Aligns the device with the given inventory and currency.
    async fn reset(&self, cartridges: &[Cartridge], currency: &Currency) -> DeviceResult<()>;

    /// Pays out `notes[i]` notes from cartridge `i`.
    async fn dispense(&self, notes: &[u32]) -> DeviceResult<DispenseReport>;

    /// Diagnostic event stream, if the device has one.
    fn subscribe(&self) -> Option<broadcast::Receiver<DeviceEvent>> {
        None
    }
}

// =============================================================================
// Dispense Report
// =============================================================================

/// What the device says it actually did, one entry per cartridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseReport {
    /// Notes presented to the customer.
    pub dispensed: Vec<u32>,

    /// Notes diverted to the reject bin (double picks, skewed notes).
    #[serde(default)]
    pub rejected: Vec<u32>,
}

impl DispenseReport {
    /// A report where the device delivered exactly what was asked.
    pub fn exact(notes: &[u32]) -> Self {
        DispenseReport {
            dispensed: notes.to_vec(),
            rejected: vec![0; notes.len()],
        }
    }

    pub fn total_rejected(&self) -> u64 {
        self.rejected.iter().map(|&n| u64::from(n)).sum()
    }
}

// =============================================================================
// Diagnostic Events
// =============================================================================

/// Kinds of out-of-band device diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEventKind {
    SessionOpened,
    SessionReleased,
    CommandSent,
    Response,
    Fault,
}

impl std::fmt::Display for DeviceEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEventKind::SessionOpened => write!(f, "session_opened"),
            DeviceEventKind::SessionReleased => write!(f, "session_released"),
            DeviceEventKind::CommandSent => write!(f, "command_sent"),
            DeviceEventKind::Response => write!(f, "response"),
            DeviceEventKind::Fault => write!(f, "fault"),
        }
    }
}

/// A diagnostic event emitted by the device. Never used for control
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub kind: DeviceEventKind,
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl DeviceEvent {
    pub fn now(kind: DeviceEventKind, detail: impl Into<String>) -> Self {
        DeviceEvent {
            kind,
            detail: detail.into(),
            at: Utc::now(),
        }
    }
}
