//! # Dispenser Controller
//!
//! Owns the live note inventory and drives the device through
//! open → command → release cycles.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   UNINITIALIZED ──init(setup)──► INITIALIZING ──reset done──► INITIALIZED│
//! │        ▲                              │          (ok or failed)         │
//! │        └──── invalid setup ───────────┘                                 │
//! │                                                                         │
//! │   init() while INITIALIZING / INITIALIZED  →  returns at once,          │
//! │                                               no side effects           │
//! │                                                                         │
//! │   INITIALIZED is terminal. Whether the last reset actually worked is    │
//! │   tracked separately in `last_reset_confirmed`.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dispense Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dispense(amount)                                                       │
//! │     │                                                                   │
//! │     ├── in-flight guard (one reset/dispense at a time)                  │
//! │     ├── compute_distribution ──None──► UnrepresentableAmount            │
//! │     │                                  (device never touched)           │
//! │     ├── SessionGate::open ──Err──► SessionAcquisitionFailure            │
//! │     ├── device.dispense(counts) ──Err──► DeviceCommandFailure           │
//! │     │                                    (inventory unchanged)          │
//! │     ├── session released                                                │
//! │     └── inventory -= report.dispensed   (confirmed counts only)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use teller_core::{
    compute_distribution, ActiveDenominations, Cartridge, CartridgeInventory, Currency,
    Distribution, Money, SetupData,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DeviceSettings;
use crate::device::{Device, DispenseReport};
use crate::error::{DeviceError, DispenserError, DispenserResult};
use crate::session::SessionGate;

// =============================================================================
// Status Types
// =============================================================================

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Initializing,
    Initialized,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "uninitialized"),
            Lifecycle::Initializing => write!(f, "initializing"),
            Lifecycle::Initialized => write!(f, "initialized"),
        }
    }
}

/// Outcome of the reset embedded in `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResetStatus {
    Confirmed,
    Failed { reason: String },
}

impl ResetStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ResetStatus::Confirmed)
    }
}

/// What a call to [`DispenserController::init`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InitOutcome {
    /// Another `init` is in progress; this call did nothing.
    AlreadyInitializing,

    /// The controller was already initialized; this call did nothing.
    AlreadyInitialized,

    /// Setup was adopted and the device reset was attempted.
    Initialized { reset: ResetStatus },
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub lifecycle: Lifecycle,

    /// True once the most recent reset succeeded; false after a failed one.
    pub last_reset_confirmed: bool,

    pub currency: Option<Currency>,
    pub total_value: Money,
    pub last_dispense_at: Option<DateTime<Utc>>,
}

impl ControllerStatus {
    /// Accepting commands and the device is known to match the inventory.
    pub fn is_healthy(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized && self.last_reset_confirmed
    }
}

/// Receipt for a completed payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseConfirmation {
    pub transaction_id: Uuid,

    /// The amount that was requested.
    pub amount: Money,

    /// The distribution sent to the device.
    pub distribution: Distribution,

    /// What the device says it delivered.
    pub report: DispenseReport,

    pub completed_at: DateTime<Utc>,
}

impl DispenseConfirmation {
    /// True when the device delivered exactly the requested notes.
    pub fn is_exact(&self) -> bool {
        self.report.dispensed == self.distribution.note_counts()
    }

    /// Value actually handed out according to the device.
    pub fn dispensed_value(&self) -> Money {
        self.distribution
            .entries()
            .iter()
            .zip(&self.report.dispensed)
            .map(|(entry, &n)| entry.denomination.times(n))
            .sum()
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    lifecycle: Lifecycle,
    last_reset_confirmed: bool,
    last_dispense_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Controller
// =============================================================================

/// Session controller for one physical dispenser.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct DispenserController {
    device: Arc<dyn Device>,
    gate: SessionGate,

    /// Held across every reset and dispense.
    operation: tokio::sync::Mutex<()>,

    /// `None` until `init` adopts setup data.
    inventory: RwLock<Option<CartridgeInventory>>,

    state: Mutex<ControllerState>,
}

impl DispenserController {
    /// Creates a controller with no device deadlines.
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self::with_gate(device, SessionGate::default())
    }

    /// Creates a controller using the configured device deadlines.
    pub fn from_settings(device: Arc<dyn Device>, settings: &DeviceSettings) -> Self {
        let gate = SessionGate::new(Some(settings.open_timeout()), Some(settings.command_timeout()));
        Self::with_gate(device, gate)
    }

    pub fn with_gate(device: Arc<dyn Device>, gate: SessionGate) -> Self {
        DispenserController {
            device,
            gate,
            operation: tokio::sync::Mutex::new(()),
            inventory: RwLock::new(None),
            state: Mutex::new(ControllerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_inventory(&self) -> RwLockReadGuard<'_, Option<CartridgeInventory>> {
        self.inventory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inventory(&self) -> RwLockWriteGuard<'_, Option<CartridgeInventory>> {
        self.inventory.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Adopts `setup` as the live inventory and resets the device to match.
    ///
    /// Safe to call repeatedly or concurrently: only the first call does
    /// anything. A failed reset does not fail `init`; the controller still
    /// becomes ready and the failure is reported in the returned
    /// [`InitOutcome`].
    ///
    /// ## Errors
    /// [`DispenserError::InvalidSetup`] when the setup data is malformed. The
    /// controller stays uninitialized and `init` can be called again.
    pub async fn init(&self, setup: SetupData) -> DispenserResult<InitOutcome> {
        {
            let mut state = self.state();
            match state.lifecycle {
                Lifecycle::Initializing => return Ok(InitOutcome::AlreadyInitializing),
                Lifecycle::Initialized => return Ok(InitOutcome::AlreadyInitialized),
                Lifecycle::Uninitialized => state.lifecycle = Lifecycle::Initializing,
            }
        }

        // Rolls back to Uninitialized unless disarmed, so a cancelled init
        // can be retried.
        let mut attempt = InitAttempt {
            controller: self,
            completed: false,
        };

        let inventory = CartridgeInventory::from_setup(setup).map_err(|e| {
            warn!(error = %e, "Rejected dispenser setup data");
            DispenserError::InvalidSetup(e)
        })?;

        info!(
            device = %self.device.name(),
            currency = %inventory.currency(),
            cartridges = inventory.cartridges().len(),
            total = %inventory.total_value(),
            "Initializing dispenser"
        );
        *self.write_inventory() = Some(inventory);

        let reset = match self.reset().await {
            Ok(()) => ResetStatus::Confirmed,
            Err(e) => ResetStatus::Failed {
                reason: e.to_string(),
            },
        };

        attempt.completed = true;
        self.state().lifecycle = Lifecycle::Initialized;
        info!(reset_confirmed = reset.is_confirmed(), "Dispenser initialized");

        Ok(InitOutcome::Initialized { reset })
    }

    /// Aligns the device with the live inventory.
    ///
    /// Never changes the inventory. On failure the device state is unknown
    /// and `last_reset_confirmed` is cleared.
    pub async fn reset(&self) -> DispenserResult<()> {
        let _in_flight = self.operation.lock().await;

        let (cartridges, currency) = {
            let guard = self.read_inventory();
            let inventory = guard.as_ref().ok_or(DispenserError::NotInitialized)?;
            (inventory.cartridges().to_vec(), inventory.currency().clone())
        };

        let result = self.reset_device(&cartridges, &currency).await;

        self.state().last_reset_confirmed = result.is_ok();
        match &result {
            Ok(()) => info!(currency = %currency, "Device reset confirmed"),
            Err(e) => warn!(error = %e, "Device reset failed; device state unknown"),
        }

        result
    }

    async fn reset_device(&self, cartridges: &[Cartridge], currency: &Currency) -> DispenserResult<()> {
        let session = self.gate.open(self.device.clone()).await?;
        session
            .run("reset", session.device().reset(cartridges, currency))
            .await
            .map_err(|source| DispenserError::DeviceCommandFailure {
                command: "reset",
                source,
            })?;
        Ok(())
    }

    // =========================================================================
    // Payout
    // =========================================================================

    /// Pays out `amount` and decrements the inventory by what the device
    /// confirms.
    ///
    /// ## Errors
    /// - [`DispenserError::NotInitialized`] before `init` completed
    /// - [`DispenserError::UnrepresentableAmount`] when no exact distribution
    ///   exists; the device is not contacted
    /// - [`DispenserError::SessionAcquisitionFailure`] /
    ///   [`DispenserError::DeviceCommandFailure`] when the device fails; the
    ///   inventory is unchanged and the physical outcome is unconfirmed
    pub async fn dispense(&self, amount: Money) -> DispenserResult<DispenseConfirmation> {
        if self.state().lifecycle != Lifecycle::Initialized {
            return Err(DispenserError::NotInitialized);
        }

        let _in_flight = self.operation.lock().await;

        let planned = self
            .read_inventory()
            .as_ref()
            .map(|inventory| compute_distribution(amount, inventory.cartridges()));
        let distribution = planned.ok_or(DispenserError::NotInitialized)?.ok_or_else(|| {
            debug!(amount = %amount, "Amount has no exact distribution");
            DispenserError::UnrepresentableAmount { amount }
        })?;

        let notes = distribution.note_counts();
        let transaction_id = Uuid::new_v4();
        info!(%transaction_id, amount = %amount, ?notes, "Dispensing");

        let session = self.gate.open(self.device.clone()).await.map_err(|e| {
            error!(%transaction_id, error = %e, "Could not open device session");
            e
        })?;
        let report = session
            .run("dispense", session.device().dispense(&notes))
            .await
            .map_err(|source| {
                error!(%transaction_id, error = %source, "Dispense command failed");
                DispenserError::DeviceCommandFailure {
                    command: "dispense",
                    source,
                }
            })?;
        drop(session);

        if report.dispensed.len() != notes.len() {
            error!(
                %transaction_id,
                expected = notes.len(),
                actual = report.dispensed.len(),
                "Device report does not match cartridge layout"
            );
            return Err(DispenserError::DeviceCommandFailure {
                command: "dispense",
                source: DeviceError::CommandFailed {
                    command: "dispense".to_string(),
                    detail: format!(
                        "report covers {} cartridges, expected {}",
                        report.dispensed.len(),
                        notes.len()
                    ),
                },
            });
        }

        if report.dispensed != notes {
            warn!(
                %transaction_id,
                requested = ?notes,
                confirmed = ?report.dispensed,
                "Device dispensed a different note count than requested"
            );
        }
        if report.total_rejected() > 0 {
            warn!(%transaction_id, rejected = ?report.rejected, "Notes diverted to reject bin");
        }

        {
            let mut guard = self.write_inventory();
            let inventory = guard.as_mut().ok_or(DispenserError::NotInitialized)?;
            inventory
                .apply_dispensed(&report.dispensed)
                .map_err(|e| {
                    error!(%transaction_id, error = %e, "Confirmed dispense could not be applied");
                    DispenserError::Inventory(e)
                })?;
        }

        let completed_at = Utc::now();
        self.state().last_dispense_at = Some(completed_at);

        let confirmation = DispenseConfirmation {
            transaction_id,
            amount,
            distribution,
            report,
            completed_at,
        };
        info!(
            %transaction_id,
            dispensed = %confirmation.dispensed_value(),
            "Dispense complete"
        );

        Ok(confirmation)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The distribution `amount` would use right now, without dispensing.
    pub fn bill_distribution(&self, amount: Money) -> Option<Distribution> {
        let guard = self.read_inventory();
        compute_distribution(amount, guard.as_ref()?.cartridges())
    }

    /// Which denominations may be offered under `limit` with `credit`
    /// already committed. `None` when uninitialized or when `credit` itself
    /// cannot be paid out.
    pub fn active_denominations(&self, limit: Money, credit: Money) -> Option<ActiveDenominations> {
        let guard = self.read_inventory();
        teller_core::active_denominations(guard.as_ref()?, limit, credit)
    }

    /// Snapshot of the live inventory.
    pub fn inventory(&self) -> Option<CartridgeInventory> {
        self.read_inventory().clone()
    }

    pub fn status(&self) -> ControllerStatus {
        let (currency, total_value) = match self.read_inventory().as_ref() {
            Some(inventory) => (Some(inventory.currency().clone()), inventory.total_value()),
            None => (None, Money::zero()),
        };

        let state = self.state();
        ControllerStatus {
            lifecycle: state.lifecycle,
            last_reset_confirmed: state.last_reset_confirmed,
            currency,
            total_value,
            last_dispense_at: state.last_dispense_at,
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Forwards device diagnostics to the log on a background task.
    ///
    /// Returns `None` if the device has no diagnostic stream. Must be called
    /// from within a tokio runtime.
    pub fn watch_diagnostics(&self) -> Option<JoinHandle<()>> {
        let mut events = self.device.subscribe()?;
        let device = self.device.name().to_string();

        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => debug!(
                        device = %device,
                        kind = %event.kind,
                        detail = %event.detail,
                        at = %event.at,
                        "Device diagnostic"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(device = %device, skipped, "Diagnostic stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(device = %device, "Diagnostic stream closed");
        }))
    }
}

impl std::fmt::Debug for DispenserController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispenserController")
            .field("device", &self.device.name())
            .field("lifecycle", &self.state().lifecycle)
            .finish()
    }
}

struct InitAttempt<'a> {
    controller: &'a DispenserController,
    completed: bool,
}

impl Drop for InitAttempt<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.controller.write_inventory() = None;
            self.controller.state().lifecycle = Lifecycle::Uninitialized;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceResult;
    use crate::simulated::SimulatedDevice;
    use async_trait::async_trait;
    use std::time::Duration;

    fn setup() -> SetupData {
        SetupData {
            cartridges: vec![
                Cartridge::new(Money::from_minor(5), 10),
                Cartridge::new(Money::from_minor(20), 5),
            ],
            virtual_cartridges: vec![Money::from_minor(25)],
            currency: "EUR".to_string(),
        }
    }

    async fn initialized() -> (Arc<SimulatedDevice>, DispenserController) {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        let controller = DispenserController::new(sim.clone());
        let outcome = controller.init(setup()).await.unwrap();
        assert_eq!(
            outcome,
            InitOutcome::Initialized {
                reset: ResetStatus::Confirmed
            }
        );
        (sim, controller)
    }

    fn counts(controller: &DispenserController) -> Vec<u32> {
        controller
            .inventory()
            .unwrap()
            .cartridges()
            .iter()
            .map(|c| c.count)
            .collect()
    }

    #[tokio::test]
    async fn test_init_resets_device() {
        let (sim, controller) = initialized().await;

        assert_eq!(sim.reset_count(), 1);
        assert_eq!(sim.loaded(), controller.inventory().unwrap().cartridges());
        assert_eq!(sim.currency().unwrap().as_str(), "EUR");
        assert_eq!(sim.open_count(), sim.release_count());

        let status = controller.status();
        assert!(status.is_healthy());
        assert_eq!(status.total_value, Money::from_minor(150));
        assert_eq!(status.currency.unwrap().as_str(), "EUR");
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let (sim, controller) = initialized().await;
        assert_eq!(
            controller.init(setup()).await.unwrap(),
            InitOutcome::AlreadyInitialized
        );
        assert_eq!(sim.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_init_resets_once() {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        sim.set_latency(Duration::from_millis(20));
        let controller = DispenserController::new(sim.clone());

        let (first, second) = tokio::join!(controller.init(setup()), controller.init(setup()));

        assert!(matches!(first.unwrap(), InitOutcome::Initialized { .. }));
        assert_eq!(second.unwrap(), InitOutcome::AlreadyInitializing);
        assert_eq!(sim.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_init_with_failed_reset_is_ready_but_unconfirmed() {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        sim.fail_next_reset("cassette 2 missing");
        let controller = DispenserController::new(sim.clone());

        let outcome = controller.init(setup()).await.unwrap();
        assert!(matches!(
            outcome,
            InitOutcome::Initialized {
                reset: ResetStatus::Failed { .. }
            }
        ));

        let status = controller.status();
        assert_eq!(status.lifecycle, Lifecycle::Initialized);
        assert!(!status.last_reset_confirmed);
        assert!(!status.is_healthy());
        assert_eq!(sim.open_count(), sim.release_count());

        controller.reset().await.unwrap();
        assert!(controller.status().is_healthy());
    }

    #[tokio::test]
    async fn test_invalid_setup_allows_retry() {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        let controller = DispenserController::new(sim.clone());

        let mut bad = setup();
        bad.cartridges.clear();
        let err = controller.init(bad).await.unwrap_err();
        assert!(matches!(err, DispenserError::InvalidSetup(_)));
        assert!(err.is_config_error());
        assert_eq!(controller.status().lifecycle, Lifecycle::Uninitialized);
        assert_eq!(sim.open_count(), 0);

        assert!(matches!(
            controller.init(setup()).await.unwrap(),
            InitOutcome::Initialized { .. }
        ));
    }

    #[tokio::test]
    async fn test_overflowing_inventory_is_rejected() {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        let controller = DispenserController::new(sim.clone());

        let huge = SetupData {
            cartridges: vec![Cartridge::new(Money::from_minor(i64::MAX / 2), 3)],
            virtual_cartridges: vec![],
            currency: "EUR".to_string(),
        };
        let err = controller.init(huge).await.unwrap_err();
        assert!(matches!(err, DispenserError::InvalidSetup(_)));

        let status = controller.status();
        assert_eq!(status.lifecycle, Lifecycle::Uninitialized);
        assert_eq!(status.total_value, Money::zero());
        assert_eq!(sim.open_count(), 0);
    }

    #[tokio::test]
    async fn test_requires_init() {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        let controller = DispenserController::new(sim.clone());

        assert!(matches!(
            controller.dispense(Money::from_minor(100)).await,
            Err(DispenserError::NotInitialized)
        ));
        assert!(matches!(
            controller.reset().await,
            Err(DispenserError::NotInitialized)
        ));
        assert!(controller.bill_distribution(Money::from_minor(100)).is_none());
        assert!(controller
            .active_denominations(Money::from_minor(100), Money::zero())
            .is_none());
        assert_eq!(sim.open_count(), 0);
    }

    #[tokio::test]
    async fn test_dispense_prefers_large_notes() {
        let (sim, controller) = initialized().await;

        let confirmation = controller.dispense(Money::from_minor(100)).await.unwrap();
        assert_eq!(confirmation.distribution.note_counts(), vec![0, 5]);
        assert!(confirmation.is_exact());
        assert_eq!(confirmation.dispensed_value(), Money::from_minor(100));

        assert_eq!(counts(&controller), vec![10, 0]);
        assert_eq!(sim.loaded(), controller.inventory().unwrap().cartridges());
        assert_eq!(sim.open_count(), sim.release_count());
        assert!(controller.status().last_dispense_at.is_some());
    }

    #[tokio::test]
    async fn test_unrepresentable_amount_skips_device() {
        let (sim, controller) = initialized().await;

        let err = controller.dispense(Money::from_minor(107)).await.unwrap_err();
        assert!(err.is_unrepresentable());
        assert_eq!(sim.open_count(), 1); // the init reset only
        assert_eq!(sim.dispense_count(), 0);
        assert_eq!(counts(&controller), vec![10, 5]);
    }

    #[tokio::test]
    async fn test_failed_dispense_leaves_inventory() {
        let (sim, controller) = initialized().await;
        sim.fail_next_dispense("note jam");

        let err = controller.dispense(Money::from_minor(100)).await.unwrap_err();
        assert!(matches!(
            err,
            DispenserError::DeviceCommandFailure {
                command: "dispense",
                ..
            }
        ));
        assert!(err.is_device_failure());
        assert_eq!(counts(&controller), vec![10, 5]);
        assert_eq!(sim.open_count(), sim.release_count());
    }

    #[tokio::test]
    async fn test_session_failure_leaves_inventory() {
        let (sim, controller) = initialized().await;
        sim.fail_next_open("port busy");

        let err = controller.dispense(Money::from_minor(100)).await.unwrap_err();
        assert!(matches!(err, DispenserError::SessionAcquisitionFailure(_)));
        assert_eq!(counts(&controller), vec![10, 5]);
    }

    #[tokio::test]
    async fn test_command_timeout_leaves_inventory() {
        let sim = Arc::new(SimulatedDevice::new("sim"));
        let gate = SessionGate::new(None, Some(Duration::from_millis(20)));
        let controller = DispenserController::with_gate(sim.clone(), gate);
        controller.init(setup()).await.unwrap();

        sim.set_latency(Duration::from_millis(200));
        let err = controller.dispense(Money::from_minor(100)).await.unwrap_err();

        assert!(matches!(
            err.device_error(),
            Some(DeviceError::Timeout { after_ms: 20, .. })
        ));
        assert_eq!(counts(&controller), vec![10, 5]);
        assert_eq!(sim.open_count(), sim.release_count());
    }

    #[tokio::test]
    async fn test_short_dispense_applies_confirmed_counts() {
        let (sim, controller) = initialized().await;
        sim.short_next_dispense(vec![0, 3]);

        let confirmation = controller.dispense(Money::from_minor(100)).await.unwrap();
        assert!(!confirmation.is_exact());
        assert_eq!(confirmation.report.dispensed, vec![0, 3]);
        assert_eq!(confirmation.dispensed_value(), Money::from_minor(60));
        assert_eq!(counts(&controller), vec![10, 2]);
    }

    struct MisreportingDevice;

    #[async_trait]
    impl Device for MisreportingDevice {
        fn name(&self) -> &str {
            "misreporting"
        }

        async fn open(&self) -> DeviceResult<()> {
            Ok(())
        }

        fn release(&self) {}

        async fn reset(&self, _: &[Cartridge], _: &Currency) -> DeviceResult<()> {
            Ok(())
        }

        async fn dispense(&self, _: &[u32]) -> DeviceResult<DispenseReport> {
            Ok(DispenseReport::exact(&[5]))
        }
    }

    #[tokio::test]
    async fn test_malformed_report_is_rejected() {
        let controller = DispenserController::new(Arc::new(MisreportingDevice));
        controller.init(setup()).await.unwrap();

        let err = controller.dispense(Money::from_minor(100)).await.unwrap_err();
        assert!(matches!(err, DispenserError::DeviceCommandFailure { .. }));
        assert_eq!(counts(&controller), vec![10, 5]);
        assert!(controller.status().last_dispense_at.is_none());
    }

    #[tokio::test]
    async fn test_queries_follow_live_inventory() {
        let (_sim, controller) = initialized().await;

        let active = controller
            .active_denominations(Money::from_minor(100), Money::from_minor(20))
            .unwrap();
        assert!(active.is_active(Money::from_minor(5)));
        assert!(active.is_active(Money::from_minor(20)));
        assert!(active.is_active(Money::from_minor(25)));
        assert!(!active.is_empty);

        controller.dispense(Money::from_minor(100)).await.unwrap();

        assert!(controller.bill_distribution(Money::from_minor(55)).is_none());
        assert_eq!(
            controller
                .bill_distribution(Money::from_minor(50))
                .unwrap()
                .note_counts(),
            vec![10, 0]
        );
        assert!(controller
            .active_denominations(Money::from_minor(100), Money::from_minor(55))
            .is_none());
    }

    #[tokio::test]
    async fn test_watch_diagnostics() {
        let (_sim, controller) = initialized().await;
        let handle = controller.watch_diagnostics().unwrap();
        controller.dispense(Money::from_minor(20)).await.unwrap();
        handle.abort();

        assert!(DispenserController::new(Arc::new(MisreportingDevice))
            .watch_diagnostics()
            .is_none());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = ControllerStatus {
            lifecycle: Lifecycle::Initialized,
            last_reset_confirmed: true,
            currency: None,
            total_value: Money::from_minor(150),
            last_dispense_at: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["lifecycle"], "initialized");
        assert_eq!(json["lastResetConfirmed"], true);
        assert_eq!(json["totalValue"], 150);
    }
}
