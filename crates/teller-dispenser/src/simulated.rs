//! # Simulated Dispenser
//!
//! An in-memory [`Device`] for tests, demos and bench work without hardware.
//!
//! It behaves like a strict dispenser: commands outside a session fail, a
//! second `open` while a session is active fails, and a dispense larger
//! than the loaded stock fails. Faults can be injected one command at a
//! time, and every call is recorded for assertions.
//!
//! ## Fault Injection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fail_next_open(msg)       next open()      → OpenFailed(msg)           │
//! │  fail_next_reset(msg)      next reset()     → CommandFailed(msg)        │
//! │  fail_next_dispense(msg)   next dispense()  → CommandFailed(msg)        │
//! │  short_next_dispense(n)    next dispense()  → Ok, but only n[i] notes   │
//! │                                               leave cartridge i         │
//! │  set_latency(d)            every command sleeps d first                 │
//! │  set_open_latency(d)       open() sleeps d before acquiring             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use teller_core::{Cartridge, Currency};
use tokio::sync::broadcast;

use crate::device::{Device, DeviceEvent, DeviceEventKind, DispenseReport};
use crate::error::{DeviceError, DeviceResult};

/// Capacity of the diagnostics channel; slow subscribers skip old events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A command the simulated device accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    Reset {
        cartridges: Vec<Cartridge>,
        currency: Currency,
    },
    Dispense {
        notes: Vec<u32>,
    },
}

#[derive(Debug, Default)]
struct SimState {
    loaded: Vec<Cartridge>,
    currency: Option<Currency>,
    session_open: bool,
    opens: usize,
    releases: usize,
    commands: Vec<SimCommand>,
    latency: Duration,
    open_latency: Duration,
    fail_open: Option<String>,
    fail_reset: Option<String>,
    fail_dispense: Option<String>,
    short_dispense: Option<Vec<u32>>,
}

/// In-memory note dispenser.
#[derive(Debug)]
pub struct SimulatedDevice {
    name: String,
    state: Mutex<SimState>,
    events: broadcast::Sender<DeviceEvent>,
}

impl SimulatedDevice {
    pub fn new(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        SimulatedDevice {
            name: name.into(),
            state: Mutex::new(SimState::default()),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, kind: DeviceEventKind, detail: impl Into<String>) {
        // No subscribers is fine: diagnostics are optional.
        let _ = self.events.send(DeviceEvent::now(kind, detail));
    }

    // =========================================================================
    // Fault Injection
    // =========================================================================

    pub fn fail_next_open(&self, detail: impl Into<String>) {
        self.state().fail_open = Some(detail.into());
    }

    pub fn fail_next_reset(&self, detail: impl Into<String>) {
        self.state().fail_reset = Some(detail.into());
    }

    pub fn fail_next_dispense(&self, detail: impl Into<String>) {
        self.state().fail_dispense = Some(detail.into());
    }

    /// The next dispense succeeds but delivers at most `notes[i]` from
    /// cartridge `i`.
    pub fn short_next_dispense(&self, notes: Vec<u32>) {
        self.state().short_dispense = Some(notes);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Delay before `open` acquires the session. Dropping `open` during the
    /// delay leaves nothing acquired.
    pub fn set_open_latency(&self, latency: Duration) {
        self.state().open_latency = latency;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn open_count(&self) -> usize {
        self.state().opens
    }

    pub fn release_count(&self) -> usize {
        self.state().releases
    }

    pub fn is_session_open(&self) -> bool {
        self.state().session_open
    }

    /// Every command accepted so far, in order.
    pub fn commands(&self) -> Vec<SimCommand> {
        self.state().commands.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.state()
            .commands
            .iter()
            .filter(|c| matches!(c, SimCommand::Reset { .. }))
            .count()
    }

    pub fn dispense_count(&self) -> usize {
        self.state()
            .commands
            .iter()
            .filter(|c| matches!(c, SimCommand::Dispense { .. }))
            .count()
    }

    /// Cartridges as the device currently believes them to be.
    pub fn loaded(&self) -> Vec<Cartridge> {
        self.state().loaded.clone()
    }

    /// Currency from the last successful reset.
    pub fn currency(&self) -> Option<Currency> {
        self.state().currency.clone()
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn command_failed(command: &str, detail: impl Into<String>) -> DeviceError {
        DeviceError::CommandFailed {
            command: command.to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl Device for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> DeviceResult<()> {
        let open_latency = self.state().open_latency;
        if !open_latency.is_zero() {
            tokio::time::sleep(open_latency).await;
        }

        let mut state = self.state();

        if let Some(detail) = state.fail_open.take() {
            drop(state);
            self.emit(DeviceEventKind::Fault, format!("open failed: {}", detail));
            return Err(DeviceError::OpenFailed(detail));
        }

        if state.session_open {
            return Err(DeviceError::OpenFailed("session already open".to_string()));
        }

        state.session_open = true;
        state.opens += 1;
        drop(state);

        self.emit(DeviceEventKind::SessionOpened, self.name.clone());
        Ok(())
    }

    fn release(&self) {
        let mut state = self.state();
        state.session_open = false;
        state.releases += 1;
        drop(state);

        self.emit(DeviceEventKind::SessionReleased, self.name.clone());
    }

    async fn reset(&self, cartridges: &[Cartridge], currency: &Currency) -> DeviceResult<()> {
        self.simulate_latency().await;
        self.emit(DeviceEventKind::CommandSent, "reset");

        let mut state = self.state();
        if !state.session_open {
            return Err(Self::command_failed("reset", "no open session"));
        }

        if let Some(detail) = state.fail_reset.take() {
            drop(state);
            self.emit(DeviceEventKind::Fault, format!("reset failed: {}", detail));
            return Err(Self::command_failed("reset", detail));
        }

        state.loaded = cartridges.to_vec();
        state.currency = Some(currency.clone());
        state.commands.push(SimCommand::Reset {
            cartridges: cartridges.to_vec(),
            currency: currency.clone(),
        });
        drop(state);

        self.emit(
            DeviceEventKind::Response,
            format!("reset ok: {} cartridges, {}", cartridges.len(), currency),
        );
        Ok(())
    }

    async fn dispense(&self, notes: &[u32]) -> DeviceResult<DispenseReport> {
        self.simulate_latency().await;
        self.emit(DeviceEventKind::CommandSent, format!("dispense {:?}", notes));

        let mut state = self.state();
        if !state.session_open {
            return Err(Self::command_failed("dispense", "no open session"));
        }

        if let Some(detail) = state.fail_dispense.take() {
            drop(state);
            self.emit(DeviceEventKind::Fault, format!("dispense failed: {}", detail));
            return Err(Self::command_failed("dispense", detail));
        }

        if notes.len() != state.loaded.len() {
            return Err(Self::command_failed(
                "dispense",
                format!(
                    "expected {} cassette counts, got {}",
                    state.loaded.len(),
                    notes.len()
                ),
            ));
        }

        if let Some((cartridge, requested)) = state
            .loaded
            .iter()
            .zip(notes)
            .find(|(cartridge, &requested)| requested > cartridge.count)
        {
            return Err(Self::command_failed(
                "dispense",
                format!(
                    "cassette {} holds {} notes, asked for {}",
                    cartridge.denomination, cartridge.count, requested
                ),
            ));
        }

        let dispensed: Vec<u32> = match state.short_dispense.take() {
            Some(limit) => notes
                .iter()
                .enumerate()
                .map(|(i, &n)| n.min(limit.get(i).copied().unwrap_or(n)))
                .collect(),
            None => notes.to_vec(),
        };

        for (cartridge, &taken) in state.loaded.iter_mut().zip(&dispensed) {
            cartridge.count -= taken;
        }
        state.commands.push(SimCommand::Dispense {
            notes: notes.to_vec(),
        });
        drop(state);

        self.emit(DeviceEventKind::Response, format!("dispensed {:?}", dispensed));
        Ok(DispenseReport {
            rejected: vec![0; dispensed.len()],
            dispensed,
        })
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<DeviceEvent>> {
        Some(self.events.subscribe())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
