//! # Device Sessions
//!
//! Exclusive, scoped access to the dispenser.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SessionGate::open(device)                                              │
//! │     │                                                                   │
//! │     ├── acquire the single permit      (waits while another session    │
//! │     │                                   is active)                      │
//! │     ├── device.open()   ──Err──► permit returned, no release()          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Session ── run("dispense", device.dispense(..))  (command deadline)    │
//! │     │                                                                   │
//! │     ▼  dropped: success, error, panic or cancelled future               │
//! │  device.release()  then  permit returned                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::device::Device;
use crate::error::{DeviceError, DeviceResult, DispenserError, DispenserResult};

// =============================================================================
// Session Gate
// =============================================================================

/// Hands out at most one open [`Session`] at a time.
#[derive(Debug, Clone)]
pub struct SessionGate {
    permits: Arc<Semaphore>,
    open_timeout: Option<Duration>,
    command_timeout: Option<Duration>,
}

impl SessionGate {
    /// Creates a gate with the given deadlines (`None` = wait forever).
    pub fn new(open_timeout: Option<Duration>, command_timeout: Option<Duration>) -> Self {
        SessionGate {
            permits: Arc::new(Semaphore::new(1)),
            open_timeout,
            command_timeout,
        }
    }

    /// True while a session is open.
    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }

    /// Opens an exclusive session on `device`.
    ///
    /// Waits for any other session to be released first. Fails with
    /// [`DispenserError::SessionAcquisitionFailure`] when the device cannot
    /// be opened or the open deadline expires; in both cases `release` is
    /// never called, so [`Device::open`] has to be cancel-safe.
    pub async fn open(&self, device: Arc<dyn Device>) -> DispenserResult<Session> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DispenserError::SessionAcquisitionFailure(DeviceError::Disconnected))?;

        let opened = match self.open_timeout {
            Some(limit) => match timeout(limit, device.open()).await {
                Ok(result) => result,
                Err(_) => Err(DeviceError::Timeout {
                    command: "open".to_string(),
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => device.open().await,
        };
        opened.map_err(DispenserError::SessionAcquisitionFailure)?;

        let session = Session {
            id: Uuid::new_v4(),
            device,
            opened_at: Instant::now(),
            command_timeout: self.command_timeout,
            _permit: permit,
        };
        debug!(session_id = %session.id, device = %session.device.name(), "Device session opened");

        Ok(session)
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        SessionGate::new(None, None)
    }
}

// =============================================================================
// Session
// =============================================================================

/// An open device session. Releases the device when dropped.
pub struct Session {
    id: Uuid,
    device: Arc<dyn Device>,
    opened_at: Instant,
    command_timeout: Option<Duration>,
    // Dropped after `Drop::drop`, so the next session can only start once
    // the device has been released.
    _permit: OwnedSemaphorePermit,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    /// Awaits one device command under the session's command deadline.
    pub async fn run<T, F>(&self, command: &'static str, fut: F) -> DeviceResult<T>
    where
        F: Future<Output = DeviceResult<T>>,
    {
        debug!(session_id = %self.id, command, "Sending device command");

        match self.command_timeout {
            Some(limit) => match timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(DeviceError::Timeout {
                    command: command.to_string(),
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => fut.await,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.device.release();
        debug!(
            session_id = %self.id,
            held_ms = self.opened_at.elapsed().as_millis() as u64,
            "Device session released"
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("device", &self.device.name())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedDevice;

    fn device() -> Arc<SimulatedDevice> {
        Arc::new(SimulatedDevice::new("test-dispenser"))
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let sim = device();
        let gate = SessionGate::default();

        let session = gate.open(sim.clone()).await.unwrap();
        assert!(gate.is_busy());
        assert_eq!(sim.open_count(), 1);
        assert_eq!(sim.release_count(), 0);

        drop(session);
        assert!(!gate.is_busy());
        assert_eq!(sim.release_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_open_does_not_release() {
        let sim = device();
        sim.fail_next_open("port busy");
        let gate = SessionGate::default();

        let err = gate.open(sim.clone()).await.unwrap_err();
        assert!(matches!(err, DispenserError::SessionAcquisitionFailure(_)));
        assert_eq!(sim.release_count(), 0);
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn test_open_timeout_does_not_release() {
        let sim = device();
        sim.set_open_latency(Duration::from_millis(200));
        let gate = SessionGate::new(Some(Duration::from_millis(20)), None);

        let err = gate.open(sim.clone()).await.unwrap_err();
        assert!(matches!(
            err.device_error(),
            Some(DeviceError::Timeout { after_ms: 20, .. })
        ));
        assert_eq!(sim.open_count(), 0);
        assert_eq!(sim.release_count(), 0);
        assert!(!sim.is_session_open());
        assert!(!gate.is_busy());

        sim.set_open_latency(Duration::ZERO);
        assert!(gate.open(sim.clone()).await.is_ok());
    }

    #[tokio::test]
    async fn test_sessions_are_exclusive() {
        let sim = device();
        let gate = SessionGate::default();

        let first = gate.open(sim.clone()).await.unwrap();

        let waiting = {
            let gate = gate.clone();
            let sim = sim.clone();
            tokio::spawn(async move { gate.open(sim).await.map(|s| s.id()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());
        assert_eq!(sim.open_count(), 1);

        drop(first);
        let second = waiting.await.unwrap();
        assert!(second.is_ok());
        assert_eq!(sim.open_count(), 2);
        assert_eq!(sim.release_count(), 2);
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let sim = device();
        sim.set_latency(Duration::from_millis(200));
        let gate = SessionGate::new(None, Some(Duration::from_millis(20)));

        let session = gate.open(sim.clone()).await.unwrap();
        let result = session
            .run("dispense", session.device().dispense(&[1]))
            .await;

        assert!(matches!(result, Err(DeviceError::Timeout { after_ms: 20, .. })));
        drop(session);
        assert_eq!(sim.release_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_future_still_releases() {
        let sim = device();
        sim.set_latency(Duration::from_millis(500));
        let gate = SessionGate::default();

        let task = {
            let gate = gate.clone();
            let sim = sim.clone();
            tokio::spawn(async move {
                let session = gate.open(sim).await?;
                let _ = session.run("dispense", session.device().dispense(&[1])).await;
                Ok::<_, DispenserError>(())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        task.abort();
        let _ = task.await;

        assert_eq!(sim.open_count(), 1);
        assert_eq!(sim.release_count(), 1);
        assert!(!gate.is_busy());
    }
}
