//! # Dispenser Configuration
//!
//! Where the dispenser's device settings and starting inventory come from.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TELLER_DEVICE_NAME=dispenser-2                                     │
//! │     TELLER_CURRENCY=USD                                                │
//! │     TELLER_OPEN_TIMEOUT_MS / TELLER_COMMAND_TIMEOUT_MS                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/dispenser/teller.toml (Linux)                            │
//! │     ~/Library/Application Support/com.teller.dispenser/teller.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [device]
//! name = "dispenser-1"
//! open_timeout_ms = 5000
//! command_timeout_ms = 30000
//!
//! [setup]
//! currency = "EUR"
//! virtual_cartridges = [2500]
//!
//! [[setup.cartridges]]
//! denomination = 500
//! count = 10
//!
//! [[setup.cartridges]]
//! denomination = 2000
//! count = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use teller_core::{CartridgeInventory, SetupData};
use tracing::{debug, info, warn};

use crate::error::{DispenserError, DispenserResult};

/// Default config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "teller.toml";

// =============================================================================
// Device Settings
// =============================================================================

/// How to talk to the dispenser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Human-readable device name for logs.
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Deadline for opening a session (milliseconds).
    #[serde(default = "default_open_timeout")]
    pub open_timeout_ms: u64,

    /// Deadline for a single reset or dispense command (milliseconds).
    /// Payouts of a full bundle can take several seconds on real hardware.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
}

fn default_device_name() -> String {
    "dispenser".to_string()
}

fn default_open_timeout() -> u64 {
    5_000
}

fn default_command_timeout() -> u64 {
    30_000
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            name: default_device_name(),
            open_timeout_ms: default_open_timeout(),
            command_timeout_ms: default_command_timeout(),
        }
    }
}

impl DeviceSettings {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn default_setup() -> SetupData {
    SetupData {
        cartridges: Vec::new(),
        virtual_cartridges: Vec::new(),
        currency: "EUR".to_string(),
    }
}

// =============================================================================
// Dispenser Configuration
// =============================================================================

/// Complete dispenser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenserConfig {
    #[serde(default)]
    pub device: DeviceSettings,

    /// Starting inventory handed to `init`.
    #[serde(default = "default_setup")]
    pub setup: SetupData,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        DispenserConfig {
            device: DeviceSettings::default(),
            setup: default_setup(),
        }
    }
}

impl DispenserConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (teller.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DispenserResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading dispenser config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    ///
    /// The default has no cartridges, so `init` will reject it; this is for
    /// tools that only need the device settings.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load dispenser config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DispenserResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DispenserError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DispenserError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| DispenserError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Dispenser config saved");
        Ok(())
    }

    /// Validates device settings and the starting inventory.
    pub fn validate(&self) -> DispenserResult<()> {
        if self.device.name.trim().is_empty() {
            return Err(DispenserError::InvalidConfig(
                "device.name must not be empty".into(),
            ));
        }

        if self.device.open_timeout_ms == 0 {
            return Err(DispenserError::InvalidConfig(
                "device.open_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.device.command_timeout_ms == 0 {
            return Err(DispenserError::InvalidConfig(
                "device.command_timeout_ms must be greater than 0".into(),
            ));
        }

        CartridgeInventory::from_setup(self.setup.clone()).map_err(DispenserError::InvalidSetup)?;

        Ok(())
    }

    /// Applies `TELLER_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("TELLER_DEVICE_NAME") {
            debug!(name = %name, "Overriding device name from environment");
            self.device.name = name;
        }

        if let Some(currency) = lookup("TELLER_CURRENCY") {
            debug!(currency = %currency, "Overriding currency from environment");
            self.setup.currency = currency;
        }

        if let Some(ms) = lookup("TELLER_OPEN_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => self.device.open_timeout_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring invalid TELLER_OPEN_TIMEOUT_MS"),
            }
        }

        if let Some(ms) = lookup("TELLER_COMMAND_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => self.device.command_timeout_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring invalid TELLER_COMMAND_TIMEOUT_MS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "teller", "dispenser")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
