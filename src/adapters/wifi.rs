//! WiFi station-mode adapter with SNTP time sync.
//!
//! The logger only needs the network for one thing: getting the wall clock
//! right. [`WifiAdapter`] joins the configured access point and starts the
//! SNTP client; the [`ClockPort`](crate::app::ports::ClockPort) adapter then
//! sees a synchronised clock.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver via `esp_idf_svc::wifi` and
//!   `esp_idf_svc::sntp`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! After a failed attempt, `poll` retries with an exponential backoff
//! (2 s → 4 s → 8 s … capped at 60 s), measured in poll calls spaced one
//! second apart.

use core::fmt;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    sntp::{EspSntp, SyncStatus},
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

/// Credentials baked in at build time (`CLIMA_WIFI_SSID` / `CLIMA_WIFI_PASS`).
pub const BUILD_SSID: &str = env!("CLIMA_WIFI_SSID");
pub const BUILD_PASSWORD: &str = env!("CLIMA_WIFI_PASS");

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    TimeSyncFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::TimeSyncFailed => write!(f, "SNTP client could not be started"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32, wait_secs: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(target_os = "espidf")]
    sntp: Option<EspSntp<'static>>,
    /// Simulation: connect attempts that should fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_time_sync: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, esp_idf_sys::EspError> {
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), nvs)?, sys_loop)?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            wifi,
            sntp: None,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            sim_failures: 0,
            sim_time_sync: false,
        }
    }

    /// Make the next `n` simulated connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    pub fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Reconnecting {
                    attempt: 0,
                    wait_secs: self.backoff_secs,
                };
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    /// Call once per second. Retries a dropped or failed connection once the
    /// current backoff has elapsed.
    pub fn poll(&mut self) {
        match self.state {
            WifiState::Reconnecting { attempt, wait_secs } if wait_secs > 1 => {
                self.state = WifiState::Reconnecting {
                    attempt,
                    wait_secs: wait_secs - 1,
                };
            }
            WifiState::Reconnecting { attempt, .. } => {
                info!("WiFi: reconnect attempt {} (backoff {}s)", attempt, self.backoff_secs);
                if self.platform_connect().is_ok() {
                    self.state = WifiState::Connected;
                    self.backoff_secs = INITIAL_BACKOFF_SECS;
                    info!("WiFi: reconnected");
                } else {
                    self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    self.state = WifiState::Reconnecting {
                        attempt: attempt + 1,
                        wait_secs: self.backoff_secs,
                    };
                }
            }
            WifiState::Connected if !self.platform_is_connected() => {
                warn!("WiFi: connection lost, entering reconnect");
                self.state = WifiState::Reconnecting {
                    attempt: 0,
                    wait_secs: self.backoff_secs,
                };
            }
            _ => {}
        }
    }

    /// Start the SNTP client. Idempotent.
    pub fn start_time_sync(&mut self) -> Result<(), ConnectivityError> {
        self.platform_start_sntp()?;
        info!("SNTP: client started");
        Ok(())
    }

    /// Whether SNTP has completed a sync since start.
    pub fn time_synced(&self) -> bool {
        self.platform_time_synced()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let result = (|| {
            self.wifi.set_configuration(&config)?;
            if !self.wifi.is_started()? {
                self.wifi.start()?;
            }
            self.wifi.connect()?;
            self.wifi.wait_netif_up()
        })();
        result.map_err(|e| {
            warn!("WiFi: driver error {}", e);
            ConnectivityError::ConnectionFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated connect failure");
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_sntp(&mut self) -> Result<(), ConnectivityError> {
        if self.sntp.is_none() {
            let sntp = EspSntp::new_default().map_err(|e| {
                warn!("SNTP: start failed {}", e);
                ConnectivityError::TimeSyncFailed
            })?;
            self.sntp = Some(sntp);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_sntp(&mut self) -> Result<(), ConnectivityError> {
        self.sim_time_sync = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_time_synced(&self) -> bool {
        self.sntp
            .as_ref()
            .is_some_and(|s| s.get_sync_status() == SyncStatus::Completed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_time_synced(&self) -> bool {
        self.sim_time_sync
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
