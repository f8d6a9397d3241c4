//! NVS (Non-Volatile Storage) config adapter.
//!
//! Implements [`ConfigPort`] for the CLIMA logger. The configuration is a
//! single postcard blob in the `clima` namespace; a missing or unreadable
//! blob falls back to [`HistoryConfig::default`].
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::HistoryConfig;
use crate::history::HISTORY_CAPACITY;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &core::ffi::CStr = c"clima";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &core::ffi::CStr = c"histcfg";
#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

/// Largest UTC offset in use anywhere (UTC+14 / UTC-12, rounded up).
const MAX_UTC_OFFSET_SECS: i32 = 14 * 3600;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    stored: Option<Vec<u8>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            stored: None,
        })
    }

    /// Open the config namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob() -> Result<Vec<u8>, i32> {
        Self::with_nvs_handle(false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr(), core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr(), buf.as_mut_ptr().cast(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        })
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(bytes: &[u8]) -> Result<(), i32> {
        Self::with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(handle, CONFIG_KEY.as_ptr(), bytes.as_ptr().cast(), bytes.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
    }
}

pub(crate) fn validate_config(cfg: &HistoryConfig) -> Result<(), ConfigError> {
    if cfg.device_name.is_empty() {
        return Err(ConfigError::ValidationFailed("device_name must not be empty"));
    }
    if !(-MAX_UTC_OFFSET_SECS..=MAX_UTC_OFFSET_SECS).contains(&cfg.utc_offset_secs) {
        return Err(ConfigError::ValidationFailed(
            "utc_offset_secs must be within ±14h",
        ));
    }
    if cfg.sync_epoch_floor <= 0 {
        return Err(ConfigError::ValidationFailed(
            "sync_epoch_floor must be a positive epoch second",
        ));
    }
    if cfg.clock_sync_retries == 0 {
        return Err(ConfigError::ValidationFailed(
            "clock_sync_retries must be at least 1",
        ));
    }
    if !(10..=10_000).contains(&cfg.clock_sync_retry_ms) {
        return Err(ConfigError::ValidationFailed(
            "clock_sync_retry_ms must be 10–10000",
        ));
    }
    // Ticks must be finer than a minute or an hour boundary can be missed
    // by a whole tick.
    if !(100..60_000).contains(&cfg.tick_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "tick_interval_ms must be 100–59999",
        ));
    }
    if !(10..=86_400).contains(&cfg.persist_retry_secs) {
        return Err(ConfigError::ValidationFailed(
            "persist_retry_secs must be 10–86400",
        ));
    }
    if !(1..=HISTORY_CAPACITY).contains(&(cfg.daily_export_window as usize)) {
        return Err(ConfigError::ValidationFailed(
            "daily_export_window must be 1–history capacity",
        ));
    }
    if !(1..=HISTORY_CAPACITY).contains(&(cfg.render_window as usize)) {
        return Err(ConfigError::ValidationFailed(
            "render_window must be 1–history capacity",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<HistoryConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        let bytes: Option<Vec<u8>> = self.stored.clone();

        #[cfg(target_os = "espidf")]
        let bytes: Option<Vec<u8>> = match Self::read_blob() {
            Ok(bytes) => Some(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => None,
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}, using defaults", e);
                None
            }
        };

        match bytes {
            Some(bytes) => {
                let cfg: HistoryConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(HistoryConfig::default())
            }
        }
    }

    fn save(&mut self, config: &HistoryConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: config saved (simulation, {} bytes)", bytes.len());
            self.stored = Some(bytes);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            match Self::write_blob(&bytes) {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
