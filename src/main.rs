//! CLIMA Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   WallClock       │
//! │  (SensorPort)      (EventSink)    (ConfigPort) (ClockPort)     │
//! │  FsStorage         WifiAdapter    SerialConsole                │
//! │  (StoragePort)     (STA + SNTP)   (AppCommand)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            HistoryService (pure logic)                 │    │
//! │  │  ClockMonitor · SampleStore · Cache · Exporter         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, error, info, warn};

use clima::adapters::console::SerialConsole;
use clima::adapters::fs::FsStorage;
use clima::adapters::hardware::HardwareAdapter;
use clima::adapters::log_sink::LogEventSink;
use clima::adapters::nvs::NvsAdapter;
use clima::adapters::time::WallClock;
use clima::adapters::wifi::{BUILD_PASSWORD, BUILD_SSID, WifiAdapter};
use clima::app::ports::{ClockPort, ConfigPort};
use clima::app::service::HistoryService;
use clima::config::HistoryConfig;
use clima::error::HistoryError;
use clima::history::Transition;
use clima::history::export::EXPORT_NAMESPACE;
use clima::pins;
use clima::sensors::DhtSensor;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CLIMA v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new().and_then(|nvs| nvs.load()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config unavailable ({}), using defaults", e);
            HistoryConfig::default()
        }
    };
    info!(
        "Config: device={} utc_offset={}s tick={}ms",
        config.device_name, config.utc_offset_secs, config.tick_interval_ms
    );

    // ── 3. Network + time sync ────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take().ok();

    let mut wifi = WifiAdapter::new(peripherals.modem, sys_loop, nvs_partition)?;
    let mut sntp_started = false;
    match wifi.set_credentials(BUILD_SSID, BUILD_PASSWORD) {
        // A failed first connect is retried by `poll` in the loop.
        Ok(()) => {
            if wifi.connect().is_ok() {
                sntp_started = wifi.start_time_sync().is_ok();
            }
        }
        Err(e) => warn!("WiFi disabled: {}", e),
    }

    let clock = WallClock::new(config.sync_epoch_floor);
    for attempt in 1..=config.clock_sync_retries {
        if clock.is_synchronized() {
            info!("Clock synchronised after {} attempts", attempt);
            break;
        }
        FreeRtos::delay_ms(config.clock_sync_retry_ms);
    }
    if !clock.is_synchronized() {
        warn!("Clock not synchronised yet; history waits for it");
    }

    // ── 4. Storage ────────────────────────────────────────────
    let mut storage = FsStorage::mount_spiffs(pins::SPIFFS_BASE_PATH).unwrap_or_else(|e| {
        // Every save will fail and be reported; sampling keeps running.
        error!("SPIFFS unavailable ({}), history will not persist", e);
        FsStorage::new(pins::SPIFFS_BASE_PATH.to_string_lossy().into_owned())
    });

    match storage.list(EXPORT_NAMESPACE) {
        Ok(files) => info!("{} export files on flash", files.len()),
        Err(e) => warn!("Cannot list exports: {}", e),
    }

    // ── 5. Construct adapters ─────────────────────────────────
    // SAFETY: DHT_DATA_GPIO is not claimed by any other driver.
    let dht_pin = PinDriver::input_output_od(unsafe { AnyIOPin::new(pins::DHT_DATA_GPIO) })?;
    let mut hw = HardwareAdapter::new(DhtSensor::new(dht_pin));
    let mut log_sink = LogEventSink::new();
    let console = SerialConsole::spawn()
        .inspect_err(|e| warn!("Serial console unavailable: {}", e))
        .ok();

    // ── 6. Boot the history core ──────────────────────────────
    let tick_interval_ms = config.tick_interval_ms;
    let mut service = Box::new(HistoryService::boot(config, &storage, &mut log_sink));
    info!("Entering main loop ({} samples in history)", service.len());

    // ── 7. Main loop ──────────────────────────────────────────
    let mut sntp_reported = false;
    loop {
        wifi.poll();
        if !sntp_started && wifi.is_connected() {
            sntp_started = wifi.start_time_sync().is_ok();
        }
        if sntp_started && !sntp_reported && wifi.time_synced() {
            info!("SNTP sync completed");
            sntp_reported = true;
        }

        match service.tick(&clock, &mut hw, &mut storage, &mut log_sink) {
            Ok(Transition::NoChange) | Err(HistoryError::ClockNotReady) => {}
            Ok(transition) => debug!("Tick {}: {:?}", service.tick_count(), transition),
            Err(e) => warn!("Tick failed: {}", e),
        }

        while let Some(cmd) = console.as_ref().and_then(SerialConsole::poll) {
            if let Err(e) = service.handle_command(cmd, &clock, &mut storage, &mut log_sink) {
                warn!("Command {:?} failed: {}", cmd, e);
            }
        }

        FreeRtos::delay_ms(tick_interval_ms);
    }
}
