//! HistoryService tick pipeline: clock gating, hourly recording, recovery
//! after reboot and persistence retries.

use crate::mock_hw::{EventLog, MockClock, MockNvs, MockSensor};

use clima::app::events::AppEvent;
use clima::app::ports::ClockPort;
use clima::app::service::HistoryService;
use clima::config::HistoryConfig;
use clima::error::HistoryError;
use clima::history::{LoadStatus, Sample, Transition};

// 2024-01-01T00:00:00Z
const JAN_1: i64 = 1_704_067_200;
const HOUR: i64 = 3600;

fn utc_config() -> HistoryConfig {
    HistoryConfig {
        utc_offset_secs: 0,
        ..Default::default()
    }
}

fn boot(nvs: &MockNvs, log: &mut EventLog) -> HistoryService {
    HistoryService::boot(utc_config(), nvs, log)
}

#[test]
fn unsynced_clock_does_nothing() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    let clock = MockClock::unsynced(JAN_1);
    let mut sensor = MockSensor::new(20.0, 50.0);

    for _ in 0..3 {
        assert_eq!(
            svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
            Err(HistoryError::ClockNotReady)
        );
        clock.advance(HOUR);
    }
    assert!(svc.is_empty());
    assert_eq!(svc.last_processed(), None);
    assert_eq!(svc.boot_time(), None);
    assert_eq!(sensor.reads, 0);
    assert_eq!(nvs.writes, 0);
    assert_eq!(log.count(|e| matches!(e, AppEvent::ClockNotReady)), 3);
}

#[test]
fn clock_below_floor_counts_as_unsynced() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    // Synced flag set, but the RTC still reads 1970.
    let clock = MockClock::at(3 * HOUR);
    let mut sensor = MockSensor::new(20.0, 50.0);

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Err(HistoryError::ClockNotReady)
    );
}

#[test]
fn records_once_per_hour() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    let clock = MockClock::at(JAN_1 + 60);
    let mut sensor = MockSensor::new(20.0, 50.0);

    // First synchronised tick only seeds the monitor.
    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::NoChange)
    );
    assert_eq!(svc.boot_time(), Some(JAN_1 + 60));

    // One-second ticks for three hours.
    let mut changes = 0;
    for _ in 0..3 * HOUR {
        clock.advance(1);
        if svc.tick(&clock, &mut sensor, &mut nvs, &mut log) == Ok(Transition::HourChanged) {
            changes += 1;
        }
    }
    assert_eq!(changes, 3);
    assert_eq!(svc.len(), 3);
    assert_eq!(sensor.reads, 3);
    assert_eq!(
        svc.full_history()
            .iter()
            .map(|s| s.timestamp)
            .collect::<Vec<_>>(),
        vec![JAN_1 + HOUR, JAN_1 + 2 * HOUR, JAN_1 + 3 * HOUR]
    );
    assert_eq!(nvs.cached_samples(), svc.full_history());
    assert_eq!(svc.tick_count(), 1 + 3 * HOUR as u64);
}

#[test]
fn failed_sensor_records_zeros() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    let clock = MockClock::at(JAN_1);
    let mut sensor = MockSensor::failing();

    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    clock.advance(HOUR);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();

    assert_eq!(svc.latest_reading(), Some(&Sample::new(JAN_1 + HOUR, 0.0, 0.0)));
    assert_eq!(log.count(|e| matches!(e, AppEvent::SensorFault(_))), 1);
}

#[test]
fn reboot_recovers_history_without_duplicates() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let clock = MockClock::at(JAN_1);
    let mut sensor = MockSensor::new(21.0, 40.0);

    let history = {
        let mut svc = boot(&nvs, &mut log);
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
        for _ in 0..5 {
            clock.advance(HOUR);
            svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
        }
        svc.full_history().to_vec()
    };
    assert_eq!(history.len(), 5);

    // Power cycle inside the same hour.
    log.clear();
    clock.advance(20 * 60);
    let mut svc = boot(&nvs, &mut log);
    assert_eq!(svc.full_history(), history.as_slice());
    assert_eq!(svc.last_processed(), Some(JAN_1 + 5 * HOUR));
    assert!(matches!(
        log.events[0],
        AppEvent::Started {
            recovered: 5,
            status: LoadStatus::Loaded { .. }
        }
    ));

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::NoChange)
    );
    assert_eq!(svc.len(), 5);

    clock.advance(HOUR);
    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::HourChanged)
    );
    assert_eq!(svc.len(), 6);
}

#[test]
fn truncated_cache_keeps_whole_records() {
    let samples = [
        Sample::new(JAN_1, 20.0, 50.0),
        Sample::new(JAN_1 + HOUR, 21.0, 55.0),
    ];
    let mut nvs = MockNvs::with_cache(&samples);
    let mut bytes = nvs.get("history", "CACHE").unwrap().to_vec();
    bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7]);
    nvs.put("history", "CACHE", bytes);

    let mut log = EventLog::new();
    let svc = boot(&nvs, &mut log);
    assert_eq!(svc.full_history(), &samples);
    assert!(matches!(
        log.events[0],
        AppEvent::Started {
            status: LoadStatus::Loaded {
                discarded_bytes: 7,
                ..
            },
            ..
        }
    ));
}

#[test]
fn backwards_clock_records_nothing() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    let clock = MockClock::at(JAN_1 + 10 * HOUR);
    let mut sensor = MockSensor::new(20.0, 50.0);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    clock.advance(HOUR);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    assert_eq!(svc.len(), 1);
    let reads = sensor.reads;

    clock.set(JAN_1 + 2 * HOUR);
    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::NoChange)
    );
    assert_eq!(svc.len(), 1);
    assert_eq!(sensor.reads, reads);
    assert!(log.events.contains(&AppEvent::ClockWentBackwards {
        now: JAN_1 + 2 * HOUR,
        last: JAN_1 + 11 * HOUR,
    }));

    // Once the clock catches up, recording resumes.
    clock.set(JAN_1 + 12 * HOUR);
    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::HourChanged)
    );
    assert_eq!(svc.len(), 2);
}

#[test]
fn future_cached_sample_is_dropped_on_first_sync() {
    // 2100-01-01T00:00:00Z, e.g. a bit-flipped timestamp.
    const YEAR_2100: i64 = 4_102_444_800;
    let mut nvs = MockNvs::with_cache(&[
        Sample::new(JAN_1, 20.0, 50.0),
        Sample::new(JAN_1 + HOUR, 21.0, 51.0),
        Sample::new(YEAR_2100, 22.0, 52.0),
    ]);
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    assert_eq!(svc.last_processed(), Some(YEAR_2100));

    let clock = MockClock::at(JAN_1 + HOUR + 30 * 60);
    let mut sensor = MockSensor::new(23.0, 53.0);
    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::NoChange)
    );
    assert_eq!(svc.len(), 2);
    assert_eq!(svc.last_processed(), Some(JAN_1 + HOUR));
    assert!(log.events.contains(&AppEvent::FutureSamplesDropped {
        removed: 1,
        now: JAN_1 + HOUR + 30 * 60,
    }));
    assert!(!log.events.iter().any(|e| matches!(e, AppEvent::ClockWentBackwards { .. })));
    assert_eq!(nvs.cached_samples(), svc.full_history());

    for _ in 0..720 {
        clock.advance(HOUR);
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    }
    assert_eq!(sensor.reads, 720);
    assert!(svc.full_history().iter().all(|s| s.timestamp < YEAR_2100));
    assert_eq!(svc.latest_reading().map(|s| s.timestamp), Some(clock.now()));
}

#[test]
fn failed_save_is_retried_after_interval() {
    let mut nvs = MockNvs::new();
    let mut log = EventLog::new();
    let mut svc = boot(&nvs, &mut log);
    let clock = MockClock::at(JAN_1);
    let mut sensor = MockSensor::new(20.0, 50.0);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();

    nvs.fail_writes = true;
    clock.advance(HOUR);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    assert_eq!(svc.len(), 1);
    assert!(svc.is_cache_dirty());
    assert_eq!(log.count(|e| matches!(e, AppEvent::StorageFailed(_))), 1);

    // Storage recovers, but the retry waits for the interval.
    nvs.fail_writes = false;
    clock.advance(10);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    assert!(svc.is_cache_dirty());
    assert!(nvs.cached_samples().is_empty());

    clock.advance(i64::from(svc.config().persist_retry_secs));
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    assert!(!svc.is_cache_dirty());
    assert_eq!(nvs.cached_samples(), svc.full_history());
}

#[test]
fn graph_window_follows_config() {
    let samples: Vec<Sample> = (0..200)
        .map(|i| Sample::new(JAN_1 + i * HOUR, 20.0, 50.0))
        .collect();
    let nvs = MockNvs::with_cache(&samples);
    let mut log = EventLog::new();
    let svc = boot(&nvs, &mut log);

    assert_eq!(svc.len(), 200);
    assert_eq!(svc.graph_window().len(), 168);
    assert_eq!(svc.graph_window().first(), Some(&samples[32]));
    assert_eq!(svc.recent_window(2), &samples[198..]);
    assert_eq!(svc.recent_window(1000).len(), 200);
}
