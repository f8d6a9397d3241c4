//! Day and month rollovers: export naming, export content, store reset and
//! the overflow policies.

use crate::mock_hw::{EventLog, MockClock, MockNvs, MockSensor};

use clima::app::events::AppEvent;
use clima::app::service::HistoryService;
use clima::config::{HistoryConfig, OverflowPolicy};
use clima::history::export::{CSV_HEADER, EXPORT_NAMESPACE};
use clima::history::{
    HISTORY_CAPACITY, LoadStatus, PersistenceCache, RolloverExporter, Sample, SampleStore,
    Transition,
};

// 2024-01-01T00:00:00Z
const JAN_1: i64 = 1_704_067_200;
const HOUR: i64 = 3600;
const DAY: i64 = 24 * HOUR;
const JAN_31: i64 = JAN_1 + 30 * DAY;
const FEB_1: i64 = JAN_1 + 31 * DAY;

fn utc_config() -> HistoryConfig {
    HistoryConfig {
        utc_offset_secs: 0,
        ..Default::default()
    }
}

/// One sample per hour of 2024-01-31, 00:00 through 23:00.
fn jan_31() -> Vec<Sample> {
    (0..24)
        .map(|h| Sample::new(JAN_31 + h * HOUR, 20.0 + h as f32 * 0.1, 50.0))
        .collect()
}

fn csv_lines(csv: &str) -> usize {
    csv.lines().count() - 1
}

#[test]
fn monthly_export_resets_store_to_last_sample_and_clears_cache() {
    let history = jan_31();
    let mut nvs = MockNvs::new();
    let cache = PersistenceCache::new();
    let (mut store, _) = SampleStore::<HISTORY_CAPACITY>::from_samples(history.iter().copied());
    cache.save(&mut nvs, &store).unwrap();
    assert_eq!(nvs.cached_samples(), history);

    let exporter = RolloverExporter::new(0, 24);
    let export = exporter
        .export_monthly(&mut nvs, &mut store, &cache, JAN_31 + 23 * HOUR)
        .unwrap();

    assert_eq!(export.records, history.len());
    assert!(export.cache_cleared);
    assert_eq!(store.len(), 1);
    assert_eq!(store.all()[0], history[history.len() - 1]);
    assert!(!cache.exists(&nvs));
    assert_eq!(cache.load::<HISTORY_CAPACITY>(&nvs).status, LoadStatus::Missing);
}

#[test]
fn end_of_month_exports_then_resets() {
    let history = jan_31();
    let mut nvs = MockNvs::with_cache(&history);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    assert_eq!(svc.last_processed(), Some(JAN_31 + 23 * HOUR));

    let clock = MockClock::at(FEB_1);
    let mut sensor = MockSensor::new(18.0, 60.0);
    log.clear();

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::MonthChanged)
    );

    // Both exports are named after the closed period and hold all of it.
    assert_eq!(
        nvs.keys(EXPORT_NAMESPACE),
        vec!["01-2024.csv".to_string(), "31-01-2024.csv".to_string()]
    );
    let daily = nvs.get_str(EXPORT_NAMESPACE, "31-01-2024.csv").unwrap();
    let monthly = nvs.get_str(EXPORT_NAMESPACE, "01-2024.csv").unwrap();
    assert!(daily.starts_with(CSV_HEADER));
    assert_eq!(csv_lines(daily), 24);
    assert_eq!(csv_lines(monthly), 24);
    assert!(daily.contains("00:00:00, 31-01-2024, 20.0, 50.0"));
    assert!(monthly.ends_with("23:00:00, 31-01-2024, 22.3, 50.0\n"));
    assert!(!monthly.contains("01-02-2024"));

    // Store reset to the closed month's last sample, then the new hour.
    assert_eq!(
        svc.full_history(),
        &[history[23], Sample::new(FEB_1, 18.0, 60.0)]
    );
    assert_eq!(nvs.cached_samples(), svc.full_history());

    let kinds: Vec<&str> = log
        .events
        .iter()
        .map(|e| match e {
            AppEvent::DailyExported { .. } => "daily",
            AppEvent::MonthlyExported(_) => "monthly",
            AppEvent::SampleRecorded(_) => "sample",
            AppEvent::Persisted { .. } => "persisted",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["daily", "monthly", "sample", "persisted"]);
}

#[test]
fn monthly_event_reports_cache_cleared() {
    let mut nvs = MockNvs::with_cache(&jan_31());
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    let clock = MockClock::at(FEB_1 + 5);
    let mut sensor = MockSensor::new(18.0, 60.0);

    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    let export = log
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::MonthlyExported(m) => Some(m.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(export.name, "01-2024.csv");
    assert_eq!(export.records, 24);
    assert!(export.cache_cleared);
}

#[test]
fn midnight_exports_day_and_keeps_history() {
    let history = jan_31();
    // 2024-01-30 with 23:00 as the newest sample.
    let shifted: Vec<Sample> = history
        .iter()
        .map(|s| Sample::new(s.timestamp - DAY, s.temperature, s.humidity))
        .collect();
    let mut nvs = MockNvs::with_cache(&shifted);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    let clock = MockClock::at(JAN_31);
    let mut sensor = MockSensor::new(18.0, 60.0);

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::DayChanged)
    );
    assert_eq!(nvs.keys(EXPORT_NAMESPACE), vec!["30-01-2024.csv".to_string()]);
    assert_eq!(svc.len(), 25);
    assert_eq!(log.count(|e| matches!(e, AppEvent::MonthlyExported(_))), 0);
}

#[test]
fn daily_export_is_limited_to_window() {
    // Two full days; only the newest 24 samples go into the daily file.
    let samples: Vec<Sample> = (0..48)
        .map(|h| Sample::new(JAN_1 + h * HOUR, h as f32, 50.0))
        .collect();
    let mut nvs = MockNvs::with_cache(&samples);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    let clock = MockClock::at(JAN_1 + 2 * DAY);
    let mut sensor = MockSensor::new(0.0, 0.0);

    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();
    let daily = nvs.get_str(EXPORT_NAMESPACE, "02-01-2024.csv").unwrap();
    assert_eq!(csv_lines(daily), 24);
    assert!(daily.contains("00:00:00, 02-01-2024, 24.0"));
    assert!(!daily.contains("01-01-2024"));
}

#[test]
fn boundaries_follow_device_local_time() {
    // 2024-02-01T02:00Z is still 2024-01-31 23:00 at UTC-3.
    let last = FEB_1 + 2 * HOUR;
    let mut nvs = MockNvs::with_cache(&[Sample::new(last, 20.0, 50.0)]);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(HistoryConfig::default(), &nvs, &mut log);
    let clock = MockClock::at(last + HOUR);
    let mut sensor = MockSensor::new(20.0, 50.0);

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::MonthChanged)
    );
    assert!(nvs.exists_export("31-01-2024.csv"));
    assert!(nvs.exists_export("01-2024.csv"));
}

#[test]
fn long_power_off_collapses_into_one_rollover() {
    // Last sample 2024-01-15 10:00, next boot 2024-03-03.
    let last = JAN_1 + 14 * DAY + 10 * HOUR;
    let mut nvs = MockNvs::with_cache(&[Sample::new(last, 20.0, 50.0)]);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    let clock = MockClock::at(FEB_1 + 31 * DAY);
    let mut sensor = MockSensor::new(20.0, 50.0);

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::MonthChanged)
    );
    assert_eq!(
        nvs.keys(EXPORT_NAMESPACE),
        vec!["01-2024.csv".to_string(), "15-01-2024.csv".to_string()]
    );
}

#[test]
fn failed_monthly_export_keeps_history() {
    let history = jan_31();
    let mut nvs = MockNvs::with_cache(&history);
    nvs.fail_namespace = Some(EXPORT_NAMESPACE);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    let clock = MockClock::at(FEB_1);
    let mut sensor = MockSensor::new(18.0, 60.0);

    assert_eq!(
        svc.tick(&clock, &mut sensor, &mut nvs, &mut log),
        Ok(Transition::MonthChanged)
    );
    assert_eq!(log.count(|e| matches!(e, AppEvent::ExportFailed(_))), 2);
    assert_eq!(svc.len(), 25);
    assert_eq!(svc.full_history()[..24], history[..]);
    assert_eq!(nvs.cached_samples().len(), 25);
}

fn full_store() -> Vec<Sample> {
    // Ends 2024-02-01T23:00Z.
    (0..HISTORY_CAPACITY as i64)
        .map(|h| Sample::new(JAN_1 + h * HOUR, 20.0, 50.0))
        .collect()
}

#[test]
fn full_store_evicts_oldest_by_default() {
    let samples = full_store();
    let mut nvs = MockNvs::with_cache(&samples);
    let mut log = EventLog::new();
    let mut svc = HistoryService::boot(utc_config(), &nvs, &mut log);
    assert_eq!(svc.len(), HISTORY_CAPACITY);

    let clock = MockClock::at(JAN_1 + HISTORY_CAPACITY as i64 * HOUR);
    let mut sensor = MockSensor::new(30.0, 30.0);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();

    assert_eq!(svc.len(), HISTORY_CAPACITY);
    assert_eq!(svc.full_history()[0], samples[1]);
    assert_eq!(svc.latest_reading().map(|s| s.temperature), Some(30.0));
    assert!(log.events.contains(&AppEvent::SampleEvicted(samples[0])));
}

#[test]
fn full_store_rejects_with_reject_policy() {
    let samples = full_store();
    let mut nvs = MockNvs::with_cache(&samples);
    let mut log = EventLog::new();
    let config = HistoryConfig {
        overflow_policy: OverflowPolicy::Reject,
        ..utc_config()
    };
    let mut svc = HistoryService::boot(config, &nvs, &mut log);

    let clock = MockClock::at(JAN_1 + HISTORY_CAPACITY as i64 * HOUR);
    let mut sensor = MockSensor::new(30.0, 30.0);
    svc.tick(&clock, &mut sensor, &mut nvs, &mut log).unwrap();

    assert_eq!(svc.full_history(), samples.as_slice());
    assert_eq!(
        log.count(|e| matches!(e, AppEvent::SampleRejected { .. })),
        1
    );
}
