//! HistoryService over the real filesystem adapter.

use crate::mock_hw::{EventLog, MockClock, MockSensor};

use clima::adapters::fs::FsStorage;
use clima::app::service::HistoryService;
use clima::config::HistoryConfig;
use clima::history::RECORD_SIZE;

// 2024-01-31T22:30:00Z
const JAN_31_2230: i64 = 1_706_740_200;
const HOUR: i64 = 3600;

fn utc_config() -> HistoryConfig {
    HistoryConfig {
        utc_offset_secs: 0,
        ..Default::default()
    }
}

#[test]
fn month_rollover_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FsStorage::new(dir.path());
    let mut log = EventLog::new();
    let clock = MockClock::at(JAN_31_2230);
    let mut sensor = MockSensor::new(20.0, 50.0);

    let mut svc = HistoryService::boot(utc_config(), &storage, &mut log);
    svc.tick(&clock, &mut sensor, &mut storage, &mut log).unwrap();
    clock.advance(HOUR); // 23:30
    svc.tick(&clock, &mut sensor, &mut storage, &mut log).unwrap();

    let cache = dir.path().join("history").join("CACHE");
    assert_eq!(std::fs::metadata(&cache).unwrap().len(), RECORD_SIZE as u64);

    clock.advance(HOUR); // 2024-02-01 00:30
    svc.tick(&clock, &mut sensor, &mut storage, &mut log).unwrap();

    assert_eq!(
        storage.list("exports").unwrap(),
        vec!["01-2024.csv".to_string(), "31-01-2024.csv".to_string()]
    );
    let monthly = std::fs::read_to_string(dir.path().join("exports").join("01-2024.csv")).unwrap();
    assert_eq!(
        monthly,
        "Hora, Data, Temperatura, Humidade\n23:30:00, 31-01-2024, 20.0, 50.0\n"
    );
    // Seed from January plus the first February sample.
    assert_eq!(std::fs::metadata(&cache).unwrap().len(), 2 * RECORD_SIZE as u64);

    // A fresh boot from the same directory sees the same history.
    let again = HistoryService::boot(utc_config(), &storage, &mut log);
    assert_eq!(again.full_history(), svc.full_history());
}
