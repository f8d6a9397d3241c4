//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                   |
//! |------------|--------------|-------------------------------|
//! | `console`  | —            | Serial console (AppCommand)   |
//! | `fs`       | StoragePort  | SPIFFS / host directory       |
//! | `hardware` | SensorPort   | DHT11 on GPIO                 |
//! | `log_sink` | EventSink    | Serial log output             |
//! | `nvs`      | ConfigPort   | NVS / in-memory store         |
//! | `time`     | ClockPort    | System clock (SNTP-disciplined)|
//! | `wifi`     | —            | ESP-IDF WiFi STA + SNTP       |

pub mod console;
pub mod fs;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
