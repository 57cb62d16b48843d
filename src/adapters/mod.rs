//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `storage`   | ConfigPort         | settings.json on SPIFFS / fs  |
//! |             | ProfileStore       | prog/*.json                   |
//! | `telemetry` | TelemetrySink      | telemetry channel, serial log |
//! | `time`      | Clock              | ESP32 system timer            |

pub mod storage;
pub mod telemetry;
pub mod time;
