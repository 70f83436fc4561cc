//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter           | Implements      | Connects to                   |
//! |-------------------|-----------------|-------------------------------|
//! | `analyzer`        | AnalyzerPort    | Gas analyzer serial link      |
//! | `checkpoint_file` | CheckpointPort  | Step checkpoint file          |
//! | `data_log`        | TelemetrySink   | Local append-only data file   |
//! | `hardware`        | ActuatorPort    | Relay boards, GPIO, prop. valves |
//! | `influx`          | TelemetrySink   | InfluxDB v1 HTTP API          |
//! | `log_sink`        | EventSink       | Process log output            |
//! | `time`            | DelayPort       | System clock, stdin advance   |

pub mod analyzer;
pub mod checkpoint_file;
pub mod data_log;
pub mod hardware;
pub mod influx;
pub mod log_sink;
pub(crate) mod serial;
pub mod time;
