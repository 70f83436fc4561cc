//! Local append-only data log.
//!
//! One line per telemetry record, in
//! [`TelemetryRecord::to_log_line`](crate::telemetry::TelemetryRecord::to_log_line)
//! format.  The file is opened per write so it can be rotated or removed
//! while the rig runs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app::ports::TelemetrySink;
use crate::error::TelemetryError;
use crate::telemetry::TelemetryRecord;

pub struct DataLog {
    path: PathBuf,
}

impl DataLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl TelemetrySink for DataLog {
    fn name(&self) -> &'static str {
        "data log"
    }

    fn write(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(TelemetryError::DataLog)?;
        writeln!(file, "{}", record.to_log_line()).map_err(TelemetryError::DataLog)
    }
}
