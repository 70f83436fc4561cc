//! sysfs GPIO valve driver.
//!
//! A valve line is "open" while it is exported and driven as an output,
//! and "closed" once it is released again:
//!
//! ```text
//!   1 ─▶ export (if gpioN/ missing) ─▶ direction = out ─▶ value = 1
//!   0 ─▶ unexport (if gpioN/ present)
//! ```
//!
//! Both directions are idempotent.  The sysfs root is configurable so the
//! driver can run against a scratch directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin, PinState};
use log::debug;

use crate::error::ActuatorError;

/// I/O failure on a sysfs attribute.
#[derive(Debug)]
pub struct GpioError(pub io::Error);

impl digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One sysfs GPIO line.
pub struct SysfsPin {
    root: PathBuf,
    line: u32,
}

impl SysfsPin {
    pub fn new(root: &Path, line: u32) -> Self {
        Self {
            root: root.to_path_buf(),
            line,
        }
    }

    fn line_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.line))
    }

    pub fn is_exported(&self) -> bool {
        self.line_dir().is_dir()
    }

    fn write(&self, attr: &Path, value: &str) -> Result<(), GpioError> {
        fs::write(attr, value).map_err(GpioError)
    }
}

impl ErrorType for SysfsPin {
    type Error = GpioError;
}

impl OutputPin for SysfsPin {
    fn set_high(&mut self) -> Result<(), GpioError> {
        if !self.is_exported() {
            self.write(&self.root.join("export"), &self.line.to_string())?;
        }
        let dir = self.line_dir();
        self.write(&dir.join("direction"), "out")?;
        self.write(&dir.join("value"), "1")
    }

    fn set_low(&mut self) -> Result<(), GpioError> {
        if self.is_exported() {
            self.write(&self.root.join("unexport"), &self.line.to_string())?;
        }
        Ok(())
    }
}

/// All GPIO valve lines under one sysfs root.
pub struct GpioBank {
    root: PathBuf,
}

impl GpioBank {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn set(&mut self, device: &str, line: u32, high: bool) -> Result<(), ActuatorError> {
        SysfsPin::new(&self.root, line)
            .set_state(PinState::from(high))
            .map_err(|GpioError(source)| ActuatorError::Io {
                device: device.to_string(),
                source,
            })?;
        debug!("GPIO: {device} line {line} -> {}", u8::from(high));
        Ok(())
    }
}
