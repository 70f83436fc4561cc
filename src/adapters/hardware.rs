//! Hardware adapter: bridges the valve drivers to [`ActuatorPort`].
//!
//! Owns one [`Valve`] per enabled device, connected once at startup and
//! held for the process lifetime.  Disabled devices are never opened; a
//! command addressed to one fails with `NotConnected`.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;

use super::serial::open_link;
use crate::app::ports::ActuatorPort;
use crate::config::{DeviceCatalog, DeviceKind};
use crate::drivers::gpio::GpioBank;
use crate::drivers::proportional::ProportionalValve;
use crate::drivers::relay::RelayBoard;
use crate::drivers::{BoxedLink, Valve};
use crate::error::ActuatorError;
use crate::sequence::{LogicalState, Port};

pub struct ValveBank {
    catalog: DeviceCatalog,
    valves: BTreeMap<String, Valve>,
}

impl ValveBank {
    /// Open the connection of every enabled device.
    pub fn connect(catalog: DeviceCatalog, gpio_root: &Path) -> Result<Self, ActuatorError> {
        Self::connect_with(catalog, gpio_root, |path, baud| open_link(path, baud))
    }

    /// Like [`connect`](Self::connect) with a custom serial opener.
    pub fn connect_with<F>(
        catalog: DeviceCatalog,
        gpio_root: &Path,
        mut open: F,
    ) -> Result<Self, ActuatorError>
    where
        F: FnMut(&str, u32) -> std::io::Result<BoxedLink>,
    {
        let mut valves = BTreeMap::new();
        for dev in catalog.iter() {
            if !dev.enabled {
                info!("Hardware: skipping device {} (disabled)", dev.name);
                continue;
            }
            let mut link = || -> Result<BoxedLink, ActuatorError> {
                let Some(params) = &dev.serial else {
                    return Err(ActuatorError::NotConnected(dev.name.clone()));
                };
                open(&params.path, params.baud).map_err(|source| ActuatorError::Io {
                    device: dev.name.clone(),
                    source,
                })
            };
            let valve = match dev.kind {
                DeviceKind::Relay => Valve::Relay(RelayBoard::new(link()?)),
                DeviceKind::Proportional => Valve::Proportional(ProportionalValve::new(link()?)),
                DeviceKind::Gpio => Valve::Gpio(GpioBank::new(gpio_root)),
            };
            info!("Hardware: connected {} ({:?})", dev.name, dev.kind);
            valves.insert(dev.name.clone(), valve);
        }
        Ok(Self { catalog, valves })
    }

    pub fn is_connected(&self, device: &str) -> bool {
        self.valves.contains_key(device)
    }
}

impl ActuatorPort for ValveBank {
    fn apply(&mut self, device: &str, port: Port, state: &LogicalState) -> Result<(), ActuatorError> {
        let valve = self
            .valves
            .get_mut(device)
            .ok_or_else(|| ActuatorError::NotConnected(device.to_string()))?;
        let address = self
            .catalog
            .get(device)
            .and_then(|d| d.address(port))
            .ok_or_else(|| ActuatorError::UnmappedPort {
                device: device.to_string(),
                port: port.to_string(),
            })?;
        valve.apply(device, address, state)
    }
}
