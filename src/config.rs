//! Rig configuration.
//!
//! Loaded once at startup from a YAML file.  [`RigConfig::validate`]
//! resolves every device kind, port mapping, initial state and sequence
//! record up front, so a bad configuration fails before any hardware is
//! touched.
//!
//! ```yaml
//! states_file: states.json
//! step_file: step.txt
//! sequence_loop: true
//! devices:
//!   sv1:   { port: /dev/ttyUSB0, baud: 115200, mapping: {0: 1}, init: {0: 0} }
//!   mpv1:  { port: /dev/ttyUSB1, baud: 9600, init: {0: 1} }
//!   gpio:  { kind: gpio, mapping: {0: 17}, init: {0: 0} }
//! sequence:
//!   - "0.5,mpv1,-,50"
//!   - "1,sv1,0,1"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sequence::{LogicalState, Port, SequencePlan, normalize};

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    // --- Hardware ---
    /// Devices by name.
    pub devices: BTreeMap<String, DeviceConfig>,
    /// Root of the sysfs GPIO tree.
    pub gpio_root: PathBuf,
    /// Pause after setting up each device (milliseconds).
    pub settle_ms: u64,
    /// Extra attempts per actuation before a failure becomes fatal.
    pub actuator_retries: u32,

    // --- Sequence ---
    /// `"offset_minutes,device,port,state"` records, any order.
    pub sequence: Vec<String>,
    /// Restart the plan after the last step.
    pub sequence_loop: bool,
    /// Wait for a manual advance instead of sleeping.
    pub manual_mode: bool,

    // --- Persistence ---
    /// State registry file (`{"device#port": state}`).
    pub states_file: Option<PathBuf>,
    /// Checkpoint file (`step_index,elapsed_seconds`).
    pub step_file: Option<PathBuf>,
    /// Append-only telemetry log.
    pub data_file: Option<PathBuf>,

    // --- Telemetry ---
    pub analyzer: AnalyzerConfig,
    pub influxdb: InfluxConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            devices: BTreeMap::new(),
            gpio_root: PathBuf::from("/sys/class/gpio"),
            settle_ms: 100,
            actuator_retries: 0,
            sequence: Vec::new(),
            sequence_loop: true,
            manual_mode: false,
            states_file: None,
            step_file: None,
            data_file: None,
            analyzer: AnalyzerConfig::default(),
            influxdb: InfluxConfig::default(),
        }
    }
}

/// Kind of actuator behind a device name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Solenoid valves behind a serial relay board.
    #[serde(alias = "sv")]
    Relay,
    /// Valves switched through sysfs GPIO lines.
    Gpio,
    /// Single-address proportional valve on a serial link.
    #[serde(alias = "mpv")]
    Proportional,
}

impl DeviceKind {
    /// Infer the kind from the naming convention `sv*`, `gpio*`, `mpv*`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with("sv") {
            Some(Self::Relay)
        } else if name.starts_with("gpio") {
            Some(Self::Gpio)
        } else if name.starts_with("mpv") {
            Some(Self::Proportional)
        } else {
            None
        }
    }

    /// Whether the hardware only understands 0/1.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Relay | Self::Gpio)
    }
}

/// A state written in YAML either as a number or a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl StateValue {
    pub fn token(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

/// Per-device section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Explicit kind; inferred from the name when absent.
    pub kind: Option<DeviceKind>,
    pub enabled: bool,
    /// Serial device path (relay board, proportional valve).
    pub port: Option<String>,
    pub baud: Option<u32>,
    /// Logical port → relay index or GPIO line.
    pub mapping: BTreeMap<u16, u32>,
    /// Logical port → state applied during setup.
    pub init: BTreeMap<u16, StateValue>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: None,
            enabled: true,
            port: None,
            baud: None,
            mapping: BTreeMap::new(),
            init: BTreeMap::new(),
        }
    }
}

/// Gas analyzer stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub enabled: bool,
    pub port: String,
    pub baud: u32,
    /// Frame terminator byte.
    pub terminator: u8,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "/dev/analyzer".into(),
            baud: 9600,
            terminator: 0x03, // ETX
        }
    }
}

/// InfluxDB (v1 HTTP API) sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub measurement: String,
    /// Value of the `node` tag.
    pub node: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "localhost".into(),
            port: 8086,
            username: String::new(),
            password: String::new(),
            database: "valves".into(),
            measurement: "events.stats.basic".into(),
            node: "sws-1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved view
// ---------------------------------------------------------------------------

/// Serial connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialParams {
    pub path: String,
    pub baud: u32,
}

/// A device with its kind resolved and its parameters checked.
#[derive(Debug, Clone)]
pub struct Device {
    pub name: String,
    pub kind: DeviceKind,
    pub enabled: bool,
    pub mapping: BTreeMap<u16, u32>,
    /// `None` for GPIO devices.
    pub serial: Option<SerialParams>,
    /// Initial `(port, token, state)` triples in port order.
    pub init: Vec<(Port, String, LogicalState)>,
}

impl Device {
    /// Port under which this device's state is commanded and recorded.
    /// A proportional valve has one address, so every port folds to `-`.
    pub fn canonical_port(&self, port: Port) -> Port {
        match self.kind {
            DeviceKind::Proportional => Port::NONE,
            DeviceKind::Relay | DeviceKind::Gpio => port,
        }
    }

    /// Physical address for a logical port.  Proportional valves have a
    /// single address and accept any port.
    pub fn address(&self, port: Port) -> Option<u32> {
        match self.kind {
            DeviceKind::Proportional => Some(0),
            DeviceKind::Relay | DeviceKind::Gpio => port.0.and_then(|p| self.mapping.get(&p).copied()),
        }
    }
}

/// All devices by name, validated.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, Device>,
}

impl DeviceCatalog {
    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|d| d.enabled)
    }

    /// [`Device::canonical_port`] by name; unknown devices keep `port`.
    pub fn canonical_port(&self, device: &str, port: Port) -> Port {
        self.get(device).map_or(port, |d| d.canonical_port(port))
    }

    /// Check that `device` exists, `port` is mapped and `state` is one the
    /// hardware understands.
    pub fn check_command(
        &self,
        device: &str,
        port: Port,
        state: &LogicalState,
    ) -> Result<&Device, ConfigError> {
        let dev = self
            .get(device)
            .ok_or_else(|| ConfigError::UnknownDevice(device.to_string()))?;
        if dev.address(port).is_none() {
            return Err(ConfigError::UnmappedPort {
                device: device.to_string(),
                port: port.to_string(),
            });
        }
        if dev.kind.is_binary() && state.as_binary().is_none() {
            return Err(ConfigError::InvalidState {
                device: device.to_string(),
                state: state.to_string(),
            });
        }
        Ok(dev)
    }
}

/// Everything the sequencer needs, validated.
#[derive(Debug, Clone)]
pub struct ResolvedRig {
    pub catalog: DeviceCatalog,
    pub plan: SequencePlan,
}

impl RigConfig {
    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve devices and the sequence plan, rejecting anything the
    /// hardware could not execute.  An empty plan is accepted here; it
    /// is only an error when the sequence is actually run.
    pub fn validate(&self) -> Result<ResolvedRig, ConfigError> {
        let mut devices = BTreeMap::new();
        for (name, cfg) in &self.devices {
            devices.insert(name.clone(), resolve_device(name, cfg)?);
        }
        let catalog = DeviceCatalog { devices };

        for dev in catalog.iter() {
            for (port, _, state) in &dev.init {
                catalog.check_command(&dev.name, *port, state)?;
            }
        }

        let plan = SequencePlan::from_records(&self.sequence)?
            .with_ports(|device, port| catalog.canonical_port(device, port));
        for step in plan.steps() {
            catalog.check_command(&step.device, step.port, &step.state)?;
        }

        Ok(ResolvedRig { catalog, plan })
    }
}

/// Highest relay number the two-byte index in a board command can reach.
const RELAY_MAX: u32 = 1 << 16;

fn resolve_device(name: &str, cfg: &DeviceConfig) -> Result<Device, ConfigError> {
    let kind = cfg
        .kind
        .or_else(|| DeviceKind::from_name(name))
        .ok_or_else(|| ConfigError::UnknownKind(name.to_string()))?;

    let serial = match kind {
        DeviceKind::Gpio => None,
        DeviceKind::Relay | DeviceKind::Proportional => {
            let path = cfg.port.clone().ok_or(ConfigError::MissingParameter {
                device: name.to_string(),
                field: "port",
            })?;
            let baud = cfg.baud.ok_or(ConfigError::MissingParameter {
                device: name.to_string(),
                field: "baud",
            })?;
            Some(SerialParams { path, baud })
        }
    };

    if kind == DeviceKind::Relay {
        for (port, relay) in &cfg.mapping {
            if !(1..=RELAY_MAX).contains(relay) {
                return Err(ConfigError::InvalidAddress {
                    device: name.to_string(),
                    port: *port,
                    address: *relay,
                });
            }
        }
    }

    let init = cfg
        .init
        .iter()
        .map(|(port, value)| {
            let token = value.token();
            let state = normalize(&token);
            let port = match kind {
                DeviceKind::Proportional => Port::NONE,
                DeviceKind::Relay | DeviceKind::Gpio => Port::index(*port),
            };
            (port, token, state)
        })
        .collect();

    Ok(Device {
        name: name.to_string(),
        kind,
        enabled: cfg.enabled,
        mapping: cfg.mapping.clone(),
        serial,
        init,
    })
}
