/* Core data model: device descriptors, capability set, bus and glitch configurations,
 * and the inbound/outbound event types exchanged with external collaborators. */

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/* Capabilities a device may advertise in its descriptor. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Uart,
    Spi,
    I2c,
    OneWire,
    Jtag,
    Swd,
    VoltageGlitch,
    Emfi,
    LogicAnalyzer,
    Adc,
    Pwm,
    Gpio,
    Flash,
    Debug,
}

impl Capability {
    /* Parse the lowercase token used in catalog files and descriptors. */
    pub fn from_token(tok: &str) -> Option<Capability> {
        match tok {
            "uart" => Some(Capability::Uart),
            "spi" => Some(Capability::Spi),
            "i2c" => Some(Capability::I2c),
            "one_wire" => Some(Capability::OneWire),
            "jtag" => Some(Capability::Jtag),
            "swd" => Some(Capability::Swd),
            "voltage_glitch" => Some(Capability::VoltageGlitch),
            "emfi" => Some(Capability::Emfi),
            "logic_analyzer" => Some(Capability::LogicAnalyzer),
            "adc" => Some(Capability::Adc),
            "pwm" => Some(Capability::Pwm),
            "gpio" => Some(Capability::Gpio),
            "flash" => Some(Capability::Flash),
            "debug" => Some(Capability::Debug),
            _ => None,
        }
    }
}

/* One serial endpoint exposed by a device. A device may expose several
 * endpoints for distinct roles; the order in the descriptor is decided
 * by the enumerator/catalog, never guessed from filenames. */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPath {
    pub path: PathBuf,
    /* Role tag from the catalog (e.g. "console", "binary", "gdb", "api"). */
    pub role: String,
}

/* Immutable description of an enumerated USB device.
 *
 * The enumerator builds these; the core never performs USB discovery
 * itself. `id` is stable across reconnects: `vendor:product:port`. */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
    pub endpoints: Vec<EndpointPath>,
    pub capabilities: BTreeSet<Capability>,
}

impl DeviceDescriptor {
    /* First endpoint tagged with `role`, if any. */
    pub fn endpoint(&self, role: &str) -> Option<&EndpointPath> {
        self.endpoints.iter().find(|e| e.role == role)
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

/* Inbound contract with the external enumerator (add/remove events).
 * Serde-derived so an enumerator process can feed events as JSON. */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEvent {
    Added(DeviceDescriptor),
    Removed { id: String },
}

/* ------------------------------------------------------------------ */
/* Bus configurations                                                 */
/* ------------------------------------------------------------------ */

/* Rejection reason for a locally-invalid configuration. Raised before
 * any bytes go on the wire. */
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid config: {0}")]
pub struct ConfigError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiConfig {
    pub speed_hz: u32,
    /* CPOL/CPHA combination, 0..=3 */
    pub mode: u8,
    pub bits_per_word: u8,
    pub cs_active_low: bool,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            speed_hz: 1_000_000,
            mode: 0,
            bits_per_word: 8,
            cs_active_low: true,
        }
    }
}

impl SpiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode > 3 {
            return Err(ConfigError(format!("SPI mode {} out of range 0..=3", self.mode)));
        }
        if self.speed_hz == 0 {
            return Err(ConfigError("SPI speed must be non-zero".into()));
        }
        Ok(())
    }

    /* Clock polarity (CPOL) bit of the mode. */
    pub fn clock_polarity(&self) -> bool {
        (self.mode >> 1) & 1 == 1
    }

    /* Clock phase (CPHA) bit of the mode. */
    pub fn clock_phase(&self) -> bool {
        self.mode & 1 == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cConfig {
    pub speed_hz: u32,
    /* 7 or 10 */
    pub address_bits: u8,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self { speed_hz: 400_000, address_bits: 7 }
    }
}

impl I2cConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address_bits != 7 && self.address_bits != 10 {
            return Err(ConfigError(format!(
                "I2C address width {} not in {{7, 10}}",
                self.address_bits
            )));
        }
        if self.speed_hz == 0 {
            return Err(ConfigError("I2C speed must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        };
        write!(f, "{c}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UartConfig {
    pub baud: u32,
    /* 5..=9 */
    pub data_bits: u8,
    pub parity: Parity,
    /* 1 or 2 */
    pub stop_bits: u8,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl UartConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=9).contains(&self.data_bits) {
            return Err(ConfigError(format!(
                "UART data bits {} out of range 5..=9",
                self.data_bits
            )));
        }
        if self.stop_bits != 1 && self.stop_bits != 2 {
            return Err(ConfigError(format!("UART stop bits {} not in {{1, 2}}", self.stop_bits)));
        }
        if self.baud == 0 {
            return Err(ConfigError("UART baud must be non-zero".into()));
        }
        Ok(())
    }
}

/* ------------------------------------------------------------------ */
/* Glitch configuration                                               */
/* ------------------------------------------------------------------ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEdge {
    Rising,
    Falling,
    Either,
}

/* Fault-injection parameters. All timing values are absolute
 * nanoseconds; drivers convert to the device clock period. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlitchConfig {
    pub width_ns: u64,
    pub offset_ns: u64,
    pub repeat: u32,
    pub trigger_channel: Option<u8>,
    pub trigger_edge: TriggerEdge,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            width_ns: 100,
            offset_ns: 0,
            repeat: 1,
            trigger_channel: None,
            trigger_edge: TriggerEdge::Falling,
        }
    }
}

impl GlitchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width_ns == 0 {
            return Err(ConfigError("glitch width must be non-zero".into()));
        }
        if self.repeat == 0 {
            return Err(ConfigError("glitch repeat must be at least 1".into()));
        }
        Ok(())
    }
}

/* ------------------------------------------------------------------ */
/* Outbound device output                                             */
/* ------------------------------------------------------------------ */

/* Which stream of a device produced a payload. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    Console,
    Uart,
    Logic,
    Trace,
}

/* One item on a device's output stream: UART/console text arrives as
 * lines, logic data as raw bytes. */
#[derive(Debug, Clone)]
pub struct DeviceOutput {
    pub device_id: String,
    pub channel: OutputChannel,
    pub payload: OutputPayload,
}

#[derive(Debug, Clone)]
pub enum OutputPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl DeviceOutput {
    pub fn line(device_id: &str, channel: OutputChannel, text: impl Into<String>) -> Self {
        Self {
            device_id: device_id.to_string(),
            channel,
            payload: OutputPayload::Text(text.into()),
        }
    }

    /* Text payload, if this item carries one. */
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            OutputPayload::Text(s) => Some(s),
            OutputPayload::Bytes(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_tokens() {
        for tok in [
            "uart", "spi", "i2c", "one_wire", "jtag", "swd", "voltage_glitch",
            "emfi", "logic_analyzer", "adc", "pwm", "gpio", "flash", "debug",
        ] {
            assert!(Capability::from_token(tok).is_some(), "token {tok}");
        }
        assert!(Capability::from_token("hypervisor").is_none());
    }

    #[test]
    fn spi_config_validation() {
        assert!(SpiConfig::default().validate().is_ok());
        assert!(SpiConfig { mode: 4, ..SpiConfig::default() }.validate().is_err());
        assert!(SpiConfig { speed_hz: 0, ..SpiConfig::default() }.validate().is_err());
    }

    #[test]
    fn spi_mode_bits() {
        let m3 = SpiConfig { mode: 3, ..SpiConfig::default() };
        assert!(m3.clock_polarity());
        assert!(m3.clock_phase());
        let m2 = SpiConfig { mode: 2, ..SpiConfig::default() };
        assert!(m2.clock_polarity());
        assert!(!m2.clock_phase());
    }

    #[test]
    fn uart_config_validation() {
        assert!(UartConfig::default().validate().is_ok());
        assert!(UartConfig { data_bits: 4, ..UartConfig::default() }.validate().is_err());
        assert!(UartConfig { data_bits: 10, ..UartConfig::default() }.validate().is_err());
        assert!(UartConfig { stop_bits: 3, ..UartConfig::default() }.validate().is_err());
    }

    #[test]
    fn i2c_config_validation() {
        assert!(I2cConfig::default().validate().is_ok());
        assert!(I2cConfig { address_bits: 8, ..I2cConfig::default() }.validate().is_err());
        assert!(I2cConfig { address_bits: 10, ..I2cConfig::default() }.validate().is_ok());
    }

    #[test]
    fn glitch_zero_width_rejected() {
        let cfg = GlitchConfig { width_ns: 0, ..GlitchConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = GlitchConfig { repeat: 0, ..GlitchConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn descriptor_endpoint_lookup() {
        let desc = DeviceDescriptor {
            id: "1209:7331:1-4".into(),
            name: "Bus Pirate 6".into(),
            vendor_id: 0x1209,
            product_id: 0x7331,
            serial: None,
            endpoints: vec![
                EndpointPath { path: "/dev/ttyACM0".into(), role: "console".into() },
                EndpointPath { path: "/dev/ttyACM1".into(), role: "binary".into() },
            ],
            capabilities: [Capability::Spi, Capability::I2c].into_iter().collect(),
        };
        assert_eq!(desc.endpoint("binary").unwrap().path, PathBuf::from("/dev/ttyACM1"));
        assert!(desc.endpoint("gdb").is_none());
        assert!(desc.has_capability(Capability::Spi));
        assert!(!desc.has_capability(Capability::Jtag));
    }
}
