/* Driver framework: the Backend lifecycle trait, the Bus / DebugProbe / Glitch
 * role contracts, the error taxonomy shared by every driver, and the explicit
 * backend registry the entry point populates at startup. */
pub mod blackmagic;
pub mod bolt;
pub mod buspirate;
pub mod stlink;
pub mod tigard;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::CatalogEntry;
use crate::device::{ConfigError, DeviceDescriptor, GlitchConfig, I2cConfig, SpiConfig, UartConfig};
use crate::framing::FrameError;
use crate::proto::bpio::BpioError;
use crate::proto::gdbmi::MiError;
use crate::proto::glitch::{GlitchError, SweepResult, sweep_grid};
use crate::proto::mpsse::MpsseError;
use crate::proto::sump::SumpError;
use crate::sink::OutputSink;

/* Role-boundary errors. Every role method fails with one of these; no
 * driver downgrades an unknown failure to a success or a log line. */
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Not connected")]
    NotConnected,

    #[error("Driver does not implement the {0} role")]
    RoleNotSupported(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Unexpected response type")]
    TypeMismatch,

    #[error("Flash busy")]
    BusBusy,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Framing failure: {0}")]
    Framing(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DriverError {
    /* Transport/framing faults force a disconnect (the caller must
     * reconnect); timeouts and device errors do not. */
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Transport(_) | DriverError::Framing(_))
    }
}

impl From<FrameError> for DriverError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Timeout => DriverError::Timeout,
            FrameError::Decode => DriverError::Framing("COBS decode failed".into()),
            FrameError::TransportClosed => DriverError::Transport("transport closed".into()),
            FrameError::Io(e) => DriverError::Transport(e.to_string()),
        }
    }
}

impl From<BpioError> for DriverError {
    fn from(err: BpioError) -> Self {
        match err {
            BpioError::TypeMismatch { .. } => DriverError::TypeMismatch,
            BpioError::Device(msg) => DriverError::Device(msg),
            BpioError::Malformed => DriverError::Framing("malformed response packet".into()),
            BpioError::Frame(inner) => inner.into(),
        }
    }
}

impl From<SumpError> for DriverError {
    fn from(err: SumpError) -> Self {
        match err {
            SumpError::NotResponding => DriverError::Device("SUMP device not responding".into()),
            SumpError::NoData => DriverError::Timeout,
            SumpError::InvalidConfig(msg) => DriverError::InvalidConfig(msg),
            SumpError::Transport(e) => DriverError::Transport(e.to_string()),
        }
    }
}

impl From<GlitchError> for DriverError {
    fn from(err: GlitchError) -> Self {
        match err {
            GlitchError::InvalidConfig(msg) => DriverError::InvalidConfig(msg),
            GlitchError::BadState(state) => {
                DriverError::Device(format!("glitch engine in state {state:?}"))
            }
        }
    }
}

impl From<MpsseError> for DriverError {
    fn from(err: MpsseError) -> Self {
        match err {
            MpsseError::Timeout(_) => DriverError::Timeout,
            other => DriverError::Transport(other.to_string()),
        }
    }
}

impl From<MiError> for DriverError {
    fn from(err: MiError) -> Self {
        DriverError::Framing(err.to_string())
    }
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        DriverError::InvalidConfig(err.0)
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Transport(err.to_string())
    }
}

/* ------------------------------------------------------------------ */
/* Backend lifecycle                                                  */
/* ------------------------------------------------------------------ */

/* Lifecycle contract every driver implements. A backend owns its
 * transport handles exclusively while connected; role accessors expose
 * the capability contracts the driver supports. */
#[async_trait]
pub trait Backend: Send {
    fn name(&self) -> &str;

    fn connected(&self) -> bool;

    async fn connect(&mut self) -> Result<(), DriverError>;

    async fn disconnect(&mut self) -> Result<(), DriverError>;

    /* Device information / live status as a JSON map. */
    async fn info(&mut self) -> Result<serde_json::Value, DriverError>;

    fn as_bus(&mut self) -> Option<&mut dyn Bus> {
        None
    }

    fn as_debug(&mut self) -> Option<&mut dyn DebugProbe> {
        None
    }

    fn as_glitch(&mut self) -> Option<&mut dyn Glitch> {
        None
    }
}

/* ------------------------------------------------------------------ */
/* Bus role                                                           */
/* ------------------------------------------------------------------ */

/* Scope of a flash erase, with the busy-poll deadline it is allowed. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseScope {
    /* 4 KiB */
    Sector,
    /* 64 KiB */
    Block,
    Chip,
}

impl EraseScope {
    pub fn deadline(&self) -> Duration {
        match self {
            EraseScope::Sector => Duration::from_millis(500),
            EraseScope::Block => Duration::from_secs(2),
            EraseScope::Chip => Duration::from_secs(60),
        }
    }

    fn opcode(&self) -> u8 {
        match self {
            EraseScope::Sector => 0x20,
            EraseScope::Block => 0xD8,
            EraseScope::Chip => 0xC7,
        }
    }
}

/* SPI flash opcodes shared by the flash helpers. */
const FLASH_READ_ID: u8 = 0x9F;
const FLASH_READ: u8 = 0x03;
const FLASH_PAGE_PROGRAM: u8 = 0x02;
const FLASH_WRITE_ENABLE: u8 = 0x06;
const FLASH_READ_STATUS: u8 = 0x05;
const FLASH_STATUS_BUSY: u8 = 0x01;
const FLASH_STATUS_WEL: u8 = 0x02;
const FLASH_PAGE_SIZE: usize = 256;

fn flash_addr_cmd(opcode: u8, address: u32) -> Vec<u8> {
    vec![
        opcode,
        (address >> 16) as u8,
        (address >> 8) as u8,
        address as u8,
    ]
}

/* Bus protocol contract: SPI, I2C and UART access plus the flash
 * helpers composed from raw SPI transfers. The helpers are provided
 * methods so every SPI-capable driver shares one page/busy-poll
 * implementation. */
#[async_trait]
pub trait Bus: Send {
    async fn configure_spi(&mut self, config: &SpiConfig) -> Result<(), DriverError>;

    /* Write `write`, then clock `read_len` bytes back, one CS assertion. */
    async fn spi_transfer(&mut self, write: &[u8], read_len: usize) -> Result<Vec<u8>, DriverError>;

    async fn configure_i2c(&mut self, config: &I2cConfig) -> Result<(), DriverError>;

    async fn i2c_write(&mut self, address: u8, data: &[u8]) -> Result<(), DriverError>;

    async fn i2c_read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, DriverError>;

    /* Write then read with a repeated start. */
    async fn i2c_write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>, DriverError>;

    /* Probe an address range; returns the addresses that ACKed. */
    async fn i2c_scan(&mut self, start: u8, end: u8) -> Result<Vec<u8>, DriverError> {
        let mut found = Vec::new();
        for addr in start..=end {
            if self.i2c_read(addr, 0).await.is_ok() {
                found.push(addr);
            }
        }
        Ok(found)
    }

    async fn configure_uart(&mut self, config: &UartConfig) -> Result<(), DriverError>;

    async fn uart_write(&mut self, data: &[u8]) -> Result<(), DriverError>;

    async fn uart_read(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, DriverError>;

    /* JEDEC id: 0x9F, three bytes back. */
    async fn spi_flash_read_id(&mut self) -> Result<Vec<u8>, DriverError> {
        self.spi_transfer(&[FLASH_READ_ID], 3).await
    }

    async fn spi_flash_read(&mut self, address: u32, len: usize) -> Result<Vec<u8>, DriverError> {
        self.spi_transfer(&flash_addr_cmd(FLASH_READ, address), len).await
    }

    async fn spi_flash_read_status(&mut self) -> Result<u8, DriverError> {
        let status = self.spi_transfer(&[FLASH_READ_STATUS], 1).await?;
        status.first().copied().ok_or(DriverError::Timeout)
    }

    /* Set the write-enable latch and confirm WEL. */
    async fn spi_flash_write_enable(&mut self) -> Result<(), DriverError> {
        self.spi_transfer(&[FLASH_WRITE_ENABLE], 0).await?;
        let status = self.spi_flash_read_status().await?;
        if status & FLASH_STATUS_WEL == 0 {
            return Err(DriverError::BusBusy);
        }
        Ok(())
    }

    /* Poll the status register until BUSY clears or the deadline fires. */
    async fn spi_flash_wait_ready(&mut self, deadline: Duration) -> Result<(), DriverError> {
        let deadline = tokio::time::Instant::now() + deadline;
        loop {
            let status = self.spi_flash_read_status().await?;
            if status & FLASH_STATUS_BUSY == 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /* Page program across 256-byte boundaries. */
    async fn spi_flash_write(&mut self, address: u32, data: &[u8]) -> Result<(), DriverError> {
        let mut address = address;
        let mut offset = 0;

        while offset < data.len() {
            let page_offset = address as usize % FLASH_PAGE_SIZE;
            let chunk = (FLASH_PAGE_SIZE - page_offset).min(data.len() - offset);

            self.spi_flash_write_enable().await?;

            let mut cmd = flash_addr_cmd(FLASH_PAGE_PROGRAM, address);
            cmd.extend_from_slice(&data[offset..offset + chunk]);
            self.spi_transfer(&cmd, 0).await?;

            self.spi_flash_wait_ready(Duration::from_millis(100)).await?;

            address += chunk as u32;
            offset += chunk;
        }
        Ok(())
    }

    async fn spi_flash_erase(&mut self, address: u32, scope: EraseScope) -> Result<(), DriverError> {
        self.spi_flash_write_enable().await?;

        match scope {
            EraseScope::Chip => {
                self.spi_transfer(&[scope.opcode()], 0).await?;
            }
            _ => {
                self.spi_transfer(&flash_addr_cmd(scope.opcode(), address), 0).await?;
            }
        }

        self.spi_flash_wait_ready(scope.deadline()).await
    }
}

/* ------------------------------------------------------------------ */
/* Debug role                                                         */
/* ------------------------------------------------------------------ */

/* Debug contract: target control, memory, breakpoints, registers.
 * Breakpoint handles are driver-allocated integers, never reused
 * within a connection. */
#[async_trait]
pub trait DebugProbe: Send {
    /* Attach to the debug target; "auto" lets the probe pick. */
    async fn connect_target(&mut self, target: &str) -> Result<(), DriverError>;

    async fn halt(&mut self) -> Result<(), DriverError>;

    async fn resume(&mut self) -> Result<(), DriverError>;

    async fn reset(&mut self, halt_after: bool) -> Result<(), DriverError>;

    async fn step(&mut self) -> Result<(), DriverError>;

    async fn read_memory(&mut self, address: u64, len: usize) -> Result<Vec<u8>, DriverError>;

    async fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), DriverError>;

    async fn set_breakpoint(&mut self, address: u64) -> Result<u32, DriverError>;

    async fn remove_breakpoint(&mut self, handle: u32) -> Result<(), DriverError>;

    async fn read_registers(&mut self) -> Result<BTreeMap<String, u64>, DriverError>;

    async fn flash_program(
        &mut self,
        address: u64,
        data: &[u8],
        verify: bool,
    ) -> Result<(), DriverError>;

    /* Chunked firmware dump; stops at the first short read. */
    async fn dump_firmware(
        &mut self,
        start: u64,
        size: usize,
        chunk_size: usize,
    ) -> Result<Vec<u8>, DriverError> {
        let mut out = Vec::with_capacity(size);
        let mut address = start;
        let mut remaining = size;

        while remaining > 0 {
            let chunk = chunk_size.min(remaining);
            let data = self.read_memory(address, chunk).await?;
            if data.len() != chunk {
                warn!("Short read at {address:#010x}: {}/{} bytes", data.len(), chunk);
                out.extend_from_slice(&data);
                break;
            }
            out.extend_from_slice(&data);
            address += chunk as u64;
            remaining -= chunk;
            debug!(
                "Dump progress: {}/{} bytes",
                size - remaining,
                size
            );
        }
        Ok(out)
    }
}

/* ------------------------------------------------------------------ */
/* Glitch role                                                        */
/* ------------------------------------------------------------------ */

#[derive(Debug, Clone, Copy)]
pub struct SweepParams {
    pub width_range: (u64, u64),
    pub width_step: u64,
    pub offset_range: (u64, u64),
    pub offset_step: u64,
    pub attempts: u32,
}

/* Observer invoked after every trigger so the campaign can record
 * target effects. */
pub type SweepObserver<'a> = &'a mut (dyn FnMut(&GlitchConfig, u32) -> Option<String> + Send);

#[async_trait]
pub trait Glitch: Send {
    async fn configure_glitch(&mut self, config: &GlitchConfig) -> Result<(), DriverError>;

    /* Arm for the configured external trigger. */
    async fn arm(&mut self) -> Result<(), DriverError>;

    /* Fire one glitch immediately. */
    async fn trigger(&mut self) -> Result<(), DriverError>;

    async fn disarm(&mut self) -> Result<(), DriverError>;

    /* Double-loop parameter sweep: reconfigure per grid point, trigger
     * `attempts` times, let the observer watch the target in between. */
    async fn sweep(
        &mut self,
        params: &SweepParams,
        observer: SweepObserver<'_>,
    ) -> Result<Vec<SweepResult>, DriverError> {
        let grid = sweep_grid(
            params.width_range,
            params.width_step,
            params.offset_range,
            params.offset_step,
        );
        let mut results = Vec::with_capacity(grid.len() * params.attempts as usize);

        for (width_ns, offset_ns) in grid {
            let config = GlitchConfig {
                width_ns,
                offset_ns,
                ..GlitchConfig::default()
            };
            self.configure_glitch(&config).await?;

            for attempt in 0..params.attempts {
                self.trigger().await?;
                let observation = observer(&config, attempt);
                results.push(SweepResult {
                    width_ns,
                    offset_ns,
                    attempt,
                    observation,
                });
                /* Brief settle between pulses. */
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        Ok(results)
    }
}

/* ------------------------------------------------------------------ */
/* Registry                                                           */
/* ------------------------------------------------------------------ */

pub type BackendConstructor =
    Box<dyn Fn(&DeviceDescriptor, &CatalogEntry, OutputSink) -> Box<dyn Backend> + Send + Sync>;

/* Explicit driver registry, owned by the process entry point and
 * populated once at startup. Drivers are values here, not side effects
 * of module loading. */
#[derive(Default)]
pub struct BackendRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        driver: &str,
        constructor: impl Fn(&DeviceDescriptor, &CatalogEntry, OutputSink) -> Box<dyn Backend>
        + Send
        + Sync
        + 'static,
    ) {
        self.constructors.insert(driver.to_string(), Box::new(constructor));
    }

    pub fn create(
        &self,
        descriptor: &DeviceDescriptor,
        entry: &CatalogEntry,
        sink: OutputSink,
    ) -> Option<Box<dyn Backend>> {
        match self.constructors.get(&entry.driver) {
            Some(ctor) => Some(ctor(descriptor, entry, sink)),
            None => {
                warn!("Unknown driver: {}", entry.driver);
                None
            }
        }
    }

    pub fn driver_names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

/* Registry with all built-in drivers. */
pub fn builtin_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register("buspirate", |desc, entry, sink| {
        Box::new(buspirate::BusPirateDriver::new(desc.clone(), entry.clone(), sink))
    });
    registry.register("tigard", |desc, entry, sink| {
        Box::new(tigard::TigardDriver::new(desc.clone(), entry.clone(), sink))
    });
    registry.register("tigard-debug", |desc, entry, sink| {
        Box::new(tigard::TigardDebugDriver::new(desc.clone(), entry.clone(), sink))
    });
    registry.register("blackmagic", |desc, entry, sink| {
        Box::new(blackmagic::BlackMagicDriver::new(desc.clone(), entry.clone(), sink))
    });
    registry.register("stlink", |desc, entry, sink| {
        Box::new(stlink::StLinkDriver::new(desc.clone(), entry.clone(), sink))
    });
    registry.register("bolt", |desc, entry, sink| {
        Box::new(bolt::BoltDriver::new(desc.clone(), entry.clone(), sink))
    });
    registry
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /* Scripted Bus double: each expected SPI transfer is matched
     * against the recorded write bytes and answered from the script. */
    pub(crate) struct ScriptedBus {
        pub script: VecDeque<(Vec<u8>, Vec<u8>)>,
        pub log: Vec<Vec<u8>>,
    }

    impl ScriptedBus {
        pub fn new(script: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
            Self {
                script: script.into(),
                log: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Bus for ScriptedBus {
        async fn configure_spi(&mut self, _config: &SpiConfig) -> Result<(), DriverError> {
            Ok(())
        }

        async fn spi_transfer(
            &mut self,
            write: &[u8],
            read_len: usize,
        ) -> Result<Vec<u8>, DriverError> {
            self.log.push(write.to_vec());
            let (expected, reply) = self
                .script
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected transfer: {write:02x?}"));
            assert_eq!(write, expected.as_slice(), "transfer bytes");
            assert_eq!(reply.len(), read_len, "scripted reply length");
            Ok(reply)
        }

        async fn configure_i2c(&mut self, _config: &I2cConfig) -> Result<(), DriverError> {
            Ok(())
        }
        async fn i2c_write(&mut self, _address: u8, _data: &[u8]) -> Result<(), DriverError> {
            Ok(())
        }
        async fn i2c_read(&mut self, address: u8, _len: usize) -> Result<Vec<u8>, DriverError> {
            /* Only 0x50 and 0x68 "answer" on this fake bus. */
            if address == 0x50 || address == 0x68 {
                Ok(Vec::new())
            } else {
                Err(DriverError::Device("NAK".into()))
            }
        }
        async fn i2c_write_read(
            &mut self,
            _address: u8,
            _write: &[u8],
            _read_len: usize,
        ) -> Result<Vec<u8>, DriverError> {
            Ok(Vec::new())
        }
        async fn configure_uart(&mut self, _config: &UartConfig) -> Result<(), DriverError> {
            Ok(())
        }
        async fn uart_write(&mut self, _data: &[u8]) -> Result<(), DriverError> {
            Ok(())
        }
        async fn uart_read(&mut self, _len: usize, _t: Duration) -> Result<Vec<u8>, DriverError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn flash_read_id_emits_jedec_command() {
        let mut bus = ScriptedBus::new(vec![(vec![0x9F], vec![0xEF, 0x40, 0x16])]);
        let id = bus.spi_flash_read_id().await.unwrap();
        assert_eq!(id, vec![0xEF, 0x40, 0x16]);
    }

    #[tokio::test]
    async fn flash_read_builds_24_bit_address() {
        let mut bus = ScriptedBus::new(vec![(vec![0x03, 0x01, 0x02, 0x03], vec![0xAA, 0xBB])]);
        let data = bus.spi_flash_read(0x010203, 2).await.unwrap();
        assert_eq!(data, vec![0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn flash_write_splits_on_page_boundary() {
        /* 48 bytes starting 16 before a page boundary: two programs. */
        let data: Vec<u8> = (0..48).collect();
        let mut first_cmd = vec![0x02, 0x00, 0x00, 0xF0];
        first_cmd.extend_from_slice(&data[..16]);
        let mut second_cmd = vec![0x02, 0x00, 0x01, 0x00];
        second_cmd.extend_from_slice(&data[16..]);

        let mut bus = ScriptedBus::new(vec![
            (vec![0x06], vec![]),
            (vec![0x05], vec![0x02]), /* WEL set */
            (first_cmd, vec![]),
            (vec![0x05], vec![0x00]), /* idle */
            (vec![0x06], vec![]),
            (vec![0x05], vec![0x02]),
            (second_cmd, vec![]),
            (vec![0x05], vec![0x00]),
        ]);

        bus.spi_flash_write(0xF0, &data).await.unwrap();
        assert!(bus.script.is_empty(), "all scripted transfers consumed");
    }

    #[tokio::test]
    async fn flash_write_fails_without_wel() {
        let mut bus = ScriptedBus::new(vec![
            (vec![0x06], vec![]),
            (vec![0x05], vec![0x00]), /* WEL never set */
        ]);
        let err = bus.spi_flash_write(0, &[0xAA]).await.unwrap_err();
        assert!(matches!(err, DriverError::BusBusy));
    }

    #[tokio::test]
    async fn flash_erase_scopes_use_right_opcodes() {
        let mut bus = ScriptedBus::new(vec![
            (vec![0x06], vec![]),
            (vec![0x05], vec![0x02]),
            (vec![0x20, 0x00, 0x10, 0x00], vec![]),
            (vec![0x05], vec![0x00]),
        ]);
        bus.spi_flash_erase(0x1000, EraseScope::Sector).await.unwrap();

        let mut bus = ScriptedBus::new(vec![
            (vec![0x06], vec![]),
            (vec![0x05], vec![0x02]),
            (vec![0xC7], vec![]),
            (vec![0x05], vec![0x00]),
        ]);
        bus.spi_flash_erase(0, EraseScope::Chip).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn flash_busy_poll_times_out() {
        /* The status register never clears: sector scope gives up at
         * 500 ms. Enough polls are scripted to outlast the deadline. */
        let mut script = vec![
            (vec![0x06], vec![0u8; 0]),
            (vec![0x05], vec![0x02]),
            (vec![0x20, 0x00, 0x00, 0x00], vec![]),
        ];
        for _ in 0..600 {
            script.push((vec![0x05], vec![0x03]));
        }
        let mut bus = ScriptedBus::new(script);
        let err = bus.spi_flash_erase(0, EraseScope::Sector).await.unwrap_err();
        assert!(matches!(err, DriverError::Timeout));
    }

    #[tokio::test]
    async fn i2c_scan_collects_ack_addresses() {
        let mut bus = ScriptedBus::new(vec![]);
        let found = bus.i2c_scan(0x08, 0x77).await.unwrap();
        assert_eq!(found, vec![0x50, 0x68]);
    }

    #[tokio::test]
    async fn registry_rejects_unknown_driver() {
        let registry = builtin_registry();
        let entry = CatalogEntry {
            name: "Mystery".into(),
            driver: "mystery".into(),
            matches: Vec::new(),
            endpoint_roles: Vec::new(),
            constants: crate::catalog::DriverConstants::default(),
        };
        let desc = DeviceDescriptor {
            id: "dead:beef:0".into(),
            name: "Mystery".into(),
            vendor_id: 0xdead,
            product_id: 0xbeef,
            serial: None,
            endpoints: Vec::new(),
            capabilities: Default::default(),
        };
        assert!(registry.create(&desc, &entry, OutputSink::default()).is_none());
        assert!(registry.driver_names().contains(&"buspirate"));
    }
}
