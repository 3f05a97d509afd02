/* Bus Pirate 5/6 driver: Bus role over the BPIO2 FlatBuffers protocol.
 *
 * The device exposes two CDC-ACM endpoints: a line-oriented console and the
 * BPIO2 binary channel. A fresh device boots into console mode, so connect
 * first probes the binary endpoint directly and falls back to the one-shot
 * `binmode` bootstrap through the console. */

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::catalog::CatalogEntry;
use crate::device::{
    DeviceDescriptor, DeviceOutput, I2cConfig, OutputChannel, Parity, SpiConfig, UartConfig,
};
use crate::driver::{Backend, Bus, DriverError};
use crate::proto::bpio::{
    self, BpioClient, ConfigureOptions, DataOptions, ModeOptions, StatusSnapshot,
};
use crate::proto::sump::{SumpCapture, SumpClient, SumpConfig};
use crate::sink::OutputSink;

/* Endpoint role tags assigned by the catalog. */
const ROLE_CONSOLE: &str = "console";
const ROLE_BINARY: &str = "binary";

/* Short deadline for the direct binary-mode probe. */
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct BusPirateDriver {
    descriptor: DeviceDescriptor,
    entry: CatalogEntry,
    sink: OutputSink,
    client: Option<BpioClient<tokio_serial::SerialStream>>,
    current_mode: Option<String>,
}

impl BusPirateDriver {
    pub fn new(descriptor: DeviceDescriptor, entry: CatalogEntry, sink: OutputSink) -> Self {
        Self {
            descriptor,
            entry,
            sink,
            client: None,
            current_mode: None,
        }
    }

    fn endpoint_path(&self, role: &str) -> Result<String, DriverError> {
        self.descriptor
            .endpoint(role)
            .map(|e| e.path.to_string_lossy().into_owned())
            .ok_or_else(|| DriverError::InvalidConfig(format!("descriptor has no '{role}' endpoint")))
    }

    fn open_serial(&self, path: &str, baud: u32) -> Result<tokio_serial::SerialStream, DriverError> {
        tokio_serial::new(path, baud)
            .open_native_async()
            .map_err(|e| DriverError::Transport(format!("open {path}: {e}")))
    }

    fn client_mut(&mut self) -> Result<&mut BpioClient<tokio_serial::SerialStream>, DriverError> {
        self.client.as_mut().ok_or(DriverError::NotConnected)
    }

    /* Transport/framing faults drop the connection; the caller must
     * reconnect. */
    fn note_failure(&mut self, err: DriverError) -> DriverError {
        if err.is_fatal() {
            warn!("[{}] fatal transport fault, disconnecting: {err}", self.descriptor.id);
            self.client = None;
            self.current_mode = None;
        }
        err
    }

    async fn configure(&mut self, opts: &ConfigureOptions) -> Result<(), DriverError> {
        let result = self.client_mut()?.configure(opts).await;
        result.map_err(|e| self.note_failure(e.into()))
    }

    async fn data(&mut self, opts: &DataOptions) -> Result<Option<Vec<u8>>, DriverError> {
        let result = self.client_mut()?.data(opts).await;
        result.map_err(|e| self.note_failure(e.into()))
    }

    async fn status(&mut self) -> Result<StatusSnapshot, DriverError> {
        let result = self.client_mut()?.status().await;
        result.map_err(|e| self.note_failure(e.into()))
    }

    /* Switch the programmable supply. */
    pub async fn set_psu(&mut self, enabled: bool, voltage_mv: u32, current_ma: u32) -> Result<(), DriverError> {
        let opts = if enabled {
            ConfigureOptions {
                psu_enable: Some(true),
                psu_set_mv: Some(voltage_mv),
                psu_set_ma: Some(current_ma),
                ..Default::default()
            }
        } else {
            ConfigureOptions { psu_disable: Some(true), ..Default::default() }
        };
        self.configure(&opts).await
    }

    pub async fn set_pullups(&mut self, enabled: bool) -> Result<(), DriverError> {
        let opts = if enabled {
            ConfigureOptions { pullup_enable: Some(true), ..Default::default() }
        } else {
            ConfigureOptions { pullup_disable: Some(true), ..Default::default() }
        };
        self.configure(&opts).await
    }

    /* Power the target and survey every reachable interface: I2C scan,
     * flash-ID probe, pin voltages and IO state. */
    pub async fn survey_target(
        &mut self,
        voltage_mv: u32,
        current_ma: u32,
        pullups: bool,
    ) -> Result<serde_json::Value, DriverError> {
        self.set_psu(true, voltage_mv, current_ma).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        if pullups {
            self.set_pullups(true).await?;
        }

        self.configure_i2c(&I2cConfig { speed_hz: 100_000, address_bits: 7 }).await?;
        let i2c_devices = self.i2c_scan(0x08, 0x77).await?;
        info!("[{}] I2C scan found {} device(s)", self.descriptor.id, i2c_devices.len());

        self.configure_spi(&SpiConfig { speed_hz: 1_000_000, ..SpiConfig::default() }).await?;
        let flash_id = self.spi_flash_read_id().await?;

        self.client_mut()?.invalidate_status();
        let status = self.status().await?;
        Ok(survey_summary(&status, &i2c_devices, &flash_id))
    }

    /* Capture logic data through the SUMP personality. The analyzer
     * lives on the console endpoint; the device is switched into SUMP
     * binary mode first. */
    pub async fn capture_logic(
        &mut self,
        config: SumpConfig,
        timeout: Duration,
    ) -> Result<SumpCapture, DriverError> {
        let console_path = self.endpoint_path(ROLE_CONSOLE)?;

        let mut console = self.open_serial(&console_path, self.entry.constants.console_baud)?;
        bpio::enter_binary_mode(&mut console, bpio::BINMODE_SELECT_SUMP)
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;

        let mut sump = SumpClient::new(console);
        sump.reset().await?;
        let id = sump.identify().await?;
        debug!("[{}] SUMP analyzer: {id}", self.descriptor.id);

        let config = SumpConfig {
            base_clock_hz: self.entry.constants.base_clock_hz,
            ..config
        };
        sump.configure(config).await?;
        let capture = sump.capture(timeout).await?;

        self.sink.publish(DeviceOutput {
            device_id: self.descriptor.id.clone(),
            channel: OutputChannel::Logic,
            payload: crate::device::OutputPayload::Bytes(capture.raw.clone()),
        });
        Ok(capture)
    }
}

/* Flatten a survey into the outward-facing JSON shape. */
fn survey_summary(
    status: &StatusSnapshot,
    i2c_devices: &[u8],
    flash_id: &[u8],
) -> serde_json::Value {
    let flash_present = flash_id.len() == 3
        && flash_id != &[0x00, 0x00, 0x00]
        && flash_id != &[0xFF, 0xFF, 0xFF];

    let pin_voltages: serde_json::Map<String, serde_json::Value> = status
        .mode_pin_labels
        .iter()
        .zip(status.adc_mv.iter())
        .map(|(label, mv)| (label.clone(), json!(mv)))
        .collect();

    let io_status: serde_json::Map<String, serde_json::Value> = (0..8)
        .map(|i| {
            let direction = if (status.io_direction >> i) & 1 == 1 { "out" } else { "in" };
            let level = if (status.io_value >> i) & 1 == 1 { "high" } else { "low" };
            (format!("io{i}"), json!({ "direction": direction, "level": level }))
        })
        .collect();

    json!({
        "psu": {
            "enabled": status.psu_enabled,
            "set_mv": status.psu_set_mv,
            "measured_mv": status.psu_measured_mv,
            "measured_ma": status.psu_measured_ma,
            "over_current": status.psu_current_error,
        },
        "i2c_devices": i2c_devices,
        "spi_flash": {
            "detected": flash_present,
            "id": flash_id.iter().map(|b| format!("{b:02x}")).collect::<String>(),
            "manufacturer": flash_id.first(),
        },
        "pin_voltages": pin_voltages,
        "io_status": io_status,
    })
}

#[async_trait]
impl Backend for BusPirateDriver {
    fn name(&self) -> &str {
        "buspirate"
    }

    fn connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.client.is_some() {
            return Ok(());
        }

        let binary_path = self.endpoint_path(ROLE_BINARY)?;
        let binary_baud = self.entry.constants.binary_baud;

        /* Direct probe: the device may already be in binary mode. */
        if let Ok(stream) = self.open_serial(&binary_path, binary_baud) {
            let mut client = BpioClient::new(stream);
            client.set_timeout(PROBE_TIMEOUT);
            match client.status().await {
                Ok(status) => {
                    info!(
                        "[{}] connected, firmware {}.{}, mode {}",
                        self.descriptor.id,
                        status.version_firmware_major,
                        status.version_firmware_minor,
                        status.mode_current.as_deref().unwrap_or("unknown")
                    );
                    client.set_timeout(bpio::REQUEST_TIMEOUT);
                    self.current_mode = status.mode_current.clone();
                    self.client = Some(client);
                    return Ok(());
                }
                Err(err) => {
                    debug!("[{}] direct binary probe failed: {err}", self.descriptor.id);
                }
            }
        }

        /* Bootstrap through the console, once. */
        let console_path = self.endpoint_path(ROLE_CONSOLE)?;
        let mut console = self.open_serial(&console_path, self.entry.constants.console_baud)?;
        bpio::enter_binary_mode(&mut console, bpio::BINMODE_SELECT_BPIO2)
            .await
            .map_err(|e| DriverError::Transport(format!("binmode bootstrap: {e}")))?;
        drop(console);

        let stream = self.open_serial(&binary_path, binary_baud)?;
        let mut client = BpioClient::new(stream);
        let status = client.status().await.map_err(DriverError::from)?;
        info!(
            "[{}] connected after bootstrap, firmware {}.{}",
            self.descriptor.id, status.version_firmware_major, status.version_firmware_minor
        );
        self.current_mode = status.mode_current.clone();
        self.client = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverError> {
        self.client = None;
        self.current_mode = None;
        debug!("[{}] disconnected", self.descriptor.id);
        Ok(())
    }

    async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
        let status = self.status().await?;
        Ok(json!({
            "name": self.entry.name,
            "firmware": format!("{}.{}", status.version_firmware_major, status.version_firmware_minor),
            "hardware": format!("{} REV{}", status.version_hardware_major, status.version_hardware_minor),
            "firmware_git_hash": status.firmware_git_hash,
            "mode": status.mode_current,
            "modes_available": status.modes_available,
            "psu_enabled": status.psu_enabled,
            "pullup_enabled": status.pullup_enabled,
            "adc_mv": status.adc_mv,
            "disk_used_mb": status.disk_used_mb,
            "disk_size_mb": status.disk_size_mb,
        }))
    }

    fn as_bus(&mut self) -> Option<&mut dyn Bus> {
        Some(self)
    }
}

#[async_trait]
impl Bus for BusPirateDriver {
    async fn configure_spi(&mut self, config: &SpiConfig) -> Result<(), DriverError> {
        config.validate()?;
        let opts = ConfigureOptions {
            mode: Some("spi".into()),
            mode_configuration: Some(ModeOptions {
                speed: Some(config.speed_hz),
                clock_polarity: Some(config.clock_polarity()),
                clock_phase: Some(config.clock_phase()),
                chip_select_idle: Some(config.cs_active_low),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.configure(&opts).await?;
        self.current_mode = Some("SPI".into());
        debug!("[{}] SPI configured: {} Hz, mode {}", self.descriptor.id, config.speed_hz, config.mode);
        Ok(())
    }

    async fn spi_transfer(&mut self, write: &[u8], read_len: usize) -> Result<Vec<u8>, DriverError> {
        let opts = DataOptions {
            start_main: true,
            data_write: (!write.is_empty()).then(|| write.to_vec()),
            bytes_read: read_len as u16,
            stop_main: true,
            ..Default::default()
        };
        Ok(self.data(&opts).await?.unwrap_or_default())
    }

    async fn configure_i2c(&mut self, config: &I2cConfig) -> Result<(), DriverError> {
        config.validate()?;
        let opts = ConfigureOptions {
            mode: Some("i2c".into()),
            mode_configuration: Some(ModeOptions {
                speed: Some(config.speed_hz),
                clock_stretch: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.configure(&opts).await?;
        self.current_mode = Some("I2C".into());
        Ok(())
    }

    async fn i2c_write(&mut self, address: u8, data: &[u8]) -> Result<(), DriverError> {
        let mut payload = vec![address << 1];
        payload.extend_from_slice(data);
        let opts = DataOptions {
            start_main: true,
            data_write: Some(payload),
            stop_main: true,
            ..Default::default()
        };
        self.data(&opts).await?;
        Ok(())
    }

    async fn i2c_read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, DriverError> {
        let opts = DataOptions {
            start_main: true,
            data_write: Some(vec![(address << 1) | 1]),
            bytes_read: len as u16,
            stop_main: true,
            ..Default::default()
        };
        Ok(self.data(&opts).await?.unwrap_or_default())
    }

    async fn i2c_write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>, DriverError> {
        let mut payload = vec![address << 1];
        payload.extend_from_slice(write);
        let opts = DataOptions {
            start_main: true,
            data_write: Some(payload),
            bytes_read: read_len as u16,
            stop_main: true,
            ..Default::default()
        };
        Ok(self.data(&opts).await?.unwrap_or_default())
    }

    async fn configure_uart(&mut self, config: &UartConfig) -> Result<(), DriverError> {
        config.validate()?;
        let parity = matches!(config.parity, Parity::Even | Parity::Odd);
        let opts = ConfigureOptions {
            mode: Some("uart".into()),
            mode_configuration: Some(ModeOptions {
                speed: Some(config.baud),
                data_bits: Some(config.data_bits),
                parity: Some(parity),
                stop_bits: Some(config.stop_bits),
                flow_control: Some(false),
                signal_inversion: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.configure(&opts).await?;
        self.current_mode = Some("UART".into());
        debug!(
            "[{}] UART configured: {} baud {}{}{}",
            self.descriptor.id, config.baud, config.data_bits, config.parity, config.stop_bits
        );
        Ok(())
    }

    async fn uart_write(&mut self, data: &[u8]) -> Result<(), DriverError> {
        let opts = DataOptions {
            start_main: true,
            data_write: Some(data.to_vec()),
            stop_main: true,
            ..Default::default()
        };
        self.data(&opts).await?;
        Ok(())
    }

    async fn uart_read(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>, DriverError> {
        let opts = DataOptions {
            start_main: true,
            bytes_read: len as u16,
            stop_main: true,
            ..Default::default()
        };
        let bytes = self.data(&opts).await?.unwrap_or_default();
        if !bytes.is_empty() {
            self.sink.publish(DeviceOutput {
                device_id: self.descriptor.id.clone(),
                channel: OutputChannel::Uart,
                payload: crate::device::OutputPayload::Bytes(bytes.clone()),
            });
        }
        Ok(bytes)
    }
}
