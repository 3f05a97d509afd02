/* Tigard (FT2232H) drivers.
 *
 * `TigardDriver` implements the Bus role: SPI and I2C through the MPSSE
 * engine on channel B, UART through the channel-A tty. `TigardDebugDriver`
 * implements the DebugProbe role by owning an OpenOCD subprocess and driving
 * it over the telnet command port. */

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::catalog::CatalogEntry;
use crate::device::{
    DeviceDescriptor, DeviceOutput, I2cConfig, OutputChannel, OutputPayload, SpiConfig, UartConfig,
};
use crate::driver::{Backend, Bus, DebugProbe, DriverError};
use crate::proto::mpsse::{CommandBuffer, MpsseChannel};
use crate::sink::OutputSink;

const ROLE_UART: &str = "uart";

/* MPSSE read deadline per exchange. */
const MPSSE_TIMEOUT: Duration = Duration::from_secs(2);

/* OpenOCD lifecycle deadlines. */
const OPENOCD_STARTUP_WAIT: Duration = Duration::from_secs(2);
const TELNET_REPLY_TIMEOUT: Duration = Duration::from_secs(1);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct TigardDriver {
    descriptor: DeviceDescriptor,
    entry: CatalogEntry,
    sink: OutputSink,
    mpsse: Option<MpsseChannel>,
    uart: Option<tokio_serial::SerialStream>,
    current_protocol: Option<&'static str>,
    spi_cs_active_low: bool,
}

impl TigardDriver {
    pub fn new(descriptor: DeviceDescriptor, entry: CatalogEntry, sink: OutputSink) -> Self {
        Self {
            descriptor,
            entry,
            sink,
            mpsse: None,
            uart: None,
            current_protocol: None,
            spi_cs_active_low: true,
        }
    }

    fn mpsse(&self) -> Result<&MpsseChannel, DriverError> {
        self.mpsse.as_ref().ok_or(DriverError::NotConnected)
    }

    fn note_failure(&mut self, err: DriverError) -> DriverError {
        if err.is_fatal() {
            warn!("[{}] MPSSE fault, disconnecting: {err}", self.descriptor.id);
            self.mpsse = None;
            self.current_protocol = None;
        }
        err
    }

    /* One I2C transaction: address (+writes), optional repeated-start
     * read phase, stop. ACK bits come back inline in the read stream. */
    async fn i2c_transaction(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>, DriverError> {
        if self.current_protocol != Some("i2c") {
            return Err(DriverError::InvalidConfig("I2C not configured".into()));
        }

        let mut cmds = CommandBuffer::new();
        cmds.i2c_start();
        let mut ack_count = 0usize;

        if !write.is_empty() || read_len == 0 {
            cmds.i2c_write_byte(address << 1);
            ack_count += 1;
            for byte in write {
                cmds.i2c_write_byte(*byte);
                ack_count += 1;
            }
        }

        if read_len > 0 {
            if !write.is_empty() {
                cmds.i2c_start(); /* repeated start */
            }
            cmds.i2c_write_byte((address << 1) | 1);
            ack_count += 1;
            for i in 0..read_len {
                cmds.i2c_read_byte(i + 1 < read_len);
            }
        }

        cmds.i2c_stop();
        cmds.send_immediate();

        let expect = ack_count + read_len;
        let result = self.mpsse()?.transfer(cmds.into_bytes(), expect, MPSSE_TIMEOUT).await;
        let payload = result.map_err(|e| self.note_failure(e.into()))?;

        /* Every address/data byte must have been ACKed (LSB clear). */
        for ack in &payload[..ack_count] {
            if ack & 0x01 != 0 {
                return Err(DriverError::Device(format!("I2C NAK from {address:#04x}")));
            }
        }
        Ok(payload[ack_count..].to_vec())
    }
}

#[async_trait]
impl Backend for TigardDriver {
    fn name(&self) -> &str {
        "tigard"
    }

    fn connected(&self) -> bool {
        self.mpsse.is_some()
    }

    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.mpsse.is_some() {
            return Ok(());
        }
        let channel = MpsseChannel::open(
            self.descriptor.vendor_id,
            self.descriptor.product_id,
            self.descriptor.serial.as_deref(),
            1, /* channel B carries SPI/I2C/JTAG on this board */
        )
        .await?;
        self.mpsse = Some(channel);
        info!("[{}] MPSSE channel B claimed", self.descriptor.id);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverError> {
        self.mpsse = None;
        self.uart = None;
        self.current_protocol = None;
        debug!("[{}] disconnected", self.descriptor.id);
        Ok(())
    }

    async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
        Ok(json!({
            "name": self.entry.name,
            "serial": self.descriptor.serial,
            "current_protocol": self.current_protocol,
            "capabilities": ["spi", "i2c", "uart", "jtag", "swd"],
        }))
    }

    fn as_bus(&mut self) -> Option<&mut dyn Bus> {
        Some(self)
    }
}

#[async_trait]
impl Bus for TigardDriver {
    async fn configure_spi(&mut self, config: &SpiConfig) -> Result<(), DriverError> {
        config.validate()?;

        let mut cmds = CommandBuffer::new();
        cmds.init(config.speed_hz);
        cmds.chip_select(false, config.cs_active_low);
        let result = self.mpsse()?.write(cmds.into_bytes()).await;
        result.map_err(|e| self.note_failure(e.into()))?;

        self.spi_cs_active_low = config.cs_active_low;
        self.current_protocol = Some("spi");
        debug!("[{}] SPI configured: {} Hz, mode {}", self.descriptor.id, config.speed_hz, config.mode);
        Ok(())
    }

    async fn spi_transfer(&mut self, write: &[u8], read_len: usize) -> Result<Vec<u8>, DriverError> {
        if self.current_protocol != Some("spi") {
            return Err(DriverError::InvalidConfig("SPI not configured".into()));
        }
        let cs_active_low = self.spi_cs_active_low;

        let mut cmds = CommandBuffer::new();
        cmds.chip_select(true, cs_active_low);
        cmds.spi_write(write);
        if read_len > 0 {
            cmds.spi_read(read_len as u16);
        }
        cmds.chip_select(false, cs_active_low);
        cmds.send_immediate();

        let result = self.mpsse()?.transfer(cmds.into_bytes(), read_len, MPSSE_TIMEOUT).await;
        result.map_err(|e| self.note_failure(e.into()))
    }

    async fn configure_i2c(&mut self, config: &I2cConfig) -> Result<(), DriverError> {
        config.validate()?;
        let mut cmds = CommandBuffer::new();
        cmds.i2c_init(config.speed_hz);
        let result = self.mpsse()?.write(cmds.into_bytes()).await;
        result.map_err(|e| self.note_failure(e.into()))?;
        self.current_protocol = Some("i2c");
        debug!("[{}] I2C configured: {} Hz", self.descriptor.id, config.speed_hz);
        Ok(())
    }

    async fn i2c_write(&mut self, address: u8, data: &[u8]) -> Result<(), DriverError> {
        self.i2c_transaction(address, data, 0).await.map(|_| ())
    }

    async fn i2c_read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, DriverError> {
        self.i2c_transaction(address, &[], len).await
    }

    async fn i2c_write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>, DriverError> {
        self.i2c_transaction(address, write, read_len).await
    }

    async fn configure_uart(&mut self, config: &UartConfig) -> Result<(), DriverError> {
        config.validate()?;
        let path = self
            .descriptor
            .endpoint(ROLE_UART)
            .map(|e| e.path.to_string_lossy().into_owned())
            .ok_or_else(|| DriverError::InvalidConfig("descriptor has no 'uart' endpoint".into()))?;

        let stream = tokio_serial::new(&path, config.baud)
            .open_native_async()
            .map_err(|e| DriverError::Transport(format!("open {path}: {e}")))?;
        self.uart = Some(stream);
        self.current_protocol = Some("uart");
        debug!("[{}] UART on {path}: {} baud", self.descriptor.id, config.baud);
        Ok(())
    }

    async fn uart_write(&mut self, data: &[u8]) -> Result<(), DriverError> {
        let uart = self.uart.as_mut().ok_or(DriverError::NotConnected)?;
        uart.write_all(data).await?;
        uart.flush().await?;
        Ok(())
    }

    async fn uart_read(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, DriverError> {
        let uart = self.uart.as_mut().ok_or(DriverError::NotConnected)?;
        let mut buf = vec![0u8; len];
        let n = match tokio::time::timeout(timeout, uart.read(&mut buf)).await {
            Err(_) => 0,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(DriverError::Transport(e.to_string())),
        };
        buf.truncate(n);
        if !buf.is_empty() {
            self.sink.publish(DeviceOutput {
                device_id: self.descriptor.id.clone(),
                channel: OutputChannel::Uart,
                payload: OutputPayload::Bytes(buf.clone()),
            });
        }
        Ok(buf)
    }
}

/* ------------------------------------------------------------------ */
/* Debug driver (OpenOCD)                                             */
/* ------------------------------------------------------------------ */

/* OpenOCD target configuration files by chip family. */
const TARGET_CONFIGS: &[(&str, &str)] = &[
    ("stm32f1", "target/stm32f1x.cfg"),
    ("stm32f4", "target/stm32f4x.cfg"),
    ("stm32l4", "target/stm32l4x.cfg"),
    ("nrf52", "target/nrf52.cfg"),
    ("esp32", "target/esp32.cfg"),
    ("rp2040", "target/rp2040.cfg"),
    ("lpc1768", "target/lpc1768.cfg"),
    ("samd21", "target/at91samdXX.cfg"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugTransport {
    Swd,
    Jtag,
}

pub struct TigardDebugDriver {
    descriptor: DeviceDescriptor,
    entry: CatalogEntry,
    #[allow(dead_code)]
    sink: OutputSink,
    transport: DebugTransport,
    target: String,
    openocd: Option<Child>,
    telnet: Option<TcpStream>,
    breakpoints: BTreeMap<u32, u64>,
    next_bp: u32,
}

impl TigardDebugDriver {
    pub fn new(descriptor: DeviceDescriptor, entry: CatalogEntry, sink: OutputSink) -> Self {
        Self {
            descriptor,
            entry,
            sink,
            transport: DebugTransport::Swd,
            target: "auto".into(),
            openocd: None,
            telnet: None,
            breakpoints: BTreeMap::new(),
            next_bp: 1,
        }
    }

    pub fn set_transport(&mut self, transport: DebugTransport) {
        self.transport = transport;
    }

    /* Send one command and collect the reply up to the next prompt. */
    async fn command(&mut self, cmd: &str) -> Result<String, DriverError> {
        let telnet = self.telnet.as_mut().ok_or(DriverError::NotConnected)?;
        telnet.write_all(cmd.as_bytes()).await?;
        telnet.write_all(b"\n").await?;

        let deadline = tokio::time::Instant::now() + TELNET_REPLY_TIMEOUT;
        let mut reply = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match tokio::time::timeout_at(deadline, telnet.read(&mut buf)).await {
                Err(_) => break,
                Ok(Ok(0)) => {
                    self.telnet = None;
                    return Err(DriverError::Transport("telnet closed".into()));
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(DriverError::Transport(e.to_string())),
            };
            reply.extend_from_slice(&buf[..n]);
            if reply.ends_with(b"> ") {
                break;
            }
        }

        let text = String::from_utf8_lossy(&reply);
        Ok(strip_telnet_reply(&text, cmd))
    }

    async fn command_ok(&mut self, cmd: &str) -> Result<(), DriverError> {
        let reply = self.command(cmd).await?;
        if reply.contains("Error") {
            return Err(DriverError::Device(reply.lines().next().unwrap_or("error").to_string()));
        }
        Ok(())
    }
}

/* Strip the echoed command and the trailing prompt from a telnet reply. */
fn strip_telnet_reply(raw: &str, cmd: &str) -> String {
    raw.lines()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && line != cmd && line != ">"
        })
        .map(|line| line.trim_end_matches("> ").trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/* Parse `mdw` output ("0x20000000: 12345678 87654321 ...") into bytes,
 * little-endian per word. */
fn parse_mdw_output(reply: &str, size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size + 4);
    for line in reply.lines() {
        let Some((_, words)) = line.split_once(':') else {
            continue;
        };
        for word in words.split_whitespace() {
            if let Ok(value) = u32::from_str_radix(word, 16) {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    data.truncate(size);
    data
}

/* Parse `reg` output lines like "(0) r0 (/32): 0x12345678". */
fn parse_reg_output(reply: &str) -> BTreeMap<String, u64> {
    let mut regs = BTreeMap::new();
    for line in reply.lines() {
        let Some((lhs, rhs)) = line.split_once(':') else {
            continue;
        };
        let Some(value_str) = rhs.split_whitespace().find(|t| t.starts_with("0x")) else {
            continue;
        };
        let Ok(value) = u64::from_str_radix(value_str.trim_start_matches("0x"), 16) else {
            continue;
        };
        let Some(name) = lhs.split_whitespace().find(|t| !t.starts_with('(')) else {
            continue;
        };
        regs.insert(name.to_string(), value);
    }
    regs
}

#[async_trait]
impl Backend for TigardDebugDriver {
    fn name(&self) -> &str {
        "tigard-debug"
    }

    fn connected(&self) -> bool {
        self.telnet.is_some()
    }

    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.telnet.is_some() {
            return Ok(());
        }

        let mut cmd = Command::new("openocd");
        cmd.arg("-f").arg("interface/ftdi/tigard.cfg");
        match self.transport {
            DebugTransport::Swd => cmd.arg("-c").arg("transport select swd"),
            DebugTransport::Jtag => cmd.arg("-c").arg("transport select jtag"),
        };
        if let Some((_, cfg)) = TARGET_CONFIGS.iter().find(|(name, _)| *name == self.target) {
            cmd.arg("-f").arg(cfg);
        } else {
            cmd.arg("-c").arg("adapter speed 1000");
        }
        cmd.arg("-c")
            .arg(format!("telnet_port {}", self.entry.constants.telnet_port));
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        info!("[{}] starting OpenOCD on port {}", self.descriptor.id, self.entry.constants.telnet_port);
        let mut child = cmd
            .spawn()
            .map_err(|e| DriverError::Transport(format!("spawn openocd: {e}")))?;

        tokio::time::sleep(OPENOCD_STARTUP_WAIT).await;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(DriverError::Transport(format!("openocd exited at startup: {status}")));
        }

        let addr = format!("127.0.0.1:{}", self.entry.constants.telnet_port);
        let mut telnet = match tokio::time::timeout(Duration::from_secs(2), TcpStream::connect(&addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let _ = child.start_kill();
                return Err(DriverError::Transport(format!("telnet connect: {e}")));
            }
            Err(_) => {
                let _ = child.start_kill();
                return Err(DriverError::Timeout);
            }
        };

        /* Consume the banner + prompt. */
        let mut banner = [0u8; 1024];
        let _ = tokio::time::timeout(Duration::from_millis(500), telnet.read(&mut banner)).await;

        self.openocd = Some(child);
        self.telnet = Some(telnet);
        info!("[{}] OpenOCD up", self.descriptor.id);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.telnet.is_some() {
            let _ = self.command("shutdown").await;
        }
        self.telnet = None;

        if let Some(mut child) = self.openocd.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("[{}] openocd did not exit, killing", self.descriptor.id);
                    let _ = child.kill().await;
                }
            }
        }
        self.breakpoints.clear();
        Ok(())
    }

    async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
        Ok(json!({
            "name": format!("{} (OpenOCD)", self.entry.name),
            "transport": match self.transport {
                DebugTransport::Swd => "swd",
                DebugTransport::Jtag => "jtag",
            },
            "target": self.target,
            "telnet_port": self.entry.constants.telnet_port,
            "breakpoints": self.breakpoints.len(),
        }))
    }

    fn as_debug(&mut self) -> Option<&mut dyn DebugProbe> {
        Some(self)
    }
}

#[async_trait]
impl DebugProbe for TigardDebugDriver {
    async fn connect_target(&mut self, target: &str) -> Result<(), DriverError> {
        self.target = target.to_string();
        let reply = self.command("targets").await?;
        let lower = reply.to_lowercase();
        if lower.contains("halted") || lower.contains("running") {
            Ok(())
        } else {
            Err(DriverError::Device("no target responding".into()))
        }
    }

    async fn halt(&mut self) -> Result<(), DriverError> {
        self.command_ok("halt").await
    }

    async fn resume(&mut self) -> Result<(), DriverError> {
        self.command_ok("resume").await
    }

    async fn reset(&mut self, halt_after: bool) -> Result<(), DriverError> {
        let cmd = if halt_after { "reset halt" } else { "reset run" };
        self.command_ok(cmd).await
    }

    async fn step(&mut self) -> Result<(), DriverError> {
        self.command_ok("step").await
    }

    async fn read_memory(&mut self, address: u64, len: usize) -> Result<Vec<u8>, DriverError> {
        let words = len.div_ceil(4);
        let reply = self.command(&format!("mdw {address:#010x} {words}")).await?;
        Ok(parse_mdw_output(&reply, len))
    }

    async fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), DriverError> {
        for (i, chunk) in data.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let value = u32::from_le_bytes(word);
            self.command_ok(&format!("mww {:#010x} {value:#010x}", address + (i * 4) as u64))
                .await?;
        }
        Ok(())
    }

    async fn set_breakpoint(&mut self, address: u64) -> Result<u32, DriverError> {
        let reply = self.command(&format!("bp {address:#010x} 2 hw")).await?;
        if !reply.to_lowercase().contains("breakpoint") {
            return Err(DriverError::Device(format!("breakpoint rejected: {reply}")));
        }
        let handle = self.next_bp;
        self.next_bp += 1;
        self.breakpoints.insert(handle, address);
        Ok(handle)
    }

    async fn remove_breakpoint(&mut self, handle: u32) -> Result<(), DriverError> {
        let address = self
            .breakpoints
            .get(&handle)
            .copied()
            .ok_or_else(|| DriverError::InvalidConfig(format!("unknown breakpoint {handle}")))?;
        self.command_ok(&format!("rbp {address:#010x}")).await?;
        self.breakpoints.remove(&handle);
        Ok(())
    }

    async fn read_registers(&mut self) -> Result<BTreeMap<String, u64>, DriverError> {
        let reply = self.command("reg").await?;
        Ok(parse_reg_output(&reply))
    }

    async fn flash_program(
        &mut self,
        address: u64,
        data: &[u8],
        _verify: bool,
    ) -> Result<(), DriverError> {
        /* OpenOCD flashes from a file; stage the blob in a scratch dir
         * that is unlinked even on error. */
        let dir = tempfile::tempdir().map_err(|e| DriverError::Transport(e.to_string()))?;
        let path = dir.path().join("firmware.bin");
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;

        self.command_ok(&format!(
            "flash write_image erase {} {address:#010x}",
            path.display()
        ))
        .await
    }

    async fn dump_firmware(
        &mut self,
        start: u64,
        size: usize,
        _chunk_size: usize,
    ) -> Result<Vec<u8>, DriverError> {
        let dir = tempfile::tempdir().map_err(|e| DriverError::Transport(e.to_string()))?;
        let path = dir.path().join("dump.bin");

        self.command_ok(&format!("dump_image {} {start:#010x} {size}", path.display()))
            .await?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!("[{}] dump_image produced no file: {e}", self.descriptor.id);
                /* Word-by-word fallback. */
                let words = size.div_ceil(4);
                let reply = self.command(&format!("mdw {start:#010x} {words}")).await?;
                Ok(parse_mdw_output(&reply, size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mdw_output_parses_to_le_bytes() {
        let reply = "0x20000000: 12345678 87654321\n0x20000008: deadbeef";
        let data = parse_mdw_output(reply, 12);
        assert_eq!(
            data,
            vec![0x78, 0x56, 0x34, 0x12, 0x21, 0x43, 0x65, 0x87, 0xEF, 0xBE, 0xAD, 0xDE]
        );
    }

    #[test]
    fn mdw_output_truncates_to_requested_size() {
        let reply = "0x08000000: aabbccdd 11223344";
        let data = parse_mdw_output(reply, 6);
        assert_eq!(data, vec![0xDD, 0xCC, 0xBB, 0xAA, 0x44, 0x33]);
    }

    #[test]
    fn mdw_ignores_noise_lines() {
        let reply = "some warning\n0x20000000: 000000ff";
        assert_eq!(parse_mdw_output(reply, 4), vec![0xFF, 0, 0, 0]);
    }

    #[test]
    fn reg_output_parses_names_and_values() {
        let reply = "===== arm v7m registers\n\
                     (0) r0 (/32): 0x00000042\n\
                     (15) pc (/32): 0x08000130\n\
                     (25) xPSR (/32): 0x01000000";
        let regs = parse_reg_output(reply);
        assert_eq!(regs["r0"], 0x42);
        assert_eq!(regs["pc"], 0x0800_0130);
        assert_eq!(regs["xPSR"], 0x0100_0000);
    }

    #[test]
    fn reg_output_skips_headers() {
        let regs = parse_reg_output("===== registers\nno hex here");
        assert!(regs.is_empty());
    }

    #[test]
    fn telnet_reply_strips_echo_and_prompt() {
        let raw = "halt\r\ntarget halted due to debug-request\r\n> ";
        assert_eq!(strip_telnet_reply(raw, "halt"), "target halted due to debug-request");
    }
}
