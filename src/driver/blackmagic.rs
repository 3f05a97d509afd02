/* Black Magic Probe driver: DebugProbe role over the GDB machine interface.
 *
 * The probe carries its own GDB server on the first CDC-ACM endpoint, so the
 * only setup is `-target-select extended-remote <port>` from a gdb child
 * process in MI mode. The second endpoint is a UART passthrough to the
 * target. */

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::catalog::CatalogEntry;
use crate::device::{DeviceDescriptor, DeviceOutput, OutputChannel};
use crate::driver::{Backend, DebugProbe, DriverError};
use crate::proto::gdbmi::{self, MiRecord, MiResultClass, MiValue};
use crate::sink::OutputSink;

const ROLE_GDB: &str = "gdb";
const ROLE_UART: &str = "uart";

const GDB_BINARY: &str = "arm-none-eabi-gdb";
const MI_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/* ARM core register numbering as reported over MI. */
const REG_NAMES: &[(u32, &str)] = &[
    (0, "r0"), (1, "r1"), (2, "r2"), (3, "r3"),
    (4, "r4"), (5, "r5"), (6, "r6"), (7, "r7"),
    (8, "r8"), (9, "r9"), (10, "r10"), (11, "r11"),
    (12, "r12"), (13, "sp"), (14, "lr"), (15, "pc"),
    (16, "xpsr"),
];

/* A gdb child process in MI mode. */
struct GdbMi {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl GdbMi {
    async fn spawn() -> Result<Self, DriverError> {
        let mut child = Command::new(GDB_BINARY)
            .arg("--interpreter=mi3")
            .arg("--nx")
            .arg("--quiet")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DriverError::Transport(format!("spawn {GDB_BINARY}: {e}")))?;

        let stdin = child.stdin.take().ok_or(DriverError::Transport("no gdb stdin".into()))?;
        let stdout = child.stdout.take().ok_or(DriverError::Transport("no gdb stdout".into()))?;
        let mut gdb = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };
        /* Swallow the startup records up to the first prompt. */
        gdb.read_until_prompt(MI_COMMAND_TIMEOUT).await?;
        Ok(gdb)
    }

    async fn read_until_prompt(&mut self, timeout: Duration) -> Result<Vec<MiRecord>, DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut records = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            let n = match tokio::time::timeout_at(deadline, self.stdout.read_line(&mut line)).await {
                Err(_) => return Err(DriverError::Timeout),
                Ok(Ok(0)) => return Err(DriverError::Transport("gdb exited".into())),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(DriverError::Transport(e.to_string())),
            };
            debug_assert!(n > 0);

            match gdbmi::parse_line(&line) {
                Ok(MiRecord::Prompt) => return Ok(records),
                Ok(record) => records.push(record),
                Err(err) => debug!("unparsed MI line {line:?}: {err}"),
            }
        }
    }

    /* Send one MI command and collect everything up to the prompt. */
    async fn command(&mut self, cmd: &str) -> Result<Vec<MiRecord>, DriverError> {
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        self.read_until_prompt(MI_COMMAND_TIMEOUT).await
    }

    async fn shutdown(mut self) {
        let _ = self.stdin.write_all(b"-gdb-exit\n").await;
        let _ = self.stdin.flush().await;
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("gdb did not exit, killing");
                let _ = self.child.kill().await;
            }
        }
    }
}

/* The ^result record of a reply, if any. */
fn result_record(records: &[MiRecord]) -> Option<&MiRecord> {
    records.iter().find(|r| matches!(r, MiRecord::Result { .. }))
}

fn expect_class(records: &[MiRecord], class: MiResultClass) -> Result<&MiRecord, DriverError> {
    let record = result_record(records).ok_or(DriverError::TypeMismatch)?;
    match record {
        MiRecord::Result { class: got, .. } if *got == class => Ok(record),
        MiRecord::Result { .. } => Err(DriverError::Device(
            record.error_message().unwrap_or("command failed").to_string(),
        )),
        _ => Err(DriverError::TypeMismatch),
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, DriverError> {
    if s.len() % 2 != 0 {
        return Err(DriverError::Framing("odd hex payload".into()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| DriverError::Framing("bad hex payload".into()))
        })
        .collect()
}

fn encode_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/* Extract the concatenated contents of a -data-read-memory-bytes reply. */
fn memory_contents(record: &MiRecord) -> Result<Vec<u8>, DriverError> {
    let memory = record.result_field("memory").ok_or(DriverError::TypeMismatch)?;
    let mut data = Vec::new();
    for region in memory.items() {
        if let Some(contents) = region.field("contents").and_then(MiValue::as_str) {
            data.extend_from_slice(&decode_hex(contents)?);
        }
    }
    Ok(data)
}

/* Map a -data-list-register-values payload to named ARM registers. */
fn named_registers(record: &MiRecord) -> BTreeMap<String, u64> {
    let mut regs = BTreeMap::new();
    let Some(values) = record.result_field("register-values") else {
        return regs;
    };
    for entry in values.items() {
        let Some(number) = entry
            .field("number")
            .and_then(MiValue::as_str)
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        let Some(value) = entry
            .field("value")
            .and_then(MiValue::as_str)
            .and_then(|v| u64::from_str_radix(v.trim_start_matches("0x"), 16).ok())
        else {
            continue;
        };
        if let Some((_, name)) = REG_NAMES.iter().find(|(n, _)| *n == number) {
            regs.insert((*name).to_string(), value);
        }
    }
    regs
}

pub struct BlackMagicDriver {
    descriptor: DeviceDescriptor,
    entry: CatalogEntry,
    sink: OutputSink,
    gdb: Option<GdbMi>,
    target_attached: bool,
    /* driver handle -> gdb breakpoint number */
    breakpoints: BTreeMap<u32, u32>,
    next_bp: u32,
}

impl BlackMagicDriver {
    pub fn new(descriptor: DeviceDescriptor, entry: CatalogEntry, sink: OutputSink) -> Self {
        Self {
            descriptor,
            entry,
            sink,
            gdb: None,
            target_attached: false,
            breakpoints: BTreeMap::new(),
            next_bp: 1,
        }
    }

    fn gdb_mut(&mut self) -> Result<&mut GdbMi, DriverError> {
        self.gdb.as_mut().ok_or(DriverError::NotConnected)
    }

    fn note_failure(&mut self, err: DriverError) -> DriverError {
        if err.is_fatal() {
            warn!("[{}] gdb session lost: {err}", self.descriptor.id);
            self.gdb = None;
            self.target_attached = false;
        }
        err
    }

    async fn command(&mut self, cmd: &str) -> Result<Vec<MiRecord>, DriverError> {
        let result = self.gdb_mut()?.command(cmd).await;
        let records = result.map_err(|e| self.note_failure(e))?;
        /* Console output is observational; fan it out. */
        for record in &records {
            if let MiRecord::ConsoleStream(text) = record {
                let text = text.trim_end();
                if !text.is_empty() {
                    self.sink
                        .publish(DeviceOutput::line(&self.descriptor.id, OutputChannel::Console, text));
                }
            }
        }
        Ok(records)
    }

    /* Run a probe monitor command, returning its console output. */
    pub async fn monitor(&mut self, cmd: &str) -> Result<String, DriverError> {
        let records = self
            .command(&format!("-interpreter-exec console \"monitor {cmd}\""))
            .await?;
        expect_class(&records, MiResultClass::Done)?;
        let output: Vec<String> = records
            .iter()
            .filter_map(|r| match r {
                MiRecord::ConsoleStream(text) => Some(text.trim().to_string()),
                _ => None,
            })
            .filter(|t| !t.is_empty())
            .collect();
        Ok(output.join("\n"))
    }

    /* Switch the probe's target power output (monitor tpwr). */
    pub async fn set_target_power(&mut self, enabled: bool) -> Result<(), DriverError> {
        let cmd = if enabled { "tpwr enable" } else { "tpwr disable" };
        self.monitor(cmd).await?;
        info!("[{}] target power {}", self.descriptor.id, if enabled { "on" } else { "off" });
        Ok(())
    }

    /* Tail the UART passthrough endpoint onto the device output stream.
     * The task runs until the endpoint reports EOF or an error. */
    pub fn spawn_uart_monitor(&self, baud: u32) -> Result<tokio::task::JoinHandle<()>, DriverError> {
        let path = self
            .descriptor
            .endpoint(ROLE_UART)
            .map(|e| e.path.to_string_lossy().into_owned())
            .ok_or_else(|| DriverError::InvalidConfig("descriptor has no 'uart' endpoint".into()))?;
        let stream = tokio_serial::new(&path, baud)
            .open_native_async()
            .map_err(|e| DriverError::Transport(format!("open {path}: {e}")))?;

        let sink = self.sink.clone();
        let device_id = self.descriptor.id.clone();
        Ok(tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        sink.publish(DeviceOutput::line(&device_id, OutputChannel::Uart, line));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("[{device_id}] uart monitor stopped: {e}");
                        break;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl Backend for BlackMagicDriver {
    fn name(&self) -> &str {
        "blackmagic"
    }

    fn connected(&self) -> bool {
        self.gdb.is_some()
    }

    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.gdb.is_some() {
            return Ok(());
        }
        let gdb_path = self
            .descriptor
            .endpoint(ROLE_GDB)
            .map(|e| e.path.to_string_lossy().into_owned())
            .ok_or_else(|| DriverError::InvalidConfig("descriptor has no 'gdb' endpoint".into()))?;

        self.gdb = Some(GdbMi::spawn().await?);

        let records = self
            .command(&format!("-target-select extended-remote {gdb_path}"))
            .await?;
        let ok = result_record(&records).is_some_and(|r| {
            matches!(
                r,
                MiRecord::Result { class: MiResultClass::Connected | MiResultClass::Done, .. }
            )
        });
        if !ok {
            let msg = result_record(&records)
                .and_then(|r| r.error_message())
                .unwrap_or("target-select failed")
                .to_string();
            if let Some(gdb) = self.gdb.take() {
                gdb.shutdown().await;
            }
            return Err(DriverError::Device(msg));
        }

        if let Ok(version) = self.monitor("version").await {
            if let Some(first) = version.lines().next() {
                info!("[{}] probe firmware: {first}", self.descriptor.id);
            }
        }
        info!("[{}] connected via {gdb_path}", self.descriptor.id);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverError> {
        if let Some(gdb) = self.gdb.take() {
            gdb.shutdown().await;
        }
        self.target_attached = false;
        self.breakpoints.clear();
        debug!("[{}] disconnected", self.descriptor.id);
        Ok(())
    }

    async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
        let firmware = if self.gdb.is_some() {
            self.monitor("version").await.ok()
        } else {
            None
        };
        Ok(json!({
            "name": self.entry.name,
            "gdb_endpoint": self.descriptor.endpoint(ROLE_GDB).map(|e| e.path.clone()),
            "uart_endpoint": self.descriptor.endpoint(ROLE_UART).map(|e| e.path.clone()),
            "target_attached": self.target_attached,
            "firmware": firmware,
        }))
    }

    fn as_debug(&mut self) -> Option<&mut dyn DebugProbe> {
        Some(self)
    }
}

#[async_trait]
impl DebugProbe for BlackMagicDriver {
    async fn connect_target(&mut self, target: &str) -> Result<(), DriverError> {
        /* Scan, then attach to the first target found. */
        if target == "auto" || target == "swd" {
            let scan = self.monitor("swdp_scan").await.unwrap_or_default();
            if !scan.is_empty() {
                debug!("[{}] swd scan:\n{scan}", self.descriptor.id);
            }
        }
        if target == "jtag" {
            let scan = self.monitor("jtag_scan").await.unwrap_or_default();
            if !scan.is_empty() {
                debug!("[{}] jtag scan:\n{scan}", self.descriptor.id);
            }
        }

        let records = self.command("-target-attach 1").await?;
        expect_class(&records, MiResultClass::Done)?;
        self.target_attached = true;
        info!("[{}] attached to target 1", self.descriptor.id);
        Ok(())
    }

    async fn halt(&mut self) -> Result<(), DriverError> {
        let records = self.command("-exec-interrupt").await?;
        expect_class(&records, MiResultClass::Done)?;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), DriverError> {
        let records = self.command("-exec-continue").await?;
        expect_class(&records, MiResultClass::Running)?;
        Ok(())
    }

    async fn reset(&mut self, halt_after: bool) -> Result<(), DriverError> {
        self.monitor("hard_srst").await?;
        if halt_after {
            let records = self.command("-target-attach 1").await?;
            expect_class(&records, MiResultClass::Done)?;
            self.halt().await?;
        }
        Ok(())
    }

    async fn step(&mut self) -> Result<(), DriverError> {
        let records = self.command("-exec-step-instruction").await?;
        expect_class(&records, MiResultClass::Done)?;
        Ok(())
    }

    async fn read_memory(&mut self, address: u64, len: usize) -> Result<Vec<u8>, DriverError> {
        let records = self
            .command(&format!("-data-read-memory-bytes {address:#x} {len}"))
            .await?;
        let record = expect_class(&records, MiResultClass::Done)?;
        memory_contents(record)
    }

    async fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), DriverError> {
        let records = self
            .command(&format!("-data-write-memory-bytes {address:#x} {}", encode_hex(data)))
            .await?;
        expect_class(&records, MiResultClass::Done)?;
        Ok(())
    }

    async fn set_breakpoint(&mut self, address: u64) -> Result<u32, DriverError> {
        let records = self.command(&format!("-break-insert *{address:#x}")).await?;
        let record = expect_class(&records, MiResultClass::Done)?;
        let number = record
            .result_field("bkpt")
            .and_then(|b| b.field("number"))
            .and_then(MiValue::as_str)
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or(DriverError::TypeMismatch)?;

        let handle = self.next_bp;
        self.next_bp += 1;
        self.breakpoints.insert(handle, number);
        debug!("[{}] breakpoint {handle} (gdb #{number}) at {address:#010x}", self.descriptor.id);
        Ok(handle)
    }

    async fn remove_breakpoint(&mut self, handle: u32) -> Result<(), DriverError> {
        let number = self
            .breakpoints
            .get(&handle)
            .copied()
            .ok_or_else(|| DriverError::InvalidConfig(format!("unknown breakpoint {handle}")))?;
        let records = self.command(&format!("-break-delete {number}")).await?;
        expect_class(&records, MiResultClass::Done)?;
        self.breakpoints.remove(&handle);
        Ok(())
    }

    async fn read_registers(&mut self) -> Result<BTreeMap<String, u64>, DriverError> {
        let records = self.command("-data-list-register-values x").await?;
        let record = expect_class(&records, MiResultClass::Done)?;
        Ok(named_registers(record))
    }

    async fn flash_program(
        &mut self,
        address: u64,
        data: &[u8],
        verify: bool,
    ) -> Result<(), DriverError> {
        /* GDB restores from a file; stage the blob in a scratch dir
         * whose cleanup does not depend on success. */
        let dir = tempfile::tempdir().map_err(|e| DriverError::Transport(e.to_string()))?;
        let path = dir.path().join("image.bin");
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;

        let records = self
            .command(&format!(
                "-interpreter-exec console \"restore {} binary {address:#x}\"",
                path.display()
            ))
            .await?;
        expect_class(&records, MiResultClass::Done)?;

        if verify {
            let records = self
                .command("-interpreter-exec console \"compare-sections\"")
                .await?;
            expect_class(&records, MiResultClass::Done)?;
        }
        Ok(())
    }
}
