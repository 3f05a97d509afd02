/* ST-Link driver: DebugProbe role through an in-process probe-rs session,
 * no subprocess involved. probe-rs is blocking, so every operation runs on
 * the blocking worker pool; the session lives behind a mutex shared with
 * those workers. */

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use probe_rs::config::TargetSelector;
use probe_rs::probe::list::Lister;
use probe_rs::{MemoryInterface, Permissions, Session};
use serde_json::json;
use tracing::{debug, info};

use crate::catalog::CatalogEntry;
use crate::device::DeviceDescriptor;
use crate::driver::{Backend, DebugProbe, DriverError};
use crate::sink::OutputSink;

const HALT_TIMEOUT: Duration = Duration::from_millis(500);

fn map_probe_err(err: probe_rs::Error) -> DriverError {
    match err {
        probe_rs::Error::Timeout => DriverError::Timeout,
        other => DriverError::Device(other.to_string()),
    }
}

/* Driver-allocated breakpoint handles mapped to target addresses.
 * Handles are never reused within a connection. */
#[derive(Debug, Default)]
struct BreakpointMap {
    slots: BTreeMap<u32, u64>,
    next: u32,
}

impl BreakpointMap {
    fn insert(&mut self, address: u64) -> u32 {
        self.next += 1;
        self.slots.insert(self.next, address);
        self.next
    }

    fn take(&mut self, handle: u32) -> Option<u64> {
        self.slots.remove(&handle)
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

pub struct StLinkDriver {
    descriptor: DeviceDescriptor,
    entry: CatalogEntry,
    #[allow(dead_code)]
    sink: OutputSink,
    session: Arc<Mutex<Option<Session>>>,
    target: String,
    probe_name: Option<String>,
    breakpoints: BreakpointMap,
}

impl StLinkDriver {
    pub fn new(descriptor: DeviceDescriptor, entry: CatalogEntry, sink: OutputSink) -> Self {
        Self {
            descriptor,
            entry,
            sink,
            session: Arc::new(Mutex::new(None)),
            target: "auto".into(),
            probe_name: None,
            breakpoints: BreakpointMap::default(),
        }
    }

    /* Open the probe and attach. Runs entirely on the blocking pool. */
    async fn attach(&mut self) -> Result<(), DriverError> {
        let serial = self.descriptor.serial.clone();
        let target = self.target.clone();
        let session_slot = Arc::clone(&self.session);

        let probe_name = tokio::task::spawn_blocking(move || -> Result<String, DriverError> {
            let lister = Lister::new();
            let probes = lister.list_all();
            let info = probes
                .into_iter()
                .find(|p| match &serial {
                    Some(s) => p.serial_number.as_deref() == Some(s.as_str()),
                    None => true,
                })
                .ok_or_else(|| DriverError::Device("no debug probe found".into()))?;

            let name = info.identifier.clone();
            let probe = info
                .open()
                .map_err(|e| DriverError::Transport(e.to_string()))?;

            let selector = if target == "auto" {
                TargetSelector::Auto
            } else {
                TargetSelector::from(target.as_str())
            };
            let session = probe
                .attach(selector, Permissions::default())
                .map_err(map_probe_err)?;

            *session_slot.lock().unwrap() = Some(session);
            Ok(name)
        })
        .await
        .map_err(|e| DriverError::Transport(format!("blocking task: {e}")))??;

        info!("[{}] attached via {probe_name}", self.descriptor.id);
        self.probe_name = Some(probe_name);
        Ok(())
    }

    /* Run one operation against core 0 on the blocking pool. */
    async fn with_core<R, F>(&self, op: F) -> Result<R, DriverError>
    where
        R: Send + 'static,
        F: FnOnce(&mut probe_rs::Core) -> Result<R, probe_rs::Error> + Send + 'static,
    {
        let session_slot = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = session_slot.lock().unwrap();
            let session = guard.as_mut().ok_or(DriverError::NotConnected)?;
            let mut core = session.core(0).map_err(map_probe_err)?;
            op(&mut core).map_err(map_probe_err)
        })
        .await
        .map_err(|e| DriverError::Transport(format!("blocking task: {e}")))?
    }

    /* Read one 32-bit word. */
    pub async fn read_word(&self, address: u64) -> Result<u32, DriverError> {
        self.with_core(move |core| core.read_word_32(address)).await
    }

    pub async fn write_word(&self, address: u64, value: u32) -> Result<(), DriverError> {
        self.with_core(move |core| core.write_word_32(address, value)).await
    }

    pub fn breakpoint_count(&self) -> usize {
        self.breakpoints.len()
    }
}

#[async_trait]
impl Backend for StLinkDriver {
    fn name(&self) -> &str {
        "stlink"
    }

    fn connected(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.connected() {
            return Ok(());
        }
        self.attach().await
    }

    async fn disconnect(&mut self) -> Result<(), DriverError> {
        let session_slot = Arc::clone(&self.session);
        /* Session teardown talks USB; keep it off the async workers. */
        tokio::task::spawn_blocking(move || {
            session_slot.lock().unwrap().take();
        })
        .await
        .map_err(|e| DriverError::Transport(format!("blocking task: {e}")))?;
        self.breakpoints.clear();
        debug!("[{}] disconnected", self.descriptor.id);
        Ok(())
    }

    async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
        let state = if self.connected() {
            let status = self
                .with_core(|core| core.status())
                .await
                .map(|s| format!("{s:?}"))
                .unwrap_or_else(|e| format!("unavailable: {e}"));
            Some(status)
        } else {
            None
        };
        Ok(json!({
            "name": self.entry.name,
            "probe": self.probe_name,
            "serial": self.descriptor.serial,
            "target": self.target,
            "core_state": state,
            "breakpoints": self.breakpoints.len(),
        }))
    }

    fn as_debug(&mut self) -> Option<&mut dyn DebugProbe> {
        Some(self)
    }
}

#[async_trait]
impl DebugProbe for StLinkDriver {
    async fn connect_target(&mut self, target: &str) -> Result<(), DriverError> {
        if target == self.target && self.connected() {
            return Ok(());
        }
        self.target = target.to_string();
        /* Target selection happens at attach time; reattach with the
         * requested chip. */
        self.disconnect().await?;
        self.attach().await
    }

    async fn halt(&mut self) -> Result<(), DriverError> {
        self.with_core(|core| core.halt(HALT_TIMEOUT).map(|_| ())).await
    }

    async fn resume(&mut self) -> Result<(), DriverError> {
        self.with_core(|core| core.run()).await
    }

    async fn reset(&mut self, halt_after: bool) -> Result<(), DriverError> {
        if halt_after {
            self.with_core(|core| core.reset_and_halt(HALT_TIMEOUT).map(|_| ())).await
        } else {
            self.with_core(|core| core.reset()).await
        }
    }

    async fn step(&mut self) -> Result<(), DriverError> {
        self.with_core(|core| core.step().map(|_| ())).await
    }

    async fn read_memory(&mut self, address: u64, len: usize) -> Result<Vec<u8>, DriverError> {
        self.with_core(move |core| {
            let mut buf = vec![0u8; len];
            core.read_8(address, &mut buf)?;
            Ok(buf)
        })
        .await
    }

    async fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), DriverError> {
        let data = data.to_vec();
        self.with_core(move |core| core.write_8(address, &data)).await
    }

    async fn set_breakpoint(&mut self, address: u64) -> Result<u32, DriverError> {
        self.with_core(move |core| core.set_hw_breakpoint(address)).await?;
        let handle = self.breakpoints.insert(address);
        debug!("[{}] breakpoint {handle} at {address:#010x}", self.descriptor.id);
        Ok(handle)
    }

    async fn remove_breakpoint(&mut self, handle: u32) -> Result<(), DriverError> {
        let address = self
            .breakpoints
            .take(handle)
            .ok_or_else(|| DriverError::InvalidConfig(format!("unknown breakpoint {handle}")))?;
        self.with_core(move |core| core.clear_hw_breakpoint(address)).await
    }

    async fn read_registers(&mut self) -> Result<BTreeMap<String, u64>, DriverError> {
        self.with_core(|core| {
            /* Collect ids first; reading a register needs the core
             * mutably. */
            let meta: Vec<(String, probe_rs::RegisterId)> = core
                .registers()
                .core_registers()
                .map(|reg| (reg.name().to_string(), reg.id()))
                .collect();

            let mut regs = BTreeMap::new();
            for (name, id) in meta {
                let value: u64 = core.read_core_reg(id)?;
                regs.insert(name, value);
            }
            Ok(regs)
        })
        .await
    }

    async fn flash_program(
        &mut self,
        address: u64,
        data: &[u8],
        verify: bool,
    ) -> Result<(), DriverError> {
        let data = data.to_vec();
        let session_slot = Arc::clone(&self.session);

        tokio::task::spawn_blocking(move || -> Result<(), DriverError> {
            let mut guard = session_slot.lock().unwrap();
            let session = guard.as_mut().ok_or(DriverError::NotConnected)?;

            let mut loader = session.target().flash_loader();
            loader
                .add_data(address, &data)
                .map_err(|e| DriverError::Device(e.to_string()))?;

            let mut options = probe_rs::flashing::DownloadOptions::default();
            options.verify = verify;
            loader
                .commit(session, options)
                .map_err(|e| DriverError::Device(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| DriverError::Transport(format!("blocking task: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_handles_are_never_reused() {
        let mut map = BreakpointMap::default();
        let a = map.insert(0x0800_0000);
        let b = map.insert(0x0800_0004);
        assert_ne!(a, b);

        assert_eq!(map.take(a), Some(0x0800_0000));
        assert_eq!(map.take(a), None);

        let c = map.insert(0x0800_0008);
        assert!(c > b, "freed handles must not come back");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn probe_error_mapping() {
        assert!(matches!(map_probe_err(probe_rs::Error::Timeout), DriverError::Timeout));
    }
}
