/* Curious Bolt driver: Glitch role plus an 8-channel SUMP logic analyzer.
 *
 * The board exposes two serial endpoints: the analyzer (SUMP) first and the
 * control API second. The glitch engine runs on the API endpoint with a
 * line protocol mirroring the vendor surface (`set glitch.repeat N`,
 * `set glitch.ext_offset N`, `arm CH EDGE`, `trigger`, `disarm`; replies
 * `ok` / `err <reason>`). Both endpoints may be open at once. */

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::catalog::CatalogEntry;
use crate::device::{
    DeviceDescriptor, DeviceOutput, GlitchConfig, OutputChannel, OutputPayload, TriggerEdge,
};
use crate::driver::{Backend, DriverError, Glitch};
use crate::proto::glitch::{ArmState, GlitchPlan, GlitchTimer};
use crate::proto::sump::{SumpCapture, SumpClient, SumpConfig, SumpError};
use crate::sink::OutputSink;

const ROLE_SUMP: &str = "sump";
const ROLE_API: &str = "api";

const API_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

fn edge_token(edge: TriggerEdge) -> &'static str {
    match edge {
        TriggerEdge::Rising => "rising",
        TriggerEdge::Falling => "falling",
        TriggerEdge::Either => "either",
    }
}

/* The glitch engine behind the API endpoint. Generic over the stream so
 * the command protocol and state machine are testable in-memory. */
pub(crate) struct GlitchEngine<T> {
    io: T,
    rx: Vec<u8>,
    timer: GlitchTimer,
    state: ArmState,
    config: GlitchConfig,
    plan: Option<GlitchPlan>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> GlitchEngine<T> {
    pub(crate) fn new(io: T, timer: GlitchTimer) -> Self {
        Self {
            io,
            rx: Vec::new(),
            timer,
            state: ArmState::Idle,
            config: GlitchConfig::default(),
            plan: None,
        }
    }

    async fn read_line(&mut self) -> Result<String, DriverError> {
        let deadline = tokio::time::Instant::now() + API_REPLY_TIMEOUT;
        let mut buf = [0u8; 128];
        loop {
            if let Some(pos) = self.rx.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.rx.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line).trim().to_string();
                return Ok(text);
            }
            let n = match tokio::time::timeout_at(deadline, self.io.read(&mut buf)).await {
                Err(_) => return Err(DriverError::Timeout),
                Ok(Ok(0)) => return Err(DriverError::Transport("api endpoint closed".into())),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(DriverError::Transport(e.to_string())),
            };
            self.rx.extend_from_slice(&buf[..n]);
        }
    }

    /* One command/reply exchange. `ok` or `err <reason>` comes back. */
    async fn command(&mut self, line: &str) -> Result<(), DriverError> {
        debug!("bolt api: {line}");
        self.io.write_all(line.as_bytes()).await?;
        self.io.write_all(b"\r\n").await?;
        self.io.flush().await?;

        let reply = self.read_line().await?;
        if reply == "ok" || reply.starts_with("ok ") {
            Ok(())
        } else if let Some(reason) = reply.strip_prefix("err") {
            Err(DriverError::Device(reason.trim().to_string()))
        } else {
            Err(DriverError::Framing(format!("unexpected api reply: {reply}")))
        }
    }

    pub(crate) async fn configure(&mut self, config: &GlitchConfig) -> Result<GlitchPlan, DriverError> {
        let plan = self.timer.plan(config)?;

        self.command(&format!("set glitch.repeat {}", plan.width_cycles)).await?;
        self.command(&format!("set glitch.ext_offset {}", plan.offset_cycles)).await?;

        self.config = *config;
        self.plan = Some(plan);
        /* Reconfiguring an armed engine implicitly disarms it. */
        self.state.on_configure();
        Ok(plan)
    }

    pub(crate) async fn arm(&mut self) -> Result<(), DriverError> {
        let channel = self
            .config
            .trigger_channel
            .ok_or_else(|| DriverError::InvalidConfig("no trigger channel configured".into()))?;

        let mut next = self.state;
        next.on_arm()?;
        self.command(&format!("arm {channel} {}", edge_token(self.config.trigger_edge)))
            .await?;
        self.state = next;
        Ok(())
    }

    pub(crate) async fn trigger(&mut self) -> Result<(), DriverError> {
        let mut next = self.state;
        next.on_trigger()?;
        self.command("trigger").await?;
        self.state = next;
        Ok(())
    }

    pub(crate) async fn disarm(&mut self) -> Result<(), DriverError> {
        let mut next = self.state;
        next.on_disarm()?;
        self.command("disarm").await?;
        self.state = next;
        Ok(())
    }

    pub(crate) fn state(&self) -> ArmState {
        self.state
    }

    pub(crate) fn plan(&self) -> Option<GlitchPlan> {
        self.plan
    }
}

pub struct BoltDriver {
    descriptor: DeviceDescriptor,
    entry: CatalogEntry,
    sink: OutputSink,
    engine: Option<GlitchEngine<tokio_serial::SerialStream>>,
    timer: GlitchTimer,
}

impl BoltDriver {
    pub fn new(descriptor: DeviceDescriptor, entry: CatalogEntry, sink: OutputSink) -> Self {
        let timer = GlitchTimer::new(entry.constants.clock_period_ps);
        Self {
            descriptor,
            entry,
            sink,
            engine: None,
            timer,
        }
    }

    fn endpoint_path(&self, role: &str) -> Result<String, DriverError> {
        self.descriptor
            .endpoint(role)
            .map(|e| e.path.to_string_lossy().into_owned())
            .ok_or_else(|| DriverError::InvalidConfig(format!("descriptor has no '{role}' endpoint")))
    }

    fn engine_mut(&mut self) -> Result<&mut GlitchEngine<tokio_serial::SerialStream>, DriverError> {
        self.engine.as_mut().ok_or(DriverError::NotConnected)
    }

    fn note_failure(&mut self, err: DriverError) -> DriverError {
        if err.is_fatal() {
            self.engine = None;
        }
        err
    }

    /* Capture from the analyzer endpoint. The analyzer and the glitch
     * engine are separate connections, so a capture may run while the
     * engine is armed. */
    pub async fn capture_logic(
        &mut self,
        config: SumpConfig,
        timeout: Duration,
    ) -> Result<SumpCapture, DriverError> {
        /* One-endpoint boards have no analyzer to talk to. */
        let path = self
            .descriptor
            .endpoint(ROLE_SUMP)
            .map(|e| e.path.to_string_lossy().into_owned())
            .ok_or_else(|| DriverError::from(SumpError::NotResponding))?;

        let stream = tokio_serial::new(&path, self.entry.constants.console_baud)
            .open_native_async()
            .map_err(|e| DriverError::Transport(format!("open {path}: {e}")))?;

        let mut sump = SumpClient::new(stream);
        sump.reset().await?;
        let id = sump.identify().await?;
        debug!("[{}] analyzer identified: {id}", self.descriptor.id);

        let config = SumpConfig {
            channels: 8,
            base_clock_hz: self.entry.constants.base_clock_hz,
            ..config
        };
        sump.configure(config).await?;
        let capture = sump.capture(timeout).await?;

        self.sink.publish(DeviceOutput {
            device_id: self.descriptor.id.clone(),
            channel: OutputChannel::Logic,
            payload: OutputPayload::Bytes(capture.raw.clone()),
        });
        Ok(capture)
    }
}

#[async_trait]
impl Backend for BoltDriver {
    fn name(&self) -> &str {
        "bolt"
    }

    fn connected(&self) -> bool {
        self.engine.is_some()
    }

    async fn connect(&mut self) -> Result<(), DriverError> {
        if self.engine.is_some() {
            return Ok(());
        }
        let path = self.endpoint_path(ROLE_API)?;
        let stream = tokio_serial::new(&path, self.entry.constants.binary_baud)
            .open_native_async()
            .map_err(|e| DriverError::Transport(format!("open {path}: {e}")))?;
        self.engine = Some(GlitchEngine::new(stream, self.timer));
        info!("[{}] glitch engine on {path}", self.descriptor.id);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverError> {
        /* Leave the hardware in a safe state before dropping the port. */
        if let Some(engine) = self.engine.as_mut() {
            if engine.state().is_armed() {
                let _ = engine.disarm().await;
            }
        }
        self.engine = None;
        debug!("[{}] disconnected", self.descriptor.id);
        Ok(())
    }

    async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
        let (state, plan) = match self.engine.as_ref() {
            Some(engine) => (format!("{:?}", engine.state()), engine.plan()),
            None => ("Disconnected".into(), None),
        };
        Ok(json!({
            "name": self.entry.name,
            "capabilities": ["glitch", "logic_analyzer"],
            "clock_period_ps": self.timer.period_ps(),
            "state": state,
            "width_cycles": plan.map(|p| p.width_cycles),
            "offset_cycles": plan.map(|p| p.offset_cycles),
        }))
    }

    fn as_glitch(&mut self) -> Option<&mut dyn Glitch> {
        Some(self)
    }
}

#[async_trait]
impl Glitch for BoltDriver {
    async fn configure_glitch(&mut self, config: &GlitchConfig) -> Result<(), DriverError> {
        let result = self.engine_mut()?.configure(config).await;
        let plan = result.map_err(|e| self.note_failure(e))?;
        debug!(
            "[{}] glitch: width {} cycles, offset {} cycles",
            self.descriptor.id, plan.width_cycles, plan.offset_cycles
        );
        Ok(())
    }

    async fn arm(&mut self) -> Result<(), DriverError> {
        let result = self.engine_mut()?.arm().await;
        result.map_err(|e| self.note_failure(e))
    }

    async fn trigger(&mut self) -> Result<(), DriverError> {
        let result = self.engine_mut()?.trigger().await;
        result.map_err(|e| self.note_failure(e))
    }

    async fn disarm(&mut self) -> Result<(), DriverError> {
        let result = self.engine_mut()?.disarm().await;
        result.map_err(|e| self.note_failure(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Glitch, SweepParams};
    use crate::proto::glitch::SweepResult;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    const BOLT_PERIOD_PS: u64 = 8300;

    /* Device double: acks every line and records it. */
    fn fake_api(io: DuplexStream, expected_lines: usize) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(io);
            let mut seen = Vec::new();
            for _ in 0..expected_lines {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                seen.push(line.trim().to_string());
                reader.get_mut().write_all(b"ok\r\n").await.unwrap();
            }
            seen
        })
    }

    fn engine(io: DuplexStream) -> GlitchEngine<DuplexStream> {
        GlitchEngine::new(io, GlitchTimer::new(BOLT_PERIOD_PS))
    }

    #[tokio::test]
    async fn configure_sends_cycle_counts() {
        let (far, near) = tokio::io::duplex(1024);
        let device = fake_api(far, 2);
        let mut engine = engine(near);

        let config = GlitchConfig { width_ns: 100, offset_ns: 100, ..GlitchConfig::default() };
        let plan = engine.configure(&config).await.unwrap();
        assert_eq!(plan.width_cycles, 13);
        assert_eq!(plan.offset_cycles, 12);
        assert_eq!(engine.state(), ArmState::Configured);

        let lines = device.await.unwrap();
        assert_eq!(lines, vec!["set glitch.repeat 13", "set glitch.ext_offset 12"]);
    }

    #[tokio::test]
    async fn trigger_requires_configuration() {
        let (_far, near) = tokio::io::duplex(64);
        let mut engine = engine(near);
        let err = engine.trigger().await.unwrap_err();
        assert!(matches!(err, DriverError::Device(_)));
    }

    #[tokio::test]
    async fn arm_requires_trigger_channel() {
        let (far, near) = tokio::io::duplex(1024);
        let device = fake_api(far, 2);
        let mut engine = engine(near);

        engine.configure(&GlitchConfig::default()).await.unwrap();
        let err = engine.arm().await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidConfig(_)));
        device.await.unwrap();
    }

    #[tokio::test]
    async fn arm_trigger_disarm_flow() {
        let (far, near) = tokio::io::duplex(1024);
        let device = fake_api(far, 4);
        let mut engine = engine(near);

        let config = GlitchConfig {
            trigger_channel: Some(3),
            trigger_edge: TriggerEdge::Rising,
            ..GlitchConfig::default()
        };
        engine.configure(&config).await.unwrap();
        engine.arm().await.unwrap();
        assert!(engine.state().is_armed());

        engine.trigger().await.unwrap();
        assert_eq!(engine.state(), ArmState::Configured);

        let lines = device.await.unwrap();
        assert_eq!(lines[2], "arm 3 rising");
        assert_eq!(lines[3], "trigger");
    }

    #[tokio::test]
    async fn device_err_reply_keeps_state() {
        let (far, near) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut reader = BufReader::new(far);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            reader.get_mut().write_all(b"err voltage rail fault\r\n").await.unwrap();
        });
        let mut engine = engine(near);

        let err = engine.configure(&GlitchConfig::default()).await.unwrap_err();
        match err {
            DriverError::Device(msg) => assert_eq!(msg, "voltage rail fault"),
            other => panic!("expected Device, got {other:?}"),
        }
        assert_eq!(engine.state(), ArmState::Idle);
    }

    /* Sweep math is shared through the Glitch trait; count the triggers
     * a full grid produces. */
    struct CountingGlitch {
        timer: GlitchTimer,
        configured_cycles: Vec<u64>,
        triggers: u32,
    }

    #[async_trait]
    impl Glitch for CountingGlitch {
        async fn configure_glitch(&mut self, config: &GlitchConfig) -> Result<(), DriverError> {
            let plan = self.timer.plan(config)?;
            self.configured_cycles.push(plan.width_cycles);
            Ok(())
        }
        async fn arm(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
        async fn trigger(&mut self) -> Result<(), DriverError> {
            self.triggers += 1;
            Ok(())
        }
        async fn disarm(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_covers_full_grid() {
        let mut glitch = CountingGlitch {
            timer: GlitchTimer::new(BOLT_PERIOD_PS),
            configured_cycles: Vec::new(),
            triggers: 0,
        };

        let params = SweepParams {
            width_range: (100, 200),
            width_step: 50,
            offset_range: (0, 100),
            offset_step: 100,
            attempts: 2,
        };
        let mut observed = Vec::new();
        let mut observer = |config: &GlitchConfig, attempt: u32| {
            observed.push((config.width_ns, attempt));
            None
        };
        let results: Vec<SweepResult> = glitch.sweep(&params, &mut observer).await.unwrap();

        /* 3 widths x 2 offsets x 2 attempts */
        assert_eq!(results.len(), 12);
        assert_eq!(glitch.triggers, 12);
        assert_eq!(observed.len(), 12);

        let widths: Vec<u64> = results.iter().map(|r| r.width_ns).collect();
        assert!(widths.iter().all(|w| [100, 150, 200].contains(w)));
        let offsets: Vec<u64> = results.iter().map(|r| r.offset_ns).collect();
        assert!(offsets.iter().all(|o| [0, 100].contains(o)));

        /* First grid point is 100 ns: ceil(100 / 8.3) = 13 cycles. */
        assert_eq!(glitch.configured_cycles[0], 13);
        assert_eq!(glitch.configured_cycles.len(), 6);
    }
}
