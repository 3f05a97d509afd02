/* SUMP logic-analyzer protocol client. Drives OLS/SUMP-compatible samplers
 * over a plain serial byte stream: single-byte commands, 5-byte long
 * commands, and a raw sample payload in device-native packing. */

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

/* Protocol commands */
const CMD_RESET: u8 = 0x00;
const CMD_RUN: u8 = 0x01;
const CMD_ID: u8 = 0x02;
const CMD_METADATA: u8 = 0x11;
const CMD_SET_DIVIDER: u8 = 0x80;
const CMD_SET_READ_DELAY_COUNT: u8 = 0x81;
const CMD_SET_FLAGS: u8 = 0x82;
const CMD_SET_TRIGGER_MASK: u8 = 0xC0;
const CMD_SET_TRIGGER_VALUE: u8 = 0xC1;
const CMD_SET_TRIGGER_CONFIG: u8 = 0xC2;

/* Flag bits for CMD_SET_FLAGS */
const FLAG_DEMUX: u32 = 0x01;
const FLAG_GROUP1_DISABLE: u32 = 0x08;
const FLAG_GROUP2_DISABLE: u32 = 0x10;
const FLAG_GROUP3_DISABLE: u32 = 0x20;

/* Trigger-config bit 3: start capture on trigger match. */
const TRIG_CONFIG_START: u32 = 0x08;

/* Expected CMD_ID reply. */
const SUMP_ID: &[u8; 4] = b"1ALS";

const IDENTIFY_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SumpError {
    #[error("Device did not answer the SUMP identify command")]
    NotResponding,

    #[error("Capture produced no data before the deadline")]
    NoData,

    #[error("Invalid capture config: {0}")]
    InvalidConfig(String),

    #[error("Transport I/O: {0}")]
    Transport(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SumpConfig {
    pub sample_rate_hz: u32,
    pub sample_count: u32,
    /* 8, 16, 24 or 32 */
    pub channels: u8,
    pub trigger_mask: u32,
    pub trigger_value: u32,
    pub trigger_delay_samples: u32,
    pub demux: bool,
    pub base_clock_hz: u32,
}

impl Default for SumpConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1_000_000,
            sample_count: 8192,
            channels: 8,
            trigger_mask: 0,
            trigger_value: 0,
            trigger_delay_samples: 0,
            demux: false,
            base_clock_hz: 100_000_000,
        }
    }
}

impl SumpConfig {
    fn validate(&self) -> Result<(), SumpError> {
        if ![8, 16, 24, 32].contains(&self.channels) {
            return Err(SumpError::InvalidConfig(format!(
                "channel count {} not in {{8, 16, 24, 32}}",
                self.channels
            )));
        }
        if self.sample_count == 0 {
            return Err(SumpError::InvalidConfig("sample count must be non-zero".into()));
        }
        if self.sample_rate_hz == 0 {
            return Err(SumpError::InvalidConfig("sample rate must be non-zero".into()));
        }
        Ok(())
    }

    /* divider = base/rate - 1, clamped to the 24-bit register. A rate
     * above the base clock clamps to 0 (fastest achievable period). */
    pub fn divider(&self) -> u32 {
        let raw = (self.base_clock_hz / self.sample_rate_hz) as i64 - 1;
        raw.clamp(0, 0xFF_FFFF) as u32
    }

    /* Devices count samples in units of four. */
    pub fn read_count(&self) -> u16 {
        ((self.sample_count / 4).saturating_sub(1)).min(0xFFFF) as u16
    }

    pub fn delay_count(&self) -> u16 {
        (self.trigger_delay_samples / 4).min(0xFFFF) as u16
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.channels as usize).div_ceil(8)
    }

    fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.demux {
            flags |= FLAG_DEMUX;
        }
        /* Disable the channel groups above the configured width. */
        if self.channels <= 8 {
            flags |= FLAG_GROUP1_DISABLE | FLAG_GROUP2_DISABLE | FLAG_GROUP3_DISABLE;
        } else if self.channels <= 16 {
            flags |= FLAG_GROUP2_DISABLE | FLAG_GROUP3_DISABLE;
        } else if self.channels <= 24 {
            flags |= FLAG_GROUP3_DISABLE;
        }
        flags
    }
}

/* Captured logic data. `samples` holds one chronological bit vector per
 * channel. */
#[derive(Debug, Clone)]
pub struct SumpCapture {
    pub channel_count: u8,
    pub sample_rate_hz: u32,
    pub samples: Vec<Vec<u8>>,
    pub trigger_position: usize,
    pub raw: Vec<u8>,
}

/* Extended-protocol device metadata (command 0x11). */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SumpMetadata {
    pub device_name: Option<String>,
    pub firmware_version: Option<String>,
    pub protocol_version: Option<String>,
    pub probe_count: Option<u32>,
    pub sample_memory: Option<u32>,
    pub dynamic_memory: Option<u32>,
    pub max_sample_rate: Option<u32>,
    pub protocol_flags: Option<u32>,
}

pub struct SumpClient<T> {
    io: T,
    config: SumpConfig,
}

impl<T: AsyncRead + AsyncWrite + Unpin> SumpClient<T> {
    pub fn new(io: T) -> Self {
        Self {
            io,
            config: SumpConfig::default(),
        }
    }

    pub fn config(&self) -> &SumpConfig {
        &self.config
    }

    async fn send_short(&mut self, cmd: u8) -> Result<(), SumpError> {
        trace!("SUMP TX: {cmd:02X}");
        self.io.write_all(&[cmd]).await.map_err(SumpError::Transport)?;
        self.io.flush().await.map_err(SumpError::Transport)
    }

    async fn send_long(&mut self, cmd: u8, data: [u8; 4]) -> Result<(), SumpError> {
        trace!("SUMP TX: {cmd:02X} {data:02x?}");
        let mut packet = [0u8; 5];
        packet[0] = cmd;
        packet[1..].copy_from_slice(&data);
        self.io.write_all(&packet).await.map_err(SumpError::Transport)?;
        self.io.flush().await.map_err(SumpError::Transport)
    }

    /* Drain any pending input so the next reply starts clean. */
    async fn drain_input(&mut self) {
        let mut buf = [0u8; 256];
        while let Ok(Ok(n)) =
            tokio::time::timeout(Duration::from_millis(20), self.io.read(&mut buf)).await
        {
            if n == 0 {
                break;
            }
        }
    }

    /* Reset the device: five reset bytes, then the input flushed. */
    pub async fn reset(&mut self) -> Result<(), SumpError> {
        for _ in 0..5 {
            self.send_short(CMD_RESET).await?;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.drain_input().await;
        Ok(())
    }

    /* Identify: expects exactly `1ALS` within 500 ms. */
    pub async fn identify(&mut self) -> Result<String, SumpError> {
        self.drain_input().await;
        self.send_short(CMD_ID).await?;

        let mut reply = [0u8; 4];
        let deadline = tokio::time::Instant::now() + IDENTIFY_TIMEOUT;
        let mut filled = 0;
        while filled < 4 {
            let n = match tokio::time::timeout_at(deadline, self.io.read(&mut reply[filled..])).await
            {
                Err(_) => return Err(SumpError::NotResponding),
                Ok(Ok(0)) => return Err(SumpError::NotResponding),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(SumpError::Transport(e)),
            };
            filled += n;
        }

        if &reply != SUMP_ID {
            warn!("Unexpected SUMP id reply: {reply:02x?}");
        }
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /* Request the extended-protocol metadata token list. */
    pub async fn get_metadata(&mut self) -> Result<SumpMetadata, SumpError> {
        self.drain_input().await;
        self.send_short(CMD_METADATA).await?;

        let mut meta = SumpMetadata::default();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);

        loop {
            let token = match self.read_exact_until(1, deadline).await? {
                Some(bytes) => bytes[0],
                None => break,
            };

            /* Token ranges: 0x00 ends the list, 0x01..=0x1F are
             * NUL-terminated strings, 0x20..=0x3F are 4-byte big-endian
             * numbers. */
            match token {
                0x00 => break,
                0x01..=0x1F => {
                    let mut s = Vec::new();
                    loop {
                        match self.read_exact_until(1, deadline).await? {
                            Some(b) if b[0] != 0 => s.push(b[0]),
                            _ => break,
                        }
                    }
                    let s = String::from_utf8_lossy(&s).into_owned();
                    match token {
                        0x01 => meta.device_name = Some(s),
                        0x02 => meta.firmware_version = Some(s),
                        0x03 => meta.protocol_version = Some(s),
                        other => debug!("Unknown SUMP string token {other:02x}"),
                    }
                }
                0x20..=0x3F => {
                    let Some(bytes) = self.read_exact_until(4, deadline).await? else {
                        break;
                    };
                    let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    match token {
                        0x20 => meta.probe_count = Some(value),
                        0x21 => meta.sample_memory = Some(value),
                        0x22 => meta.dynamic_memory = Some(value),
                        0x23 => meta.max_sample_rate = Some(value),
                        0x24 => meta.protocol_flags = Some(value),
                        other => debug!("Unknown SUMP numeric token {other:02x}"),
                    }
                }
                other => {
                    /* Unknown token class: payload size is unknowable,
                     * so the rest of the stream cannot be realigned. */
                    debug!("Unknown SUMP metadata token {other:02x}, stopping");
                    break;
                }
            }
        }

        Ok(meta)
    }

    async fn read_exact_until(
        &mut self,
        want: usize,
        deadline: tokio::time::Instant,
    ) -> Result<Option<Vec<u8>>, SumpError> {
        let mut out = vec![0u8; want];
        let mut filled = 0;
        while filled < want {
            let n = match tokio::time::timeout_at(deadline, self.io.read(&mut out[filled..])).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => return Ok(None),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(SumpError::Transport(e)),
            };
            filled += n;
        }
        Ok(Some(out))
    }

    /* Program divider, read/delay counts, flags and the stage-0 trigger. */
    pub async fn configure(&mut self, config: SumpConfig) -> Result<(), SumpError> {
        config.validate()?;
        self.config = config;

        let divider = config.divider();
        let read_count = config.read_count();
        let delay_count = config.delay_count();
        debug!(
            "SUMP configure: rate={} Hz, samples={}, divider={}, read_count={}, delay_count={}",
            config.sample_rate_hz, config.sample_count, divider, read_count, delay_count
        );

        /* 24-bit divider, little-endian, high byte zero. */
        let d = divider.to_le_bytes();
        self.send_long(CMD_SET_DIVIDER, [d[0], d[1], d[2], 0]).await?;

        let rc = read_count.to_le_bytes();
        let dc = delay_count.to_le_bytes();
        self.send_long(CMD_SET_READ_DELAY_COUNT, [rc[0], rc[1], dc[0], dc[1]])
            .await?;

        self.send_long(CMD_SET_FLAGS, config.flags().to_le_bytes()).await?;

        if config.trigger_mask != 0 {
            self.send_long(CMD_SET_TRIGGER_MASK, config.trigger_mask.to_le_bytes())
                .await?;
            self.send_long(CMD_SET_TRIGGER_VALUE, config.trigger_value.to_le_bytes())
                .await?;
            self.send_long(CMD_SET_TRIGGER_CONFIG, TRIG_CONFIG_START.to_le_bytes())
                .await?;
        } else {
            /* No trigger: immediate capture. */
            self.send_long(CMD_SET_TRIGGER_CONFIG, 0u32.to_le_bytes()).await?;
        }

        Ok(())
    }

    /* Run a capture and collect sample bytes until the deadline.
     *
     * A deadline with at least one complete sample returns a truncated
     * capture; a deadline with nothing at all is `NoData`. */
    pub async fn capture(&mut self, timeout: Duration) -> Result<SumpCapture, SumpError> {
        let bytes_per_sample = self.config.bytes_per_sample();
        let expected = self.config.sample_count as usize * bytes_per_sample;

        self.drain_input().await;
        self.send_short(CMD_RUN).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut raw = Vec::with_capacity(expected);
        let mut buf = [0u8; 4096];

        while raw.len() < expected {
            let n = match tokio::time::timeout_at(deadline, self.io.read(&mut buf)).await {
                Err(_) => {
                    debug!("SUMP capture deadline: {}/{} bytes", raw.len(), expected);
                    break;
                }
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(SumpError::Transport(e)),
            };
            raw.extend_from_slice(&buf[..n.min(expected - raw.len())]);
        }

        if raw.len() < bytes_per_sample {
            return Err(SumpError::NoData);
        }

        let truncated = raw.len() < expected;
        Ok(parse_capture(&self.config, raw, truncated))
    }

    /* Abort an in-flight capture by resetting the sampler. */
    pub async fn abort(&mut self) -> Result<(), SumpError> {
        self.reset().await
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

/* Parse raw device bytes into per-channel bit vectors.
 *
 * Devices emit newest-first, LSB-first; samples are reversed back into
 * chronological order and demultiplexed by bit position. The trigger
 * position is found by re-scanning for the mask/value pair and left at
 * zero when no match exists or the capture was truncated. */
fn parse_capture(config: &SumpConfig, raw: Vec<u8>, truncated: bool) -> SumpCapture {
    let channels = config.channels as usize;
    let bytes_per_sample = config.bytes_per_sample();
    let sample_count = raw.len() / bytes_per_sample;

    let mut values = Vec::with_capacity(sample_count);
    for i in (0..sample_count).rev() {
        let offset = i * bytes_per_sample;
        let mut sample: u32 = 0;
        for (j, b) in raw[offset..offset + bytes_per_sample].iter().enumerate() {
            sample |= (*b as u32) << (j * 8);
        }
        values.push(sample);
    }

    let mut samples = vec![Vec::with_capacity(sample_count); channels];
    for value in &values {
        for (ch, lane) in samples.iter_mut().enumerate() {
            lane.push(((value >> ch) & 1) as u8);
        }
    }

    let mut trigger_position = 0;
    if config.trigger_mask != 0 && !truncated {
        if let Some(pos) = values
            .iter()
            .position(|v| v & config.trigger_mask == config.trigger_value)
        {
            trigger_position = pos;
        }
    }

    SumpCapture {
        channel_count: config.channels,
        sample_rate_hz: config.sample_rate_hz,
        samples,
        trigger_position,
        raw,
    }
}
