/* BPIO2 client: typed request/response over the COBS frame codec for
 * Bus Pirate-class firmware. Every request rides in a RequestPacket with the
 * protocol major version and the minimum minor version this client accepts. */

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::framing::{FrameCodec, FrameError};
use crate::proto::bpio_fb as fb;

pub const PROTOCOL_VERSION_MAJOR: u8 = 2;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/* status() calls inside this window return the cached snapshot. */
pub const STATUS_DEBOUNCE: Duration = Duration::from_millis(50);

/* Console commands for the one-shot binary-mode bootstrap. */
pub const BINMODE_COMMAND: &[u8] = b"binmode\r\n";
pub const BINMODE_SELECT_SUMP: &[u8] = b"1\r\n";
pub const BINMODE_SELECT_BPIO2: &[u8] = b"2\r\n";

#[derive(Debug, Error)]
pub enum BpioError {
    #[error("Unexpected response type {got}, expected {expected}")]
    TypeMismatch { expected: u8, got: u8 },

    #[error("Device error: {0}")]
    Device(String),

    #[error("Malformed response packet")]
    Malformed,

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/* Full parse of a StatusResponse. */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub version_flatbuffers_major: u16,
    pub version_flatbuffers_minor: u16,
    pub version_hardware_major: u16,
    pub version_hardware_minor: u16,
    pub version_firmware_major: u16,
    pub version_firmware_minor: u16,
    pub firmware_git_hash: String,
    pub firmware_date: String,
    pub modes_available: Vec<String>,
    pub mode_current: Option<String>,
    pub mode_pin_labels: Vec<String>,
    pub mode_bitorder_msb: bool,
    pub mode_max_packet_size: u16,
    pub mode_max_write: u16,
    pub mode_max_read: u16,
    pub psu_enabled: bool,
    pub psu_set_mv: u32,
    pub psu_set_ma: u32,
    pub psu_measured_mv: u32,
    pub psu_measured_ma: u32,
    pub psu_current_error: bool,
    pub pullup_enabled: bool,
    pub adc_mv: Vec<u32>,
    pub io_direction: u8,
    pub io_value: u8,
    pub disk_size_mb: u32,
    pub disk_used_mb: u32,
    pub led_count: u8,
}

/* Mode parameters for a ConfigurationRequest. Absent fields are not
 * sent, so firmware leaves the corresponding setting as-is. */
#[derive(Debug, Clone, Default)]
pub struct ModeOptions {
    pub speed: Option<u32>,
    pub data_bits: Option<u8>,
    pub parity: Option<bool>,
    pub stop_bits: Option<u8>,
    pub flow_control: Option<bool>,
    pub signal_inversion: Option<bool>,
    pub clock_stretch: Option<bool>,
    pub clock_polarity: Option<bool>,
    pub clock_phase: Option<bool>,
    pub chip_select_idle: Option<bool>,
    pub submode: Option<String>,
}

/* Default speed when a mode is configured without one. */
const DEFAULT_MODE_SPEED: u32 = 20_000;

#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    pub mode: Option<String>,
    pub mode_configuration: Option<ModeOptions>,
    pub mode_bitorder_msb: Option<bool>,
    pub mode_bitorder_lsb: Option<bool>,
    pub psu_disable: Option<bool>,
    pub psu_enable: Option<bool>,
    pub psu_set_mv: Option<u32>,
    pub psu_set_ma: Option<u32>,
    pub pullup_disable: Option<bool>,
    pub pullup_enable: Option<bool>,
    pub io_direction_mask: Option<u8>,
    pub io_direction: Option<u8>,
    pub io_value_mask: Option<u8>,
    pub io_value: Option<u8>,
    pub led_resume: Option<bool>,
    pub led_color: Option<Vec<u32>>,
    pub print_string: Option<String>,
    pub hardware_bootloader: Option<bool>,
    pub hardware_reset: Option<bool>,
    pub hardware_selftest: Option<bool>,
}

/* One start/write/read/stop sequence for a DataRequest. */
#[derive(Debug, Clone, Default)]
pub struct DataOptions {
    pub start_main: bool,
    pub start_alt: bool,
    pub data_write: Option<Vec<u8>>,
    pub bytes_read: u16,
    pub stop_main: bool,
    pub stop_alt: bool,
}

/* ------------------------------------------------------------------ */
/* Request building                                                   */
/* ------------------------------------------------------------------ */

pub fn build_status_request(min_minor: u8) -> Vec<u8> {
    let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(128);
    let query = fbb.create_vector::<u8>(&[fb::status_query::ALL]);
    let status = fb::StatusRequest::create(&mut fbb, &fb::StatusRequestArgs { query: Some(query) });
    finish_request(
        fbb,
        min_minor,
        fb::RequestPacketContents::StatusRequest,
        status.as_union_value(),
    )
}

pub fn build_configure_request(min_minor: u8, opts: &ConfigureOptions) -> Vec<u8> {
    let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(512);

    let mode = opts.mode.as_deref().map(|m| fbb.create_string(m));
    let print_string = opts.print_string.as_deref().map(|s| fbb.create_string(s));
    let led_color = opts.led_color.as_deref().map(|c| fbb.create_vector(c));

    let mode_configuration = opts.mode_configuration.as_ref().map(|mc| {
        let submode = mc.submode.as_deref().map(|s| fbb.create_string(s));
        fb::ModeConfiguration::create(
            &mut fbb,
            &fb::ModeConfigurationArgs {
                speed: Some(mc.speed.unwrap_or(DEFAULT_MODE_SPEED)),
                data_bits: mc.data_bits,
                parity: mc.parity,
                stop_bits: mc.stop_bits,
                flow_control: mc.flow_control,
                signal_inversion: mc.signal_inversion,
                clock_stretch: mc.clock_stretch,
                clock_polarity: mc.clock_polarity,
                clock_phase: mc.clock_phase,
                chip_select_idle: mc.chip_select_idle,
                submode,
                tx_modulation: None,
                rx_sensor: None,
            },
        )
    });

    let request = fb::ConfigurationRequest::create(
        &mut fbb,
        &fb::ConfigurationRequestArgs {
            mode,
            mode_configuration,
            mode_bitorder_msb: opts.mode_bitorder_msb,
            mode_bitorder_lsb: opts.mode_bitorder_lsb,
            psu_disable: opts.psu_disable,
            psu_enable: opts.psu_enable,
            psu_set_mv: opts.psu_set_mv,
            psu_set_ma: opts.psu_set_ma,
            pullup_disable: opts.pullup_disable,
            pullup_enable: opts.pullup_enable,
            io_direction_mask: opts.io_direction_mask,
            io_direction: opts.io_direction,
            io_value_mask: opts.io_value_mask,
            io_value: opts.io_value,
            led_resume: opts.led_resume,
            led_color,
            print_string,
            hardware_bootloader: opts.hardware_bootloader,
            hardware_reset: opts.hardware_reset,
            hardware_selftest: opts.hardware_selftest,
        },
    );
    finish_request(
        fbb,
        min_minor,
        fb::RequestPacketContents::ConfigurationRequest,
        request.as_union_value(),
    )
}

pub fn build_data_request(min_minor: u8, opts: &DataOptions) -> Vec<u8> {
    let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(512);
    let data_write = opts
        .data_write
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(|d| fbb.create_vector(d));

    let request = fb::DataRequest::create(
        &mut fbb,
        &fb::DataRequestArgs {
            start_main: opts.start_main.then_some(true),
            start_alt: opts.start_alt.then_some(true),
            data_write,
            bytes_read: (opts.bytes_read > 0).then_some(opts.bytes_read),
            stop_main: opts.stop_main.then_some(true),
            stop_alt: opts.stop_alt.then_some(true),
        },
    );
    finish_request(
        fbb,
        min_minor,
        fb::RequestPacketContents::DataRequest,
        request.as_union_value(),
    )
}

fn finish_request(
    mut fbb: flatbuffers::FlatBufferBuilder,
    min_minor: u8,
    contents_type: fb::RequestPacketContents,
    contents: flatbuffers::WIPOffset<flatbuffers::UnionWIPOffset>,
) -> Vec<u8> {
    let packet = fb::RequestPacket::create(
        &mut fbb,
        &fb::RequestPacketArgs {
            version_major: PROTOCOL_VERSION_MAJOR,
            minimum_version_minor: min_minor,
            contents_type,
            contents: Some(contents),
        },
    );
    fbb.finish(packet, None);
    fbb.finished_data().to_vec()
}

/* ------------------------------------------------------------------ */
/* Client                                                             */
/* ------------------------------------------------------------------ */

pub struct BpioClient<T> {
    codec: FrameCodec<T>,
    min_minor: u8,
    timeout: Duration,
    status_cache: Option<(tokio::time::Instant, StatusSnapshot)>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> BpioClient<T> {
    pub fn new(io: T) -> Self {
        Self::with_min_minor(io, 0)
    }

    /* `min_minor` is advertised in every request so firmware can reject
     * clients older than it supports. */
    pub fn with_min_minor(io: T, min_minor: u8) -> Self {
        Self {
            codec: FrameCodec::new(io),
            min_minor,
            timeout: REQUEST_TIMEOUT,
            status_cache: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn is_poisoned(&self) -> bool {
        self.codec.is_poisoned()
    }

    /* Raw escape hatch: one framed exchange, caller supplies the bytes. */
    pub async fn transact_raw(&mut self, request: &[u8], deadline: Duration) -> Result<Vec<u8>, BpioError> {
        Ok(self.codec.transact(request, deadline).await?)
    }

    /* Query device status. Calls within the debounce window return the
     * cached snapshot so poll-driven UIs do not hammer the wire. */
    pub async fn status(&mut self) -> Result<StatusSnapshot, BpioError> {
        if let Some((at, cached)) = &self.status_cache {
            if at.elapsed() < STATUS_DEBOUNCE {
                trace!("status() debounced, returning cached snapshot");
                return Ok(cached.clone());
            }
        }

        let request = build_status_request(self.min_minor);
        let response = self.codec.transact(&request, self.timeout).await?;
        let snapshot = parse_status_response(&response)?;
        self.status_cache = Some((tokio::time::Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }

    /* Drop the cached status (after mode changes etc.). */
    pub fn invalidate_status(&mut self) {
        self.status_cache = None;
    }

    /* Apply mode / PSU / pull-up / IO configuration. */
    pub async fn configure(&mut self, opts: &ConfigureOptions) -> Result<(), BpioError> {
        let request = build_configure_request(self.min_minor, opts);
        let response = self.codec.transact(&request, self.timeout).await?;
        self.status_cache = None;

        let packet = parse_response_packet(&response)?;
        let config = expect_contents(
            packet.contents_as_configuration_response(),
            fb::ResponsePacketContents::ConfigurationResponse,
            packet.contents_type(),
        )?;
        if let Some(err) = config.error() {
            debug!("Configuration rejected: {err}");
            return Err(BpioError::Device(err.to_string()));
        }
        Ok(())
    }

    /* One start/write/read/stop round trip. Returns the read payload,
     * or None when the response carried no data. */
    pub async fn data(&mut self, opts: &DataOptions) -> Result<Option<Vec<u8>>, BpioError> {
        let request = build_data_request(self.min_minor, opts);
        let response = self.codec.transact(&request, self.timeout).await?;

        let packet = parse_response_packet(&response)?;
        let data = expect_contents(
            packet.contents_as_data_response(),
            fb::ResponsePacketContents::DataResponse,
            packet.contents_type(),
        )?;
        if let Some(err) = data.error() {
            debug!("Data request rejected: {err}");
            return Err(BpioError::Device(err.to_string()));
        }
        Ok(data
            .data_read()
            .filter(|d| !d.is_empty())
            .map(|d| d.bytes().to_vec()))
    }

    pub fn into_inner(self) -> T {
        self.codec.into_inner()
    }
}

fn parse_response_packet(buf: &[u8]) -> Result<fb::ResponsePacket<'_>, BpioError> {
    let packet = fb::root_as_response_packet(buf).map_err(|_| BpioError::Malformed)?;
    if let Some(err) = packet.error() {
        return Err(BpioError::Device(err.to_string()));
    }
    Ok(packet)
}

fn expect_contents<C>(
    contents: Option<C>,
    expected: fb::ResponsePacketContents,
    got: fb::ResponsePacketContents,
) -> Result<C, BpioError> {
    contents.ok_or(BpioError::TypeMismatch {
        expected: expected.0,
        got: got.0,
    })
}

fn parse_status_response(buf: &[u8]) -> Result<StatusSnapshot, BpioError> {
    let packet = parse_response_packet(buf)?;
    let status = expect_contents(
        packet.contents_as_status_response(),
        fb::ResponsePacketContents::StatusResponse,
        packet.contents_type(),
    )?;
    if let Some(err) = status.error() {
        return Err(BpioError::Device(err.to_string()));
    }

    Ok(StatusSnapshot {
        version_flatbuffers_major: status.version_flatbuffers_major(),
        version_flatbuffers_minor: status.version_flatbuffers_minor(),
        version_hardware_major: status.version_hardware_major(),
        version_hardware_minor: status.version_hardware_minor(),
        version_firmware_major: status.version_firmware_major(),
        version_firmware_minor: status.version_firmware_minor(),
        firmware_git_hash: status.version_firmware_git_hash().unwrap_or_default().to_string(),
        firmware_date: status.version_firmware_date().unwrap_or_default().to_string(),
        modes_available: status
            .modes_available()
            .map(|v| v.iter().map(str::to_string).collect())
            .unwrap_or_default(),
        mode_current: status.mode_current().map(str::to_string),
        mode_pin_labels: status
            .mode_pin_labels()
            .map(|v| v.iter().map(str::to_string).collect())
            .unwrap_or_default(),
        mode_bitorder_msb: status.mode_bitorder_msb(),
        mode_max_packet_size: status.mode_max_packet_size(),
        mode_max_write: status.mode_max_write(),
        mode_max_read: status.mode_max_read(),
        psu_enabled: status.psu_enabled(),
        psu_set_mv: status.psu_set_mv(),
        psu_set_ma: status.psu_set_ma(),
        psu_measured_mv: status.psu_measured_mv(),
        psu_measured_ma: status.psu_measured_ma(),
        psu_current_error: status.psu_current_error(),
        pullup_enabled: status.pullup_enabled(),
        adc_mv: status
            .adc_mv()
            .map(|v| v.iter().collect())
            .unwrap_or_default(),
        io_direction: status.io_direction(),
        io_value: status.io_value(),
        disk_size_mb: status.disk_size_mb(),
        disk_used_mb: status.disk_used_mb(),
        led_count: status.led_count(),
    })
}

/* ------------------------------------------------------------------ */
/* Binary-mode bootstrap                                              */
/* ------------------------------------------------------------------ */

/* Drive a freshly-powered device from the line-oriented console into a
 * binary mode. Writes `binmode`, waits for the menu, writes the mode
 * selection, then waits for the switch. The caller closes the console
 * endpoint afterwards; failure is reported, never retried here. */
pub async fn enter_binary_mode<T>(console: &mut T, selection: &[u8]) -> Result<(), std::io::Error>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    console.write_all(BINMODE_COMMAND).await?;
    console.flush().await?;
    drain_console(console, Duration::from_millis(500)).await;

    console.write_all(selection).await?;
    console.flush().await?;
    drain_console(console, Duration::from_millis(500)).await;

    /* Give the firmware time to tear down the console and bring the
     * binary endpoint up. */
    tokio::time::sleep(Duration::from_millis(1000)).await;
    Ok(())
}

async fn drain_console<T: AsyncRead + Unpin>(console: &mut T, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    let mut buf = [0u8; 256];
    while let Ok(Ok(n)) = tokio::time::timeout_at(deadline, console.read(&mut buf)).await {
        if n == 0 {
            break;
        }
        trace!("console: {}", String::from_utf8_lossy(&buf[..n]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::FrameCodec;

    /* Minimal firmware double: answers one framed request. */
    async fn serve_one(
        io: tokio::io::DuplexStream,
        reply: impl FnOnce(&[u8]) -> Vec<u8> + Send + 'static,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut codec = FrameCodec::new(io);
            let request = codec.recv(Duration::from_secs(5)).await.unwrap();
            let response = reply(&request);
            codec.send(&response).await.unwrap();
        })
    }

    fn status_reply_hiz() -> Vec<u8> {
        let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(512);
        let hash = fbb.create_string("deadbee");
        let date = fbb.create_string("2025-05-01");
        let mode = fbb.create_string("HiZ");
        let adc = fbb.create_vector::<u32>(&[0; 8]);
        let status = fb::StatusResponse::create(
            &mut fbb,
            &fb::StatusResponseArgs {
                version_flatbuffers_major: 2,
                version_flatbuffers_minor: 3,
                version_hardware_major: 5,
                version_hardware_minor: 0,
                version_firmware_major: 2,
                version_firmware_minor: 3,
                version_firmware_git_hash: Some(hash),
                version_firmware_date: Some(date),
                mode_current: Some(mode),
                psu_enabled: false,
                adc_mv: Some(adc),
                ..Default::default()
            },
        );
        let packet = fb::ResponsePacket::create(
            &mut fbb,
            &fb::ResponsePacketArgs {
                error: None,
                contents_type: fb::ResponsePacketContents::StatusResponse,
                contents: Some(status.as_union_value()),
            },
        );
        fbb.finish(packet, None);
        fbb.finished_data().to_vec()
    }

    #[tokio::test]
    async fn status_round_trip() {
        let (far, near) = tokio::io::duplex(4096);
        let device = serve_one(far, |request| {
            /* The request must be a well-formed versioned StatusRequest. */
            let packet = fb::root_as_request_packet(request).unwrap();
            assert_eq!(packet.version_major(), 2);
            let status = packet.contents_as_status_request().unwrap();
            assert_eq!(status.query().unwrap().get(0), fb::status_query::ALL);
            status_reply_hiz()
        })
        .await;

        let mut client = BpioClient::new(near);
        let snapshot = client.status().await.unwrap();
        assert_eq!(snapshot.version_firmware_major, 2);
        assert_eq!(snapshot.version_firmware_minor, 3);
        assert_eq!(snapshot.version_hardware_major, 5);
        assert_eq!(snapshot.mode_current.as_deref(), Some("HiZ"));
        assert!(!snapshot.psu_enabled);
        assert_eq!(snapshot.adc_mv, vec![0; 8]);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn status_is_debounced() {
        let (far, near) = tokio::io::duplex(4096);
        /* The device only answers once; a second wire request would hang. */
        let device = serve_one(far, |_| status_reply_hiz()).await;

        let mut client = BpioClient::new(near);
        let first = client.status().await.unwrap();
        let second = client.status().await.unwrap();
        assert_eq!(first, second);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn type_mismatch_detected() {
        let (far, near) = tokio::io::duplex(4096);
        let device = serve_one(far, |_| {
            /* Reply to the StatusRequest with a DataResponse. */
            let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(128);
            let data = fb::DataResponse::create(&mut fbb, &fb::DataResponseArgs::default());
            let packet = fb::ResponsePacket::create(
                &mut fbb,
                &fb::ResponsePacketArgs {
                    error: None,
                    contents_type: fb::ResponsePacketContents::DataResponse,
                    contents: Some(data.as_union_value()),
                },
            );
            fbb.finish(packet, None);
            fbb.finished_data().to_vec()
        })
        .await;

        let mut client = BpioClient::new(near);
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, BpioError::TypeMismatch { .. }));
        device.await.unwrap();
    }

    #[tokio::test]
    async fn root_error_string_surfaces_as_device_error() {
        let (far, near) = tokio::io::duplex(4096);
        let device = serve_one(far, |_| {
            let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(128);
            let msg = fbb.create_string("unsupported client version");
            let packet = fb::ResponsePacket::create(
                &mut fbb,
                &fb::ResponsePacketArgs {
                    error: Some(msg),
                    contents_type: fb::ResponsePacketContents::NONE,
                    contents: None,
                },
            );
            fbb.finish(packet, None);
            fbb.finished_data().to_vec()
        })
        .await;

        let mut client = BpioClient::new(near);
        let err = client.status().await.unwrap_err();
        match err {
            BpioError::Device(msg) => assert_eq!(msg, "unsupported client version"),
            other => panic!("expected Device error, got {other:?}"),
        }
        device.await.unwrap();
    }

    #[tokio::test]
    async fn data_round_trip_returns_read_bytes() {
        let (far, near) = tokio::io::duplex(4096);
        let device = serve_one(far, |request| {
            let packet = fb::root_as_request_packet(request).unwrap();
            let data = packet.contents_as_data_request().unwrap();
            assert!(data.start_main());
            assert_eq!(data.data_write().unwrap().bytes(), &[0x9F]);
            assert_eq!(data.bytes_read(), 3);
            assert!(data.stop_main());

            let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(128);
            let read = fbb.create_vector::<u8>(&[0xEF, 0x40, 0x16]);
            let resp = fb::DataResponse::create(
                &mut fbb,
                &fb::DataResponseArgs { error: None, data_read: Some(read) },
            );
            let packet = fb::ResponsePacket::create(
                &mut fbb,
                &fb::ResponsePacketArgs {
                    error: None,
                    contents_type: fb::ResponsePacketContents::DataResponse,
                    contents: Some(resp.as_union_value()),
                },
            );
            fbb.finish(packet, None);
            fbb.finished_data().to_vec()
        })
        .await;

        let mut client = BpioClient::new(near);
        let opts = DataOptions {
            start_main: true,
            data_write: Some(vec![0x9F]),
            bytes_read: 3,
            stop_main: true,
            ..Default::default()
        };
        let read = client.data(&opts).await.unwrap();
        assert_eq!(read, Some(vec![0xEF, 0x40, 0x16]));
        device.await.unwrap();
    }

    #[tokio::test]
    async fn write_only_data_returns_none() {
        let (far, near) = tokio::io::duplex(4096);
        let device = serve_one(far, |_| {
            let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(64);
            let resp = fb::DataResponse::create(&mut fbb, &fb::DataResponseArgs::default());
            let packet = fb::ResponsePacket::create(
                &mut fbb,
                &fb::ResponsePacketArgs {
                    error: None,
                    contents_type: fb::ResponsePacketContents::DataResponse,
                    contents: Some(resp.as_union_value()),
                },
            );
            fbb.finish(packet, None);
            fbb.finished_data().to_vec()
        })
        .await;

        let mut client = BpioClient::new(near);
        let opts = DataOptions {
            start_main: true,
            data_write: Some(vec![0x01, 0x02]),
            stop_main: true,
            ..Default::default()
        };
        assert_eq!(client.data(&opts).await.unwrap(), None);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn configure_builds_mode_request() {
        let (far, near) = tokio::io::duplex(4096);
        let device = serve_one(far, |request| {
            let packet = fb::root_as_request_packet(request).unwrap();
            let config = packet.contents_as_configuration_request().unwrap();
            assert_eq!(config.mode(), Some("spi"));
            let mc = config.mode_configuration().unwrap();
            assert_eq!(mc.speed(), 1_000_000);
            assert!(mc.chip_select_idle());

            let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(64);
            let resp =
                fb::ConfigurationResponse::create(&mut fbb, &fb::ConfigurationResponseArgs::default());
            let packet = fb::ResponsePacket::create(
                &mut fbb,
                &fb::ResponsePacketArgs {
                    error: None,
                    contents_type: fb::ResponsePacketContents::ConfigurationResponse,
                    contents: Some(resp.as_union_value()),
                },
            );
            fbb.finish(packet, None);
            fbb.finished_data().to_vec()
        })
        .await;

        let mut client = BpioClient::new(near);
        let opts = ConfigureOptions {
            mode: Some("spi".into()),
            mode_configuration: Some(ModeOptions {
                speed: Some(1_000_000),
                clock_polarity: Some(false),
                clock_phase: Some(false),
                chip_select_idle: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        client.configure(&opts).await.unwrap();
        device.await.unwrap();
    }
}
