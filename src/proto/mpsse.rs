/* FTDI MPSSE protocol engine: builds multi-protocol synchronous serial
 * command streams (SPI exchange, I2C primitives, pin control) and moves
 * them over the chip's bulk endpoints. The command builder is pure so the
 * byte streams are testable without hardware. */

use std::time::Duration;

use nusb::transfer::{ControlOut, ControlType, Recipient, RequestBuffer};
use thiserror::Error;
use tracing::{debug, trace};

/* MPSSE opcodes */
const CMD_WRITE_BYTES_NVE: u8 = 0x11; /* out on -ve edge, MSB first */
const CMD_READ_BYTES_PVE: u8 = 0x20; /* in on +ve edge, MSB first */
const CMD_EXCHANGE_BYTES: u8 = 0x31; /* out -ve / in +ve, MSB first */
const CMD_WRITE_BITS_NVE: u8 = 0x13;
const CMD_READ_BITS_PVE: u8 = 0x22;
const CMD_SET_BITS_LOW: u8 = 0x80;
const CMD_SET_BITS_HIGH: u8 = 0x82;
const CMD_LOOPBACK_OFF: u8 = 0x85;
const CMD_SET_TCK_DIVISOR: u8 = 0x86;
const CMD_SEND_IMMEDIATE: u8 = 0x87;
const CMD_DISABLE_CLK_DIV5: u8 = 0x8A;
const CMD_ENABLE_3PHASE: u8 = 0x8C;
const CMD_DISABLE_3PHASE: u8 = 0x8D;

/* ADBUS bit assignments for the SPI/I2C pins. */
const PIN_SCK: u8 = 0x01;
const PIN_DO: u8 = 0x02;
const PIN_DI: u8 = 0x04;
const PIN_CS: u8 = 0x08;

/* MPSSE base clock with the div-by-5 prescaler disabled. */
const BASE_CLOCK_HZ: u32 = 60_000_000;

/* FTDI vendor requests */
const SIO_RESET: u8 = 0x00;
const SIO_SET_LATENCY_TIMER: u8 = 0x09;
const SIO_SET_BITMODE: u8 = 0x0B;
const BITMODE_RESET: u16 = 0x0000;
const BITMODE_MPSSE: u16 = 0x0200;

#[derive(Debug, Error)]
pub enum MpsseError {
    #[error("No FTDI device {vid:04x}:{pid:04x} found")]
    NotFound { vid: u16, pid: u16 },

    #[error("USB transfer failed: {0}")]
    Usb(String),

    #[error("Timed out waiting for {0} MPSSE read bytes")]
    Timeout(usize),
}

/* ------------------------------------------------------------------ */
/* Command builder                                                    */
/* ------------------------------------------------------------------ */

/* Accumulates an MPSSE command stream. */
#[derive(Debug, Default)]
pub struct CommandBuffer {
    buf: Vec<u8>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /* Engine init: loopback off, prescaler off, clock divisor for the
     * requested SCK frequency. */
    pub fn init(&mut self, sck_hz: u32) -> &mut Self {
        self.buf.push(CMD_LOOPBACK_OFF);
        self.buf.push(CMD_DISABLE_CLK_DIV5);
        let divisor = clock_divisor(sck_hz);
        self.buf.push(CMD_SET_TCK_DIVISOR);
        self.buf.extend_from_slice(&divisor.to_le_bytes());
        self
    }

    /* Drive the low-byte pins (value, direction; 1 = output). */
    pub fn set_pins(&mut self, value: u8, direction: u8) -> &mut Self {
        self.buf.extend_from_slice(&[CMD_SET_BITS_LOW, value, direction]);
        self
    }

    pub fn set_pins_high(&mut self, value: u8, direction: u8) -> &mut Self {
        self.buf.extend_from_slice(&[CMD_SET_BITS_HIGH, value, direction]);
        self
    }

    /* Full-duplex SPI byte exchange; reads as many bytes as it writes. */
    pub fn spi_exchange(&mut self, data: &[u8]) -> &mut Self {
        if data.is_empty() {
            return self;
        }
        let len = (data.len() - 1) as u16;
        self.buf.push(CMD_EXCHANGE_BYTES);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        self
    }

    /* Write-only SPI clocking. */
    pub fn spi_write(&mut self, data: &[u8]) -> &mut Self {
        if data.is_empty() {
            return self;
        }
        let len = (data.len() - 1) as u16;
        self.buf.push(CMD_WRITE_BYTES_NVE);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        self
    }

    /* Read-only SPI clocking (bus idles high on DO). */
    pub fn spi_read(&mut self, count: u16) -> &mut Self {
        if count == 0 {
            return self;
        }
        self.buf.push(CMD_READ_BYTES_PVE);
        self.buf.extend_from_slice(&(count - 1).to_le_bytes());
        self
    }

    /* Assert or release chip select (active-low wiring). */
    pub fn chip_select(&mut self, asserted: bool, cs_active_low: bool) -> &mut Self {
        let cs_level = if asserted == cs_active_low { 0 } else { PIN_CS };
        self.set_pins(cs_level, PIN_SCK | PIN_DO | PIN_CS)
    }

    /* Ask the engine to flush its read FIFO to the host now. */
    pub fn send_immediate(&mut self) -> &mut Self {
        self.buf.push(CMD_SEND_IMMEDIATE);
        self
    }

    /* ---------------- I2C primitives (3-phase clocking) ------------ */

    pub fn i2c_init(&mut self, scl_hz: u32) -> &mut Self {
        self.buf.push(CMD_LOOPBACK_OFF);
        self.buf.push(CMD_DISABLE_CLK_DIV5);
        self.buf.push(CMD_ENABLE_3PHASE);
        /* 3-phase clocking stretches each bit to 1.5 periods. */
        let divisor = clock_divisor(scl_hz + scl_hz / 2);
        self.buf.push(CMD_SET_TCK_DIVISOR);
        self.buf.extend_from_slice(&divisor.to_le_bytes());
        /* Idle: SCL and SDA released high. */
        self.set_pins(PIN_SCK | PIN_DO, PIN_SCK | PIN_DO)
    }

    /* START: SDA falls while SCL is high, then SCL falls. Repeated pin
     * writes hold the transition long enough for slow slaves. */
    pub fn i2c_start(&mut self) -> &mut Self {
        for _ in 0..4 {
            self.set_pins(PIN_SCK | PIN_DO, PIN_SCK | PIN_DO);
        }
        for _ in 0..4 {
            self.set_pins(PIN_SCK, PIN_SCK | PIN_DO);
        }
        self.set_pins(0, PIN_SCK | PIN_DO)
    }

    /* STOP: SDA rises while SCL is high. */
    pub fn i2c_stop(&mut self) -> &mut Self {
        for _ in 0..4 {
            self.set_pins(PIN_SCK, PIN_SCK | PIN_DO);
        }
        for _ in 0..4 {
            self.set_pins(PIN_SCK | PIN_DO, PIN_SCK | PIN_DO);
        }
        /* Release the bus. */
        self.set_pins(PIN_SCK | PIN_DO, 0)
    }

    /* Clock one byte out and read the ACK bit (appears in the read
     * stream; 0 = ACK). */
    pub fn i2c_write_byte(&mut self, byte: u8) -> &mut Self {
        self.buf.extend_from_slice(&[CMD_WRITE_BITS_NVE, 0x07, byte]);
        /* Release SDA, read ACK. */
        self.set_pins(0, PIN_SCK);
        self.buf.extend_from_slice(&[CMD_READ_BITS_PVE, 0x00]);
        self.set_pins(PIN_DO, PIN_SCK | PIN_DO)
    }

    /* Clock one byte in and send ACK (or NAK on the final byte). */
    pub fn i2c_read_byte(&mut self, ack: bool) -> &mut Self {
        self.set_pins(0, PIN_SCK);
        self.buf.extend_from_slice(&[CMD_READ_BITS_PVE, 0x07]);
        let ack_bit = if ack { 0x00 } else { 0x80 };
        self.buf.extend_from_slice(&[CMD_WRITE_BITS_NVE, 0x00, ack_bit]);
        self.set_pins(PIN_DO, PIN_SCK | PIN_DO)
    }

    #[allow(dead_code)]
    fn disable_3phase(&mut self) -> &mut Self {
        self.buf.push(CMD_DISABLE_3PHASE);
        self
    }
}

/* TCK divisor for a target frequency with the prescaler disabled:
 * f = 60 MHz / (2 * (divisor + 1)), clamped to the 16-bit register. */
pub fn clock_divisor(target_hz: u32) -> u16 {
    if target_hz == 0 {
        return u16::MAX;
    }
    let divisor = (BASE_CLOCK_HZ / (2 * target_hz)).saturating_sub(1);
    divisor.min(u16::MAX as u32) as u16
}

/* Strip the two modem-status bytes the chip prepends to every bulk-in
 * packet (max packet size 64). */
pub fn strip_modem_status(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for chunk in raw.chunks(64) {
        if chunk.len() > 2 {
            out.extend_from_slice(&chunk[2..]);
        }
    }
    out
}

/* ------------------------------------------------------------------ */
/* Bulk channel                                                       */
/* ------------------------------------------------------------------ */

/* One claimed MPSSE channel of an FTDI device. */
pub struct MpsseChannel {
    interface: nusb::Interface,
    /* FTDI port index: 1 = channel A, 2 = channel B. */
    port: u16,
    ep_out: u8,
    ep_in: u8,
}

impl MpsseChannel {
    /* Claim `interface_index` (0 = A, 1 = B) of the matching device and
     * switch it into MPSSE mode. */
    pub async fn open(
        vid: u16,
        pid: u16,
        serial: Option<&str>,
        interface_index: u8,
    ) -> Result<Self, MpsseError> {
        let info = nusb::list_devices()
            .map_err(|e| MpsseError::Usb(e.to_string()))?
            .find(|d| {
                d.vendor_id() == vid
                    && d.product_id() == pid
                    && serial.is_none_or(|s| d.serial_number() == Some(s))
            })
            .ok_or(MpsseError::NotFound { vid, pid })?;

        let device = info.open().map_err(|e| MpsseError::Usb(e.to_string()))?;
        let interface = device
            .detach_and_claim_interface(interface_index)
            .map_err(|e| MpsseError::Usb(e.to_string()))?;

        let channel = Self {
            interface,
            port: interface_index as u16 + 1,
            /* FT2232H bulk endpoints: A = 0x02/0x81, B = 0x04/0x83. */
            ep_out: 0x02 + interface_index * 2,
            ep_in: 0x81 + interface_index * 2,
        };

        channel.vendor_request(SIO_RESET, 0).await?;
        channel.vendor_request(SIO_SET_LATENCY_TIMER, 16).await?;
        channel.vendor_request(SIO_SET_BITMODE, BITMODE_RESET).await?;
        channel.vendor_request(SIO_SET_BITMODE, BITMODE_MPSSE).await?;
        debug!("MPSSE channel {} up on {vid:04x}:{pid:04x}", channel.port);
        Ok(channel)
    }

    async fn vendor_request(&self, request: u8, value: u16) -> Result<(), MpsseError> {
        let completion = self
            .interface
            .control_out(ControlOut {
                control_type: ControlType::Vendor,
                recipient: Recipient::Device,
                request,
                value,
                index: self.port,
                data: &[],
            })
            .await;
        completion.status.map_err(|e| MpsseError::Usb(e.to_string()))
    }

    pub async fn write(&self, commands: Vec<u8>) -> Result<(), MpsseError> {
        trace!("MPSSE TX {} bytes", commands.len());
        let completion = self.interface.bulk_out(self.ep_out, commands).await;
        completion.status.map_err(|e| MpsseError::Usb(e.to_string()))?;
        Ok(())
    }

    /* Read exactly `want` payload bytes (modem-status stripped). */
    pub async fn read(&self, want: usize, deadline: Duration) -> Result<Vec<u8>, MpsseError> {
        let deadline = tokio::time::Instant::now() + deadline;
        let mut payload = Vec::with_capacity(want);

        while payload.len() < want {
            let transfer = self.interface.bulk_in(self.ep_in, RequestBuffer::new(512));
            let completion = match tokio::time::timeout_at(deadline, transfer).await {
                Err(_) => return Err(MpsseError::Timeout(want)),
                Ok(c) => c,
            };
            completion.status.map_err(|e| MpsseError::Usb(e.to_string()))?;
            payload.extend_from_slice(&strip_modem_status(&completion.data));
        }

        payload.truncate(want);
        Ok(payload)
    }

    /* Write a command stream and collect its expected read payload. */
    pub async fn transfer(
        &self,
        commands: Vec<u8>,
        read_len: usize,
        deadline: Duration,
    ) -> Result<Vec<u8>, MpsseError> {
        self.write(commands).await?;
        if read_len == 0 {
            return Ok(Vec::new());
        }
        self.read(read_len, deadline).await
    }
}
