/* COBS frame codec: exchanges length-delimited binary packets over a serial byte
 * stream. Every packet on the wire is COBS-encoded and terminated by a single
 * zero byte; zero never appears inside the encoded body. */

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/* Default deadline for a single frame receive. */
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Timed out waiting for a frame delimiter")]
    Timeout,

    #[error("COBS decode failed")]
    Decode,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Transport I/O: {0}")]
    Io(#[source] std::io::Error),
}

/* A single protocol message and its on-wire form. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEnvelope {
    pub payload: Vec<u8>,
    /* COBS of the payload followed by the zero terminator. */
    pub encoded: Vec<u8>,
    pub completed: bool,
}

impl FrameEnvelope {
    /* Build the wire form of a payload. */
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut encoded = cobs::encode_vec(payload);
        encoded.push(0);
        Self {
            payload: payload.to_vec(),
            encoded,
            completed: true,
        }
    }

    /* Decode a delimiter-trimmed encoded body back into a payload. */
    pub fn from_encoded(body: &[u8]) -> Result<Self, FrameError> {
        let payload = cobs::decode_vec(body).map_err(|_| FrameError::Decode)?;
        let mut encoded = body.to_vec();
        encoded.push(0);
        Ok(Self {
            payload,
            encoded,
            completed: true,
        })
    }
}

/* Framed transport over any async byte stream.
 *
 * Generic over the stream so protocol tests run against an in-memory
 * duplex endpoint instead of real hardware. Bytes received past a
 * delimiter are retained for the next receive. A failed write poisons
 * the codec: every later operation fails `TransportClosed` until the
 * owner reconnects. */
pub struct FrameCodec<T> {
    io: T,
    rx: Vec<u8>,
    poisoned: bool,
}

impl<T: AsyncRead + AsyncWrite + Unpin> FrameCodec<T> {
    pub fn new(io: T) -> Self {
        Self {
            io,
            rx: Vec::new(),
            poisoned: false,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /* Encode, terminate, write atomically and flush. */
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        if self.poisoned {
            return Err(FrameError::TransportClosed);
        }

        let frame = FrameEnvelope::from_payload(payload);
        trace!("TX frame: {} payload bytes, {} on wire", payload.len(), frame.encoded.len());

        /* The poisoned flag must be set before the error surfaces. */
        if let Err(e) = self.io.write_all(&frame.encoded).await {
            self.poisoned = true;
            return Err(FrameError::Io(e));
        }
        if let Err(e) = self.io.flush().await {
            self.poisoned = true;
            return Err(FrameError::Io(e));
        }
        Ok(())
    }

    /* Read until a zero delimiter, trim it, COBS-decode the body.
     *
     * Leading zeroes are discarded so a desynchronized stream recovers
     * at the next delimiter. A deadline with no delimiter observed
     * fails `Timeout` and leaves the codec usable. */
    pub async fn recv(&mut self, deadline: Duration) -> Result<Vec<u8>, FrameError> {
        if self.poisoned {
            return Err(FrameError::TransportClosed);
        }

        let deadline = tokio::time::Instant::now() + deadline;
        let mut buf = [0u8; 512];

        loop {
            /* Resync: drop empty frames / stray delimiters. */
            if let Some(start) = self.rx.iter().position(|b| *b != 0) {
                if start > 0 {
                    self.rx.drain(..start);
                }
            } else {
                self.rx.clear();
            }

            if let Some(pos) = self.rx.iter().position(|b| *b == 0) {
                let body: Vec<u8> = self.rx.drain(..=pos).take(pos).collect();
                let frame = FrameEnvelope::from_encoded(&body)?;
                trace!("RX frame: {} payload bytes", frame.payload.len());
                return Ok(frame.payload);
            }

            let n = match tokio::time::timeout_at(deadline, self.io.read(&mut buf)).await {
                Err(_) => return Err(FrameError::Timeout),
                Ok(Ok(0)) => {
                    debug!("Transport EOF during frame receive");
                    self.poisoned = true;
                    return Err(FrameError::TransportClosed);
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(FrameError::Io(e)),
            };
            self.rx.extend_from_slice(&buf[..n]);
        }
    }

    /* Send followed by receive. The codec's exclusive borrow is the
     * transaction lock; higher layers wrap the codec in a mutex when
     * they share it. */
    pub async fn transact(&mut self, payload: &[u8], deadline: Duration) -> Result<Vec<u8>, FrameError> {
        self.send(payload).await?;
        self.recv(deadline).await
    }

    /* Drop any buffered receive bytes (used before a fresh exchange). */
    pub fn discard_input(&mut self) {
        self.rx.clear();
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn encode_has_no_embedded_zero() {
        for payload in [
            &b""[..],
            &b"\x00"[..],
            &b"\x00\x00\x00"[..],
            &b"hello"[..],
            &b"\x01\x00\x02\x00\x03"[..],
        ] {
            let frame = FrameEnvelope::from_payload(payload);
            let (last, body) = frame.encoded.split_last().unwrap();
            assert_eq!(*last, 0);
            assert!(!body.contains(&0), "zero inside encoded body of {payload:02x?}");
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let payloads: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![0xFF; 300],
            (0..=255u8).collect(),
        ];
        for p in payloads {
            let frame = FrameEnvelope::from_payload(&p);
            let body = &frame.encoded[..frame.encoded.len() - 1];
            let back = FrameEnvelope::from_encoded(body).unwrap();
            assert_eq!(back.payload, p);
        }
    }

    #[tokio::test]
    async fn recv_resyncs_past_leading_zeroes() {
        let (mut far, near) = tokio::io::duplex(1024);
        let mut codec = FrameCodec::new(near);

        let frame = FrameEnvelope::from_payload(b"ping");
        let mut wire = vec![0u8, 0u8];
        wire.extend_from_slice(&frame.encoded);
        far.write_all(&wire).await.unwrap();

        let got = codec.recv(Duration::from_secs(1)).await.unwrap();
        assert_eq!(got, b"ping");
    }

    #[tokio::test(start_paused = true)]
    async fn recv_timeout_then_recovers() {
        let (mut far, near) = tokio::io::duplex(1024);
        let mut codec = FrameCodec::new(near);

        /* Partial frame, no delimiter */
        far.write_all(&[0x03, 0x41, 0x42]).await.unwrap();
        let err = codec.recv(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, FrameError::Timeout));

        /* Codec stays usable: completing the frame decodes it. */
        far.write_all(&[0x00]).await.unwrap();
        let got = codec.recv(Duration::from_millis(100)).await.unwrap();
        assert_eq!(got, b"AB");
    }

    #[tokio::test]
    async fn recv_splits_back_to_back_frames() {
        let (mut far, near) = tokio::io::duplex(1024);
        let mut codec = FrameCodec::new(near);

        let mut wire = FrameEnvelope::from_payload(b"one").encoded;
        wire.extend_from_slice(&FrameEnvelope::from_payload(b"two").encoded);
        far.write_all(&wire).await.unwrap();

        assert_eq!(codec.recv(Duration::from_secs(1)).await.unwrap(), b"one");
        assert_eq!(codec.recv(Duration::from_secs(1)).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn write_failure_poisons_transport() {
        let (far, near) = tokio::io::duplex(16);
        let mut codec = FrameCodec::new(near);
        drop(far);

        /* The duplex peer is gone; the write must fail and poison. */
        let err = codec.send(&[0xAA; 64]).await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_) | FrameError::TransportClosed));
        assert!(codec.is_poisoned());

        let err = codec.send(b"again").await.unwrap_err();
        assert!(matches!(err, FrameError::TransportClosed));
        let err = codec.recv(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, FrameError::TransportClosed));
    }

    #[tokio::test]
    async fn transact_roundtrip() {
        let (far, near) = tokio::io::duplex(1024);
        let mut codec = FrameCodec::new(near);
        let mut peer = FrameCodec::new(far);

        let echo = tokio::spawn(async move {
            let req = peer.recv(Duration::from_secs(1)).await.unwrap();
            peer.send(&req).await.unwrap();
        });

        let resp = codec.transact(b"\x01\x02\x00\x03", Duration::from_secs(1)).await.unwrap();
        assert_eq!(resp, b"\x01\x02\x00\x03");
        echo.await.unwrap();
    }
}
