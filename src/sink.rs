/* Bounded fan-out streams for device output. One publisher per device; any
 * number of read-only subscribers share the single underlying connection.
 * On overflow the oldest items are dropped and the subscriber's drop
 * counter is incremented. */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tracing::trace;

use crate::device::DeviceOutput;

/* Default per-device buffer depth. */
pub const SINK_CAPACITY: usize = 256;

/* Publishing side of a device's output stream. Cheap to clone. */
#[derive(Clone)]
pub struct OutputSink {
    tx: broadcast::Sender<DeviceOutput>,
    dropped: Arc<AtomicU64>,
}

impl OutputSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /* Publish one item. With no subscribers the item is discarded,
     * which is fine: output is observational. */
    pub fn publish(&self, item: DeviceOutput) {
        trace!(device = %item.device_id, "sink publish");
        let _ = self.tx.send(item);
    }

    pub fn subscribe(&self) -> OutputStream {
        OutputStream {
            rx: self.tx.subscribe(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /* Total items dropped across all subscribers due to overflow. */
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::new(SINK_CAPACITY)
    }
}

/* Subscribing side. Lag (ring overflow) is absorbed: the stream skips
 * the lost items, counts them, and continues with the oldest retained
 * item rather than surfacing an error to every caller. */
pub struct OutputStream {
    rx: broadcast::Receiver<DeviceOutput>,
    dropped: Arc<AtomicU64>,
}

impl OutputStream {
    pub async fn next(&mut self) -> Option<DeviceOutput> {
        loop {
            match self.rx.recv().await {
                Ok(item) => return Some(item),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.dropped.fetch_add(n, Ordering::Relaxed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
