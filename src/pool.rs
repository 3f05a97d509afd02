/* Device pool: owns every backend instance, maps enumerated descriptors to
 * drivers through the registry, and enforces the sharing policy: exactly
 * one in-flight mutating operation per device, FIFO between waiters, any
 * number of read-only output subscribers, one open per endpoint path. */

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::catalog::{self, Catalog, CatalogEntry};
use crate::device::{DeviceDescriptor, DeviceEvent};
use crate::driver::{Backend, BackendRegistry, Bus, DebugProbe, DriverError, Glitch};
use crate::sink::{OutputSink, OutputStream};

/* How long a close waits for an in-flight operation before declaring
 * the backend faulty. */
const CANCEL_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("No catalog entry for device {0}")]
    NoCatalogEntry(String),

    #[error("Endpoint {0} already in use")]
    EndpointBusy(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

type SharedBackend = Arc<Mutex<Box<dyn Backend>>>;

struct DeviceSlot {
    descriptor: DeviceDescriptor,
    entry: Arc<CatalogEntry>,
    backend: Option<SharedBackend>,
    sink: OutputSink,
    closed_tx: watch::Sender<bool>,
    faulty: bool,
}

/* Cloneable handle to an open backend. Clones share the single driver
 * connection; subscribing to output is read-only and coexists with the
 * one mutator. */
#[derive(Clone)]
pub struct BackendLease {
    pub device_id: String,
    backend: SharedBackend,
    sink: OutputSink,
}

impl std::fmt::Debug for BackendLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendLease")
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl BackendLease {
    pub fn subscribe_output(&self) -> OutputStream {
        self.sink.subscribe()
    }

    pub async fn info(&self) -> Result<serde_json::Value, DriverError> {
        self.backend.lock().await.info().await
    }

    pub async fn connected(&self) -> bool {
        self.backend.lock().await.connected()
    }
}

struct PoolInner {
    devices: HashMap<String, DeviceSlot>,
    open_endpoints: HashSet<PathBuf>,
}

pub struct DevicePool {
    registry: BackendRegistry,
    catalog: Catalog,
    inner: Mutex<PoolInner>,
}

impl DevicePool {
    pub fn new(registry: BackendRegistry, catalog: Catalog) -> Self {
        Self {
            registry,
            catalog,
            inner: Mutex::new(PoolInner {
                devices: HashMap::new(),
                open_endpoints: HashSet::new(),
            }),
        }
    }

    /* Apply one enumerator event. */
    pub async fn apply_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Added(descriptor) => {
                if let Err(err) = self.add_device(descriptor).await {
                    warn!("Ignoring device: {err}");
                }
            }
            DeviceEvent::Removed { id } => {
                if let Err(err) = self.close(&id).await {
                    debug!("Remove of {id}: {err}");
                }
                self.inner.lock().await.devices.remove(&id);
            }
        }
    }

    /* Replace the device list wholesale (a full enumerator refresh).
     * Devices that disappeared are closed; new ones are registered. */
    pub async fn scan(&self, descriptors: Vec<DeviceDescriptor>) {
        let known: HashSet<String> = self.inner.lock().await.devices.keys().cloned().collect();
        let fresh: HashSet<String> = descriptors.iter().map(|d| d.id.clone()).collect();

        for gone in known.difference(&fresh) {
            self.apply_event(DeviceEvent::Removed { id: gone.clone() }).await;
        }
        for descriptor in descriptors {
            if !known.contains(&descriptor.id) {
                self.apply_event(DeviceEvent::Added(descriptor)).await;
            }
        }
    }

    async fn add_device(&self, descriptor: DeviceDescriptor) -> Result<(), PoolError> {
        let entry = catalog::lookup(&self.catalog, descriptor.vendor_id, descriptor.product_id)
            .ok_or_else(|| PoolError::NoCatalogEntry(descriptor.id.clone()))?;

        let mut inner = self.inner.lock().await;
        let id = descriptor.id.clone();
        let (closed_tx, _) = watch::channel(false);
        inner.devices.entry(id.clone()).or_insert_with(|| DeviceSlot {
            descriptor,
            entry,
            backend: None,
            sink: OutputSink::default(),
            closed_tx,
            faulty: false,
        });
        info!("Device registered: {id}");
        Ok(())
    }

    pub async fn device_ids(&self) -> Vec<String> {
        self.inner.lock().await.devices.keys().cloned().collect()
    }

    pub async fn descriptor(&self, device_id: &str) -> Option<DeviceDescriptor> {
        self.inner
            .lock()
            .await
            .devices
            .get(device_id)
            .map(|slot| slot.descriptor.clone())
    }

    /* Publishing side of a device's output stream, for injecting
     * simulated traffic in tests. */
    #[cfg(test)]
    pub(crate) async fn sink_for_test(&self, device_id: &str) -> Option<OutputSink> {
        self.inner
            .lock()
            .await
            .devices
            .get(device_id)
            .map(|slot| slot.sink.clone())
    }

    /* Subscribe to a device's output stream without opening it. */
    pub async fn subscribe(&self, device_id: &str) -> Result<OutputStream, PoolError> {
        let inner = self.inner.lock().await;
        let slot = inner
            .devices
            .get(device_id)
            .ok_or_else(|| PoolError::UnknownDevice(device_id.to_string()))?;
        Ok(slot.sink.subscribe())
    }

    /* Open a device: construct and connect the backend on first call,
     * hand out the existing instance afterwards. */
    pub async fn open(&self, device_id: &str) -> Result<BackendLease, PoolError> {
        let (backend, sink, fresh) = {
            let mut inner = self.inner.lock().await;
            let slot = inner
                .devices
                .get(device_id)
                .ok_or_else(|| PoolError::UnknownDevice(device_id.to_string()))?;

            match &slot.backend {
                Some(backend) => (Arc::clone(backend), slot.sink.clone(), false),
                None => {
                    /* Serial endpoints are process-exclusive. */
                    for endpoint in &slot.descriptor.endpoints {
                        if inner.open_endpoints.contains(&endpoint.path) {
                            return Err(PoolError::EndpointBusy(
                                endpoint.path.to_string_lossy().into_owned(),
                            ));
                        }
                    }

                    let slot = inner.devices.get_mut(device_id).unwrap();
                    let backend = self
                        .registry
                        .create(&slot.descriptor, &slot.entry, slot.sink.clone())
                        .ok_or_else(|| PoolError::NoCatalogEntry(device_id.to_string()))?;
                    let backend: SharedBackend = Arc::new(Mutex::new(backend));
                    slot.backend = Some(Arc::clone(&backend));
                    slot.faulty = false;
                    let _ = slot.closed_tx.send_replace(false);
                    let sink = slot.sink.clone();
                    let paths: Vec<PathBuf> =
                        slot.descriptor.endpoints.iter().map(|e| e.path.clone()).collect();
                    for path in paths {
                        inner.open_endpoints.insert(path);
                    }
                    (backend, sink, true)
                }
            }
        };

        if fresh {
            let mut guard = backend.lock().await;
            if let Err(err) = guard.connect().await {
                drop(guard);
                self.forget_backend(device_id).await;
                return Err(err.into());
            }
            info!("Device opened: {device_id}");
        }

        Ok(BackendLease {
            device_id: device_id.to_string(),
            backend,
            sink,
        })
    }

    /* Drop a slot's backend and release its endpoints. */
    async fn forget_backend(&self, device_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.devices.get_mut(device_id) {
            slot.backend = None;
            let paths: Vec<PathBuf> = slot.descriptor.endpoints.iter().map(|e| e.path.clone()).collect();
            for path in paths {
                inner.open_endpoints.remove(&path);
            }
        }
    }

    /* Disconnect and drop a device's backend. An in-flight operation is
     * asked to cancel; if it does not settle within the grace period
     * the backend is marked faulty and abandoned. */
    pub async fn close(&self, device_id: &str) -> Result<(), PoolError> {
        let (backend, closed_tx) = {
            let inner = self.inner.lock().await;
            let slot = inner
                .devices
                .get(device_id)
                .ok_or_else(|| PoolError::UnknownDevice(device_id.to_string()))?;
            match &slot.backend {
                Some(backend) => (Arc::clone(backend), slot.closed_tx.clone()),
                None => return Ok(()),
            }
        };

        /* Signal cancellation to whoever holds the mutator lease. */
        let _ = closed_tx.send_replace(true);

        match tokio::time::timeout(CANCEL_GRACE, backend.lock()).await {
            Ok(mut guard) => {
                if let Err(err) = guard.disconnect().await {
                    warn!("Disconnect of {device_id}: {err}");
                }
            }
            Err(_) => {
                warn!("Device {device_id} did not cancel within {CANCEL_GRACE:?}, marking faulty");
                let mut inner = self.inner.lock().await;
                if let Some(slot) = inner.devices.get_mut(device_id) {
                    slot.faulty = true;
                }
            }
        }

        self.forget_backend(device_id).await;
        info!("Device closed: {device_id}");
        Ok(())
    }

    pub async fn is_faulty(&self, device_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .devices
            .get(device_id)
            .map(|slot| slot.faulty)
            .unwrap_or(false)
    }

    async fn role_op<R, F>(&self, device_id: &str, role: &'static str, f: F) -> Result<R, PoolError>
    where
        R: Send,
        F: for<'a> FnOnce(&'a mut Box<dyn Backend>) -> Result<BoxFuture<'a, Result<R, DriverError>>, PoolError>
        + Send,
    {
        let (backend, closed_tx) = {
            let inner = self.inner.lock().await;
            let slot = inner
                .devices
                .get(device_id)
                .ok_or_else(|| PoolError::UnknownDevice(device_id.to_string()))?;
            let backend = slot
                .backend
                .as_ref()
                .ok_or(PoolError::Driver(DriverError::NotConnected))?;
            (Arc::clone(backend), slot.closed_tx.clone())
        };

        let mut closed_rx = closed_tx.subscribe();
        if *closed_rx.borrow() {
            return Err(PoolError::Cancelled);
        }

        /* The tokio mutex queues waiters, giving FIFO between racing
         * mutators. */
        let mut guard = backend.lock().await;
        debug!("{role} lease acquired on {device_id}");

        let outcome = {
            let op = f(&mut guard)?;
            tokio::select! {
                result = op => Some(result),
                _ = closed_rx.wait_for(|closed| *closed) => None,
            }
        };

        match outcome {
            Some(result) => result.map_err(PoolError::Driver),
            None => {
                /* The operation future was dropped at its suspension
                 * point; bring the device to a safe state. */
                let _ = guard.disconnect().await;
                Err(PoolError::Cancelled)
            }
        }
    }

    /* Run one exclusive Bus operation. */
    pub async fn with_bus<R, F>(&self, device_id: &str, f: F) -> Result<R, PoolError>
    where
        R: Send,
        F: for<'a> FnOnce(&'a mut dyn Bus) -> BoxFuture<'a, Result<R, DriverError>> + Send,
    {
        self.role_op(device_id, "bus", move |backend| {
            if !backend.connected() {
                return Err(PoolError::Driver(DriverError::NotConnected));
            }
            let bus = backend
                .as_bus()
                .ok_or(PoolError::Driver(DriverError::RoleNotSupported("bus")))?;
            Ok(f(bus))
        })
        .await
    }

    /* Run one exclusive DebugProbe operation. */
    pub async fn with_debug<R, F>(&self, device_id: &str, f: F) -> Result<R, PoolError>
    where
        R: Send,
        F: for<'a> FnOnce(&'a mut dyn DebugProbe) -> BoxFuture<'a, Result<R, DriverError>> + Send,
    {
        self.role_op(device_id, "debug", move |backend| {
            if !backend.connected() {
                return Err(PoolError::Driver(DriverError::NotConnected));
            }
            let debug = backend
                .as_debug()
                .ok_or(PoolError::Driver(DriverError::RoleNotSupported("debug")))?;
            Ok(f(debug))
        })
        .await
    }

    /* Run one exclusive Glitch operation. */
    pub async fn with_glitch<R, F>(&self, device_id: &str, f: F) -> Result<R, PoolError>
    where
        R: Send,
        F: for<'a> FnOnce(&'a mut dyn Glitch) -> BoxFuture<'a, Result<R, DriverError>> + Send,
    {
        self.role_op(device_id, "glitch", move |backend| {
            if !backend.connected() {
                return Err(PoolError::Driver(DriverError::NotConnected));
            }
            let glitch = backend
                .as_glitch()
                .ok_or(PoolError::Driver(DriverError::RoleNotSupported("glitch")))?;
            Ok(f(glitch))
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{BusType, DriverConstants};
    use crate::device::{Capability, EndpointPath, GlitchConfig, OutputChannel};
    use crate::device::{I2cConfig, SpiConfig, UartConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /* Backend double implementing the Bus role with observable state. */
    pub(crate) struct MockBackend {
        connects: Arc<AtomicU32>,
        in_flight: Arc<AtomicU32>,
        overlap_seen: Arc<AtomicU32>,
        op_delay: Duration,
        with_bus_role: bool,
        connected: bool,
        sink: OutputSink,
        device_id: String,
    }

    #[async_trait]
    impl Backend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }
        fn connected(&self) -> bool {
            self.connected
        }
        async fn connect(&mut self) -> Result<(), DriverError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.connected = true;
            Ok(())
        }
        async fn disconnect(&mut self) -> Result<(), DriverError> {
            self.connected = false;
            Ok(())
        }
        async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
            Ok(serde_json::json!({ "name": "mock" }))
        }
        fn as_bus(&mut self) -> Option<&mut dyn Bus> {
            if self.with_bus_role { Some(self) } else { None }
        }
    }

    #[async_trait]
    impl Bus for MockBackend {
        async fn configure_spi(&mut self, _c: &SpiConfig) -> Result<(), DriverError> {
            Ok(())
        }
        async fn spi_transfer(&mut self, write: &[u8], read_len: usize) -> Result<Vec<u8>, DriverError> {
            /* Detect overlapping mutators. */
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlap_seen.fetch_add(1, Ordering::SeqCst);
            }
            tokio::time::sleep(self.op_delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.sink.publish(crate::device::DeviceOutput::line(
                &self.device_id,
                OutputChannel::Uart,
                format!("xfer {write:02x?}"),
            ));
            Ok(vec![0xAB; read_len])
        }
        async fn configure_i2c(&mut self, _c: &I2cConfig) -> Result<(), DriverError> {
            Ok(())
        }
        async fn i2c_write(&mut self, _a: u8, _d: &[u8]) -> Result<(), DriverError> {
            Ok(())
        }
        async fn i2c_read(&mut self, _a: u8, _l: usize) -> Result<Vec<u8>, DriverError> {
            Ok(Vec::new())
        }
        async fn i2c_write_read(&mut self, _a: u8, _w: &[u8], _r: usize) -> Result<Vec<u8>, DriverError> {
            Ok(Vec::new())
        }
        async fn configure_uart(&mut self, _c: &UartConfig) -> Result<(), DriverError> {
            Ok(())
        }
        async fn uart_write(&mut self, _d: &[u8]) -> Result<(), DriverError> {
            Ok(())
        }
        async fn uart_read(&mut self, _l: usize, _t: Duration) -> Result<Vec<u8>, DriverError> {
            Ok(Vec::new())
        }
    }

    pub(crate) struct PoolFixture {
        pub pool: Arc<DevicePool>,
        pub connects: Arc<AtomicU32>,
        pub overlap_seen: Arc<AtomicU32>,
    }

    pub(crate) fn fixture(op_delay: Duration, with_bus_role: bool) -> PoolFixture {
        let connects = Arc::new(AtomicU32::new(0));
        let in_flight = Arc::new(AtomicU32::new(0));
        let overlap_seen = Arc::new(AtomicU32::new(0));

        let mut registry = BackendRegistry::new();
        {
            let connects = Arc::clone(&connects);
            let in_flight = Arc::clone(&in_flight);
            let overlap_seen = Arc::clone(&overlap_seen);
            registry.register("mock", move |desc, _entry, sink| {
                Box::new(MockBackend {
                    connects: Arc::clone(&connects),
                    in_flight: Arc::clone(&in_flight),
                    overlap_seen: Arc::clone(&overlap_seen),
                    op_delay,
                    with_bus_role,
                    connected: false,
                    sink,
                    device_id: desc.id.clone(),
                })
            });
        }

        let entry = Arc::new(CatalogEntry {
            name: "Mock Tool".into(),
            driver: "mock".into(),
            matches: Vec::new(),
            endpoint_roles: vec!["console".into()],
            constants: DriverConstants::default(),
        });
        let mut catalog = Catalog::new();
        catalog.insert((BusType::Usb, 0x1209, 0x0001), entry);

        PoolFixture {
            pool: Arc::new(DevicePool::new(registry, catalog)),
            connects,
            overlap_seen,
        }
    }

    pub(crate) fn descriptor(id: &str, endpoint: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.into(),
            name: "Mock Tool".into(),
            vendor_id: 0x1209,
            product_id: 0x0001,
            serial: None,
            endpoints: vec![EndpointPath { path: endpoint.into(), role: "console".into() }],
            capabilities: [Capability::Uart, Capability::Spi].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn open_connects_once_and_reuses() {
        let fx = fixture(Duration::ZERO, true);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttyMOCK0")))
            .await;

        let a = fx.pool.open("dev0").await.unwrap();
        let b = fx.pool.open("dev0").await.unwrap();
        assert_eq!(fx.connects.load(Ordering::SeqCst), 1);
        assert!(a.connected().await);
        assert_eq!(a.device_id, b.device_id);
    }

    #[tokio::test]
    async fn open_unknown_device_fails() {
        let fx = fixture(Duration::ZERO, true);
        assert!(matches!(
            fx.pool.open("nope").await,
            Err(PoolError::UnknownDevice(_))
        ));
    }

    #[tokio::test]
    async fn role_not_supported_surfaces() {
        let fx = fixture(Duration::ZERO, false);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttyMOCK0")))
            .await;
        fx.pool.open("dev0").await.unwrap();

        let err = fx
            .pool
            .with_bus("dev0", |bus| Box::pin(async move { bus.spi_transfer(&[0x9F], 3).await }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PoolError::Driver(DriverError::RoleNotSupported("bus"))
        ));
    }

    #[tokio::test]
    async fn endpoint_exclusivity_enforced() {
        let fx = fixture(Duration::ZERO, true);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttySHARED")))
            .await;
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev1", "/dev/ttySHARED")))
            .await;

        fx.pool.open("dev0").await.unwrap();
        let err = fx.pool.open("dev1").await.unwrap_err();
        assert!(matches!(err, PoolError::EndpointBusy(_)));

        /* Closing dev0 releases the endpoint. */
        fx.pool.close("dev0").await.unwrap();
        fx.pool.open("dev1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn mutator_operations_are_serialized() {
        let fx = fixture(Duration::from_millis(50), true);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttyMOCK0")))
            .await;
        fx.pool.open("dev0").await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&fx.pool);
            tasks.push(tokio::spawn(async move {
                pool.with_bus("dev0", |bus| {
                    Box::pin(async move { bus.spi_transfer(&[0x05], 1).await })
                })
                .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(fx.overlap_seen.load(Ordering::SeqCst), 0, "mutators overlapped");
    }

    #[tokio::test]
    async fn subscribers_coexist_with_mutator() {
        let fx = fixture(Duration::ZERO, true);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttyMOCK0")))
            .await;
        let lease = fx.pool.open("dev0").await.unwrap();
        let mut stream = lease.subscribe_output();

        fx.pool
            .with_bus("dev0", |bus| Box::pin(async move { bus.spi_transfer(&[0x01], 0).await }))
            .await
            .unwrap();

        let item = stream.next().await.unwrap();
        assert_eq!(item.device_id, "dev0");
        assert!(item.text().unwrap().starts_with("xfer"));
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_in_flight_operation() {
        let fx = fixture(Duration::from_secs(30), true);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttyMOCK0")))
            .await;
        fx.pool.open("dev0").await.unwrap();

        let pool = Arc::clone(&fx.pool);
        let op = tokio::spawn(async move {
            pool.with_bus("dev0", |bus| {
                Box::pin(async move { bus.spi_transfer(&[0x03], 8).await })
            })
            .await
        });

        /* Let the operation reach its sleep, then close the device. */
        tokio::time::sleep(Duration::from_millis(10)).await;
        fx.pool.close("dev0").await.unwrap();

        let result = op.await.unwrap();
        assert!(matches!(result, Err(PoolError::Cancelled)));

        /* The backend is gone; a new operation needs a fresh open. */
        let err = fx
            .pool
            .with_bus("dev0", |bus| Box::pin(async move { bus.spi_transfer(&[0], 0).await }))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Driver(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn removed_device_disappears() {
        let fx = fixture(Duration::ZERO, true);
        fx.pool
            .apply_event(DeviceEvent::Added(descriptor("dev0", "/dev/ttyMOCK0")))
            .await;
        assert_eq!(fx.pool.device_ids().await, vec!["dev0".to_string()]);

        fx.pool
            .apply_event(DeviceEvent::Removed { id: "dev0".into() })
            .await;
        assert!(fx.pool.device_ids().await.is_empty());
    }

    #[tokio::test]
    async fn scan_diffs_device_list() {
        let fx = fixture(Duration::ZERO, true);
        fx.pool.scan(vec![descriptor("dev0", "/dev/ttyA"), descriptor("dev1", "/dev/ttyB")]).await;
        let mut ids = fx.pool.device_ids().await;
        ids.sort();
        assert_eq!(ids, vec!["dev0".to_string(), "dev1".to_string()]);

        fx.pool.scan(vec![descriptor("dev1", "/dev/ttyB")]).await;
        assert_eq!(fx.pool.device_ids().await, vec!["dev1".to_string()]);
    }
}
