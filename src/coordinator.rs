/* Cross-device trigger coordinator: watches text output from source devices,
 * evaluates regex routes with debounce/cooldown, and fires glitch actions on
 * target devices through the pool. Events land in a bounded ring and on a
 * broadcast stream for the UI. */

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

use regex::Regex;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device::{Capability, GlitchConfig};
use crate::pool::{DevicePool, PoolError};

/* Event ring capacity. */
const EVENT_LOG_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Route '{0}' already exists")]
    DuplicateRoute(String),

    #[error("No route named '{0}'")]
    UnknownRoute(String),

    #[error("No enabled routes to arm")]
    NoRoutes,

    #[error("Route '{route}' has an invalid pattern: {error}")]
    BadPattern { route: String, error: String },

    #[error("Route '{route}' names unknown source device '{device}'")]
    UnknownSource { route: String, device: String },

    #[error("Route '{route}' names unknown target device '{device}'")]
    UnknownTarget { route: String, device: String },

    #[error("Route '{route}' target '{device}' cannot glitch")]
    TargetNotGlitchCapable { route: String, device: String },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/* What a route does when its pattern matches. */
#[derive(Debug, Clone)]
pub enum RouteOperation {
    /* Software dispatch: configure the target and trigger immediately. */
    Glitch { config: GlitchConfig },
    /* Hardware-synchronous dispatch: only arm the target; a
     * device-to-device wire completes the trigger. */
    ArmOnly { config: GlitchConfig },
}

#[derive(Debug, Clone)]
pub struct RouteAction {
    pub target_device_id: String,
    pub operation: RouteOperation,
}

#[derive(Debug, Clone)]
pub struct TriggerRoute {
    pub name: String,
    pub source_device_id: String,
    pub source_pattern: String,
    pub action: RouteAction,
    pub enabled: bool,
    pub debounce_ms: u64,
    pub cooldown_ms: u64,
    pub fired_count: u64,
    pub last_fire_time: Option<tokio::time::Instant>,
    compiled: Option<Regex>,
}

impl TriggerRoute {
    pub fn new(
        name: impl Into<String>,
        source_device_id: impl Into<String>,
        source_pattern: impl Into<String>,
        action: RouteAction,
    ) -> Self {
        Self {
            name: name.into(),
            source_device_id: source_device_id.into(),
            source_pattern: source_pattern.into(),
            action,
            enabled: true,
            debounce_ms: 0,
            cooldown_ms: 0,
            fired_count: 0,
            last_fire_time: None,
            compiled: None,
        }
    }

    pub fn with_windows(mut self, debounce_ms: u64, cooldown_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self.cooldown_ms = cooldown_ms;
        self
    }

    /* Debounce, then cooldown, both measured from the last fire. */
    fn may_fire(&self, now: tokio::time::Instant) -> bool {
        let Some(last) = self.last_fire_time else {
            return true;
        };
        let elapsed = now.duration_since(last).as_millis() as u64;
        if elapsed < self.debounce_ms {
            return false;
        }
        if elapsed < self.cooldown_ms {
            return false;
        }
        true
    }
}

/* Why a matched route did not fire successfully. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteFailure {
    TargetMissing,
    ActionFailed(String),
}

#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub route_name: String,
    pub timestamp: SystemTime,
    pub success: bool,
    pub latency_us: u64,
    pub details: String,
    pub failure: Option<RouteFailure>,
}

struct CoordInner {
    armed: bool,
    routes: Vec<TriggerRoute>,
    event_log: VecDeque<TriggerEvent>,
    disarm_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct Coordinator {
    pool: Arc<DevicePool>,
    inner: Arc<Mutex<CoordInner>>,
    events_tx: broadcast::Sender<TriggerEvent>,
}

impl Coordinator {
    pub fn new(pool: Arc<DevicePool>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_LOG_CAPACITY);
        let (disarm_tx, _) = watch::channel(false);
        Self {
            pool,
            inner: Arc::new(Mutex::new(CoordInner {
                armed: false,
                routes: Vec::new(),
                event_log: VecDeque::new(),
                disarm_tx,
                tasks: Vec::new(),
            })),
            events_tx,
        }
    }

    pub async fn add_route(&self, route: TriggerRoute) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.lock().await;
        if inner.routes.iter().any(|r| r.name == route.name) {
            return Err(CoordinatorError::DuplicateRoute(route.name));
        }
        debug!("Route added: {} ({} -> {})", route.name, route.source_device_id, route.action.target_device_id);
        inner.routes.push(route);
        Ok(())
    }

    pub async fn remove_route(&self, name: &str) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.lock().await;
        let before = inner.routes.len();
        inner.routes.retain(|r| r.name != name);
        if inner.routes.len() == before {
            return Err(CoordinatorError::UnknownRoute(name.to_string()));
        }
        Ok(())
    }

    pub async fn set_route_enabled(&self, name: &str, enabled: bool) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.lock().await;
        let route = inner
            .routes
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| CoordinatorError::UnknownRoute(name.to_string()))?;
        route.enabled = enabled;
        Ok(())
    }

    pub async fn routes(&self) -> Vec<TriggerRoute> {
        self.inner.lock().await.routes.clone()
    }

    pub async fn is_armed(&self) -> bool {
        self.inner.lock().await.armed
    }

    pub async fn events(&self) -> Vec<TriggerEvent> {
        self.inner.lock().await.event_log.iter().cloned().collect()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TriggerEvent> {
        self.events_tx.subscribe()
    }

    /* Validate every enabled route, subscribe to the sources, and start
     * evaluating. */
    pub async fn arm(&self) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.lock().await;
        if inner.armed {
            return Ok(());
        }
        if !inner.routes.iter().any(|r| r.enabled) {
            return Err(CoordinatorError::NoRoutes);
        }

        /* Compile patterns and resolve both ends up front. */
        for route in inner.routes.iter_mut().filter(|r| r.enabled) {
            let regex = Regex::new(&route.source_pattern).map_err(|e| CoordinatorError::BadPattern {
                route: route.name.clone(),
                error: e.to_string(),
            })?;
            route.compiled = Some(regex);
        }
        for route in inner.routes.iter().filter(|r| r.enabled) {
            let source = self.pool.descriptor(&route.source_device_id).await;
            if source.is_none() {
                return Err(CoordinatorError::UnknownSource {
                    route: route.name.clone(),
                    device: route.source_device_id.clone(),
                });
            }
            let target =
                self.pool.descriptor(&route.action.target_device_id).await.ok_or_else(|| {
                    CoordinatorError::UnknownTarget {
                        route: route.name.clone(),
                        device: route.action.target_device_id.clone(),
                    }
                })?;
            if !target.has_capability(Capability::VoltageGlitch)
                && !target.has_capability(Capability::Emfi)
            {
                return Err(CoordinatorError::TargetNotGlitchCapable {
                    route: route.name.clone(),
                    device: route.action.target_device_id.clone(),
                });
            }
        }

        let _ = inner.disarm_tx.send_replace(false);

        /* One evaluation task per source; line events are delivered in
         * source order, routes fire sequentially within a source. */
        let mut sources: Vec<String> =
            inner.routes.iter().filter(|r| r.enabled).map(|r| r.source_device_id.clone()).collect();
        sources.sort();
        sources.dedup();

        for source in sources {
            let stream = self.pool.subscribe(&source).await?;
            let task = tokio::spawn(source_loop(
                source,
                stream,
                Arc::clone(&self.pool),
                Arc::clone(&self.inner),
                self.events_tx.clone(),
                inner.disarm_tx.subscribe(),
            ));
            inner.tasks.push(task);
        }

        inner.armed = true;
        info!("Coordinator armed ({} routes)", inner.routes.iter().filter(|r| r.enabled).count());
        Ok(())
    }

    /* Stop evaluating. Subscriptions are cancelled atomically; an action
     * already dispatched completes and is logged. */
    pub async fn disarm(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.armed {
            return;
        }
        let _ = inner.disarm_tx.send_replace(true);
        inner.tasks.clear();
        inner.armed = false;
        info!("Coordinator disarmed");
    }
}

/* Evaluation loop for one source device. */
async fn source_loop(
    source_id: String,
    mut stream: crate::sink::OutputStream,
    pool: Arc<DevicePool>,
    inner: Arc<Mutex<CoordInner>>,
    events_tx: broadcast::Sender<TriggerEvent>,
    mut disarm_rx: watch::Receiver<bool>,
) {
    debug!("Coordinator watching {source_id}");
    loop {
        let item = tokio::select! {
            item = stream.next() => item,
            _ = disarm_rx.wait_for(|disarmed| *disarmed) => break,
        };
        let Some(item) = item else {
            warn!("Source {source_id} output stream ended");
            break;
        };
        let Some(line) = item.text() else {
            continue;
        };

        let received = tokio::time::Instant::now();

        /* Claim matching routes under the lock so a burst of lines
         * cannot double-fire inside a debounce window. */
        let claimed: Vec<(String, RouteAction)> = {
            let mut inner = inner.lock().await;
            let mut claimed = Vec::new();
            for route in inner.routes.iter_mut() {
                if !route.enabled || route.source_device_id != source_id {
                    continue;
                }
                let Some(regex) = route.compiled.as_ref() else {
                    continue;
                };
                if !regex.is_match(line) {
                    continue;
                }
                if !route.may_fire(received) {
                    debug!("Route {} suppressed (debounce/cooldown)", route.name);
                    continue;
                }
                route.last_fire_time = Some(received);
                claimed.push((route.name.clone(), route.action.clone()));
            }
            claimed
        };

        /* Routes fire sequentially within one source subscription. */
        for (route_name, action) in claimed {
            let result = execute_action(&pool, &action).await;
            let latency_us = received.elapsed().as_micros() as u64;
            let (success, details, failure) = match result {
                Ok(()) => (true, format!("matched on {source_id}"), None),
                Err(failure) => {
                    let details = match &failure {
                        RouteFailure::TargetMissing => {
                            format!("target {} unavailable", action.target_device_id)
                        }
                        RouteFailure::ActionFailed(msg) => msg.clone(),
                    };
                    (false, details, Some(failure))
                }
            };

            let event = TriggerEvent {
                route_name: route_name.clone(),
                timestamp: SystemTime::now(),
                success,
                latency_us,
                details,
                failure,
            };

            {
                let mut inner = inner.lock().await;
                if success {
                    if let Some(route) = inner.routes.iter_mut().find(|r| r.name == route_name) {
                        route.fired_count += 1;
                    }
                }
                if inner.event_log.len() == EVENT_LOG_CAPACITY {
                    inner.event_log.pop_front();
                }
                inner.event_log.push_back(event.clone());
            }
            let _ = events_tx.send(event);
        }
    }
    debug!("Coordinator stopped watching {source_id}");
}

/* Resolve the target through the pool and run the action. A missing or
 * disconnected target is a non-fatal per-route failure. */
async fn execute_action(pool: &DevicePool, action: &RouteAction) -> Result<(), RouteFailure> {
    let target = &action.target_device_id;
    let result = match &action.operation {
        RouteOperation::Glitch { config } => {
            let config = *config;
            pool.with_glitch(target, move |glitch| {
                Box::pin(async move {
                    glitch.configure_glitch(&config).await?;
                    glitch.trigger().await
                })
            })
            .await
        }
        RouteOperation::ArmOnly { config } => {
            let config = *config;
            pool.with_glitch(target, move |glitch| {
                Box::pin(async move {
                    glitch.configure_glitch(&config).await?;
                    glitch.arm().await
                })
            })
            .await
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(PoolError::UnknownDevice(_)) => Err(RouteFailure::TargetMissing),
        Err(PoolError::Driver(crate::driver::DriverError::NotConnected)) => {
            Err(RouteFailure::TargetMissing)
        }
        Err(other) => Err(RouteFailure::ActionFailed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BusType, Catalog, CatalogEntry, DriverConstants};
    use crate::device::{
        Capability, DeviceDescriptor, DeviceEvent, EndpointPath, OutputChannel, TriggerEdge,
    };
    use crate::driver::{Backend, BackendRegistry, DriverError, Glitch};
    use crate::sink::OutputSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct MockGlitchBackend {
        connected: bool,
        triggers: Arc<AtomicU32>,
        arms: Arc<AtomicU32>,
        last_config: Arc<Mutex<Option<GlitchConfig>>>,
    }

    #[async_trait]
    impl Backend for MockGlitchBackend {
        fn name(&self) -> &str {
            "mockglitch"
        }
        fn connected(&self) -> bool {
            self.connected
        }
        async fn connect(&mut self) -> Result<(), DriverError> {
            self.connected = true;
            Ok(())
        }
        async fn disconnect(&mut self) -> Result<(), DriverError> {
            self.connected = false;
            Ok(())
        }
        async fn info(&mut self) -> Result<serde_json::Value, DriverError> {
            Ok(serde_json::json!({}))
        }
        fn as_glitch(&mut self) -> Option<&mut dyn Glitch> {
            Some(self)
        }
    }

    #[async_trait]
    impl Glitch for MockGlitchBackend {
        async fn configure_glitch(&mut self, config: &GlitchConfig) -> Result<(), DriverError> {
            *self.last_config.lock().await = Some(*config);
            Ok(())
        }
        async fn arm(&mut self) -> Result<(), DriverError> {
            self.arms.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn trigger(&mut self) -> Result<(), DriverError> {
            self.triggers.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn disarm(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    struct Fixture {
        pool: Arc<DevicePool>,
        coordinator: Coordinator,
        triggers: Arc<AtomicU32>,
        arms: Arc<AtomicU32>,
        last_config: Arc<Mutex<Option<GlitchConfig>>>,
    }

    fn uart_descriptor(id: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.into(),
            name: "Target console".into(),
            vendor_id: 0x1209,
            product_id: 0x0002,
            serial: None,
            endpoints: vec![EndpointPath { path: format!("/dev/tty{id}").into(), role: "uart".into() }],
            capabilities: [Capability::Uart].into_iter().collect(),
        }
    }

    fn glitch_descriptor(id: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.into(),
            name: "Glitcher".into(),
            vendor_id: 0x1209,
            product_id: 0x0003,
            serial: None,
            endpoints: vec![EndpointPath { path: format!("/dev/tty{id}").into(), role: "api".into() }],
            capabilities: [Capability::VoltageGlitch, Capability::LogicAnalyzer]
                .into_iter()
                .collect(),
        }
    }

    async fn fixture() -> Fixture {
        let triggers = Arc::new(AtomicU32::new(0));
        let arms = Arc::new(AtomicU32::new(0));
        let last_config = Arc::new(Mutex::new(None));

        let mut registry = BackendRegistry::new();
        {
            let triggers = Arc::clone(&triggers);
            let arms = Arc::clone(&arms);
            let last_config = Arc::clone(&last_config);
            registry.register("mockglitch", move |_d, _e, _s| {
                Box::new(MockGlitchBackend {
                    connected: false,
                    triggers: Arc::clone(&triggers),
                    arms: Arc::clone(&arms),
                    last_config: Arc::clone(&last_config),
                })
            });
        }
        /* Source devices are only subscribed to, never opened. */
        registry.register("mockuart", |_d, _e, _s| {
            unreachable!("source device is never opened in these tests")
        });

        let mut catalog = Catalog::new();
        catalog.insert(
            (BusType::Usb, 0x1209, 0x0002),
            Arc::new(CatalogEntry {
                name: "Console".into(),
                driver: "mockuart".into(),
                matches: Vec::new(),
                endpoint_roles: vec!["uart".into()],
                constants: DriverConstants::default(),
            }),
        );
        catalog.insert(
            (BusType::Usb, 0x1209, 0x0003),
            Arc::new(CatalogEntry {
                name: "Glitcher".into(),
                driver: "mockglitch".into(),
                matches: Vec::new(),
                endpoint_roles: vec!["api".into()],
                constants: DriverConstants::default(),
            }),
        );

        let pool = Arc::new(DevicePool::new(registry, catalog));
        pool.apply_event(DeviceEvent::Added(uart_descriptor("uartA"))).await;
        pool.apply_event(DeviceEvent::Added(glitch_descriptor("glitchB"))).await;

        Fixture {
            coordinator: Coordinator::new(Arc::clone(&pool)),
            pool,
            triggers,
            arms,
            last_config,
        }
    }

    fn boot_ok_route(debounce_ms: u64, cooldown_ms: u64) -> TriggerRoute {
        TriggerRoute::new(
            "uart_glitch_1",
            "uartA",
            "BOOT OK",
            RouteAction {
                target_device_id: "glitchB".into(),
                operation: RouteOperation::Glitch {
                    config: GlitchConfig {
                        width_ns: 100,
                        offset_ns: 0,
                        repeat: 1,
                        trigger_channel: None,
                        trigger_edge: TriggerEdge::Falling,
                    },
                },
            },
        )
        .with_windows(debounce_ms, cooldown_ms)
    }

    async fn inject(pool: &DevicePool, device: &str, line: &str) {
        let sink = pool.sink_for_test(device).await.unwrap();
        sink.publish(crate::device::DeviceOutput::line(device, OutputChannel::Uart, line));
        /* Let the evaluation task run. */
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn arm_requires_enabled_routes() {
        let fx = fixture().await;
        assert!(matches!(fx.coordinator.arm().await, Err(CoordinatorError::NoRoutes)));
    }

    #[tokio::test]
    async fn arm_rejects_bad_pattern() {
        let fx = fixture().await;
        let mut route = boot_ok_route(0, 0);
        route.source_pattern = "BOOT [".into();
        fx.coordinator.add_route(route).await.unwrap();
        assert!(matches!(
            fx.coordinator.arm().await,
            Err(CoordinatorError::BadPattern { .. })
        ));
    }

    #[tokio::test]
    async fn arm_rejects_unknown_target() {
        let fx = fixture().await;
        let mut route = boot_ok_route(0, 0);
        route.action.target_device_id = "ghost".into();
        fx.coordinator.add_route(route).await.unwrap();
        assert!(matches!(
            fx.coordinator.arm().await,
            Err(CoordinatorError::UnknownTarget { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_route_names_rejected() {
        let fx = fixture().await;
        fx.coordinator.add_route(boot_ok_route(0, 0)).await.unwrap();
        assert!(matches!(
            fx.coordinator.add_route(boot_ok_route(0, 0)).await,
            Err(CoordinatorError::DuplicateRoute(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn route_fires_on_match() {
        let fx = fixture().await;
        fx.pool.open("glitchB").await.unwrap();
        fx.coordinator.add_route(boot_ok_route(0, 0)).await.unwrap();
        fx.coordinator.arm().await.unwrap();

        inject(&fx.pool, "uartA", "boot banner").await;
        inject(&fx.pool, "uartA", "BOOT OK - entering app").await;

        assert_eq!(fx.triggers.load(Ordering::SeqCst), 1);
        let events = fx.coordinator.events().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].success);
        assert_eq!(events[0].route_name, "uart_glitch_1");
        let cfg = fx.last_config.lock().await.unwrap();
        assert_eq!(cfg.width_ns, 100);

        let routes = fx.coordinator.routes().await;
        assert_eq!(routes[0].fired_count, 1);
        fx.coordinator.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_and_cooldown_suppress_refires() {
        let fx = fixture().await;
        fx.pool.open("glitchB").await.unwrap();
        fx.coordinator.add_route(boot_ok_route(100, 500)).await.unwrap();
        fx.coordinator.arm().await.unwrap();

        /* t=0: fires. */
        inject(&fx.pool, "uartA", "BOOT OK").await;
        /* t=50ms: inside the debounce window, dropped. */
        tokio::time::sleep(Duration::from_millis(49)).await;
        inject(&fx.pool, "uartA", "BOOT OK").await;
        /* t=600ms: past debounce and cooldown, fires again. */
        tokio::time::sleep(Duration::from_millis(549)).await;
        inject(&fx.pool, "uartA", "BOOT OK").await;

        assert_eq!(fx.triggers.load(Ordering::SeqCst), 2);
        let events = fx.coordinator.events().await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.success));
        fx.coordinator.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_target_is_nonfatal() {
        let fx = fixture().await;
        /* glitchB exists but is never opened: resolution fails at fire
         * time and other routes keep running. */
        fx.coordinator.add_route(boot_ok_route(0, 0)).await.unwrap();
        fx.coordinator.arm().await.unwrap();

        inject(&fx.pool, "uartA", "BOOT OK").await;
        inject(&fx.pool, "uartA", "BOOT OK").await;

        assert_eq!(fx.triggers.load(Ordering::SeqCst), 0);
        let events = fx.coordinator.events().await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| !e.success));
        assert_eq!(events[0].failure, Some(RouteFailure::TargetMissing));
        assert!(fx.coordinator.is_armed().await);
        fx.coordinator.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn arm_only_route_arms_without_trigger() {
        let fx = fixture().await;
        fx.pool.open("glitchB").await.unwrap();

        let mut route = boot_ok_route(0, 0);
        route.action.operation = RouteOperation::ArmOnly {
            config: GlitchConfig {
                trigger_channel: Some(2),
                ..GlitchConfig::default()
            },
        };
        fx.coordinator.add_route(route).await.unwrap();
        fx.coordinator.arm().await.unwrap();

        inject(&fx.pool, "uartA", "BOOT OK").await;

        assert_eq!(fx.arms.load(Ordering::SeqCst), 1);
        assert_eq!(fx.triggers.load(Ordering::SeqCst), 0);
        fx.coordinator.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_stops_evaluation() {
        let fx = fixture().await;
        fx.pool.open("glitchB").await.unwrap();
        fx.coordinator.add_route(boot_ok_route(0, 0)).await.unwrap();
        fx.coordinator.arm().await.unwrap();

        inject(&fx.pool, "uartA", "BOOT OK").await;
        fx.coordinator.disarm().await;
        assert!(!fx.coordinator.is_armed().await);
        /* Let the evaluation task observe the disarm and exit. */
        tokio::time::sleep(Duration::from_millis(1)).await;

        inject(&fx.pool, "uartA", "BOOT OK").await;
        assert_eq!(fx.triggers.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn may_fire_windows() {
        let route = boot_ok_route(100, 500);
        /* Never fired: always allowed. */
        assert!(route.may_fire(tokio::time::Instant::now()));
    }
}
