// ── HVAC session ──
//
// The context object consumers hold: device registry, realtime channels,
// command dispatcher, weather, history and vendor stores, and the
// notification hub, with an explicit start/shutdown lifecycle.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hvaclink_api::models::CreateDeviceRequest;
use hvaclink_api::vendor::models::{GroupSetting, HvacSystem, IndoorUnit, UnitProperties};
use hvaclink_api::{ControlClient, RealtimeMessage, VendorClient};

use crate::backend::{ControlBackend, VendorBackend};
use crate::channel::RealtimeChannel;
use crate::command::{Command, CommandClass, FleetCommand};
use crate::config::SessionConfig;
use crate::convert::devices_from_wire;
use crate::dispatch::{CommandDispatcher, FleetActivity};
use crate::error::CoreError;
use crate::event::{self, DeviceEvent, WeatherEvent};
use crate::feed::DeviceFeed;
use crate::history::HistoryLog;
use crate::interaction::DialControl;
use crate::model::{Device, DeviceSn};
use crate::notify::{Notification, Notifier};
use crate::store::DeviceRegistry;
use crate::vendor::VendorStore;
use crate::weather::WeatherStore;

// ── ConnectionState ──────────────────────────────────────────────────

/// Device channel state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── HvacSession ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Nothing connects until
/// [`start()`](Self::start); [`shutdown()`](Self::shutdown) tears every
/// channel and timer down.
#[derive(Clone)]
pub struct HvacSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    backend: Arc<dyn ControlBackend>,
    vendor_backend: Option<Arc<dyn VendorBackend>>,
    registry: DeviceRegistry,
    dispatcher: CommandDispatcher,
    notifier: Notifier,
    weather: WeatherStore,
    history: HistoryLog,
    vendor: VendorStore,
    connection_state: watch::Sender<ConnectionState>,
    /// Set from connect (or an explicit refresh) until the next snapshot.
    snapshot_loading: watch::Sender<bool>,
    device_channel: Option<RealtimeChannel>,
    weather_channel: Option<RealtimeChannel>,
    cancel: CancellationToken,
}

impl HvacSession {
    /// Build a session talking to the control API over HTTP.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let client = ControlClient::new(config.api_url.clone(), &transport)?;
        let vendor = match config.vendor_url {
            Some(ref url) => {
                let vendor: Arc<dyn VendorBackend> =
                    Arc::new(VendorClient::new(url.clone(), &transport)?);
                Some(vendor)
            }
            None => None,
        };
        Ok(Self::with_backends(config, Arc::new(client), vendor))
    }

    /// Build a session over any control backend, without a vendor gateway.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_backend(config: SessionConfig, backend: Arc<dyn ControlBackend>) -> Self {
        Self::with_backends(config, backend, None)
    }

    /// Build a session over any control and vendor backends.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_backends(
        config: SessionConfig,
        backend: Arc<dyn ControlBackend>,
        vendor_backend: Option<Arc<dyn VendorBackend>>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let notifier = Notifier::new();
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&backend),
            config.debounce,
            notifier.clone(),
            cancel.child_token(),
        );
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (snapshot_loading, _) = watch::channel(false);

        let device_channel = config.realtime_url.clone().map(|url| {
            RealtimeChannel::new(
                "devices",
                url,
                vec![event::request_all_devices(&config.search)],
                config.reconnect.clone(),
                cancel.clone(),
            )
        });
        let weather_channel = config.weather_url.clone().map(|url| {
            RealtimeChannel::new(
                "weather",
                url,
                vec![config.weather_query.to_frame()],
                config.reconnect.clone(),
                cancel.clone(),
            )
        });

        Self {
            inner: Arc::new(SessionInner {
                config,
                backend,
                vendor_backend,
                registry: DeviceRegistry::new(),
                dispatcher,
                notifier,
                weather: WeatherStore::new(),
                history: HistoryLog::new(),
                vendor: VendorStore::new(),
                connection_state,
                snapshot_loading,
                device_channel,
                weather_channel,
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the realtime channels. Idempotent: channels that are already
    /// open are left alone.
    pub fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }

        if let Some(ref channel) = self.inner.device_channel {
            let weak = Arc::downgrade(&self.inner);
            if channel.open(move |msg| with_inner(&weak, |inner| inner.on_device_message(&msg))) {
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Connecting);
            }
        } else {
            debug!("no realtime URL configured, push updates disabled");
        }

        if let Some(ref channel) = self.inner.weather_channel {
            let weak = Arc::downgrade(&self.inner);
            channel.open(move |msg| with_inner(&weak, |inner| inner.on_weather_message(&msg)));
        }

        Ok(())
    }

    /// Cancel pending commands, close channels, stop background tasks.
    pub fn shutdown(&self) {
        self.inner.dispatcher.shutdown();
        if let Some(ref channel) = self.inner.device_channel {
            channel.close();
        }
        if let Some(ref channel) = self.inner.weather_channel {
            channel.close();
        }
        self.inner.cancel.cancel();
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        self.inner.snapshot_loading.send_replace(false);
        debug!("session shut down");
    }

    /// Run `f` against a started session, then shut it down.
    pub async fn oneshot<F, Fut, T>(config: SessionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(HvacSession) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let session = HvacSession::new(config)?;
        session.start()?;
        let result = f(session.clone()).await;
        session.shutdown();
        result
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Fetch the device list over REST and replace the registry with it.
    /// Returns the number of devices loaded.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        self.ensure_open()?;
        self.inner.snapshot_loading.send_replace(true);
        let result = self.inner.backend.list_devices().await;
        self.inner.snapshot_loading.send_replace(false);

        match result {
            Ok(records) => {
                let devices = devices_from_wire(&records);
                let count = devices.len();
                self.inner.registry.replace_all(devices);
                info!(count, "device list refreshed");
                Ok(count)
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.notifier.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Ask the backend to push a fresh snapshot over the device channel.
    pub fn request_snapshot(&self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.inner.request_snapshot()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Validate and schedule a debounced command. Outcomes arrive as
    /// notifications.
    pub fn send_command(&self, serial: DeviceSn, command: Command) -> Result<(), CoreError> {
        self.inner.dispatcher.send_command(serial, command)
    }

    pub fn send(
        &self,
        serial: DeviceSn,
        class: CommandClass,
        parameter: i64,
    ) -> Result<(), CoreError> {
        self.inner.dispatcher.send(serial, class, parameter)
    }

    /// Send a command now, bypassing the debounce window.
    pub async fn execute_command(
        &self,
        serial: &DeviceSn,
        command: Command,
    ) -> Result<String, CoreError> {
        self.ensure_open()?;
        self.inner.dispatcher.execute(serial, command).await
    }

    /// Finish a drag on `dial`: schedule the committed value and return the
    /// dial to idle. Returns whether a command was scheduled.
    pub fn commit_dial(&self, serial: &DeviceSn, dial: &mut DialControl) -> Result<bool, CoreError> {
        let Some(command) = dial.pointer_up() else {
            return Ok(false);
        };
        let result = self.send_command(serial.clone(), command);
        dial.finish_commit();
        result.map(|()| true)
    }

    /// A +/- tap on `dial`: schedule one step past its current target.
    /// Taps inside the debounce window collapse into a single command.
    pub fn step_dial(
        &self,
        serial: &DeviceSn,
        dial: &mut DialControl,
        delta: i64,
    ) -> Result<bool, CoreError> {
        let Some(command) = dial.step(delta) else {
            return Ok(false);
        };
        let result = self.send_command(serial.clone(), command);
        dial.finish_commit();
        if result.is_err() {
            dial.settle();
        }
        result.map(|()| true)
    }

    pub async fn master_power(&self, on: bool) -> Result<String, CoreError> {
        self.inner
            .dispatcher
            .execute_fleet(FleetCommand::Power { on })
            .await
    }

    pub async fn unlock_all(&self) -> Result<String, CoreError> {
        self.inner.dispatcher.execute_fleet(FleetCommand::UnlockAll).await
    }

    // ── Device management ────────────────────────────────────────────

    /// Register a new device. The registry picks it up from the realtime
    /// push that follows.
    pub async fn create_device(&self, request: &CreateDeviceRequest) -> Result<String, CoreError> {
        self.ensure_open()?;
        let result = self.inner.backend.create_device(request).await;
        self.report(result.map(|created| {
            let serial = created.device_sn.unwrap_or_else(|| request.device_sn.clone());
            format!("Device {serial} created successfully")
        }))
    }

    /// Delete a device by backend record id. The registry is left to the
    /// realtime delete event.
    pub async fn delete_device(&self, record_id: i64) -> Result<String, CoreError> {
        self.ensure_open()?;
        let result = self.inner.backend.delete_device(record_id).await;
        self.report(result.map(|message| {
            let message = message.unwrap_or_else(|| format!("Device {record_id} deleted"));
            format!("{}.", message.trim_end_matches('.'))
        }))
    }

    /// Look up a device's backend record id (needed for delete).
    pub fn record_id(&self, serial: &str) -> Result<i64, CoreError> {
        self.inner
            .registry
            .get_by_id(serial)
            .and_then(|d| d.record_id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                serial: serial.to_owned(),
            })
    }

    // ── History ──────────────────────────────────────────────────────

    /// Load a page of device history. Page 1 starts a fresh log.
    pub async fn load_history(&self, search: &str, page: u32) -> Result<(), CoreError> {
        self.ensure_open()?;
        match self.inner.backend.device_history(search, page.max(1)).await {
            Ok(fetched) => {
                self.inner.history.apply_page(search, fetched);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.notifier.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Load the page after the last one fetched. Returns `false` when there
    /// is nothing more to load.
    pub async fn next_history_page(&self) -> Result<bool, CoreError> {
        let Some(page) = self.inner.history.next_page() else {
            return Ok(false);
        };
        let search = self.inner.history.search();
        self.load_history(&search, page).await?;
        Ok(true)
    }

    pub fn history(&self) -> &HistoryLog {
        &self.inner.history
    }

    // ── Vendor gateway ───────────────────────────────────────────────

    /// Fetch the gateway's indoor-unit listing into the vendor store.
    pub async fn vendor_units(&self) -> Result<Vec<IndoorUnit>, CoreError> {
        let gateway = self.vendor_backend()?;
        let units = self
            .vendor_call("Vendor device list fetched.", gateway.list_units())
            .await?;
        self.inner.vendor.set_units(units.clone());
        Ok(units)
    }

    /// Apply a group power setting. The returned system record replaces the
    /// stored unit listing.
    pub async fn apply_group_setting(
        &self,
        setting: &GroupSetting,
    ) -> Result<HvacSystem, CoreError> {
        if setting.device_sns.is_empty() {
            return Err(self.rejected("A group setting needs at least one device."));
        }
        let gateway = self.vendor_backend()?;
        let system = self
            .vendor_call("HVAC data updated.", gateway.group_setting(setting))
            .await?;
        self.inner.vendor.set_system(system.clone());
        Ok(system)
    }

    /// Fetch live properties for `serials` into the vendor store.
    pub async fn unit_properties(
        &self,
        serials: &[String],
    ) -> Result<Vec<UnitProperties>, CoreError> {
        if serials.is_empty() {
            return Err(self.rejected("No devices to query."));
        }
        let gateway = self.vendor_backend()?;
        let properties = self
            .vendor_call("Device properties fetched.", gateway.unit_properties(serials))
            .await?;
        self.inner.vendor.set_properties(properties.clone());
        Ok(properties)
    }

    /// Drop everything the gateway reported.
    pub fn reset_vendor(&self) {
        self.inner.vendor.reset();
        self.inner.notifier.info("HVAC data reset.");
    }

    // ── State observation ────────────────────────────────────────────

    pub fn registry(&self) -> &DeviceRegistry {
        &self.inner.registry
    }

    pub fn devices(&self) -> DeviceFeed {
        self.inner.registry.subscribe()
    }

    pub fn device(&self, serial: &str) -> Option<Device> {
        self.inner.registry.get_by_id(serial)
    }

    pub fn notifications(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.notifier.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn snapshot_loading(&self) -> watch::Receiver<bool> {
        self.inner.snapshot_loading.subscribe()
    }

    pub fn is_updating(&self, serial: &str) -> bool {
        self.inner.dispatcher.is_updating(serial)
    }

    pub fn updating(&self) -> watch::Receiver<BTreeMap<DeviceSn, usize>> {
        self.inner.dispatcher.subscribe_updating()
    }

    pub fn fleet_activity(&self) -> watch::Receiver<FleetActivity> {
        self.inner.dispatcher.subscribe_fleet()
    }

    pub fn weather(&self) -> &WeatherStore {
        &self.inner.weather
    }

    pub fn vendor(&self) -> &VendorStore {
        &self.inner.vendor
    }

    // ── Internals ────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            Err(CoreError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn vendor_backend(&self) -> Result<Arc<dyn VendorBackend>, CoreError> {
        self.ensure_open()?;
        self.inner
            .vendor_backend
            .clone()
            .ok_or_else(|| CoreError::Config {
                message: "no vendor gateway URL configured".into(),
            })
    }

    fn rejected(&self, message: &str) -> CoreError {
        self.inner.notifier.error(message);
        CoreError::validation(message)
    }

    /// Run one gateway request under the vendor loading flag and notify
    /// the outcome.
    async fn vendor_call<T>(
        &self,
        success: &str,
        request: impl std::future::Future<Output = Result<T, hvaclink_api::Error>>,
    ) -> Result<T, CoreError> {
        self.inner.vendor.set_loading(true);
        let result = request.await;
        self.inner.vendor.set_loading(false);
        match result {
            Ok(value) => {
                self.inner.notifier.success(success);
                Ok(value)
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "vendor gateway request failed");
                self.inner.notifier.error(err.user_message());
                Err(err)
            }
        }
    }

    fn report(
        &self,
        result: Result<String, hvaclink_api::Error>,
    ) -> Result<String, CoreError> {
        match result {
            Ok(message) => {
                self.inner.notifier.success(message.clone());
                Ok(message)
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.notifier.error(err.user_message());
                Err(err)
            }
        }
    }
}

fn with_inner(weak: &Weak<SessionInner>, f: impl FnOnce(&SessionInner)) {
    if let Some(inner) = weak.upgrade() {
        f(&inner);
    }
}

// ── Realtime message handling ────────────────────────────────────────

impl SessionInner {
    fn request_snapshot(&self) -> Result<(), CoreError> {
        let Some(ref channel) = self.device_channel else {
            return Err(CoreError::ChannelDisconnected {
                reason: "no realtime URL configured".into(),
            });
        };
        channel.emit(event::request_all_devices(&self.config.search))?;
        self.snapshot_loading.send_replace(true);
        Ok(())
    }

    fn on_device_message(&self, message: &RealtimeMessage) {
        match message {
            RealtimeMessage::Connected => {
                self.connection_state.send_replace(ConnectionState::Connected);
                self.snapshot_loading.send_replace(true);
                self.notifier.info("Realtime channel connected.");
            }
            RealtimeMessage::Frame(frame) => match DeviceEvent::decode(frame) {
                Ok(Some(event)) => self.on_device_event(&event),
                Ok(None) => debug!(event = %frame.event, "ignoring unknown realtime event"),
                Err(e) => warn!(event = %frame.event, error = %e, "dropping realtime event"),
            },
            RealtimeMessage::Disconnected { reason } => {
                self.connection_state
                    .send_replace(ConnectionState::Disconnected);
                self.snapshot_loading.send_replace(false);
                let err = CoreError::ChannelDisconnected {
                    reason: reason.clone(),
                };
                self.notifier.error(err.user_message());
            }
        }
    }

    fn on_device_event(&self, event: &DeviceEvent) {
        if let DeviceEvent::ResyncRequested { count } = event {
            self.notifier
                .success(format!("Synced {count} devices from host."));
            if let Err(e) = self.request_snapshot() {
                warn!(error = %e, "could not request snapshot after resync");
            }
            return;
        }

        self.registry.apply(event);
        if matches!(event, DeviceEvent::Snapshot(_)) {
            self.snapshot_loading.send_replace(false);
        }
    }

    fn on_weather_message(&self, message: &RealtimeMessage) {
        match message {
            RealtimeMessage::Connected => self.weather.set_loading(true),
            RealtimeMessage::Frame(frame) => match WeatherEvent::decode(frame) {
                Ok(Some(event)) => self.weather.apply(event),
                Ok(None) => debug!(event = %frame.event, "ignoring unknown weather event"),
                Err(e) => warn!(event = %frame.event, error = %e, "dropping weather event"),
            },
            RealtimeMessage::Disconnected { reason } => {
                self.weather.set_loading(false);
                warn!(%reason, "weather channel disconnected");
            }
        }
    }
}
