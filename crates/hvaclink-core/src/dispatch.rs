// ── Command dispatcher ──
//
// Turns user intents into control requests. Single-device commands are
// validated, then debounced per (device, class): only the last command in
// a burst is sent. Fleet commands bypass debouncing. Every outcome is
// reported through the `Notifier`; the registry is never touched here,
// authoritative state arrives over the realtime channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ControlBackend;
use crate::command::{Coalescer, Command, CommandClass, DebounceWindows, FleetCommand};
use crate::error::CoreError;
use crate::model::{DeviceSn, RunMode};
use crate::notify::Notifier;

type CommandKey = (DeviceSn, CommandClass);

/// Which fleet operations are currently running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetActivity {
    pub master_power: bool,
    pub unlock_all: bool,
}

impl FleetActivity {
    pub fn is_busy(&self) -> bool {
        self.master_power || self.unlock_all
    }

    fn flag(&mut self, command: FleetCommand) -> &mut bool {
        match command {
            FleetCommand::Power { .. } => &mut self.master_power,
            FleetCommand::UnlockAll => &mut self.unlock_all,
        }
    }
}

/// Debounced command sender. Cheap to clone; clones share timers and
/// in-flight bookkeeping.
#[derive(Clone)]
pub struct CommandDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    backend: Arc<dyn ControlBackend>,
    windows: DebounceWindows,
    coalescer: Coalescer<CommandKey, Command>,
    notifier: Notifier,
    /// Outstanding request count per device.
    in_flight: watch::Sender<BTreeMap<DeviceSn, usize>>,
    fleet: watch::Sender<FleetActivity>,
    cancel: CancellationToken,
}

impl CommandDispatcher {
    /// Create a dispatcher and spawn its delivery worker.
    ///
    /// Must be called from within a tokio runtime. The worker stops when
    /// `cancel` fires or [`shutdown`](Self::shutdown) is called.
    pub fn new(
        backend: Arc<dyn ControlBackend>,
        windows: DebounceWindows,
        notifier: Notifier,
        cancel: CancellationToken,
    ) -> Self {
        let (coalescer, ready_rx) = Coalescer::new();
        let (in_flight, _) = watch::channel(BTreeMap::new());
        let (fleet, _) = watch::channel(FleetActivity::default());

        let dispatcher = Self {
            inner: Arc::new(DispatcherInner {
                backend,
                windows,
                coalescer,
                notifier,
                in_flight,
                fleet,
                cancel,
            }),
        };

        let worker = dispatcher.clone();
        tokio::spawn(async move { worker.deliver_ready(ready_rx).await });

        dispatcher
    }

    // ── Single-device commands ───────────────────────────────────────

    /// Validate and schedule a command for `serial`.
    ///
    /// A command that fails validation raises an error notification and is
    /// never sent. Otherwise it replaces any pending command of the same
    /// class for the same device and fires after that class's window.
    pub fn send_command(&self, serial: DeviceSn, command: Command) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }
        if let Err(e) = command.validate() {
            self.inner.notifier.error(e.user_message());
            return Err(e);
        }

        let class = command.class();
        let window = self.inner.windows.window(class);
        debug!(%serial, ?class, ?window, "scheduling command");
        self.inner.coalescer.schedule((serial, class), command, window);
        Ok(())
    }

    /// Schedule a command given as a class plus raw parameter.
    pub fn send(
        &self,
        serial: DeviceSn,
        class: CommandClass,
        parameter: i64,
    ) -> Result<(), CoreError> {
        self.send_command(serial, Command::from_class(class, parameter))
    }

    /// Drop a pending (not yet sent) command. Returns whether one was pending.
    pub fn cancel_pending(&self, serial: &DeviceSn, class: CommandClass) -> bool {
        self.inner.coalescer.cancel(&(serial.clone(), class))
    }

    pub fn pending_len(&self) -> usize {
        self.inner.coalescer.pending_len()
    }

    /// Send a command now, without debouncing, and report the outcome.
    ///
    /// Returns the success message on success. Failures are notified and
    /// returned; nothing is rolled back locally.
    pub async fn execute(&self, serial: &DeviceSn, command: Command) -> Result<String, CoreError> {
        if let Err(e) = command.validate() {
            self.inner.notifier.error(e.user_message());
            return Err(e);
        }

        self.mark_in_flight(serial);
        let result = self.perform(serial, command).await;
        self.clear_in_flight(serial);

        match &result {
            Ok(message) => {
                info!(%serial, %command, "command applied");
                self.inner.notifier.success(message.clone());
            }
            Err(e) => {
                warn!(%serial, %command, error = %e, "command failed");
                self.inner.notifier.error(e.user_message());
            }
        }
        result
    }

    async fn perform(&self, serial: &DeviceSn, command: Command) -> Result<String, CoreError> {
        let backend = &self.inner.backend;

        if command == Command::PowerToggle {
            let device = backend.toggle_power(serial.as_str()).await?;
            let off = device.run_mode.map(RunMode::from_code).is_none_or(RunMode::is_off);
            let state = if off { "off" } else { "on" };
            return Ok(format!("Device '{serial}' is powered {state}."));
        }

        let Some(request) = command.to_request(serial.as_str()) else {
            return Err(CoreError::Internal(format!(
                "no control instruction for {command}"
            )));
        };
        let ack = backend.control_device(&request).await?;
        Ok(match ack.summary() {
            Some(summary) => format!("{summary} of '{serial}'."),
            None => format!("{command} on '{serial}'."),
        })
    }

    // ── Fleet commands ───────────────────────────────────────────────

    /// Run a fleet-wide command immediately.
    pub async fn execute_fleet(&self, command: FleetCommand) -> Result<String, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }

        self.inner.fleet.send_modify(|a| *a.flag(command) = true);
        let result = self.perform_fleet(command).await;
        self.inner.fleet.send_modify(|a| *a.flag(command) = false);

        match &result {
            Ok(message) => self.inner.notifier.success(message.clone()),
            Err(e) => {
                warn!(?command, error = %e, "fleet command failed");
                self.inner.notifier.error(e.user_message());
            }
        }
        result
    }

    async fn perform_fleet(&self, command: FleetCommand) -> Result<String, CoreError> {
        let backend = &self.inner.backend;
        match command {
            FleetCommand::Power { on } => {
                let instructions = command.instructions().unwrap_or_default();
                backend.control_all(&instructions).await?;
                let state = if on { "on" } else { "off" };
                Ok(format!("All devices are powered {state}."))
            }
            FleetCommand::UnlockAll => {
                backend.unlock_all().await?;
                Ok("All devices are unlocked.".to_owned())
            }
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Whether a request for `serial` is currently outstanding.
    pub fn is_updating(&self, serial: &str) -> bool {
        self.inner.in_flight.borrow().contains_key(serial)
    }

    /// Serials with at least one outstanding request.
    pub fn updating(&self) -> Vec<DeviceSn> {
        self.inner.in_flight.borrow().keys().cloned().collect()
    }

    /// Subscribe to in-flight changes (serial -> outstanding request count).
    pub fn subscribe_updating(&self) -> watch::Receiver<BTreeMap<DeviceSn, usize>> {
        self.inner.in_flight.subscribe()
    }

    pub fn fleet_activity(&self) -> FleetActivity {
        *self.inner.fleet.borrow()
    }

    pub fn subscribe_fleet(&self) -> watch::Receiver<FleetActivity> {
        self.inner.fleet.subscribe()
    }

    /// Drop every pending command and stop the delivery worker.
    pub fn shutdown(&self) {
        self.inner.coalescer.cancel_all();
        self.inner.cancel.cancel();
    }

    // ── Internals ────────────────────────────────────────────────────

    fn mark_in_flight(&self, serial: &DeviceSn) {
        self.inner.in_flight.send_modify(|m| {
            *m.entry(serial.clone()).or_insert(0) += 1;
        });
    }

    fn clear_in_flight(&self, serial: &DeviceSn) {
        self.inner.in_flight.send_modify(|m| {
            if let Some(count) = m.get_mut(serial) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    m.remove(serial);
                }
            }
        });
    }

    async fn deliver_ready(self, mut ready_rx: mpsc::UnboundedReceiver<(CommandKey, Command)>) {
        let cancel = self.inner.cancel.clone();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                ready = ready_rx.recv() => {
                    let Some(((serial, _class), command)) = ready else { break };
                    let dispatcher = self.clone();
                    tokio::spawn(async move {
                        // Outcome already notified
                        let _ = dispatcher.execute(&serial, command).await;
                    });
                }
            }
        }
        debug!("command delivery worker stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use hvaclink_api::Error as ApiError;
    use hvaclink_api::models::{
        ControlAck, ControlRequest, CreateDeviceRequest, HistoryPage, Instruction, WireDevice,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command::LockKind;
    use crate::notify::NotificationLevel;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Control(ControlRequest),
        Toggle(String),
        ControlAll(Vec<Instruction>),
        UnlockAll,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail_with: Mutex<Option<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with.lock().unwrap().clone() {
                Some(message) => Err(ApiError::Backend {
                    message,
                    status: Some(500),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ControlBackend for Recorder {
        async fn list_devices(&self) -> Result<Vec<WireDevice>, ApiError> {
            Ok(Vec::new())
        }

        async fn control_device(&self, request: &ControlRequest) -> Result<ControlAck, ApiError> {
            self.record(Call::Control(request.clone()))?;
            Ok(ControlAck::default())
        }

        async fn toggle_power(&self, serial: &str) -> Result<WireDevice, ApiError> {
            self.record(Call::Toggle(serial.to_owned()))?;
            Ok(WireDevice {
                device_sn: Some(serial.to_owned()),
                run_mode: Some(66),
                ..WireDevice::default()
            })
        }

        async fn control_all(
            &self,
            instructions: &[Instruction],
        ) -> Result<Option<String>, ApiError> {
            self.record(Call::ControlAll(instructions.to_vec()))?;
            Ok(None)
        }

        async fn unlock_all(&self) -> Result<Option<String>, ApiError> {
            self.record(Call::UnlockAll)?;
            Ok(None)
        }

        async fn create_device(
            &self,
            _request: &CreateDeviceRequest,
        ) -> Result<WireDevice, ApiError> {
            Ok(WireDevice::default())
        }

        async fn delete_device(&self, _id: i64) -> Result<Option<String>, ApiError> {
            Ok(None)
        }

        async fn device_history(&self, _search: &str, _page: u32) -> Result<HistoryPage, ApiError> {
            Err(ApiError::Backend {
                message: "not recorded".into(),
                status: None,
            })
        }
    }

    fn dispatcher() -> (CommandDispatcher, Arc<Recorder>, Notifier) {
        let recorder = Arc::new(Recorder::default());
        let notifier = Notifier::new();
        let dispatcher = CommandDispatcher::new(
            recorder.clone(),
            DebounceWindows::default(),
            notifier.clone(),
            CancellationToken::new(),
        );
        (dispatcher, recorder, notifier)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn temperature_burst_sends_only_last_value() {
        let (dispatcher, recorder, _) = dispatcher();
        let serial = DeviceSn::from("ABC123");

        dispatcher.send_command(serial.clone(), Command::SetTemperature(23)).unwrap();
        tokio::time::advance(Duration::from_millis(100)).await;
        dispatcher.send_command(serial.clone(), Command::SetTemperature(24)).unwrap();
        tokio::time::advance(Duration::from_millis(100)).await;
        dispatcher.send_command(serial.clone(), Command::SetTemperature(25)).unwrap();

        tokio::time::advance(Duration::from_millis(499)).await;
        settle().await;
        assert!(recorder.calls().is_empty());

        tokio::time::advance(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(
            recorder.calls(),
            vec![Call::Control(ControlRequest::single(
                "ABC123",
                Instruction::new("SetTemperature", 25)
            ))]
        );

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn set_mode_off_is_rejected_without_a_request() {
        let (dispatcher, recorder, notifier) = dispatcher();
        let mut notes = notifier.subscribe();

        let err = dispatcher
            .send(DeviceSn::from("ABC123"), CommandClass::SetMode, 0)
            .unwrap_err();
        assert!(err.is_validation());

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert!(recorder.calls().is_empty());
        assert_eq!(notes.try_recv().unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn classes_debounce_independently() {
        let (dispatcher, recorder, _) = dispatcher();
        let serial = DeviceSn::from("ABC123");

        dispatcher.send_command(serial.clone(), Command::SetTemperature(22)).unwrap();
        dispatcher.send_command(serial.clone(), Command::SetFanSpeed(3)).unwrap();

        tokio::time::advance(Duration::from_millis(600)).await;
        settle().await;
        assert_eq!(recorder.calls().len(), 1);

        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(
            recorder.calls()[1],
            Call::Control(ControlRequest::single(
                "ABC123",
                Instruction::new("SetFanSpeed", 3)
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn locks_use_five_second_window() {
        let (dispatcher, recorder, _) = dispatcher();
        let lock = Command::SetLock {
            lock: LockKind::Remote,
            engaged: true,
        };
        dispatcher.send_command(DeviceSn::from("X1"), lock).unwrap();

        tokio::time::advance(Duration::from_millis(4900)).await;
        settle().await;
        assert!(recorder.calls().is_empty());

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn power_toggle_is_immediate_and_reports_state() {
        let (dispatcher, recorder, notifier) = dispatcher();
        let mut notes = notifier.subscribe();

        dispatcher
            .send_command(DeviceSn::from("ABC123"), Command::PowerToggle)
            .unwrap();
        settle().await;

        assert_eq!(recorder.calls(), vec![Call::Toggle("ABC123".into())]);
        let note = notes.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Success);
        assert_eq!(note.message, "Device 'ABC123' is powered on.");
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_is_notified_verbatim() {
        let (dispatcher, recorder, notifier) = dispatcher();
        *recorder.fail_with.lock().unwrap() = Some("Device ABC123 is offline".into());
        let mut notes = notifier.subscribe();

        let err = dispatcher
            .execute(&DeviceSn::from("ABC123"), Command::SetFanSpeed(2))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Device ABC123 is offline");
        let note = notes.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Device ABC123 is offline");
        assert!(!dispatcher.is_updating("ABC123"));
    }

    #[tokio::test(start_paused = true)]
    async fn fleet_commands_bypass_debounce() {
        let (dispatcher, recorder, _) = dispatcher();

        let msg = dispatcher
            .execute_fleet(FleetCommand::Power { on: false })
            .await
            .unwrap();
        assert_eq!(msg, "All devices are powered off.");

        let msg = dispatcher.execute_fleet(FleetCommand::UnlockAll).await.unwrap();
        assert_eq!(msg, "All devices are unlocked.");

        assert_eq!(
            recorder.calls(),
            vec![
                Call::ControlAll(vec![Instruction::new("IduMode", 0)]),
                Call::UnlockAll,
            ]
        );
        assert!(!dispatcher.fleet_activity().is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_pending_commands() {
        let (dispatcher, recorder, _) = dispatcher();
        dispatcher
            .send_command(DeviceSn::from("ABC123"), Command::SetTemperature(20))
            .unwrap();
        assert_eq!(dispatcher.pending_len(), 1);

        dispatcher.shutdown();
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;

        assert!(recorder.calls().is_empty());
        assert!(matches!(
            dispatcher.send_command(DeviceSn::from("ABC123"), Command::SetTemperature(20)),
            Err(CoreError::SessionClosed)
        ));
    }
}
