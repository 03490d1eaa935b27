// ── Optimistic dial bindings ──
//
// A `DialControl` shadows one authoritative device field (set-point or fan
// speed) while the user drags it. Authoritative updates are ignored while
// dragging and shown again once the commit finishes. The last committed
// value stays pending until an authoritative update confirms it, so quick
// +/- taps build on each other instead of on the stale device value.

use crate::command::{Command, CommandClass, FAN_SPEED_RANGE, TEMPERATURE_RANGE};
use crate::model::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging,
    Committing,
}

/// Which device field a dial edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialKind {
    Temperature,
    FanSpeed,
}

impl DialKind {
    /// Inclusive (min, max).
    pub const fn bounds(self) -> (u8, u8) {
        match self {
            Self::Temperature => TEMPERATURE_RANGE,
            Self::FanSpeed => FAN_SPEED_RANGE,
        }
    }

    pub const fn class(self) -> CommandClass {
        match self {
            Self::Temperature => CommandClass::SetTemperature,
            Self::FanSpeed => CommandClass::SetFanSpeed,
        }
    }

    pub fn command(self, value: u8) -> Command {
        Command::from_class(self.class(), i64::from(value))
    }

    fn read(self, device: &Device) -> u8 {
        match self {
            Self::Temperature => device.set_temperature,
            Self::FanSpeed => device.fan_speed,
        }
    }

    fn clamp(self, value: i64) -> u8 {
        let (min, max) = self.bounds();
        let clamped = value.clamp(i64::from(min), i64::from(max));
        u8::try_from(clamped).unwrap_or(min)
    }
}

/// Three-state optimistic binding for one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialControl {
    kind: DialKind,
    state: InteractionState,
    authoritative: u8,
    displayed: u8,
    pending: Option<u8>,
}

impl DialControl {
    pub fn new(kind: DialKind, authoritative: u8) -> Self {
        Self {
            kind,
            state: InteractionState::Idle,
            authoritative,
            displayed: authoritative,
            pending: None,
        }
    }

    pub fn for_device(kind: DialKind, device: &Device) -> Self {
        Self::new(kind, kind.read(device))
    }

    pub fn kind(&self) -> DialKind {
        self.kind
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn displayed(&self) -> u8 {
        self.displayed
    }

    pub fn authoritative(&self) -> u8 {
        self.authoritative
    }

    /// Last committed value not yet confirmed by the device.
    pub fn pending(&self) -> Option<u8> {
        self.pending
    }

    /// The value the user is heading for: the pending commit if any,
    /// otherwise what is displayed.
    pub fn target(&self) -> u8 {
        self.pending.unwrap_or(self.displayed)
    }

    /// Forget the pending commit (the command failed or was abandoned).
    pub fn settle(&mut self) {
        self.pending = None;
    }

    /// Record a new authoritative value. Shown immediately only when idle.
    /// A value equal to the pending commit confirms it.
    pub fn on_authoritative(&mut self, value: u8) {
        self.authoritative = value;
        if self.pending == Some(value) {
            self.pending = None;
        }
        if self.state == InteractionState::Idle {
            self.displayed = value;
        }
    }

    /// Convenience for feeding registry updates.
    pub fn sync_from(&mut self, device: &Device) {
        self.on_authoritative(self.kind.read(device));
    }

    pub fn pointer_down(&mut self) {
        self.state = InteractionState::Dragging;
    }

    /// Track the pointer. Ignored unless dragging. Returns the displayed value.
    pub fn drag_to(&mut self, value: i64) -> u8 {
        if self.state == InteractionState::Dragging {
            self.displayed = self.kind.clamp(value);
        }
        self.displayed
    }

    /// End the drag. Freezes the displayed value and returns the command to
    /// dispatch; `None` if no drag was in progress.
    pub fn pointer_up(&mut self) -> Option<Command> {
        if self.state != InteractionState::Dragging {
            return None;
        }
        self.state = InteractionState::Committing;
        self.pending = (self.displayed != self.authoritative).then_some(self.displayed);
        Some(self.kind.command(self.displayed))
    }

    /// Single-step adjustment (a +/- button). Behaves like a one-step drag
    /// from [`target`](Self::target) followed by a pointer-up.
    pub fn step(&mut self, delta: i64) -> Option<Command> {
        if self.state == InteractionState::Dragging {
            return None;
        }
        let base = self.target();
        self.state = InteractionState::Dragging;
        self.drag_to(i64::from(base) + delta);
        self.pointer_up()
    }

    /// The committed value has been dispatched; drop the optimistic value.
    pub fn finish_commit(&mut self) {
        if self.state == InteractionState::Committing {
            self.state = InteractionState::Idle;
            self.displayed = self.authoritative;
        }
    }

    /// Displayed value sits at the lower bound (visual lock flag only).
    pub fn at_min(&self) -> bool {
        self.displayed <= self.kind.bounds().0
    }

    pub fn at_max(&self) -> bool {
        self.displayed >= self.kind.bounds().1
    }
}
