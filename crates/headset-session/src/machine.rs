//! The call state machine.
//!
//! Pure and synchronous: every input produces a list of [`Effect`]s that the
//! orchestrator executes in order. The machine never performs I/O itself.

use std::collections::VecDeque;

use headset_core::{
    Ack, AtMessage, AtMessageKind, AudioProfile, AudioRouteRequest, Button, ButtonEvent,
    CallListEntry, CallState, CallStatus, LedPattern, OutgoingCommand, PressKind,
    VolumeChannel, VolumeState,
};
use tracing::{debug, info, warn};

/// HF supported features: CLI presentation, remote volume control and
/// enhanced call status.
pub const DEFAULT_HF_FEATURES: u32 = 0x34;

/// Indicator order assumed until the phone answers `AT+CIND=?`.
const DEFAULT_INDICATORS: [&str; 7] = [
    "service", "call", "callsetup", "callheld", "signal", "roam", "battchg",
];

/// Something the machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A new AT link is up. `stored_level` is the speaker level remembered
    /// for this phone.
    LinkUp { stored_level: Option<u8> },
    /// A parsed line from the phone.
    Message(AtMessage),
    Button(ButtonEvent),
    /// The AT link failed or closed.
    LinkLost,
}

/// Work for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Send(OutgoingCommand),
    Route(AudioRouteRequest),
    /// Speaker volume changed; mirror and persist it.
    Volume(VolumeState),
    /// Microphone gain (0-15) changed.
    MicGain(u8),
    /// New call LED pattern.
    Led(LedPattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub hf_features: u32,
    /// Treat a long press of Answer while ringing as Reject.
    pub long_press_rejects: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            hf_features: DEFAULT_HF_FEATURES,
            long_press_rejects: false,
        }
    }
}

/// What to do when the phone acknowledges a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Service level connection step.
    Slc,
    /// `ATA` sent optimistically; `ERROR` reverts to Idle.
    Answer,
    /// `AT+VGS` sent; `ERROR` restores the previous level.
    SpeakerGain { previous: VolumeState },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indicator {
    Call,
    CallSetup,
    CallHeld,
    Other,
}

/// Tracks the single call and decides what the headset does about it.
#[derive(Debug)]
pub struct CallStateMachine {
    config: MachineConfig,
    state: CallState,
    volume: VolumeState,
    mic_gain: Option<u8>,
    /// Host volume already set for this link.
    volume_synced: bool,
    connected: bool,
    /// Next service level connection step, `None` once complete.
    slc_step: Option<usize>,
    pending: VecDeque<(OutgoingCommand, Pending)>,
    indicator_names: Vec<String>,
    call_active: bool,
    call_setup: u8,
    caller_id: Option<String>,
    ag_features: Option<u32>,
}

impl CallStateMachine {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            state: CallState::Idle,
            volume: VolumeState::default(),
            mic_gain: None,
            volume_synced: false,
            connected: false,
            slc_step: None,
            pending: VecDeque::new(),
            indicator_names: DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect(),
            call_active: false,
            call_setup: 0,
            caller_id: None,
            ag_features: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn volume(&self) -> VolumeState {
        self.volume
    }

    pub fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the service level connection handshake has finished.
    pub fn slc_complete(&self) -> bool {
        self.connected && self.slc_step.is_none()
    }

    /// Feature bitmap reported by the phone in `+BRSF`.
    pub fn ag_features(&self) -> Option<u32> {
        self.ag_features
    }

    /// Commands still waiting for `OK`/`ERROR`.
    pub fn pending_commands(&self) -> Vec<OutgoingCommand> {
        self.pending.iter().map(|(command, _)| *command).collect()
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::LinkUp { stored_level } => self.on_link_up(stored_level, &mut effects),
            Input::Message(message) => self.on_message(message, &mut effects),
            Input::Button(event) => self.on_button(event, &mut effects),
            Input::LinkLost => self.on_link_lost(&mut effects),
        }
        effects
    }

    fn on_link_up(&mut self, stored_level: Option<u8>, effects: &mut Vec<Effect>) {
        let volume = self.volume;
        *self = Self::new(self.config);
        self.volume = volume;
        self.connected = true;

        if let Some(level) = stored_level {
            let restored = VolumeState::from_phone(level);
            debug!(level = restored.level(), "Restoring stored speaker level");
            self.volume = restored;
            self.volume_synced = true;
            effects.push(Effect::Volume(restored));
        }

        self.slc_step = Some(0);
        self.send_slc_step(effects);
    }

    fn on_link_lost(&mut self, effects: &mut Vec<Effect>) {
        self.connected = false;
        self.slc_step = None;
        self.pending.clear();
        self.call_active = false;
        self.call_setup = 0;
        self.caller_id = None;

        if self.state != CallState::Idle {
            self.transition(CallState::Idle, effects);
        } else {
            effects.push(Effect::Led(LedPattern::Off));
        }
        effects.push(Effect::Route(AudioRouteRequest::new(
            AudioProfile::Idle,
            CallState::Idle,
        )));
    }

    fn on_message(&mut self, message: AtMessage, effects: &mut Vec<Effect>) {
        match message.kind {
            AtMessageKind::Ring => self.on_ring(effects),
            AtMessageKind::CallerId(number) => {
                if matches!(self.state, CallState::Idle | CallState::Incoming) {
                    info!("Incoming call from {}", number);
                    self.caller_id = Some(number);
                }
            }
            AtMessageKind::CommandAck(ack) => self.on_ack(ack, effects),
            AtMessageKind::VolumeReport { level, channel } => {
                self.on_volume_report(level, channel, effects)
            }
            AtMessageKind::Indicator { index, value } => {
                self.on_indicator(index, value, effects)
            }
            AtMessageKind::IndicatorMapping(names) => {
                debug!("Phone indicators: {}", names.join(", "));
                self.indicator_names = names;
            }
            AtMessageKind::IndicatorValues(values) => self.on_indicator_values(&values, effects),
            AtMessageKind::AgFeatures(features) => {
                info!("Phone supported features: {:#x}", features);
                self.ag_features = Some(features);
            }
            AtMessageKind::CallList(entry) => self.on_call_list(entry, effects),
            AtMessageKind::CodecSelection(codec) => {
                info!("Phone selected codec {}", codec);
                self.send(OutgoingCommand::ConfirmCodec(codec), Pending::Other, effects);
            }
            AtMessageKind::Unknown(_) => {
                debug!("Ignoring unrecognized AT line: {}", message.raw);
            }
        }
    }

    fn on_ring(&mut self, effects: &mut Vec<Effect>) {
        match self.state {
            CallState::Idle => self.transition(CallState::Incoming, effects),
            CallState::Incoming => debug!("RING while already ringing"),
            state => debug!("Ignoring RING in state {}", state),
        }
    }

    fn on_ack(&mut self, ack: Ack, effects: &mut Vec<Effect>) {
        let Some((command, pending)) = self.pending.pop_front() else {
            debug!("Unsolicited {:?} with no command outstanding", ack);
            return;
        };

        if ack == Ack::Error {
            warn!("Phone rejected {}", command);
        }

        match (pending, ack) {
            (Pending::Slc, _) => self.advance_slc(effects),
            (Pending::Answer, Ack::Ok) => info!("Call answered"),
            (Pending::Answer, Ack::Error) => {
                if self.state == CallState::Active {
                    self.transition(CallState::Idle, effects);
                    effects.push(Effect::Route(AudioRouteRequest::new(
                        AudioProfile::Idle,
                        CallState::Idle,
                    )));
                }
            }
            (Pending::SpeakerGain { previous }, Ack::Error) => {
                self.volume = previous;
                effects.push(Effect::Volume(previous));
            }
            _ => {}
        }
    }

    fn on_volume_report(&mut self, level: u8, channel: VolumeChannel, effects: &mut Vec<Effect>) {
        match channel {
            VolumeChannel::Speaker => {
                if level != self.volume.level() {
                    self.volume = VolumeState::from_phone(level);
                    debug!(level, "Phone changed speaker gain");
                    effects.push(Effect::Volume(self.volume));
                }
            }
            VolumeChannel::Microphone => {
                if self.mic_gain != Some(level) {
                    self.mic_gain = Some(level);
                    debug!(level, "Phone changed microphone gain");
                    effects.push(Effect::MicGain(level));
                }
            }
        }
    }

    fn on_button(&mut self, event: ButtonEvent, effects: &mut Vec<Effect>) {
        match (event.button, event.kind) {
            (Button::Answer, PressKind::Press) => match self.state {
                CallState::Incoming => {
                    self.send(OutgoingCommand::Answer, Pending::Answer, effects);
                    self.route_call(effects);
                    self.transition(CallState::Active, effects);
                }
                CallState::Active | CallState::Held | CallState::Outgoing => self.hang_up(effects),
                CallState::Idle => debug!("Answer pressed with no call"),
            },
            (Button::Answer, PressKind::LongPress)
                if self.config.long_press_rejects && self.state == CallState::Incoming =>
            {
                self.hang_up(effects)
            }
            (Button::Reject, PressKind::Press) => match self.state {
                CallState::Incoming | CallState::Outgoing => self.hang_up(effects),
                state => debug!("Reject pressed in state {}", state),
            },
            (Button::VolumeUp, PressKind::Press) => self.step_volume(self.volume.step_up(), effects),
            (Button::VolumeDown, PressKind::Press) => {
                self.step_volume(self.volume.step_down(), effects)
            }
            (button, kind) => debug!("Ignoring {:?} {:?}", button, kind),
        }
    }

    fn step_volume(&mut self, next: VolumeState, effects: &mut Vec<Effect>) {
        if self.state != CallState::Active {
            debug!("Volume buttons only act during a connected call");
            return;
        }
        if next == self.volume {
            return;
        }
        let previous = self.volume;
        self.volume = next;
        self.send(
            OutgoingCommand::SpeakerGain(next.level()),
            Pending::SpeakerGain { previous },
            effects,
        );
        effects.push(Effect::Volume(next));
    }

    fn on_indicator(&mut self, index: u8, value: u8, effects: &mut Vec<Effect>) {
        match self.indicator(index) {
            Indicator::Call => {
                self.call_active = value == 1;
                if self.call_active {
                    if self.state.is_setup() {
                        self.route_call(effects);
                        self.transition(CallState::Active, effects);
                    }
                } else if matches!(self.state, CallState::Active | CallState::Held)
                    || (self.state.is_setup() && self.call_setup == 0)
                {
                    self.end_call(effects);
                }
            }
            Indicator::CallSetup => {
                self.call_setup = value;
                match (self.state, value) {
                    (CallState::Idle, 1) => self.transition(CallState::Incoming, effects),
                    (CallState::Idle, 2 | 3) => self.transition(CallState::Outgoing, effects),
                    (CallState::Incoming | CallState::Outgoing, 0) => {
                        if self.call_active {
                            self.route_call(effects);
                            self.transition(CallState::Active, effects);
                        } else {
                            self.end_call(effects);
                        }
                    }
                    _ => {}
                }
            }
            Indicator::CallHeld => {
                match (self.state, value) {
                    (CallState::Active, 1 | 2) => self.transition(CallState::Held, effects),
                    (CallState::Held, 0) => {
                        if self.call_active {
                            self.transition(CallState::Active, effects);
                        } else {
                            self.end_call(effects);
                        }
                    }
                    _ => {}
                }
            }
            Indicator::Other => debug!(index, value, "Indicator update"),
        }
    }

    /// Initial `+CIND?` snapshot. Only call setup is adopted from Idle.
    fn on_indicator_values(&mut self, values: &[u8], effects: &mut Vec<Effect>) {
        for (position, value) in values.iter().enumerate() {
            match self.indicator((position + 1) as u8) {
                Indicator::Call => self.call_active = *value == 1,
                Indicator::CallSetup => self.call_setup = *value,
                Indicator::CallHeld | Indicator::Other => {}
            }
        }

        if self.state == CallState::Idle {
            match self.call_setup {
                1 => self.transition(CallState::Incoming, effects),
                2 | 3 => self.transition(CallState::Outgoing, effects),
                _ => {}
            }
        }
    }

    fn on_call_list(&mut self, entry: CallListEntry, effects: &mut Vec<Effect>) {
        if let Some(number) = &entry.number {
            self.caller_id = Some(number.clone());
        }

        match (self.state, entry.status) {
            (CallState::Idle, CallStatus::Incoming | CallStatus::Waiting) => {
                self.transition(CallState::Incoming, effects)
            }
            (CallState::Idle, CallStatus::Dialing | CallStatus::Alerting) => {
                self.transition(CallState::Outgoing, effects)
            }
            (CallState::Incoming | CallState::Outgoing, CallStatus::Active) => {
                self.route_call(effects);
                self.transition(CallState::Active, effects);
            }
            (CallState::Active, CallStatus::Held) => self.transition(CallState::Held, effects),
            (CallState::Idle, status) => {
                debug!("Not adopting call {} in status {:?}", entry.index, status)
            }
            _ => {}
        }
    }

    fn indicator(&self, index: u8) -> Indicator {
        let name = (index as usize)
            .checked_sub(1)
            .and_then(|i| self.indicator_names.get(i));
        match name.map(String::as_str) {
            Some("call") => Indicator::Call,
            Some("callsetup") | Some("call_setup") => Indicator::CallSetup,
            Some("callheld") => Indicator::CallHeld,
            _ => Indicator::Other,
        }
    }

    fn send_slc_step(&mut self, effects: &mut Vec<Effect>) {
        let command = match self.slc_step {
            Some(0) => OutgoingCommand::SupportedFeatures(self.config.hf_features),
            Some(1) => OutgoingCommand::QueryIndicatorMapping,
            Some(2) => OutgoingCommand::QueryIndicatorValues,
            Some(3) => OutgoingCommand::EnableIndicatorEvents,
            Some(4) => OutgoingCommand::EnableCallerId,
            _ => return,
        };
        self.send(command, Pending::Slc, effects);
    }

    fn advance_slc(&mut self, effects: &mut Vec<Effect>) {
        let Some(step) = self.slc_step else {
            return;
        };
        if step >= 4 {
            self.slc_step = None;
            info!("Service level connection established");
            self.send(
                OutgoingCommand::SpeakerGain(self.volume.level()),
                Pending::Other,
                effects,
            );
            if !self.volume_synced {
                self.volume_synced = true;
                effects.push(Effect::Volume(self.volume));
            }
            self.send(OutgoingCommand::ListCalls, Pending::Other, effects);
        } else {
            self.slc_step = Some(step + 1);
            self.send_slc_step(effects);
        }
    }

    fn send(&mut self, command: OutgoingCommand, pending: Pending, effects: &mut Vec<Effect>) {
        self.pending.push_back((command, pending));
        effects.push(Effect::Send(command));
    }

    fn hang_up(&mut self, effects: &mut Vec<Effect>) {
        self.send(OutgoingCommand::HangUp, Pending::Other, effects);
        self.end_call(effects);
    }

    fn end_call(&mut self, effects: &mut Vec<Effect>) {
        effects.push(Effect::Route(AudioRouteRequest::new(
            AudioProfile::Idle,
            CallState::Idle,
        )));
        self.transition(CallState::Idle, effects);
    }

    fn route_call(&mut self, effects: &mut Vec<Effect>) {
        effects.push(Effect::Route(AudioRouteRequest::new(
            AudioProfile::CallRouting,
            CallState::Active,
        )));
    }

    fn transition(&mut self, next: CallState, effects: &mut Vec<Effect>) {
        info!("Call state {} -> {}", self.state, next);
        self.state = next;
        match next {
            CallState::Active => self.call_active = true,
            CallState::Idle => {
                self.call_active = false;
                self.caller_id = None;
            }
            _ => {}
        }
        effects.push(Effect::Led(next.led_pattern()));
    }
}

impl Default for CallStateMachine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use headset_at::parse_line;

    fn at(line: &str) -> Input {
        Input::Message(parse_line(line))
    }

    fn press(button: Button) -> Input {
        Input::Button(ButtonEvent::press(button))
    }

    fn sends(effects: &[Effect]) -> Vec<OutgoingCommand> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    fn routes(effects: &[Effect]) -> Vec<AudioProfile> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Route(request) => Some(request.profile),
                _ => None,
            })
            .collect()
    }

    fn leds(effects: &[Effect]) -> Vec<LedPattern> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Led(pattern) => Some(*pattern),
                _ => None,
            })
            .collect()
    }

    /// Machine with a finished handshake.
    fn connected() -> CallStateMachine {
        let mut machine = CallStateMachine::default();
        machine.handle(Input::LinkUp { stored_level: None });
        for _ in 0..5 {
            machine.handle(at("OK"));
        }
        machine.handle(at("OK"));
        machine.handle(at("OK"));
        assert!(machine.slc_complete());
        assert!(machine.pending_commands().is_empty());
        machine
    }

    fn ringing() -> CallStateMachine {
        let mut machine = connected();
        machine.handle(at("RING"));
        machine
    }

    fn in_call() -> CallStateMachine {
        let mut machine = ringing();
        machine.handle(press(Button::Answer));
        machine.handle(at("OK"));
        assert_eq!(machine.state(), CallState::Active);
        machine
    }

    mod handshake {
        use super::*;

        #[test]
        fn commands_are_sent_one_at_a_time() {
            let mut machine = CallStateMachine::default();
            let effects = machine.handle(Input::LinkUp { stored_level: None });
            assert_eq!(sends(&effects), vec![OutgoingCommand::SupportedFeatures(0x34)]);

            let mut sent = Vec::new();
            for reply in ["+BRSF: 871", "OK", "+CIND: (\"service\",(0,1)),(\"call\",(0,1))", "OK", "+CIND: 1,0", "OK", "OK", "OK"] {
                sent.extend(sends(&machine.handle(at(reply))));
            }

            assert_eq!(
                sent,
                vec![
                    OutgoingCommand::QueryIndicatorMapping,
                    OutgoingCommand::QueryIndicatorValues,
                    OutgoingCommand::EnableIndicatorEvents,
                    OutgoingCommand::EnableCallerId,
                    OutgoingCommand::SpeakerGain(10),
                    OutgoingCommand::ListCalls,
                ]
            );
            assert!(machine.slc_complete());
        }

        #[test]
        fn error_does_not_stall_handshake() {
            let mut machine = CallStateMachine::default();
            machine.handle(Input::LinkUp { stored_level: None });
            let effects = machine.handle(at("ERROR"));
            assert_eq!(sends(&effects), vec![OutgoingCommand::QueryIndicatorMapping]);
        }

        #[test]
        fn stored_level_is_restored_and_reported() {
            let mut machine = CallStateMachine::default();
            let effects = machine.handle(Input::LinkUp { stored_level: Some(4) });
            assert_eq!(effects[0], Effect::Volume(VolumeState::from_phone(4)));

            let mut sent = Vec::new();
            let mut volumes = Vec::new();
            for _ in 0..5 {
                let effects = machine.handle(at("OK"));
                sent.extend(sends(&effects));
                volumes.extend(effects.into_iter().filter(|e| matches!(e, Effect::Volume(_))));
            }
            assert!(sent.contains(&OutgoingCommand::SpeakerGain(4)));
            assert!(volumes.is_empty());
        }

        #[test]
        fn default_level_is_mirrored_to_host() {
            let mut machine = CallStateMachine::default();
            machine.handle(Input::LinkUp { stored_level: None });
            let mut effects = Vec::new();
            for _ in 0..5 {
                effects.extend(machine.handle(at("OK")));
            }
            assert!(effects.contains(&Effect::Send(OutgoingCommand::SpeakerGain(10))));
            assert!(effects.contains(&Effect::Volume(VolumeState::default())));
        }

        #[test]
        fn custom_feature_bits() {
            let mut machine = CallStateMachine::new(MachineConfig {
                hf_features: 0x3f,
                long_press_rejects: false,
            });
            let effects = machine.handle(Input::LinkUp { stored_level: None });
            assert_eq!(sends(&effects), vec![OutgoingCommand::SupportedFeatures(0x3f)]);
        }

        #[test]
        fn codec_selection_is_confirmed() {
            let mut machine = connected();
            let effects = machine.handle(at("+BCS: 2"));
            assert_eq!(sends(&effects), vec![OutgoingCommand::ConfirmCodec(2)]);
        }
    }

    mod buttons {
        use super::*;

        #[test]
        fn ring_starts_incoming() {
            let mut machine = connected();
            let effects = machine.handle(at("RING"));
            assert_eq!(machine.state(), CallState::Incoming);
            assert_eq!(effects, vec![Effect::Led(LedPattern::BlinkFast)]);
        }

        #[test]
        fn second_ring_is_ignored() {
            let mut machine = ringing();
            assert!(machine.handle(at("RING")).is_empty());
            assert_eq!(machine.state(), CallState::Incoming);
        }

        #[test]
        fn answer_sends_ata_and_routes_audio() {
            let mut machine = ringing();
            let effects = machine.handle(press(Button::Answer));
            assert_eq!(sends(&effects), vec![OutgoingCommand::Answer]);
            assert_eq!(routes(&effects), vec![AudioProfile::CallRouting]);
            assert_eq!(leds(&effects), vec![LedPattern::PulseSlow]);
            assert_eq!(machine.state(), CallState::Active);

            assert!(machine.handle(at("OK")).is_empty());
            assert_eq!(machine.state(), CallState::Active);
        }

        #[test]
        fn answer_error_reverts_to_idle() {
            let mut machine = ringing();
            machine.handle(press(Button::Answer));
            let effects = machine.handle(at("ERROR"));
            assert_eq!(machine.state(), CallState::Idle);
            assert_eq!(routes(&effects), vec![AudioProfile::Idle]);
            assert_eq!(leds(&effects), vec![LedPattern::Off]);
            assert!(sends(&effects).is_empty());
        }

        #[test]
        fn answer_during_call_hangs_up() {
            let mut machine = in_call();
            let effects = machine.handle(press(Button::Answer));
            assert_eq!(sends(&effects), vec![OutgoingCommand::HangUp]);
            assert_eq!(routes(&effects), vec![AudioProfile::Idle]);
            assert_eq!(leds(&effects), vec![LedPattern::Off]);
            assert_eq!(machine.state(), CallState::Idle);
        }

        #[test]
        fn reject_sends_chup_once() {
            let mut machine = ringing();
            let first = machine.handle(press(Button::Reject));
            let second = machine.handle(press(Button::Reject));
            assert_eq!(sends(&first), vec![OutgoingCommand::HangUp]);
            assert!(second.is_empty());
            assert_eq!(machine.state(), CallState::Idle);
        }

        #[test]
        fn buttons_do_nothing_when_idle() {
            let mut machine = connected();
            for button in Button::ALL {
                assert!(machine.handle(press(button)).is_empty(), "{:?}", button);
            }
        }

        #[test]
        fn long_press_ignored_by_default() {
            let mut machine = ringing();
            let effects = machine.handle(Input::Button(ButtonEvent::long_press(Button::Answer)));
            assert!(effects.is_empty());
            assert_eq!(machine.state(), CallState::Incoming);
        }

        #[test]
        fn long_press_rejects_when_enabled() {
            let mut machine = CallStateMachine::new(MachineConfig {
                long_press_rejects: true,
                ..MachineConfig::default()
            });
            machine.handle(Input::LinkUp { stored_level: None });
            machine.handle(at("RING"));
            let effects = machine.handle(Input::Button(ButtonEvent::long_press(Button::Answer)));
            assert_eq!(sends(&effects), vec![OutgoingCommand::HangUp]);
            assert_eq!(machine.state(), CallState::Idle);
        }

        #[test]
        fn outgoing_call_can_be_cancelled() {
            let mut machine = connected();
            machine.handle(at("+CIEV: 3,2"));
            assert_eq!(machine.state(), CallState::Outgoing);
            let effects = machine.handle(press(Button::Reject));
            assert_eq!(sends(&effects), vec![OutgoingCommand::HangUp]);
            assert_eq!(machine.state(), CallState::Idle);
        }
    }

    mod volume {
        use super::*;

        #[test]
        fn volume_down_sends_vgs() {
            let mut machine = in_call();
            machine.handle(at("+VGS: 8"));
            let effects = machine.handle(press(Button::VolumeDown));
            assert_eq!(sends(&effects), vec![OutgoingCommand::SpeakerGain(7)]);
            assert_eq!(machine.volume().mirrored(), 47);
            assert!(effects.contains(&Effect::Volume(VolumeState::from_phone(7))));
        }

        #[test]
        fn clamped_step_sends_nothing() {
            let mut machine = in_call();
            machine.handle(at("+VGS: 15"));
            assert!(machine.handle(press(Button::VolumeUp)).is_empty());
            machine.handle(at("+VGS: 0"));
            assert!(machine.handle(press(Button::VolumeDown)).is_empty());
        }

        #[test]
        fn rejected_volume_is_restored() {
            let mut machine = in_call();
            machine.handle(at("+VGS: 8"));
            machine.handle(press(Button::VolumeUp));
            assert_eq!(machine.volume().level(), 9);

            let effects = machine.handle(at("ERROR"));
            assert_eq!(machine.volume().level(), 8);
            assert_eq!(effects, vec![Effect::Volume(VolumeState::from_phone(8))]);
        }

        #[test]
        fn volume_ignored_outside_active_call() {
            let mut machine = ringing();
            assert!(machine.handle(press(Button::VolumeUp)).is_empty());
        }

        #[test]
        fn phone_volume_updates_without_echo() {
            let mut machine = connected();
            let effects = machine.handle(at("+VGS: 3"));
            assert_eq!(effects, vec![Effect::Volume(VolumeState::from_phone(3))]);
            assert!(machine.handle(at("+VGS: 3")).is_empty());
        }

        #[test]
        fn mic_gain_report() {
            let mut machine = connected();
            assert_eq!(machine.handle(at("+VGM: 12")), vec![Effect::MicGain(12)]);
            assert!(machine.handle(at("+VGM: 12")).is_empty());
        }

        #[test]
        fn acks_matched_in_order() {
            let mut machine = in_call();
            machine.handle(at("+VGS: 8"));
            machine.handle(press(Button::VolumeUp));
            machine.handle(press(Button::VolumeUp));
            assert_eq!(
                machine.pending_commands(),
                vec![OutgoingCommand::SpeakerGain(9), OutgoingCommand::SpeakerGain(10)]
            );

            machine.handle(at("OK"));
            let effects = machine.handle(at("ERROR"));
            assert_eq!(effects, vec![Effect::Volume(VolumeState::from_phone(9))]);
        }
    }

    mod indicators {
        use super::*;

        #[test]
        fn incoming_answered_on_phone() {
            let mut machine = connected();
            machine.handle(at("+CIEV: 3,1"));
            assert_eq!(machine.state(), CallState::Incoming);

            let effects = machine.handle(at("+CIEV: 2,1"));
            assert_eq!(machine.state(), CallState::Active);
            assert_eq!(routes(&effects), vec![AudioProfile::CallRouting]);

            assert!(machine.handle(at("+CIEV: 3,0")).is_empty());
            assert_eq!(machine.state(), CallState::Active);
        }

        #[test]
        fn remote_hang_up_ends_call() {
            let mut machine = in_call();
            let effects = machine.handle(at("+CIEV: 2,0"));
            assert_eq!(machine.state(), CallState::Idle);
            assert_eq!(routes(&effects), vec![AudioProfile::Idle]);
            assert_eq!(leds(&effects), vec![LedPattern::Off]);
        }

        #[test]
        fn missed_call_returns_to_idle() {
            let mut machine = ringing();
            let effects = machine.handle(at("+CIEV: 3,0"));
            assert_eq!(machine.state(), CallState::Idle);
            assert_eq!(routes(&effects), vec![AudioProfile::Idle]);
        }

        #[test]
        fn hold_and_resume() {
            let mut machine = in_call();
            machine.handle(at("+CIEV: 2,1"));
            machine.handle(at("+CIEV: 4,1"));
            assert_eq!(machine.state(), CallState::Held);

            let effects = machine.handle(at("+CIEV: 4,0"));
            assert_eq!(machine.state(), CallState::Active);
            assert_eq!(leds(&effects), vec![LedPattern::PulseSlow]);
        }

        #[test]
        fn answered_call_resumes_from_hold() {
            let mut machine = in_call();
            machine.handle(at("+CIEV: 4,1"));
            assert_eq!(machine.state(), CallState::Held);
            let effects = machine.handle(at("+CIEV: 4,0"));
            assert_eq!(machine.state(), CallState::Active);
            assert!(routes(&effects).is_empty());
        }

        #[test]
        fn call_list_connect_resumes_from_hold() {
            let mut machine = connected();
            machine.handle(at("+CLCC: 1,1,4,0,0"));
            machine.handle(at("+CLCC: 1,1,0,0,0"));
            assert_eq!(machine.state(), CallState::Active);
            machine.handle(at("+CIEV: 4,1"));
            machine.handle(at("+CIEV: 4,0"));
            assert_eq!(machine.state(), CallState::Active);
        }

        #[test]
        fn held_call_ended_by_button() {
            let mut machine = in_call();
            machine.handle(at("+CIEV: 4,1"));
            let effects = machine.handle(press(Button::Answer));
            assert_eq!(sends(&effects), vec![OutgoingCommand::HangUp]);
            assert_eq!(machine.state(), CallState::Idle);
        }

        #[test]
        fn call_never_starts_from_idle() {
            let mut machine = connected();
            assert!(machine.handle(at("+CIEV: 2,1")).is_empty());
            assert!(machine.handle(at("+CIEV: 4,1")).is_empty());
            assert_eq!(machine.state(), CallState::Idle);
        }

        #[test]
        fn indices_follow_phone_mapping() {
            let mut machine = CallStateMachine::default();
            machine.handle(Input::LinkUp { stored_level: None });
            machine.handle(at("+CIND: (\"call\",(0,1)),(\"callsetup\",(0-3)),(\"service\",(0,1))"));
            machine.handle(at("+CIEV: 2,1"));
            assert_eq!(machine.state(), CallState::Incoming);
        }

        #[test]
        fn snapshot_adopts_ringing_call() {
            let mut machine = CallStateMachine::default();
            machine.handle(Input::LinkUp { stored_level: None });
            let effects = machine.handle(at("+CIND: 1,0,1,0,4,0,5"));
            assert_eq!(machine.state(), CallState::Incoming);
            assert_eq!(leds(&effects), vec![LedPattern::BlinkFast]);
        }

        #[test]
        fn call_list_drives_setup_and_connect() {
            let mut machine = connected();
            machine.handle(at("+CLCC: 1,0,2,0,0,\"5551234\",129"));
            assert_eq!(machine.state(), CallState::Outgoing);
            assert_eq!(machine.caller_id(), Some("5551234"));

            let effects = machine.handle(at("+CLCC: 1,0,0,0,0,\"5551234\",129"));
            assert_eq!(machine.state(), CallState::Active);
            assert_eq!(routes(&effects), vec![AudioProfile::CallRouting]);
        }

        #[test]
        fn caller_id_recorded_while_ringing() {
            let mut machine = ringing();
            machine.handle(at("+CLIP: \"5551234\",129"));
            assert_eq!(machine.caller_id(), Some("5551234"));
            machine.handle(press(Button::Reject));
            assert_eq!(machine.caller_id(), None);
        }
    }

    mod link {
        use super::*;

        #[test]
        fn link_loss_during_call_sends_nothing() {
            let mut machine = in_call();
            let effects = machine.handle(Input::LinkLost);
            assert!(sends(&effects).is_empty());
            assert_eq!(routes(&effects), vec![AudioProfile::Idle]);
            assert_eq!(leds(&effects), vec![LedPattern::Off]);
            assert_eq!(machine.state(), CallState::Idle);
            assert!(!machine.is_connected());
        }

        #[test]
        fn link_loss_clears_pending() {
            let mut machine = ringing();
            machine.handle(press(Button::Answer));
            machine.handle(Input::LinkLost);
            assert!(machine.pending_commands().is_empty());
        }

        #[test]
        fn unsolicited_ack_is_ignored() {
            let mut machine = connected();
            assert!(machine.handle(at("OK")).is_empty());
            assert!(machine.handle(at("+XAPL=iPhone,2")).is_empty());
        }

        #[test]
        fn new_link_keeps_volume() {
            let mut machine = in_call();
            machine.handle(at("+VGS: 6"));
            machine.handle(Input::LinkLost);
            machine.handle(Input::LinkUp { stored_level: None });
            assert_eq!(machine.volume().level(), 6);
            assert_eq!(machine.state(), CallState::Idle);

            let mut effects = Vec::new();
            for _ in 0..5 {
                effects.extend(machine.handle(at("OK")));
            }
            assert!(effects.contains(&Effect::Volume(VolumeState::from_phone(6))));
        }
    }
}
