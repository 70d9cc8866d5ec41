//! AT protocol messages exchanged with the audio gateway (the phone).

use std::fmt;

/// Result code terminating an AT command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Error,
}

/// Which gain a `+VGS`/`+VGM` report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeChannel {
    Speaker,
    Microphone,
}

/// `<dir>` field of a `+CLCC` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    /// Mobile originated.
    Outgoing,
    /// Mobile terminated.
    Incoming,
}

/// `<stat>` field of a `+CLCC` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Active,
    Held,
    Dialing,
    Alerting,
    Incoming,
    Waiting,
}

impl CallStatus {
    /// Decode the numeric `<stat>` value (0-5).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CallStatus::Active),
            1 => Some(CallStatus::Held),
            2 => Some(CallStatus::Dialing),
            3 => Some(CallStatus::Alerting),
            4 => Some(CallStatus::Incoming),
            5 => Some(CallStatus::Waiting),
            _ => None,
        }
    }
}

/// One line of a `+CLCC` current-calls listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallListEntry {
    pub index: u8,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub multiparty: bool,
    pub number: Option<String>,
}

/// Parsed meaning of one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtMessageKind {
    /// Unsolicited `RING`.
    Ring,
    /// `+CLIP: "<number>",...`
    CallerId(String),
    /// `OK`, `ERROR` or `+CME ERROR: <n>`.
    CommandAck(Ack),
    /// `+VGS: <n>` or `+VGM: <n>`, level 0-15.
    VolumeReport { level: u8, channel: VolumeChannel },
    /// `+CIEV: <index>,<value>`
    Indicator { index: u8, value: u8 },
    /// `+CIND: ("service",(0,1)),...` response to `AT+CIND=?`.
    IndicatorMapping(Vec<String>),
    /// `+CIND: 1,0,0,...` response to `AT+CIND?`.
    IndicatorValues(Vec<u8>),
    /// `+BRSF: <bitmap>`
    AgFeatures(u32),
    /// `+CLCC: ...`
    CallList(CallListEntry),
    /// `+BCS: <codec id>`
    CodecSelection(u8),
    /// Anything not recognized.
    Unknown(String),
}

/// A single line received from the phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtMessage {
    pub kind: AtMessageKind,
    /// The line as received, without terminator.
    pub raw: String,
}

impl AtMessage {
    pub fn new(kind: AtMessageKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.kind, AtMessageKind::CommandAck(_))
    }
}

/// Commands the hands-free unit sends to the phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutgoingCommand {
    /// `ATA`
    Answer,
    /// `AT+CHUP`
    HangUp,
    /// `AT+CLCC`
    ListCalls,
    /// `AT+VGS=<n>`
    SpeakerGain(u8),
    /// `AT+VGM=<n>`
    MicGain(u8),
    /// `AT+BRSF=<bitmap>`
    SupportedFeatures(u32),
    /// `AT+CIND=?`
    QueryIndicatorMapping,
    /// `AT+CIND?`
    QueryIndicatorValues,
    /// `AT+CMER=3,0,0,1`
    EnableIndicatorEvents,
    /// `AT+CLIP=1`
    EnableCallerId,
    /// `AT+BCS=<codec id>`
    ConfirmCodec(u8),
}

impl fmt::Display for OutgoingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutgoingCommand::Answer => f.write_str("ATA"),
            OutgoingCommand::HangUp => f.write_str("AT+CHUP"),
            OutgoingCommand::ListCalls => f.write_str("AT+CLCC"),
            OutgoingCommand::SpeakerGain(level) => write!(f, "AT+VGS={}", level),
            OutgoingCommand::MicGain(level) => write!(f, "AT+VGM={}", level),
            OutgoingCommand::SupportedFeatures(bits) => write!(f, "AT+BRSF={}", bits),
            OutgoingCommand::QueryIndicatorMapping => f.write_str("AT+CIND=?"),
            OutgoingCommand::QueryIndicatorValues => f.write_str("AT+CIND?"),
            OutgoingCommand::EnableIndicatorEvents => f.write_str("AT+CMER=3,0,0,1"),
            OutgoingCommand::EnableCallerId => f.write_str("AT+CLIP=1"),
            OutgoingCommand::ConfirmCodec(id) => write!(f, "AT+BCS={}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_text() {
        assert_eq!(OutgoingCommand::Answer.to_string(), "ATA");
        assert_eq!(OutgoingCommand::HangUp.to_string(), "AT+CHUP");
        assert_eq!(OutgoingCommand::ListCalls.to_string(), "AT+CLCC");
        assert_eq!(OutgoingCommand::SpeakerGain(7).to_string(), "AT+VGS=7");
        assert_eq!(OutgoingCommand::MicGain(12).to_string(), "AT+VGM=12");
        assert_eq!(OutgoingCommand::SupportedFeatures(52).to_string(), "AT+BRSF=52");
        assert_eq!(OutgoingCommand::EnableIndicatorEvents.to_string(), "AT+CMER=3,0,0,1");
        assert_eq!(OutgoingCommand::ConfirmCodec(2).to_string(), "AT+BCS=2");
    }

    #[test]
    fn call_status_codes() {
        assert_eq!(CallStatus::from_code(0), Some(CallStatus::Active));
        assert_eq!(CallStatus::from_code(4), Some(CallStatus::Incoming));
        assert_eq!(CallStatus::from_code(9), None);
    }
}
