//! Classification of inbound AT lines.

use headset_core::message::{Ack, CallDirection, CallListEntry, CallStatus, VolumeChannel};
use headset_core::volume::MAX_PHONE_LEVEL;
use headset_core::{AtMessage, AtMessageKind};

/// Parse one framed line.
///
/// Never fails: anything malformed or unrecognized is returned as
/// [`AtMessageKind::Unknown`] carrying the original text.
pub fn parse_line(line: &str) -> AtMessage {
    let text = line.trim();
    let kind = classify(text).unwrap_or_else(|| AtMessageKind::Unknown(text.to_string()));
    AtMessage::new(kind, text)
}

fn classify(text: &str) -> Option<AtMessageKind> {
    match text {
        "RING" => return Some(AtMessageKind::Ring),
        "OK" => return Some(AtMessageKind::CommandAck(Ack::Ok)),
        "ERROR" => return Some(AtMessageKind::CommandAck(Ack::Error)),
        _ => {}
    }

    if text.starts_with("+CME ERROR") {
        return Some(AtMessageKind::CommandAck(Ack::Error));
    }
    if let Some(args) = arguments(text, "+CLIP") {
        return quoted(args).map(|number| AtMessageKind::CallerId(number.to_string()));
    }
    if let Some(args) = arguments(text, "+VGS") {
        return volume(args, VolumeChannel::Speaker);
    }
    if let Some(args) = arguments(text, "+VGM") {
        return volume(args, VolumeChannel::Microphone);
    }
    if let Some(args) = arguments(text, "+CIEV") {
        let (index, value) = args.split_once(',')?;
        return Some(AtMessageKind::Indicator {
            index: index.trim().parse().ok()?,
            value: value.trim().parse().ok()?,
        });
    }
    if let Some(args) = arguments(text, "+CIND") {
        return indicators(args);
    }
    if let Some(args) = arguments(text, "+BRSF") {
        return args.parse().ok().map(AtMessageKind::AgFeatures);
    }
    if let Some(args) = arguments(text, "+BCS") {
        return args.parse().ok().map(AtMessageKind::CodecSelection);
    }
    if let Some(args) = arguments(text, "+CLCC") {
        return call_list_entry(args).map(AtMessageKind::CallList);
    }
    None
}

/// Strip `<prefix>:` (or `<prefix>=`, which some gateways send) and return
/// the trimmed argument text.
fn arguments<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(prefix)?;
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('='))?;
    Some(rest.trim())
}

/// First double-quoted, non-empty field.
fn quoted(args: &str) -> Option<&str> {
    let start = args.find('"')? + 1;
    let len = args[start..].find('"')?;
    let value = &args[start..start + len];
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn volume(args: &str, channel: VolumeChannel) -> Option<AtMessageKind> {
    let level: u8 = args.parse().ok()?;
    if level > MAX_PHONE_LEVEL {
        return None;
    }
    Some(AtMessageKind::VolumeReport { level, channel })
}

/// `+CIND` is overloaded: the test form lists names, the read form values.
fn indicators(args: &str) -> Option<AtMessageKind> {
    if args.contains('"') {
        let names: Vec<String> = args
            .split('"')
            .skip(1)
            .step_by(2)
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return None;
        }
        return Some(AtMessageKind::IndicatorMapping(names));
    }

    let values = args
        .split(',')
        .map(|v| v.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    Some(AtMessageKind::IndicatorValues(values))
}

/// `<idx>,<dir>,<stat>,<mode>,<mpty>[,"<number>",<type>]`
fn call_list_entry(args: &str) -> Option<CallListEntry> {
    let mut fields = args.splitn(6, ',').map(str::trim);
    let index = fields.next()?.parse().ok()?;
    let direction = match fields.next()? {
        "0" => CallDirection::Outgoing,
        "1" => CallDirection::Incoming,
        _ => return None,
    };
    let status = CallStatus::from_code(fields.next()?.parse().ok()?)?;
    let _mode = fields.next()?;
    let multiparty = fields.next()? == "1";
    let number = fields.next().and_then(quoted).map(str::to_string);

    Some(CallListEntry {
        index,
        direction,
        status,
        multiparty,
        number,
    })
}
