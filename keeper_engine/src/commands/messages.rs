//! Objectives, information panels, speech and sounds.
//!
//! Inline message texts are interned in the string arena during the check
//! and looked up again when the message is shown.

use keeper_data::{MessageKind, PlayerRange};

use super::{location, subtile_position};
use crate::codec::ArgList;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::location::MapLocation;
use crate::registry::CommandRegistry;
use crate::sim::{Channel, Speaker, WorldOp};
use crate::strings::StrHandle;
use crate::value::{MessageValue, SoundValue};

/// Longest text a quick message may carry.
const MAX_TEXT_LEN: usize = 255;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.value("DISPLAY_OBJECTIVE", "NL", check_display_objective, process_message);
    registry.value("DISPLAY_INFORMATION", "NL", check_display_information, process_message);
    registry.value("QUICK_OBJECTIVE", "NAl", check_quick_objective, process_message);
    registry.value("QUICK_INFORMATION", "NAl", check_quick_information, process_message);
    registry.value("DISPLAY_OBJECTIVE_WITH_POS", "NNN", check_display_objective_at, process_message);
    registry.value("DISPLAY_INFORMATION_WITH_POS", "NNN", check_display_information_at, process_message);
    registry.value("QUICK_OBJECTIVE_WITH_POS", "NANN", check_quick_objective_at, process_message);
    registry.value("QUICK_INFORMATION_WITH_POS", "NANN", check_quick_information_at, process_message);
    registry.value("DISPLAY_MESSAGE", "NA", check_display_message, process_message);
    registry.value("QUICK_MESSAGE", "NAA", check_quick_message, process_message);
    registry.value("PLAY_MESSAGE", "PAN", check_play_message, process_play_message);
}

fn message_id(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<i64, ScriptError> {
    Ok(cx.clamp("message id", args.number(0)?, 0, i64::from(i16::MAX)))
}

fn intern(args: &ArgList, index: usize, cx: &mut CheckContext<'_>) -> Result<StrHandle, ScriptError> {
    let mut text = args.text(index)?;
    if text.len() > MAX_TEXT_LEN {
        let mut end = MAX_TEXT_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        cx.warn(format!("message text truncated to {end} bytes"));
        text = &text[..end];
    }
    Ok(cx.strings.intern(text)?)
}

/// A player or creature name choosing the portrait shown with a message.
fn speaker(args: &ArgList, index: usize, cx: &CheckContext<'_>) -> Result<Speaker, ScriptError> {
    let name = args.text(index)?;
    if let Some(player) = PlayerRange::from_name(name).and_then(PlayerRange::single_player) {
        return Ok(Speaker::Player(player));
    }
    cx.catalog
        .creatures
        .id(name)
        .map(Speaker::Creature)
        .ok_or_else(|| ScriptError::UnknownName {
            kind: "player or creature",
            name: name.to_string(),
        })
}

/// Zoom target from a location word, or from subtile coordinates for the `*_WITH_POS` forms.
fn zoom(args: &ArgList, index: usize, at_pos: bool, cx: &mut CheckContext<'_>) -> Result<MapLocation, ScriptError> {
    if at_pos {
        let (x, y) = subtile_position(args, index, cx)?;
        Ok(MapLocation::Subtile(x, y))
    } else {
        location(args, index, cx)
    }
}

fn panel(
    args: &ArgList,
    cx: &mut CheckContext<'_>,
    channel: Channel,
    at_pos: bool,
) -> Result<MessageValue, ScriptError> {
    let id = message_id(args, cx)?;
    let zoom = zoom(args, 1, at_pos, cx)?;
    Ok(MessageValue {
        channel,
        id,
        text: None,
        zoom,
        speaker: Speaker::None,
    })
}

fn check_display_objective(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    panel(args, cx, Channel::Objective, false)
}

fn check_display_information(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    panel(args, cx, Channel::Information, false)
}

fn check_display_objective_at(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    panel(args, cx, Channel::Objective, true)
}

fn check_display_information_at(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    panel(args, cx, Channel::Information, true)
}

fn quick_panel(
    args: &ArgList,
    cx: &mut CheckContext<'_>,
    channel: Channel,
    at_pos: bool,
) -> Result<MessageValue, ScriptError> {
    let id = message_id(args, cx)?;
    let zoom = zoom(args, 2, at_pos, cx)?;
    let text = intern(args, 1, cx)?;
    Ok(MessageValue {
        channel,
        id,
        text: Some(text),
        zoom,
        speaker: Speaker::None,
    })
}

fn check_quick_objective(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    quick_panel(args, cx, Channel::QuickObjective, false)
}

fn check_quick_information(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    quick_panel(args, cx, Channel::QuickInformation, false)
}

fn check_quick_objective_at(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    quick_panel(args, cx, Channel::QuickObjective, true)
}

fn check_quick_information_at(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    quick_panel(args, cx, Channel::QuickInformation, true)
}

fn check_display_message(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    let id = message_id(args, cx)?;
    Ok(MessageValue {
        channel: Channel::Message,
        id,
        text: None,
        zoom: MapLocation::None,
        speaker: speaker(args, 1, cx)?,
    })
}

fn check_quick_message(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<MessageValue, ScriptError> {
    let id = message_id(args, cx)?;
    let speaker = speaker(args, 2, cx)?;
    let text = intern(args, 1, cx)?;
    Ok(MessageValue {
        channel: Channel::QuickMessage,
        id,
        text: Some(text),
        zoom: MapLocation::None,
        speaker,
    })
}

fn process_message(value: &MessageValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let text = match value.text {
        Some(handle) => Some(cx.strings.get(handle)?.to_string()),
        None => None,
    };
    let zoom = cx.resolve(value.zoom);
    cx.apply(WorldOp::ShowMessage {
        channel: value.channel,
        id: value.id,
        text,
        zoom,
        speaker: value.speaker,
    })
}

fn check_play_message(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<SoundValue, ScriptError> {
    let kind_name = args.text(1)?;
    let kind = MessageKind::from_name(kind_name).ok_or_else(|| ScriptError::UnknownName {
        kind: "message kind",
        name: kind_name.to_string(),
    })?;
    let id = cx.clamp("sample id", args.number(2)?, 0, i64::from(i16::MAX));
    Ok(SoundValue { kind, id })
}

fn process_play_message(value: &SoundValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        cx.apply(WorldOp::PlaySound {
            player,
            kind: value.kind,
            id: value.id,
        })
    });
    Ok(())
}
