//! Rich-text message fragments as they appear in `PrintJSON` packets.
//!
//! Fragments are flat and loosely typed on the wire: a `type` string says
//! how to read `text`, which may hold literal text or a numeric id. Colors
//! and hint statuses are decoded leniently; an unrecognized value becomes
//! `None` instead of failing the whole packet.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::{ItemFlags, Slot};

/// How a fragment's `text` should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    Text,
    /// `text` is a slot number.
    PlayerId,
    PlayerName,
    /// `text` is an item id; `player` is the receiving slot.
    ItemId,
    ItemName,
    /// `text` is a location id; `player` is the slot owning the location.
    LocationId,
    LocationName,
    EntranceName,
    HintStatus,
    /// Plain text with a `color` hint.
    Color,
    #[serde(other)]
    Unknown,
}

/// One fragment of a rich-text log line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JsonMessagePart {
    /// Absent means plain text.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PartType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<WireColor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<ItemFlags>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Slot>,

    #[serde(
        default,
        deserialize_with = "lenient_hint_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub hint_status: Option<HintStatus>,
}

impl JsonMessagePart {
    /// A plain text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A typed fragment.
    pub fn typed(kind: PartType, text: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_player(mut self, player: Slot) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_color(mut self, color: WireColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_hint_status(mut self, status: HintStatus) -> Self {
        self.hint_status = Some(status);
        self
    }
}

// ---------------------------------------------------------------------------
// WireColor
// ---------------------------------------------------------------------------

/// Terminal-style color hint attached to a text fragment.
///
/// The palette has eight foreground and eight background colors, indexed
/// 0-7 and 8-15. The protocol also sends these as snake-case names
/// (`"red"`, `"blue_bg"`) plus the two style hints `"bold"` and
/// `"underline"`; both forms are accepted. Encoding always uses names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BlackBg,
    RedBg,
    GreenBg,
    YellowBg,
    BlueBg,
    MagentaBg,
    CyanBg,
    WhiteBg,
    Bold,
    Underline,
}

impl WireColor {
    /// The sixteen palette entries, in index order.
    pub const PALETTE: [WireColor; 16] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
        Self::BlackBg,
        Self::RedBg,
        Self::GreenBg,
        Self::YellowBg,
        Self::BlueBg,
        Self::MagentaBg,
        Self::CyanBg,
        Self::WhiteBg,
    ];

    pub fn from_index(index: u64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::PALETTE.get(i).copied())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let color = match name {
            "black" => Self::Black,
            "red" => Self::Red,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "blue" => Self::Blue,
            "magenta" => Self::Magenta,
            "cyan" => Self::Cyan,
            "white" => Self::White,
            "black_bg" => Self::BlackBg,
            "red_bg" => Self::RedBg,
            "green_bg" => Self::GreenBg,
            "yellow_bg" => Self::YellowBg,
            "blue_bg" => Self::BlueBg,
            "magenta_bg" => Self::MagentaBg,
            "cyan_bg" => Self::CyanBg,
            "white_bg" => Self::WhiteBg,
            "bold" => Self::Bold,
            "underline" => Self::Underline,
            _ => return None,
        };
        Some(color)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BlackBg => "black_bg",
            Self::RedBg => "red_bg",
            Self::GreenBg => "green_bg",
            Self::YellowBg => "yellow_bg",
            Self::BlueBg => "blue_bg",
            Self::MagentaBg => "magenta_bg",
            Self::CyanBg => "cyan_bg",
            Self::WhiteBg => "white_bg",
            Self::Bold => "bold",
            Self::Underline => "underline",
        }
    }

    /// Returns `true` for the `*_bg` half of the palette.
    pub fn is_background(self) -> bool {
        matches!(
            self,
            Self::BlackBg
                | Self::RedBg
                | Self::GreenBg
                | Self::YellowBg
                | Self::BlueBg
                | Self::MagentaBg
                | Self::CyanBg
                | Self::WhiteBg
        )
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(Self::from_index),
            Value::String(s) => Self::from_name(s),
            _ => None,
        }
    }
}

impl Serialize for WireColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

fn lenient_color<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<WireColor>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(WireColor::from_value))
}

// ---------------------------------------------------------------------------
// HintStatus
// ---------------------------------------------------------------------------

/// Priority state of a hint, sent as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintStatus {
    Unspecified,
    NoPriority,
    Avoid,
    Priority,
    Found,
}

impl HintStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        let status = match code {
            0 => Self::Unspecified,
            10 => Self::NoPriority,
            20 => Self::Avoid,
            30 => Self::Priority,
            40 => Self::Found,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Unspecified => 0,
            Self::NoPriority => 10,
            Self::Avoid => 20,
            Self::Priority => 30,
            Self::Found => 40,
        }
    }
}

impl Serialize for HintStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

fn lenient_hint_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<HintStatus>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_i64)
        .and_then(HintStatus::from_code))
}
