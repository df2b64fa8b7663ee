//! Display colors for resolved message parts.

use std::fmt;

use archlink_protocol::{HintStatus, ItemFlags, WireColor};

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const SLATE_BLUE: Self = Self::rgb(106, 90, 205);
    pub const SALMON: Self = Self::rgb(250, 128, 114);
    pub const PLUM: Self = Self::rgb(221, 160, 221);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Palette color for a wire color hint.
    ///
    /// Background entries map to the same RGB as their foreground twin;
    /// the caller tracks which side they apply to. Style hints (`bold`,
    /// `underline`) carry no color.
    pub fn from_wire(color: WireColor) -> Option<Self> {
        let rgb = match color {
            WireColor::Black | WireColor::BlackBg => Self::BLACK,
            WireColor::Red | WireColor::RedBg => Self::RED,
            WireColor::Green | WireColor::GreenBg => Self::GREEN,
            WireColor::Yellow | WireColor::YellowBg => Self::YELLOW,
            WireColor::Blue | WireColor::BlueBg => Self::BLUE,
            WireColor::Magenta | WireColor::MagentaBg => Self::MAGENTA,
            WireColor::Cyan | WireColor::CyanBg => Self::CYAN,
            WireColor::White | WireColor::WhiteBg => Self::WHITE,
            WireColor::Bold | WireColor::Underline => return None,
        };
        Some(rgb)
    }

    /// Item color. Advancement wins over never-exclude, which wins over
    /// trap.
    pub fn for_item(flags: ItemFlags) -> Self {
        if flags.is_advancement() {
            Self::PLUM
        } else if flags.is_never_exclude() {
            Self::SLATE_BLUE
        } else if flags.is_trap() {
            Self::SALMON
        } else {
            Self::CYAN
        }
    }

    pub fn for_hint_status(status: HintStatus) -> Self {
        match status {
            HintStatus::Found => Self::GREEN,
            HintStatus::Unspecified => Self::WHITE,
            HintStatus::NoPriority => Self::SLATE_BLUE,
            HintStatus::Avoid => Self::SALMON,
            HintStatus::Priority => Self::PLUM,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Formats as `#rrggbb`.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
