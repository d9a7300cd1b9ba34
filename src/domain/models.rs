use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub key: &'static str,
    pub label: &'static str,
    pub stream_url: &'static str,
    pub gradient_start: &'static str,
    pub gradient_end: &'static str,
}

impl Station {
    pub fn gradient_rgb(&self) -> Option<((u8, u8, u8), (u8, u8, u8))> {
        Some((parse_hex_color(self.gradient_start)?, parse_hex_color(self.gradient_end)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackState {
    #[default]
    Idle,
    Connecting,
    Playing,
    ErrorRecovering,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Playing => "Playing",
            Self::ErrorRecovering => "Reconnecting",
        }
    }

    /// True while a backend handle is alive.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Playing)
    }
}

/// Parses `#RRGGBB` (case-insensitive).
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
