//! Terminal styling for the status view

use crate::config::Settings;

/// Reset all attributes
pub const RESET: &str = "\x1b[0m";
/// Red foreground
pub const RED: &str = "\x1b[31m";
/// Green foreground
pub const GREEN: &str = "\x1b[32m";
/// Blue foreground
pub const BLUE: &str = "\x1b[34m";
/// Bold blue foreground
pub const LIGHT_BLUE: &str = "\x1b[1;34m";

/// Icons for the status-bit quartet
#[derive(Debug, Clone, Copy)]
pub struct Icons {
    pub checkmark: &'static str,
    pub crossmark: &'static str,
    pub pending: &'static str,
    pub questionmark: &'static str,
    pub empty: &'static str,
    pub warning: &'static str,
}

const ASCII_ICONS: Icons = Icons {
    checkmark: "v",
    crossmark: "x",
    pending: ".",
    questionmark: "?",
    empty: "-",
    warning: "!",
};

const EMOJI_ICONS: Icons = Icons {
    checkmark: "✅",
    crossmark: "❌",
    pending: "⌛",
    questionmark: "❓",
    empty: "➖",
    warning: "⚠️",
};

/// Icon set selected by the user's settings
pub fn icons(settings: &Settings) -> Icons {
    if settings.user.status_bits_emojis {
        EMOJI_ICONS
    } else {
        ASCII_ICONS
    }
}

/// Color for a PR-set index, cycling by `index % 4`
pub fn pr_set_color(pr_index: Option<usize>) -> &'static str {
    match pr_index {
        None => BLUE,
        Some(i) => match i % 4 {
            0 => RED,
            1 => GREEN,
            2 => BLUE,
            _ => LIGHT_BLUE,
        },
    }
}
