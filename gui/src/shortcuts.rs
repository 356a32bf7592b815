use iced::keyboard::key::Named;
use iced::keyboard::{Key, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Reject,
    Approve,
    SuperLike,
    Undo,
    Refresh,
}

impl Shortcut {
    /// Shortcuts that act on the card on screen and are ignored without one.
    pub fn needs_active_card(self) -> bool {
        !matches!(self, Shortcut::Refresh)
    }
}

/// Maps a key press to a review shortcut.
///
/// Arrows decide the current card, `z` (bare or with Ctrl/Cmd) undoes the
/// last decision and a bare `r` reloads.
pub fn shortcut_for(key: &Key, modifiers: Modifiers) -> Option<Shortcut> {
    match key {
        Key::Named(Named::ArrowLeft) => Some(Shortcut::Reject),
        Key::Named(Named::ArrowRight) => Some(Shortcut::Approve),
        Key::Named(Named::ArrowUp) => Some(Shortcut::SuperLike),
        Key::Character(c) if c.as_str().eq_ignore_ascii_case("z") => Some(Shortcut::Undo),
        Key::Character(c) if c.as_str().eq_ignore_ascii_case("r") && !modifiers.command() => {
            Some(Shortcut::Refresh)
        }
        _ => None,
    }
}
