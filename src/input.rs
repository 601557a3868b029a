//! Key bindings (normal and vim-style) and mouse-drag swipe decoding.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Minimum drag distance, in terminal cells, before a swipe counts.
pub const SWIPE_THRESHOLD: i32 = 2;

/// Action from a key press or a decoded swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    Pause,
    Start,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows) and vim (hjk).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') | KeyCode::Char(' ') if modifiers == KeyModifiers::CONTROL => {
            Action::Pause
        }
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('i') if no_mod => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Start,
        _ => Action::None,
    }
}

/// Decode a mouse drag as a swipe: the dominant axis wins, short drags are
/// ignored. Right/left move, down soft-drops, up rotates.
pub fn swipe_to_action(dx: i32, dy: i32) -> Action {
    if dx.abs() > dy.abs() {
        if dx > SWIPE_THRESHOLD {
            Action::MoveRight
        } else if dx < -SWIPE_THRESHOLD {
            Action::MoveLeft
        } else {
            Action::None
        }
    } else if dy > SWIPE_THRESHOLD {
        Action::SoftDrop
    } else if dy < -SWIPE_THRESHOLD {
        Action::Rotate
    } else {
        Action::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_dominant_axis_wins() {
        assert_eq!(swipe_to_action(8, 3), Action::MoveRight);
        assert_eq!(swipe_to_action(-8, 3), Action::MoveLeft);
        assert_eq!(swipe_to_action(2, 9), Action::SoftDrop);
        assert_eq!(swipe_to_action(-1, -7), Action::Rotate);
    }

    #[test]
    fn test_swipe_below_threshold_is_ignored() {
        assert_eq!(swipe_to_action(0, 0), Action::None);
        assert_eq!(swipe_to_action(2, 1), Action::None);
        assert_eq!(swipe_to_action(-1, 2), Action::None);
    }
}
