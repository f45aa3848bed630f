//! Key bindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pause,
    Quit,
    None,
}

/// Map a key press to an action. Outside preview mode every key ends the screensaver.
pub fn key_to_action(key: KeyEvent, preview: bool) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        _ if !preview => Action::Quit,
        KeyCode::Char('p') | KeyCode::Char(' ') if no_mod => Action::Pause,
        _ => Action::None,
    }
}
