//! Key presses mapped to chat actions.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Submit,
    Stop,
    CycleModel,
    NewChat,
    Listen,
    Insert(char),
    Backspace,
    ClearInput,
    ScrollUp(u16),
    ScrollDown(u16),
    ScrollTop,
    ScrollBottom,
    Ignored,
}

pub fn map_key(key: &KeyEvent, page: u16) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => KeyAction::Quit,
        KeyCode::Char('n') if ctrl => KeyAction::NewChat,
        KeyCode::Char('t') if ctrl => KeyAction::Listen,
        KeyCode::Char('u') if ctrl => KeyAction::ClearInput,
        KeyCode::Char(_) if ctrl => KeyAction::Ignored,
        KeyCode::Char(c) => KeyAction::Insert(c),
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Esc => KeyAction::Stop,
        KeyCode::Tab => KeyAction::CycleModel,
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Up => KeyAction::ScrollUp(1),
        KeyCode::Down => KeyAction::ScrollDown(1),
        KeyCode::PageUp => KeyAction::ScrollUp(page.max(1)),
        KeyCode::PageDown => KeyAction::ScrollDown(page.max(1)),
        KeyCode::Home => KeyAction::ScrollTop,
        KeyCode::End => KeyAction::ScrollBottom,
        _ => KeyAction::Ignored,
    }
}
