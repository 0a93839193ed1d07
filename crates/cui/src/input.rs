use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    Quit,
    ToggleHelp,
    Draw,
    Skip,
    Purge,
    Cancel,
}

pub fn map_key(key: KeyEvent) -> InputAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputAction::Quit,
        KeyCode::Esc => InputAction::Cancel,
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('d') => InputAction::Draw,
        KeyCode::Char('q') => InputAction::Quit,
        KeyCode::Char('?') => InputAction::ToggleHelp,
        KeyCode::Char('s') => InputAction::Skip,
        KeyCode::Char('P') => InputAction::Purge,
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::SHIFT) => InputAction::Purge,
        _ => InputAction::None,
    }
}
