use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Global
    Quit,
    ShowHelp,
    CloseHelp,

    // Text input
    TypeChar(char),
    Backspace,

    // Dashboard
    CreateRoom,
    JoinRoom,

    // Lobby
    ToggleReady,
    StartGame,
    LeaveRoom,

    // Game
    SendGuess,
    MoveBrush(i16, i16),
    TogglePen,
    ClearCanvas,

    // Scoreboard
    BackToDashboard,
}

pub fn map_key(key: KeyEvent, screen: &Screen, help_open: bool) -> Option<Action> {
    // Ctrl+C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    if help_open {
        return Some(Action::CloseHelp);
    }

    match screen {
        Screen::Dashboard(_) => match key.code {
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::CreateRoom)
            }
            KeyCode::Char('?') => Some(Action::ShowHelp),
            KeyCode::Char(c) => Some(Action::TypeChar(c)),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Enter => Some(Action::JoinRoom),
            KeyCode::Esc => Some(Action::Quit),
            _ => None,
        },

        Screen::Lobby(_) => match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::ToggleReady),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::StartGame),
            KeyCode::Char('?') => Some(Action::ShowHelp),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Esc => Some(Action::LeaveRoom),
            _ => None,
        },

        Screen::Game(g) if g.is_drawing() => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveBrush(0, -1)),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveBrush(0, 1)),
            KeyCode::Left | KeyCode::Char('h') => Some(Action::MoveBrush(-1, 0)),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::MoveBrush(1, 0)),
            KeyCode::Char(' ') => Some(Action::TogglePen),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::ClearCanvas),
            KeyCode::Char('?') => Some(Action::ShowHelp),
            KeyCode::Esc => Some(Action::LeaveRoom),
            _ => None,
        },

        Screen::Game(_) => match key.code {
            KeyCode::Enter => Some(Action::SendGuess),
            KeyCode::Char(c) => Some(Action::TypeChar(c)),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Esc => Some(Action::LeaveRoom),
            _ => None,
        },

        Screen::Scoreboard(_) => match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Enter => Some(Action::BackToDashboard),
            KeyCode::Esc => Some(Action::Quit),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::dashboard::DashboardScreen;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn dashboard() -> Screen {
        Screen::Dashboard(DashboardScreen::new("Ada".into(), None))
    }

    #[test]
    fn test_dashboard_keys() {
        let screen = dashboard();
        assert_eq!(map_key(ctrl('n'), &screen, false), Some(Action::CreateRoom));
        assert_eq!(map_key(press(KeyCode::Char('n')), &screen, false), Some(Action::TypeChar('n')));
        assert_eq!(map_key(press(KeyCode::Enter), &screen, false), Some(Action::JoinRoom));
        assert_eq!(map_key(press(KeyCode::Esc), &screen, false), Some(Action::Quit));
    }

    #[test]
    fn test_ctrl_c_quits_even_with_help_open() {
        assert_eq!(map_key(ctrl('c'), &dashboard(), true), Some(Action::Quit));
    }

    #[test]
    fn test_any_key_closes_help() {
        assert_eq!(
            map_key(press(KeyCode::Char('x')), &dashboard(), true),
            Some(Action::CloseHelp)
        );
    }
}
