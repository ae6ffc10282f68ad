use crate::app::Screen;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Refresh,
    ToggleWatch,
    OpenBrowser,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    Select,
    ToggleLogs,
    NextRun,
    PrevRun,
    Branches,
    StatusFilter,
    ShowHelp,
    CloseHelp,
    Workflow,
    Artifacts,
    LogFilter,
    SaveLogs,
    ToggleHighlight,
    Compare,
    MultiJob,
    ToggleSplit,
    Back,
    Toggle,
    Rerun,
    CancelRun,
    Dispatch,
    StartSearch,
    NextMatch,
    PrevMatch,
    SearchChar(char),
    SearchBackspace,
    SearchConfirm,
    SearchCancel,
    None,
}

/// UI state needed to interpret a key press.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputContext {
    pub screen: Screen,
    /// The log search prompt is capturing keystrokes.
    pub search_input: bool,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if ctx.search_input {
        return match key.code {
            KeyCode::Enter => Action::SearchConfirm,
            KeyCode::Esc => Action::SearchCancel,
            KeyCode::Backspace => Action::SearchBackspace,
            KeyCode::Char(c) => Action::SearchChar(c),
            _ => Action::None,
        };
    }

    if key.code == KeyCode::Char('q') {
        return Action::Quit;
    }

    if ctx.screen == Screen::Help {
        return Action::CloseHelp;
    }

    match key.code {
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Char('w') => Action::ToggleWatch,
        KeyCode::Char('o') => Action::OpenBrowser,
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Home | KeyCode::Char('g') => Action::ScrollToTop,
        KeyCode::End | KeyCode::Char('G') => Action::ScrollToBottom,
        KeyCode::Enter => Action::Select,
        KeyCode::Char('l') => Action::ToggleLogs,
        KeyCode::Right => Action::NextRun,
        KeyCode::Left | KeyCode::Char('h') => Action::PrevRun,
        KeyCode::Char('b') => Action::Branches,
        KeyCode::Char('f') => Action::StatusFilter,
        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char('y') => Action::Workflow,
        KeyCode::Char('a') => Action::Artifacts,
        KeyCode::Char('F') => Action::LogFilter,
        KeyCode::Char('s') => Action::SaveLogs,
        KeyCode::Char('H') => Action::ToggleHighlight,
        KeyCode::Char('c') => Action::Compare,
        KeyCode::Char('m') => Action::MultiJob,
        KeyCode::Char('v') => Action::ToggleSplit,
        KeyCode::Esc => Action::Back,
        KeyCode::Char(' ') => Action::Toggle,
        KeyCode::Char('R') => Action::Rerun,
        KeyCode::Char('X') => Action::CancelRun,
        KeyCode::Char('D') => Action::Dispatch,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Char('n') => Action::NextMatch,
        KeyCode::Char('N') => Action::PrevMatch,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn press_with(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        }
    }

    fn ctx() -> InputContext {
        InputContext {
            screen: Screen::Ready,
            search_input: false,
        }
    }

    fn ctx_help() -> InputContext {
        InputContext {
            screen: Screen::Help,
            ..ctx()
        }
    }

    fn ctx_search() -> InputContext {
        InputContext {
            screen: Screen::LogViewer,
            search_input: true,
        }
    }

    #[test]
    fn quit_on_q() {
        assert_eq!(map_key(press(KeyCode::Char('q')), &ctx()), Action::Quit);
    }

    #[test]
    fn ctrl_c_quits() {
        assert_eq!(
            map_key(press_with(KeyCode::Char('c'), KeyModifiers::CONTROL), &ctx()),
            Action::Quit
        );
    }

    #[test]
    fn plain_c_compares() {
        assert_eq!(map_key(press(KeyCode::Char('c')), &ctx()), Action::Compare);
    }

    #[test]
    fn non_press_event_filtered() {
        assert_eq!(map_key(release(KeyCode::Char('q')), &ctx()), Action::None);
    }

    #[test]
    fn vim_and_arrow_movement() {
        assert_eq!(map_key(press(KeyCode::Up), &ctx()), Action::MoveUp);
        assert_eq!(map_key(press(KeyCode::Char('k')), &ctx()), Action::MoveUp);
        assert_eq!(map_key(press(KeyCode::Down), &ctx()), Action::MoveDown);
        assert_eq!(map_key(press(KeyCode::Char('j')), &ctx()), Action::MoveDown);
    }

    #[test]
    fn run_navigation() {
        assert_eq!(map_key(press(KeyCode::Right), &ctx()), Action::NextRun);
        assert_eq!(map_key(press(KeyCode::Left), &ctx()), Action::PrevRun);
        assert_eq!(map_key(press(KeyCode::Char('h')), &ctx()), Action::PrevRun);
    }

    #[test]
    fn l_toggles_logs() {
        assert_eq!(map_key(press(KeyCode::Char('l')), &ctx()), Action::ToggleLogs);
    }

    #[test]
    fn case_sensitive_bindings() {
        assert_eq!(map_key(press(KeyCode::Char('f')), &ctx()), Action::StatusFilter);
        assert_eq!(map_key(press(KeyCode::Char('F')), &ctx()), Action::LogFilter);
        assert_eq!(map_key(press(KeyCode::Char('r')), &ctx()), Action::Refresh);
        assert_eq!(map_key(press(KeyCode::Char('R')), &ctx()), Action::Rerun);
        assert_eq!(map_key(press(KeyCode::Char('n')), &ctx()), Action::NextMatch);
        assert_eq!(map_key(press(KeyCode::Char('N')), &ctx()), Action::PrevMatch);
    }

    #[test]
    fn help_closes_on_any_key_but_quit() {
        assert_eq!(map_key(press(KeyCode::Char('j')), &ctx_help()), Action::CloseHelp);
        assert_eq!(map_key(press(KeyCode::Esc), &ctx_help()), Action::CloseHelp);
        assert_eq!(map_key(press(KeyCode::Char('q')), &ctx_help()), Action::Quit);
    }

    #[test]
    fn question_mark_shows_help() {
        assert_eq!(map_key(press(KeyCode::Char('?')), &ctx()), Action::ShowHelp);
    }

    // --- Search prompt ---

    #[test]
    fn search_captures_letters() {
        assert_eq!(
            map_key(press(KeyCode::Char('q')), &ctx_search()),
            Action::SearchChar('q')
        );
        assert_eq!(
            map_key(press(KeyCode::Char('r')), &ctx_search()),
            Action::SearchChar('r')
        );
    }

    #[test]
    fn search_editing_keys() {
        assert_eq!(map_key(press(KeyCode::Enter), &ctx_search()), Action::SearchConfirm);
        assert_eq!(map_key(press(KeyCode::Esc), &ctx_search()), Action::SearchCancel);
        assert_eq!(
            map_key(press(KeyCode::Backspace), &ctx_search()),
            Action::SearchBackspace
        );
    }

    #[test]
    fn search_still_honours_ctrl_c() {
        assert_eq!(
            map_key(press_with(KeyCode::Char('c'), KeyModifiers::CONTROL), &ctx_search()),
            Action::Quit
        );
    }

    #[test]
    fn unbound_key_returns_none() {
        assert_eq!(map_key(press(KeyCode::Char('z')), &ctx()), Action::None);
    }
}
