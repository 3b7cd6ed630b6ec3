use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    Select,
    Back,
    NewerPage,
    OlderPage,
    ScrollUp,
    ScrollDown,
    OpenInBrowser,
    DeletePage,
    Refresh,
    StartAdd,
    ShowHelp,
    HideHelp,
    // URL input actions
    UrlInputChar(char),
    UrlInputBackspace,
    UrlInputConfirm,
    UrlInputCancel,
}

pub fn handle_key_event(
    key: KeyEvent,
    url_input_active: bool,
    in_reading: bool,
    show_help: bool,
) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    // URL input mode
    if url_input_active {
        return match key.code {
            KeyCode::Enter => Some(AppAction::UrlInputConfirm),
            KeyCode::Esc => Some(AppAction::UrlInputCancel),
            KeyCode::Backspace => Some(AppAction::UrlInputBackspace),
            KeyCode::Char(c) => Some(AppAction::UrlInputChar(c)),
            _ => None,
        };
    }

    // Reading view
    if in_reading {
        return match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(AppAction::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::ScrollDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::ScrollUp),

            (KeyCode::Char('n'), _) => Some(AppAction::NewerPage),
            (KeyCode::Char('p'), _) => Some(AppAction::OlderPage),

            (KeyCode::Char('b'), _) | (KeyCode::Esc, _) => Some(AppAction::Back),
            (KeyCode::Char('o'), _) => Some(AppAction::OpenInBrowser),

            (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

            _ => None,
        };
    }

    // Feed view
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
        (KeyCode::Char('<'), _) => Some(AppAction::MoveToTop),
        (KeyCode::Char('>'), _) => Some(AppAction::MoveToBottom),

        (KeyCode::Enter, _) => Some(AppAction::Select),

        (KeyCode::Char('r'), _) => Some(AppAction::Refresh),
        (KeyCode::Char('a'), _) => Some(AppAction::StartAdd),
        (KeyCode::Char('o'), _) => Some(AppAction::OpenInBrowser),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(AppAction::DeletePage),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn feed_keys_map_to_navigation() {
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('j')), false, false, false),
            Some(AppAction::MoveDown)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Down), false, false, false),
            Some(AppAction::MoveDown)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Enter), false, false, false),
            Some(AppAction::Select)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('d')), false, false, false),
            Some(AppAction::DeletePage)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('a')), false, false, false),
            Some(AppAction::StartAdd)
        ));
    }

    #[test]
    fn reading_keys_scroll_and_walk_neighbors() {
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('j')), false, true, false),
            Some(AppAction::ScrollDown)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('k')), false, true, false),
            Some(AppAction::ScrollUp)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('n')), false, true, false),
            Some(AppAction::NewerPage)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('p')), false, true, false),
            Some(AppAction::OlderPage)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Esc), false, true, false),
            Some(AppAction::Back)
        ));
        // Deleting is a feed affair.
        assert!(handle_key_event(key(KeyCode::Char('d')), false, true, false).is_none());
    }

    #[test]
    fn url_input_captures_typing() {
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('q')), true, false, false),
            Some(AppAction::UrlInputChar('q'))
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Enter), true, false, false),
            Some(AppAction::UrlInputConfirm)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Esc), true, false, false),
            Some(AppAction::UrlInputCancel)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Backspace), true, false, false),
            Some(AppAction::UrlInputBackspace)
        ));
    }

    #[test]
    fn help_swallows_every_key() {
        assert!(matches!(
            handle_key_event(key(KeyCode::Char('j')), false, false, true),
            Some(AppAction::HideHelp)
        ));
        assert!(matches!(
            handle_key_event(key(KeyCode::Enter), true, true, true),
            Some(AppAction::HideHelp)
        ));
    }

    #[test]
    fn ctrl_c_quits_in_both_views() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(
            handle_key_event(ctrl_c, false, false, false),
            Some(AppAction::Quit)
        ));
        assert!(matches!(
            handle_key_event(ctrl_c, false, true, false),
            Some(AppAction::Quit)
        ));
    }
}
