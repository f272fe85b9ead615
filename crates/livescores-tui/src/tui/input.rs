// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState mutations (selection, rider
// expansion).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use livescores_core::projection::CategoryFilter;

use super::ViewState;
use crate::protocol::UserCommand;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    match key_event.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(UserCommand::Quit),

        // Category selection
        KeyCode::Tab | KeyCode::Char('c') | KeyCode::Right | KeyCode::Char('l') => {
            change_filter(view_state, cycle_filter(&view_state.categories, &view_state.filter, true))
        }
        KeyCode::BackTab | KeyCode::Char('C') | KeyCode::Left | KeyCode::Char('h') => {
            change_filter(view_state, cycle_filter(&view_state.categories, &view_state.filter, false))
        }
        KeyCode::Char('a') => change_filter(view_state, CategoryFilter::All),

        // Row selection and rider breakdown
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.select_prev();
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.select_next();
            None
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            view_state.toggle_selected();
            None
        }

        KeyCode::Char('r') => Some(UserCommand::Refresh),

        _ => None,
    }
}

fn change_filter(view_state: &mut ViewState, filter: CategoryFilter) -> Option<UserCommand> {
    if filter == view_state.filter {
        return None;
    }
    view_state.set_filter(filter.clone());
    Some(UserCommand::SetFilter(filter))
}

/// Next (or previous) entry in `All, categories...`, wrapping at both ends.
/// A filter not in the list counts as `All`.
pub fn cycle_filter(categories: &[String], current: &CategoryFilter, forward: bool) -> CategoryFilter {
    let options: Vec<CategoryFilter> = std::iter::once(CategoryFilter::All)
        .chain(categories.iter().map(|c| CategoryFilter::Category(c.clone())))
        .collect();
    let idx = options.iter().position(|f| f == current).unwrap_or(0);
    let next = if forward {
        (idx + 1) % options.len()
    } else {
        (idx + options.len() - 1) % options.len()
    };
    options[next].clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::UiUpdate;
    use crate::tui::apply_ui_update;
    use crossterm::event::KeyEventState;
    use livescores_core::model::{Category, RiderRow, StandingsPayload, TeamId, TeamRow};
    use livescores_core::projection::project;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn cats() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    fn state_with_categories() -> ViewState {
        ViewState {
            categories: cats(),
            ..ViewState::default()
        }
    }

    // -- Filter cycling --

    #[test]
    fn cycle_forward_wraps() {
        let all = CategoryFilter::All;
        let a = CategoryFilter::from_label(Some("A"));
        let b = CategoryFilter::from_label(Some("B"));
        assert_eq!(cycle_filter(&cats(), &all, true), a);
        assert_eq!(cycle_filter(&cats(), &a, true), b);
        assert_eq!(cycle_filter(&cats(), &b, true), all);
    }

    #[test]
    fn cycle_backward_wraps() {
        let all = CategoryFilter::All;
        assert_eq!(
            cycle_filter(&cats(), &all, false),
            CategoryFilter::from_label(Some("B"))
        );
    }

    #[test]
    fn cycle_from_unknown_category_starts_at_all() {
        let gone = CategoryFilter::from_label(Some("Gone"));
        assert_eq!(
            cycle_filter(&cats(), &gone, true),
            CategoryFilter::from_label(Some("A"))
        );
    }

    #[test]
    fn cycle_without_categories_stays_all() {
        assert_eq!(
            cycle_filter(&[], &CategoryFilter::All, true),
            CategoryFilter::All
        );
    }

    #[test]
    fn tab_sends_set_filter() {
        let mut state = state_with_categories();
        let result = handle_key(key(KeyCode::Tab), &mut state);
        let a = CategoryFilter::from_label(Some("A"));
        assert_eq!(result, Some(UserCommand::SetFilter(a.clone())));
        assert_eq!(state.filter, a);
    }

    #[test]
    fn a_returns_to_all() {
        let mut state = state_with_categories();
        state.filter = CategoryFilter::from_label(Some("B"));
        assert_eq!(
            handle_key(key(KeyCode::Char('a')), &mut state),
            Some(UserCommand::SetFilter(CategoryFilter::All))
        );
        // Already on all: nothing to send.
        assert_eq!(handle_key(key(KeyCode::Char('a')), &mut state), None);
    }

    // -- Selection and expansion --

    #[test]
    fn enter_toggles_riders_of_selected_row() {
        let payload = StandingsPayload {
            categories: vec![Category {
                label: "A".into(),
                teams: vec![
                    TeamRow {
                        team_id: TeamId::Number(1),
                        ..TeamRow::default()
                    },
                    TeamRow {
                        team_id: TeamId::Number(2),
                        riders: Some(vec![RiderRow::default()]),
                        ..TeamRow::default()
                    },
                ],
            }],
            combined: vec![],
        };
        let filter = CategoryFilter::from_label(Some("A"));
        let mut state = state_with_categories();
        state.set_filter(filter.clone());
        apply_ui_update(
            &mut state,
            UiUpdate::Standings {
                projection: Box::new(project(&payload, &filter)),
                fetched_at: None,
            },
        );

        assert_eq!(handle_key(key(KeyCode::Down), &mut state), None);
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
        assert!(state.expanded.contains(&TeamId::Number(2)));

        handle_key(key(KeyCode::Char(' ')), &mut state);
        assert!(state.expanded.is_empty());

        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.selected, 0);
    }

    // -- Commands --

    #[test]
    fn r_requests_refresh() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(key(KeyCode::Char('r')), &mut state),
            Some(UserCommand::Refresh)
        );
    }

    #[test]
    fn q_and_ctrl_c_quit() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(key(KeyCode::Char('q')), &mut state),
            Some(UserCommand::Quit)
        );
        assert_eq!(
            handle_key(ctrl_key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut event = key(KeyCode::Char('q'));
        event.kind = KeyEventKind::Release;
        assert_eq!(handle_key(event, &mut state), None);
    }

    #[test]
    fn unbound_key_is_noop() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Char('z')), &mut state), None);
    }
}
