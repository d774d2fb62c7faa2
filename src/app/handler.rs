use crate::app::action::Action;
use crate::app::controller::App;
use crate::app::event::AppEvent;
use crate::app::navigation::RouteArgs;
use crossterm::event::{Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde_json::json;

/// Route the `x` key points at; never registered.
pub const MISSING_ROUTE: &str = "settings";

/// Apply one event to the app and return the actions it asks for.
///
/// Dispatched jobs run here, inside the app's error boundary. Returns
/// whether the screen needs a redraw alongside the actions.
pub fn handle_event(app: &mut App, event: AppEvent) -> (Vec<Action>, bool) {
    match event {
        AppEvent::Terminal(cevent) => handle_terminal(cevent),
        AppEvent::Dispatch(job) => {
            app.run_job(job);
            (vec![], true)
        }
        // Keeps the status bar's task counter current
        AppEvent::Tick => (vec![], app.tasks.in_flight() > 0),
    }
}

fn handle_terminal(event: CEvent) -> (Vec<Action>, bool) {
    match event {
        CEvent::Key(key) if key.kind != KeyEventKind::Release => (handle_key(key), true),
        CEvent::Resize(_, _) => (vec![], true),
        _ => (vec![], false),
    }
}

fn handle_key(key: KeyEvent) -> Vec<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return vec![Action::Quit];
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => vec![Action::Quit],
        KeyCode::Char(c @ '1'..='9') => vec![Action::Navigate {
            route: "details".to_string(),
            args: details_args(c),
        }],
        KeyCode::Char('h') => vec![navigate("home")],
        KeyCode::Char('a') => vec![navigate("about")],
        KeyCode::Char('x') => vec![navigate(MISSING_ROUTE)],
        KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Left => vec![Action::Back],
        KeyCode::Char('r') => vec![Action::Refresh],
        KeyCode::Char('f') => vec![Action::FailingTask],
        KeyCode::Char('c') => vec![Action::DismissNotifications],
        _ => vec![],
    }
}

fn navigate(route: &str) -> Action {
    Action::Navigate {
        route: route.to_string(),
        args: RouteArgs::new(),
    }
}

fn details_args(digit: char) -> RouteArgs {
    let mut args = RouteArgs::new();
    if let Some(n) = digit.to_digit(10) {
        args.insert("id".to_string(), json!(n));
    }
    args
}
