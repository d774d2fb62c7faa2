use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use pagewright::app::action::Action;
use pagewright::app::controller::{App, NotificationLevel};
use pagewright::app::event::AppEvent;
use pagewright::app::handler;
use pagewright::app::navigation::RouteArgs;
use pagewright::config::{self, AppConfig};
use pagewright::ui::window::Window;
use pagewright::{logging, pages, ui};
use ratatui::prelude::*;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Restores the terminal when dropped, including during an unwind.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = restore_terminal();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config, writing the defaults on first run
    let cfg = config::load_config()?;
    if !config::config_exists() {
        config::save_config(&cfg)?;
    }

    let log_file = logging::init(&cfg.logging)?;

    // Panics inside pages, subscribers and tasks are contained by the app;
    // keep their reports out of the terminal and in the log.
    std::panic::set_hook(Box::new(|info| {
        error!(panic = %info, "panic");
    }));

    // Setup terminal
    enable_raw_mode()?;
    let guard = TerminalGuard;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, cfg).await;

    drop(guard);

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if let Some(path) = log_file {
            eprintln!("See {} for details.", path.display());
        }
        std::process::exit(1);
    }

    Ok(())
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    cfg: AppConfig,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();

    let mut app = App::new(&cfg, Box::new(Window::new()), event_tx.clone());
    pages::register(&mut app)?;
    info!(route = %cfg.navigation.initial_route, "starting");
    // A failure here already put the error page up
    let _ = app.navigate(&cfg.navigation.initial_route, RouteArgs::new());

    // Spawn terminal input task
    let term_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            if term_tx.send(AppEvent::Terminal(event)).is_err() {
                break;
            }
        }
    });

    // Spawn tick task
    let tick_tx = event_tx;
    let tick_rate = Duration::from_millis(cfg.ui.tick_rate_ms.max(16));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_rate);
        loop {
            interval.tick().await;
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // Initial render
    terminal.draw(|f| ui::render(f, &app))?;

    // Main event loop
    while let Some(event) = event_rx.recv().await {
        let (actions, mut dirty) = handler::handle_event(&mut app, event);

        for action in actions {
            apply(&mut app, action);
            dirty = true;
        }

        if app.should_quit() {
            break;
        }

        if dirty {
            terminal.draw(|f| ui::render(f, &app))?;
        }
    }

    info!("shutting down");
    Ok(())
}

fn apply(app: &mut App, action: Action) {
    match action {
        Action::Navigate { route, args } => {
            // Failures are shown as the error page and a notification
            let _ = app.navigate(&route, args);
        }
        Action::Back => {
            if let Ok(false) = app.back() {
                app.notify(NotificationLevel::Info, "Nothing to go back to");
            }
        }
        Action::Refresh => {
            if let Err(e) = pages::home::start_refresh(app) {
                app.notify(NotificationLevel::Error, format!("Refresh failed: {e:#}"));
            }
        }
        Action::FailingTask => {
            pages::home::start_failing_task(app);
        }
        Action::DismissNotifications => app.dismiss_notifications(),
        Action::Quit => app.quit(),
    }
}
