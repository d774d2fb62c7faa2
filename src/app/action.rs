use crate::app::navigation::RouteArgs;

/// Side effects requested by key handling, applied by the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate { route: String, args: RouteArgs },
    Back,
    /// Reload the item list in the background
    Refresh,
    /// Start a task that is known to fail
    FailingTask,
    DismissNotifications,
    Quit,
}
