//! Hooks into the surrounding user interface.
//!
//! The core never draws anything itself. When it needs the user to log in
//! again or to pick a daily goal, it asks the `AppShell` it was built with.

use tracing::info;

pub trait AppShell: Send + Sync {
    /// The session is gone; send the user to the login surface.
    fn navigate_to_login(&self);

    /// No daily goal is configured; ask the user to choose one.
    fn request_daily_goal(&self);
}

/// Shell for headless use: requests are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopShell;

impl AppShell for NoopShell {
    fn navigate_to_login(&self) {
        info!("Login required");
    }

    fn request_daily_goal(&self) {
        info!("Daily goal not configured");
    }
}
