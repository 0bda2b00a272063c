//! Wiring between the command line and the core library.

use std::sync::Arc;

use anyhow::{Context, Result};
use quizstreak_core::stats::GOAL_PRESETS;
use quizstreak_core::{
    ApiClient, AppShell, Config, FileStore, PracticeStatsEngine, ReqwestTransport,
    SessionManager, SyncOutcome,
};
use tracing::{debug, info};

use crate::command::{Command, USAGE};

/// Terminal stand-in for the web UI: prompts become printed instructions.
struct CliShell;

impl AppShell for CliShell {
    fn navigate_to_login(&self) {
        eprintln!("Your session has expired. Log in again with `quizstreak login <token>`.");
    }

    fn request_daily_goal(&self) {
        let presets: Vec<String> = GOAL_PRESETS.iter().map(|g| g.to_string()).collect();
        eprintln!(
            "No daily goal set. Pick one with `quizstreak goal <n>` (try {}).",
            presets.join(", ")
        );
    }
}

fn report_sync(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Synced(streaks) => debug!(?streaks, "Stats synced"),
        SyncOutcome::Skipped(reason) => debug!(%reason, "Stats kept local"),
        SyncOutcome::Failed(e) => eprintln!("Warning: could not sync with backend: {}", e),
    }
}

pub struct App {
    session: SessionManager,
    stats: PracticeStatsEngine,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        let data_dir = config.data_dir()?;
        let store = Arc::new(
            FileStore::open(&data_dir)
                .with_context(|| format!("Failed to open store in {}", data_dir.display()))?,
        );
        let transport = Arc::new(
            ReqwestTransport::new(config.request_timeout())
                .context("Failed to build HTTP client")?,
        );
        let api = ApiClient::new(transport, &config);
        let shell: Arc<dyn AppShell> = Arc::new(CliShell);

        let session = SessionManager::new(store.clone(), api.clone(), shell.clone(), &config);
        let stats = PracticeStatsEngine::new(store, session.clone(), api, shell);
        info!(data_dir = %data_dir.display(), "App initialized");

        Ok(Self { session, stats })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login(token) => {
                self.session.set_token(token)?;
                if self.session.verify_token().await {
                    println!("Logged in.");
                    report_sync(&self.stats.initialize_stats().await?);
                } else {
                    self.session.handle_auth_error();
                }
            }
            Command::Logout => {
                self.session.remove_token()?;
                println!("Logged out.");
            }
            Command::Status => {
                if self.session.check_auth_on_load().await {
                    println!("Logged in.");
                } else if !self.session.is_authenticated() {
                    println!("Not logged in.");
                }
            }
            Command::Goal(None) => match self.stats.daily_goal() {
                0 => CliShell.request_daily_goal(),
                goal => println!("Daily goal: {} questions", goal),
            },
            Command::Goal(Some(goal)) => {
                self.stats.set_daily_goal(goal)?;
                println!("Daily goal set to {} questions.", goal);
            }
            Command::Scroll(surface) => {
                let outcome = self.stats.increment_questions_scrolled(surface).await?;
                let goal = self.stats.daily_goal();
                if goal > 0 {
                    println!("{} / {} questions today", outcome.total_today, goal);
                } else {
                    println!("{} questions today", outcome.total_today);
                }
                if outcome.streak_advanced {
                    println!("Daily goal reached! Streak: {}", self.stats.stats()?.streak);
                }
                report_sync(&outcome.sync);
            }
            Command::Answer { correct, surface } => {
                let outcome = self.stats.record_answer(correct, surface).await?;
                report_sync(&outcome);
            }
            Command::Stats => {
                let stats = self.stats.stats()?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            Command::Watch => {
                self.session.check_auth_on_load().await;
                let handle = self.session.start_auto_refresh();
                println!("Keeping session fresh. Press Ctrl-C to stop.");
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")?;
                handle.cancel();
            }
            Command::Help => println!("{}", USAGE),
        }
        Ok(())
    }
}
