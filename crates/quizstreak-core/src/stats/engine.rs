use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::{AuthError, SessionManager};
use crate::shell::AppShell;
use crate::storage::{KeyValueStore, StorageError};
use crate::time::Clock;

use super::model::{AggregateStats, BackendStreaks, Surface, SurfaceStats, DAILY_GOAL_KEY};
use super::StatsError;

/// Result of mirroring streaks with the backend. Sync never fails the
/// operation that triggered it; callers decide what to do with this.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Backend streaks were fetched and applied locally
    Synced(BackendStreaks),
    /// No usable session, nothing was attempted past authentication
    Skipped(AuthError),
    Failed(StatsError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }
}

#[derive(Debug)]
pub struct ScrollOutcome {
    pub total_today: u32,
    /// True when this scroll completed the daily goal and advanced the streak
    pub streak_advanced: bool,
    pub sync: SyncOutcome,
}

/// Tracks daily practice across the two surfaces.
///
/// Every read-modify-write of the stored records happens under `write_lock`
/// and never spans an await point.
pub struct PracticeStatsEngine {
    store: Arc<dyn KeyValueStore>,
    session: SessionManager,
    api: ApiClient,
    shell: Arc<dyn AppShell>,
    clock: Clock,
    write_lock: Mutex<()>,
}

impl PracticeStatsEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        session: SessionManager,
        api: ApiClient,
        shell: Arc<dyn AppShell>,
    ) -> Self {
        Self {
            store,
            session,
            api,
            shell,
            clock: Clock::System,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Records =====

    fn load(&self, surface: Surface) -> Result<Option<SurfaceStats>, StatsError> {
        let key = surface.storage_key();
        match self.store.get(key) {
            None => Ok(None),
            Some(raw) => serde_json::from_str::<SurfaceStats>(&raw)
                .map(|stats| Some(stats.clamp_answers()))
                .map_err(|source| StatsError::Corrupt { key, source }),
        }
    }

    fn load_or_default(&self, surface: Surface) -> Result<SurfaceStats, StatsError> {
        Ok(self
            .load(surface)?
            .unwrap_or_else(|| SurfaceStats::new(self.clock.today())))
    }

    fn save(&self, surface: Surface, stats: &SurfaceStats) -> Result<(), StatsError> {
        let json = serde_json::to_string(stats).map_err(StorageError::from)?;
        self.store.set(surface.storage_key(), &json)?;
        Ok(())
    }

    pub fn has_records(&self) -> bool {
        Surface::ALL.iter().all(|s| self.store.has(s.storage_key()))
    }

    /// Create default records for surfaces that have none. Lock must be held.
    fn ensure_records(&self) -> Result<(), StatsError> {
        for surface in Surface::ALL {
            if !self.store.has(surface.storage_key()) {
                debug!(%surface, "Creating stats record");
                self.save(surface, &SurfaceStats::new(self.clock.today()))?;
            }
        }
        Ok(())
    }

    fn prompt_goal_if_unset(&self) {
        if self.daily_goal() == 0 {
            self.shell.request_daily_goal();
        }
    }

    /// Create any missing records, ask for a goal if none is set, then sync.
    pub async fn initialize_stats(&self) -> Result<SyncOutcome, StatsError> {
        {
            let _guard = self.guard();
            self.ensure_records()?;
        }
        self.prompt_goal_if_unset();
        Ok(self.sync_with_backend().await)
    }

    // ===== Daily goal =====

    /// The configured goal, or 0 when unset or unreadable.
    pub fn daily_goal(&self) -> u32 {
        self.store
            .get(DAILY_GOAL_KEY)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn set_daily_goal(&self, goal: u32) -> Result<(), StatsError> {
        if goal == 0 {
            return Err(StatsError::InvalidGoal);
        }
        self.store.set(DAILY_GOAL_KEY, &goal.to_string())?;
        info!(goal, "Daily goal set");
        Ok(())
    }

    fn goal_met(&self, total_today: u32) -> bool {
        let goal = self.daily_goal();
        goal > 0 && total_today >= goal
    }

    // ===== Counters =====

    /// Roll stale surfaces over to today and sum their counts. Lock must be held.
    fn rolled_over_total(&self) -> Result<u32, StatsError> {
        let today = self.clock.today();
        let mut total: u32 = 0;
        for surface in Surface::ALL {
            let Some(mut stats) = self.load(surface)? else {
                continue;
            };
            if stats.roll_over(today) {
                debug!(%surface, "New day, resetting questions scrolled");
                self.save(surface, &stats)?;
            }
            total = total.saturating_add(stats.questions_scrolled);
        }
        Ok(total)
    }

    pub fn total_questions_today(&self) -> Result<u32, StatsError> {
        let _guard = self.guard();
        self.rolled_over_total()
    }

    pub async fn increment_questions_scrolled(
        &self,
        surface: Surface,
    ) -> Result<ScrollOutcome, StatsError> {
        let (total_today, streak_advanced) = {
            let _guard = self.guard();
            let mut stats = self.load_or_default(surface)?;
            stats.roll_over(self.clock.today());
            stats.questions_scrolled = stats.questions_scrolled.saturating_add(1);
            self.save(surface, &stats)?;

            let total_today = self.rolled_over_total()?;
            let advanced = self.goal_met(total_today) && self.advance_streak()?;
            (total_today, advanced)
        };

        Ok(ScrollOutcome {
            total_today,
            streak_advanced,
            sync: self.sync_with_backend().await,
        })
    }

    pub async fn record_answer(
        &self,
        is_correct: bool,
        surface: Surface,
    ) -> Result<SyncOutcome, StatsError> {
        {
            let _guard = self.guard();
            let mut stats = self.load_or_default(surface)?;
            stats.record_answer(is_correct);
            self.save(surface, &stats)?;
        }
        Ok(self.sync_with_backend().await)
    }

    // ===== Streak =====

    /// Count today toward the streak if the goal is met and today has not
    /// been counted yet. Lock must be held.
    fn advance_streak(&self) -> Result<bool, StatsError> {
        if !self.goal_met(self.rolled_over_total()?) {
            return Ok(false);
        }

        let today = self.clock.today();
        let mut pyq = self.load_or_default(Surface::Pyq)?;
        let mut reel = self.load_or_default(Surface::PyqReel)?;
        if pyq.last_streak_date == Some(today) || reel.last_streak_date == Some(today) {
            return Ok(false);
        }

        let yesterday = Some(self.clock.yesterday());
        let continued = pyq.last_streak_date == yesterday || reel.last_streak_date == yesterday;
        for stats in [&mut pyq, &mut reel] {
            stats.streak = if continued { stats.streak.saturating_add(1) } else { 1 };
            stats.last_streak_date = Some(today);
        }

        self.save(Surface::Pyq, &pyq)?;
        self.save(Surface::PyqReel, &reel)?;
        info!(streak = pyq.streak.max(reel.streak), continued, "Daily goal met");
        Ok(true)
    }

    /// Returns whether the streak moved.
    pub async fn update_streak(&self) -> Result<bool, StatsError> {
        let advanced = {
            let _guard = self.guard();
            self.advance_streak()?
        };
        if advanced {
            self.sync_with_backend().await;
        }
        Ok(advanced)
    }

    // ===== Summary =====

    /// Combined stats for display. Missing records are created first.
    pub fn stats(&self) -> Result<AggregateStats, StatsError> {
        let (stats, created) = {
            let _guard = self.guard();
            let created = !self.has_records();
            if created {
                self.ensure_records()?;
            }

            self.rolled_over_total()?;
            let pyq = self.load_or_default(Surface::Pyq)?;
            let reel = self.load_or_default(Surface::PyqReel)?;
            (AggregateStats::combine(&pyq, &reel, self.daily_goal()), created)
        };

        // Outside the lock: the shell may call back into the engine
        if created {
            self.prompt_goal_if_unset();
        }
        Ok(stats)
    }

    // ===== Backend =====

    fn apply_backend_streaks(&self, streaks: &BackendStreaks) -> Result<(), StatsError> {
        let _guard = self.guard();
        for surface in Surface::ALL {
            // Zero from the backend means "no data", not a broken streak
            let Some(streak) = streaks.for_surface(surface).filter(|s| *s > 0) else {
                continue;
            };
            let Some(mut stats) = self.load(surface)? else {
                continue;
            };
            if stats.streak != streak {
                debug!(%surface, local = stats.streak, backend = streak, "Adopting backend streak");
                stats.streak = streak;
                self.save(surface, &stats)?;
            }
        }
        Ok(())
    }

    /// Pull streaks from the backend. Failures are logged and returned, never raised.
    pub async fn sync_with_backend(&self) -> SyncOutcome {
        let headers = match self.session.auth_headers().await {
            Ok(headers) => headers,
            Err(AuthError::NotAuthenticated) => {
                debug!("Not logged in, skipping stats sync");
                return SyncOutcome::Skipped(AuthError::NotAuthenticated);
            }
            Err(e) => {
                warn!(error = %e, "Skipping stats sync");
                return SyncOutcome::Skipped(e);
            }
        };

        let streaks = match self.api.user_stats(headers).await {
            Ok(streaks) => streaks,
            Err(e) => {
                warn!(error = %e, "Error syncing with backend");
                return SyncOutcome::Failed(e.into());
            }
        };

        match self.apply_backend_streaks(&streaks) {
            Ok(()) => SyncOutcome::Synced(streaks),
            Err(e) => {
                warn!(error = %e, "Failed to store backend streaks");
                SyncOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use chrono::NaiveDate;
    use reqwest::Method;

    use super::*;
    use crate::auth::TOKEN_KEY;
    use crate::storage::MemoryStore;
    use crate::testing::{api_client, test_config, MockTransport, RecordingShell, Reply};

    const STATS: &str = "/users/stats";
    const ME: &str = "/users/me";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    const TODAY: u32 = 10;

    struct Fixture {
        transport: Arc<MockTransport>,
        store: Arc<MemoryStore>,
        shell: Arc<RecordingShell>,
        session: SessionManager,
    }

    impl Fixture {
        fn new(token: Option<&str>) -> Self {
            let transport = MockTransport::new();
            let store = Arc::new(MemoryStore::new());
            if let Some(token) = token {
                store.set(TOKEN_KEY, token).unwrap();
            }
            let shell = Arc::new(RecordingShell::default());
            let session = SessionManager::new(
                store.clone(),
                api_client(&transport),
                shell.clone(),
                &test_config(),
            );
            Self {
                transport,
                store,
                shell,
                session,
            }
        }

        fn engine_on(&self, date: NaiveDate) -> PracticeStatsEngine {
            PracticeStatsEngine::new(
                self.store.clone(),
                self.session.clone(),
                api_client(&self.transport),
                self.shell.clone(),
            )
            .with_clock(Clock::fixed(date))
        }

        fn engine(&self) -> PracticeStatsEngine {
            self.engine_on(day(TODAY))
        }

        fn seed(&self, surface: Surface, stats: &SurfaceStats) {
            self.store
                .set(surface.storage_key(), &serde_json::to_string(stats).unwrap())
                .unwrap();
        }

        fn record(&self, surface: Surface) -> SurfaceStats {
            serde_json::from_str(&self.store.get(surface.storage_key()).unwrap()).unwrap()
        }
    }

    fn streak_record(streak: u32, last_streak_date: Option<NaiveDate>) -> SurfaceStats {
        SurfaceStats {
            streak,
            last_streak_date,
            ..SurfaceStats::new(day(TODAY))
        }
    }

    #[tokio::test]
    async fn test_initialize_creates_records_and_requests_goal() {
        let f = Fixture::new(None);
        let engine = f.engine();

        let outcome = engine.initialize_stats().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Skipped(AuthError::NotAuthenticated)));
        assert!(engine.has_records());
        assert_eq!(f.record(Surface::Pyq), SurfaceStats::new(day(TODAY)));
        assert_eq!(f.shell.goal_prompts(), 1);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let f = Fixture::new(None);
        let engine = f.engine();
        engine.set_daily_goal(25).unwrap();
        engine.record_answer(true, Surface::Pyq).await.unwrap();

        engine.initialize_stats().await.unwrap();

        assert_eq!(f.record(Surface::Pyq).total_answers, 1);
        assert_eq!(f.shell.goal_prompts(), 0);
    }

    #[test]
    fn test_daily_goal_defaults_and_validation() {
        let f = Fixture::new(None);
        let engine = f.engine();
        assert_eq!(engine.daily_goal(), 0);

        f.store.set(DAILY_GOAL_KEY, "lots").unwrap();
        assert_eq!(engine.daily_goal(), 0);

        assert!(matches!(engine.set_daily_goal(0), Err(StatsError::InvalidGoal)));
        engine.set_daily_goal(50).unwrap();
        assert_eq!(engine.daily_goal(), 50);
    }

    #[tokio::test]
    async fn test_correct_answer_accuracy() {
        let f = Fixture::new(None);
        let engine = f.engine();

        engine.record_answer(true, Surface::Pyq).await.unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.total_answers, 1);
        assert_eq!(stats.accuracy, 100);
    }

    #[tokio::test]
    async fn test_mixed_answers_accuracy() {
        let f = Fixture::new(None);
        let engine = f.engine();

        for _ in 0..3 {
            engine.record_answer(false, Surface::Pyq).await.unwrap();
        }
        engine.record_answer(true, Surface::Pyq).await.unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.total_answers, 4);
        assert_eq!(stats.accuracy, 25);
    }

    #[tokio::test]
    async fn test_answers_combine_across_surfaces() {
        let f = Fixture::new(None);
        let engine = f.engine();

        engine.record_answer(true, Surface::Pyq).await.unwrap();
        engine.record_answer(false, Surface::PyqReel).await.unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!((stats.correct_answers, stats.total_answers), (1, 2));
        assert_eq!(stats.accuracy, 50);
        assert_eq!(f.record(Surface::PyqReel).total_answers, 1);
    }

    #[tokio::test]
    async fn test_goal_completion_advances_streak_once() {
        let f = Fixture::new(None);
        let engine = f.engine();
        engine.set_daily_goal(10).unwrap();

        for i in 0..9 {
            let surface = if i % 2 == 0 { Surface::Pyq } else { Surface::PyqReel };
            let outcome = engine.increment_questions_scrolled(surface).await.unwrap();
            assert!(!outcome.streak_advanced);
        }
        assert_eq!(engine.stats().unwrap().streak, 0);

        let tenth = engine.increment_questions_scrolled(Surface::Pyq).await.unwrap();
        assert_eq!(tenth.total_today, 10);
        assert!(tenth.streak_advanced);
        assert_eq!(f.record(Surface::Pyq).streak, 1);
        assert_eq!(f.record(Surface::PyqReel).streak, 1);

        let eleventh = engine.increment_questions_scrolled(Surface::PyqReel).await.unwrap();
        assert!(!eleventh.streak_advanced);
        assert!(!engine.update_streak().await.unwrap());

        let stats = engine.stats().unwrap();
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.questions_scrolled, 11);
        assert_eq!(stats.goal_progress, 100);
        assert_eq!(f.record(Surface::PyqReel).last_streak_date, Some(day(TODAY)));
    }

    #[tokio::test]
    async fn test_streak_continues_from_yesterday() {
        let f = Fixture::new(None);
        let yesterday = Some(day(TODAY - 1));
        f.seed(Surface::Pyq, &streak_record(3, yesterday));
        f.seed(Surface::PyqReel, &streak_record(3, yesterday));
        let engine = f.engine();
        engine.set_daily_goal(1).unwrap();

        let outcome = engine.increment_questions_scrolled(Surface::PyqReel).await.unwrap();

        assert!(outcome.streak_advanced);
        assert_eq!(f.record(Surface::Pyq).streak, 4);
        assert_eq!(f.record(Surface::PyqReel).streak, 4);
    }

    #[tokio::test]
    async fn test_streak_continues_when_only_one_surface_was_active_yesterday() {
        let f = Fixture::new(None);
        f.seed(Surface::Pyq, &streak_record(5, Some(day(TODAY - 1))));
        f.seed(Surface::PyqReel, &streak_record(5, Some(day(TODAY - 4))));
        let engine = f.engine();
        engine.set_daily_goal(1).unwrap();

        engine.increment_questions_scrolled(Surface::Pyq).await.unwrap();

        assert_eq!(f.record(Surface::Pyq).streak, 6);
        assert_eq!(f.record(Surface::PyqReel).streak, 6);
    }

    #[tokio::test]
    async fn test_streak_resets_after_gap() {
        let f = Fixture::new(None);
        let two_days_ago = Some(day(TODAY - 2));
        f.seed(Surface::Pyq, &streak_record(7, two_days_ago));
        f.seed(Surface::PyqReel, &streak_record(7, two_days_ago));
        let engine = f.engine();
        engine.set_daily_goal(1).unwrap();

        engine.increment_questions_scrolled(Surface::Pyq).await.unwrap();

        assert_eq!(f.record(Surface::Pyq).streak, 1);
        assert_eq!(f.record(Surface::PyqReel).streak, 1);
        assert_eq!(engine.stats().unwrap().streak, 1);
    }

    #[tokio::test]
    async fn test_streak_across_consecutive_days() {
        let f = Fixture::new(None);
        let monday = f.engine_on(day(6));
        monday.set_daily_goal(2).unwrap();
        monday.increment_questions_scrolled(Surface::Pyq).await.unwrap();
        monday.increment_questions_scrolled(Surface::Pyq).await.unwrap();
        assert_eq!(monday.stats().unwrap().streak, 1);

        let tuesday = f.engine_on(day(7));
        assert_eq!(tuesday.total_questions_today().unwrap(), 0);
        tuesday.increment_questions_scrolled(Surface::PyqReel).await.unwrap();
        assert_eq!(tuesday.stats().unwrap().streak, 1);
        tuesday.increment_questions_scrolled(Surface::PyqReel).await.unwrap();
        assert_eq!(tuesday.stats().unwrap().streak, 2);
    }

    #[tokio::test]
    async fn test_unset_goal_never_advances_streak() {
        let f = Fixture::new(None);
        let engine = f.engine();

        let outcome = engine.increment_questions_scrolled(Surface::Pyq).await.unwrap();

        assert!(!outcome.streak_advanced);
        assert!(!engine.update_streak().await.unwrap());
        assert_eq!(f.record(Surface::Pyq).streak, 0);
    }

    #[tokio::test]
    async fn test_stale_day_resets_scrolled_before_summing() {
        let f = Fixture::new(None);
        let mut stale = SurfaceStats::new(day(TODAY - 1));
        stale.questions_scrolled = 5;
        stale.total_answers = 2;
        f.seed(Surface::Pyq, &stale);
        let mut fresh = SurfaceStats::new(day(TODAY));
        fresh.questions_scrolled = 3;
        f.seed(Surface::PyqReel, &fresh);

        let engine = f.engine();
        assert_eq!(engine.total_questions_today().unwrap(), 3);

        let pyq = f.record(Surface::Pyq);
        assert_eq!(pyq.questions_scrolled, 0);
        assert_eq!(pyq.last_active_date, day(TODAY));
        assert_eq!(pyq.total_answers, 2);
    }

    #[tokio::test]
    async fn test_first_scroll_of_new_day_counts() {
        let f = Fixture::new(None);
        let mut stale = SurfaceStats::new(day(TODAY - 1));
        stale.questions_scrolled = 8;
        f.seed(Surface::Pyq, &stale);

        let outcome = f
            .engine()
            .increment_questions_scrolled(Surface::Pyq)
            .await
            .unwrap();

        assert_eq!(outcome.total_today, 1);
        assert_eq!(f.record(Surface::Pyq).questions_scrolled, 1);
    }

    #[test]
    fn test_stats_self_heals_missing_records() {
        let f = Fixture::new(None);
        let engine = f.engine();

        let stats = engine.stats().unwrap();

        assert_eq!(stats, AggregateStats::default());
        assert!(engine.has_records());
        assert_eq!(f.shell.goal_prompts(), 1);
    }

    /// Shell that reads stats back while the goal prompt is shown.
    #[derive(Default)]
    struct StatsReadingShell {
        engine: OnceLock<Arc<PracticeStatsEngine>>,
        seen: Mutex<Option<AggregateStats>>,
    }

    impl AppShell for StatsReadingShell {
        fn navigate_to_login(&self) {}

        fn request_daily_goal(&self) {
            if let Some(engine) = self.engine.get() {
                *self.seen.lock().unwrap() = Some(engine.stats().unwrap());
            }
        }
    }

    #[test]
    fn test_goal_prompt_can_read_stats() {
        let f = Fixture::new(None);
        let shell = Arc::new(StatsReadingShell::default());
        let engine = Arc::new(
            PracticeStatsEngine::new(
                f.store.clone(),
                f.session.clone(),
                api_client(&f.transport),
                shell.clone(),
            )
            .with_clock(Clock::fixed(day(TODAY))),
        );
        assert!(shell.engine.set(engine.clone()).is_ok());

        let stats = engine.stats().unwrap();

        assert_eq!(*shell.seen.lock().unwrap(), Some(stats));
        assert!(engine.has_records());
    }

    #[tokio::test]
    async fn test_scroll_total_saturates() {
        let f = Fixture::new(None);
        let mut full = SurfaceStats::new(day(TODAY));
        full.questions_scrolled = u32::MAX;
        f.seed(Surface::Pyq, &full);
        let engine = f.engine();

        let outcome = engine.increment_questions_scrolled(Surface::PyqReel).await.unwrap();

        assert_eq!(outcome.total_today, u32::MAX);
        assert_eq!(f.record(Surface::PyqReel).questions_scrolled, 1);
        assert_eq!(engine.total_questions_today().unwrap(), u32::MAX);
    }

    #[test]
    fn test_stats_saturate_across_surfaces() {
        let f = Fixture::new(None);
        let mut pyq = SurfaceStats::new(day(TODAY));
        pyq.correct_answers = u32::MAX;
        pyq.total_answers = u32::MAX;
        f.seed(Surface::Pyq, &pyq);
        let mut reel = SurfaceStats::new(day(TODAY));
        reel.correct_answers = 1;
        reel.total_answers = 1;
        f.seed(Surface::PyqReel, &reel);

        let stats = f.engine().stats().unwrap();

        assert_eq!(stats.total_answers, u32::MAX);
        assert_eq!(stats.correct_answers, u32::MAX);
        assert_eq!(stats.accuracy, 100);
    }

    #[test]
    fn test_stored_correct_above_total_is_capped() {
        let f = Fixture::new(None);
        f.store
            .set(
                Surface::Pyq.storage_key(),
                r#"{"correctAnswers": 5, "totalAnswers": 2, "lastActiveDate": "2024-05-10"}"#,
            )
            .unwrap();
        f.seed(Surface::PyqReel, &SurfaceStats::new(day(TODAY)));

        let stats = f.engine().stats().unwrap();

        assert_eq!((stats.correct_answers, stats.total_answers), (2, 2));
        assert_eq!(stats.accuracy, 100);
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let f = Fixture::new(None);
        f.store.set(Surface::Pyq.storage_key(), "{oops").unwrap();
        f.store.set(Surface::PyqReel.storage_key(), "{}").unwrap();

        assert!(matches!(
            f.engine().stats(),
            Err(StatsError::Corrupt { key: "pyqStats", .. })
        ));
    }

    #[tokio::test]
    async fn test_sync_adopts_backend_streaks() {
        let f = Fixture::new(Some("tok"));
        f.transport.reply(Method::GET, ME, Reply::ok("{}"));
        f.transport
            .reply(Method::GET, STATS, Reply::ok(r#"{"pyqStreak": 12, "pyqreelStreak": 0}"#));
        f.seed(Surface::Pyq, &streak_record(2, None));
        f.seed(Surface::PyqReel, &streak_record(2, None));

        let outcome = f.engine().sync_with_backend().await;

        assert!(outcome.is_synced());
        assert_eq!(f.record(Surface::Pyq).streak, 12);
        // Zero leaves the local value in place
        assert_eq!(f.record(Surface::PyqReel).streak, 2);

        let request = f.transport.last_request(Method::GET, STATS).unwrap();
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer tok");
        assert_eq!(request.headers.get("content-type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_sync_failure_keeps_local_data() {
        let f = Fixture::new(Some("tok"));
        f.transport.reply(Method::GET, ME, Reply::ok("{}"));
        f.transport.reply(Method::GET, STATS, Reply::NetworkDown);
        let engine = f.engine();

        let outcome = engine.record_answer(true, Surface::PyqReel).await.unwrap();

        assert!(matches!(outcome, SyncOutcome::Failed(StatsError::Backend(_))));
        assert_eq!(engine.stats().unwrap().correct_answers, 1);
    }

    #[tokio::test]
    async fn test_sync_skipped_when_session_dead() {
        let f = Fixture::new(Some("tok"));
        f.transport.reply(Method::GET, ME, Reply::status(401));
        f.transport.reply(Method::POST, "/auth/refresh", Reply::status(401));
        let engine = f.engine();

        let outcome = engine.record_answer(false, Surface::Pyq).await.unwrap();

        assert!(matches!(
            outcome,
            SyncOutcome::Skipped(AuthError::AuthenticationFailed)
        ));
        assert_eq!(f.transport.count(Method::GET, STATS), 0);
        assert!(!f.session.is_authenticated());
        assert_eq!(engine.stats().unwrap().total_answers, 1);
    }

    #[tokio::test]
    async fn test_sync_without_records_does_not_create_them() {
        let f = Fixture::new(Some("tok"));
        f.transport.reply(Method::GET, ME, Reply::ok("{}"));
        f.transport.reply(Method::GET, STATS, Reply::ok(r#"{"pyqStreak": 3}"#));
        let engine = f.engine();

        assert!(engine.sync_with_backend().await.is_synced());
        assert!(!engine.has_records());
    }
}
