//! Practice statistics records and the derived summary.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::StatsError;

/// Storage key for the daily goal
pub const DAILY_GOAL_KEY: &str = "dailyQuestionGoal";

/// Goals offered to the user when no goal is set yet.
pub const GOAL_PRESETS: [u32; 3] = [10, 25, 50];

/// A practice mode with its own counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Pyq,
    #[default]
    PyqReel,
}

impl Surface {
    pub const ALL: [Surface; 2] = [Surface::Pyq, Surface::PyqReel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Pyq => "pyq",
            Surface::PyqReel => "pyqreel",
        }
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            Surface::Pyq => "pyqStats",
            Surface::PyqReel => "pyqreelStats",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pyq" => Ok(Surface::Pyq),
            "pyqreel" => Ok(Surface::PyqReel),
            other => Err(StatsError::UnknownSurface(other.to_string())),
        }
    }
}

/// Persisted counters for one surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurfaceStats {
    /// Questions scrolled on `last_active_date`
    pub questions_scrolled: u32,
    pub correct_answers: u32,
    pub total_answers: u32,
    pub last_active_date: NaiveDate,
    pub streak: u32,
    pub last_streak_date: Option<NaiveDate>,
}

impl SurfaceStats {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_active_date: today,
            ..Self::default()
        }
    }

    /// Zero the day-scoped counter if the record belongs to an earlier day.
    /// Returns true when the record changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_active_date == today {
            return false;
        }
        self.questions_scrolled = 0;
        self.last_active_date = today;
        true
    }

    pub fn record_answer(&mut self, is_correct: bool) {
        self.total_answers = self.total_answers.saturating_add(1);
        if is_correct && self.correct_answers < self.total_answers {
            self.correct_answers += 1;
        }
    }

    /// Cap `correct_answers` at `total_answers` for records edited by hand.
    pub fn clamp_answers(mut self) -> Self {
        self.correct_answers = self.correct_answers.min(self.total_answers);
        self
    }
}

/// Streak values held by the backend. Missing fields leave local values alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStreaks {
    #[serde(default)]
    pub pyq_streak: Option<u32>,
    #[serde(default)]
    pub pyqreel_streak: Option<u32>,
}

impl BackendStreaks {
    pub fn for_surface(&self, surface: Surface) -> Option<u32> {
        match surface {
            Surface::Pyq => self.pyq_streak,
            Surface::PyqReel => self.pyqreel_streak,
        }
    }
}

/// Combined view over both surfaces, computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub questions_scrolled: u32,
    pub correct_answers: u32,
    pub total_answers: u32,
    pub streak: u32,
    /// Percent of answers that were correct, 0 with no answers
    pub accuracy: u32,
    pub daily_goal: u32,
    /// Percent of the daily goal reached today, capped at 100
    pub goal_progress: u32,
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(whole) * 100.0).round() as u32
}

impl AggregateStats {
    /// `pyq` and `reel` must already be rolled over to today.
    pub fn combine(pyq: &SurfaceStats, reel: &SurfaceStats, daily_goal: u32) -> Self {
        let questions_scrolled = pyq.questions_scrolled.saturating_add(reel.questions_scrolled);
        let correct_answers = pyq.correct_answers.saturating_add(reel.correct_answers);
        let total_answers = pyq.total_answers.saturating_add(reel.total_answers);

        Self {
            questions_scrolled,
            correct_answers,
            total_answers,
            streak: pyq.streak.max(reel.streak),
            accuracy: percent(correct_answers, total_answers),
            daily_goal,
            goal_progress: percent(questions_scrolled, daily_goal).min(100),
        }
    }
}
