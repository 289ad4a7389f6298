//! Gamified analytics layer
//!
//! Course statistics, per-user achievements and leaderboards. Points come
//! from an append-only ledger keyed by reason, so re-running an award is a
//! no-op. Read paths go through a short-lived [`cache::TtlCache`].

pub mod cache;
pub mod gamification;

pub use cache::TtlCache;
pub use gamification::{Badge, PointsRule};

use crate::types::{CourseId, UserId};
use serde::{Deserialize, Serialize};

/// Aggregate numbers for one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStats {
    pub course_id: CourseId,
    pub enrolled: u64,
    pub completed: u64,
    /// Share of enrollments that reached 100%, in percent
    pub completion_rate: f64,
    pub average_progress: f64,
    pub lesson_count: u64,
    /// Submissions without a grade
    pub pending_submissions: u64,
}

impl CourseStats {
    /// Build stats from raw counts, deriving the completion rate
    pub fn from_counts(
        course_id: CourseId,
        enrolled: u64,
        completed: u64,
        average_progress: f64,
        lesson_count: u64,
        pending_submissions: u64,
    ) -> Self {
        let completion_rate = if enrolled == 0 {
            0.0
        } else {
            round1(100.0 * completed as f64 / enrolled as f64)
        };
        Self {
            course_id,
            enrolled,
            completed,
            completion_rate,
            average_progress: round1(average_progress),
            lesson_count,
            pending_submissions,
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub name: String,
    pub points: u64,
}

/// A user's gamification summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievements {
    pub user_id: UserId,
    pub points: u64,
    pub level: u32,
    /// Points still needed to reach the next level
    pub next_level_in: u64,
    pub streak_days: u32,
    pub courses_completed: u64,
    pub badges: Vec<Badge>,
}

/// Stats for every course an instructor manages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorDashboard {
    pub instructor_id: UserId,
    pub courses: Vec<CourseSummary>,
    pub total_enrolled: u64,
    pub total_pending_submissions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub title: String,
    pub stats: CourseStats,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
