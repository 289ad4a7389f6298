//! Points, levels, streaks and badges

use crate::types::{CourseId, LessonId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const LESSON_POINTS: u32 = 10;
pub const QUIZ_PASS_POINTS: u32 = 20;
pub const QUIZ_PERFECT_BONUS: u32 = 10;
pub const ASSIGNMENT_MAX_POINTS: u32 = 20;
pub const COURSE_COMPLETION_POINTS: u32 = 100;

/// Points per level step; level `n` starts at `LEVEL_STEP * (n - 1)^2`
pub const LEVEL_STEP: u64 = 50;

/// Events that earn points. Each maps to a stable ledger key, so an event
/// can only ever be rewarded once per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsRule {
    LessonCompleted(LessonId),
    QuizPassed(LessonId),
    QuizPerfect(LessonId),
    /// Keyed by the assignment lesson, so resubmissions never earn twice
    AssignmentGraded {
        lesson: LessonId,
        score: u32,
        max_points: u32,
    },
    CourseCompleted(CourseId),
}

impl PointsRule {
    pub fn reason_key(&self) -> String {
        match self {
            PointsRule::LessonCompleted(id) => format!("lesson:{}", id),
            PointsRule::QuizPassed(id) => format!("quiz:{}", id),
            PointsRule::QuizPerfect(id) => format!("quiz-perfect:{}", id),
            PointsRule::AssignmentGraded { lesson, .. } => format!("assignment:{}", lesson),
            PointsRule::CourseCompleted(id) => format!("course:{}", id),
        }
    }

    pub fn points(&self) -> u32 {
        match self {
            PointsRule::LessonCompleted(_) => LESSON_POINTS,
            PointsRule::QuizPassed(_) => QUIZ_PASS_POINTS,
            PointsRule::QuizPerfect(_) => QUIZ_PERFECT_BONUS,
            PointsRule::AssignmentGraded {
                score, max_points, ..
            } => {
                if *max_points == 0 {
                    0
                } else {
                    let ratio = (*score).min(*max_points) as f64 / *max_points as f64;
                    (ASSIGNMENT_MAX_POINTS as f64 * ratio).round() as u32
                }
            }
            PointsRule::CourseCompleted(_) => COURSE_COMPLETION_POINTS,
        }
    }
}

fn isqrt(n: u64) -> u64 {
    let mut x = (n as f64).sqrt() as u64;
    while x * x > n {
        x -= 1;
    }
    while (x + 1) * (x + 1) <= n {
        x += 1;
    }
    x
}

/// Level for a point total; everyone starts at level 1
pub fn level_for(points: u64) -> u32 {
    (isqrt(points / LEVEL_STEP) + 1) as u32
}

/// Points remaining until the next level
pub fn points_to_next_level(points: u64) -> u64 {
    let level = level_for(points) as u64;
    LEVEL_STEP * level * level - points
}

/// Consecutive active days ending today or yesterday.
///
/// A streak survives until the end of the day after the last activity, so a
/// learner who studied yesterday but not yet today still has a live streak.
pub fn streak_days(active_days: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = active_days.iter().copied().collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

/// Milestones shown on a learner's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    /// Completed a first lesson
    FirstSteps,
    /// Completed a first course
    CourseFinisher,
    /// Scored 100% on a quiz
    Perfectionist,
    /// Seven-day streak
    OnFire,
    /// Completed five courses
    Scholar,
}

/// Facts badges are derived from
#[derive(Debug, Clone, Copy, Default)]
pub struct BadgeInputs {
    pub lessons_completed: u64,
    pub courses_completed: u64,
    pub has_perfect_quiz: bool,
    pub streak_days: u32,
}

pub fn earned_badges(inputs: &BadgeInputs) -> Vec<Badge> {
    let mut badges = Vec::new();
    if inputs.lessons_completed >= 1 {
        badges.push(Badge::FirstSteps);
    }
    if inputs.courses_completed >= 1 {
        badges.push(Badge::CourseFinisher);
    }
    if inputs.has_perfect_quiz {
        badges.push(Badge::Perfectionist);
    }
    if inputs.streak_days >= 7 {
        badges.push(Badge::OnFire);
    }
    if inputs.courses_completed >= 5 {
        badges.push(Badge::Scholar);
    }
    badges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reason_keys_are_distinct_per_rule() {
        let lesson = LessonId::new();
        let a = PointsRule::QuizPassed(lesson).reason_key();
        let b = PointsRule::QuizPerfect(lesson).reason_key();
        let c = PointsRule::LessonCompleted(lesson).reason_key();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(c.starts_with("lesson:"));

        let graded = |score| PointsRule::AssignmentGraded {
            lesson,
            score,
            max_points: 10,
        };
        assert_eq!(graded(4).reason_key(), graded(10).reason_key());
        assert_ne!(graded(10).reason_key(), c);
    }

    #[test]
    fn test_assignment_points_scale_with_score() {
        let rule = |score, max_points| PointsRule::AssignmentGraded {
            lesson: LessonId::new(),
            score,
            max_points,
        };
        assert_eq!(rule(10, 10).points(), 20);
        assert_eq!(rule(5, 10).points(), 10);
        assert_eq!(rule(0, 10).points(), 0);
        assert_eq!(rule(3, 0).points(), 0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(49), 1);
        assert_eq!(level_for(50), 2);
        assert_eq!(level_for(199), 2);
        assert_eq!(level_for(200), 3);
        assert_eq!(level_for(450), 4);

        assert_eq!(points_to_next_level(0), 50);
        assert_eq!(points_to_next_level(60), 140);
    }

    #[test]
    fn test_isqrt_exact() {
        for n in [0u64, 1, 3, 4, 15, 16, 17, 1_000_000, u32::MAX as u64] {
            let r = isqrt(n);
            assert!(r * r <= n && (r + 1) * (r + 1) > n, "isqrt({})", n);
        }
    }

    #[test]
    fn test_streak_counts_back_from_today() {
        let today = day(2024, 3, 10);
        let days = vec![day(2024, 3, 10), day(2024, 3, 9), day(2024, 3, 8), day(2024, 3, 6)];
        assert_eq!(streak_days(&days, today), 3);
    }

    #[test]
    fn test_streak_alive_from_yesterday() {
        let today = day(2024, 3, 10);
        let days = vec![day(2024, 3, 9), day(2024, 3, 8)];
        assert_eq!(streak_days(&days, today), 2);
    }

    #[test]
    fn test_streak_broken() {
        let today = day(2024, 3, 10);
        assert_eq!(streak_days(&[day(2024, 3, 8)], today), 0);
        assert_eq!(streak_days(&[], today), 0);
    }

    #[test]
    fn test_streak_duplicates_and_month_boundary() {
        let today = day(2024, 3, 1);
        let days = vec![day(2024, 3, 1), day(2024, 3, 1), day(2024, 2, 29)];
        assert_eq!(streak_days(&days, today), 2);
    }

    #[test]
    fn test_badges() {
        assert!(earned_badges(&BadgeInputs::default()).is_empty());

        let badges = earned_badges(&BadgeInputs {
            lessons_completed: 12,
            courses_completed: 5,
            has_perfect_quiz: true,
            streak_days: 7,
        });
        assert_eq!(
            badges,
            vec![
                Badge::FirstSteps,
                Badge::CourseFinisher,
                Badge::Perfectionist,
                Badge::OnFire,
                Badge::Scholar
            ]
        );
    }
}
