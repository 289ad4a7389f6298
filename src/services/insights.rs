//! Course statistics, leaderboards, achievements and the instructor dashboard

use super::Lms;
use crate::access::{require_access, require_manage, require_self_or_admin, Actor};
use crate::analytics::gamification::{
    earned_badges, level_for, points_to_next_level, streak_days, BadgeInputs,
};
use crate::analytics::{Achievements, CourseStats, CourseSummary, InstructorDashboard, LeaderboardEntry};
use crate::error::{LyceumError, Result};
use crate::types::{CourseFilter, CourseId, UserId};
use chrono::{NaiveDate, Utc};
use tracing::trace;

/// Upper bound on a requested leaderboard size
pub const MAX_LEADERBOARD_SIZE: usize = 100;

impl Lms {
    /// Aggregate numbers for a course (course managers only)
    pub async fn course_stats(&self, actor: &Actor, course_id: CourseId) -> Result<CourseStats> {
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;
        self.cached_course_stats(course_id).await
    }

    async fn cached_course_stats(&self, course_id: CourseId) -> Result<CourseStats> {
        if let Some(stats) = self.cache.stats.get(&course_id) {
            trace!("Course stats cache hit for {}", course_id);
            return Ok(stats);
        }
        let stats = self.storage.course_stats(course_id).await?;
        self.cache.stats.insert(course_id, stats.clone());
        Ok(stats)
    }

    /// Top learners by points earned in the course; visible to course participants
    pub async fn leaderboard(
        &self,
        actor: &Actor,
        course_id: CourseId,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let (course, enrolled) = self.course_with_enrollment(actor, course_id).await?;
        require_access(actor, &course, enrolled)?;

        let limit = limit
            .unwrap_or(self.settings.leaderboard_size)
            .clamp(1, MAX_LEADERBOARD_SIZE);
        let key = (course_id, limit);
        if let Some(board) = self.cache.leaderboards.get(&key) {
            return Ok(board);
        }
        let board = self.storage.leaderboard(course_id, limit).await?;
        self.cache.leaderboards.insert(key, board.clone());
        Ok(board)
    }

    /// Points, level, streak and badges for a user
    pub async fn achievements(&self, actor: &Actor, user_id: UserId) -> Result<Achievements> {
        require_self_or_admin(actor, user_id)?;
        if let Some(achievements) = self.cache.achievements.get(&user_id) {
            return Ok(achievements);
        }

        // Surface unknown users as 404 rather than an all-zero profile
        self.storage.get_user(user_id).await?;

        let points = self.storage.user_points(user_id).await?;
        let completions = self.storage.completion_times(user_id).await?;
        let active_days: Vec<NaiveDate> = completions.iter().map(|t| t.date_naive()).collect();
        let streak = streak_days(&active_days, Utc::now().date_naive());
        let courses_completed = self.storage.count_completed_courses(user_id).await?;

        let badges = earned_badges(&BadgeInputs {
            lessons_completed: completions.len() as u64,
            courses_completed,
            has_perfect_quiz: self.storage.has_perfect_quiz(user_id).await?,
            streak_days: streak,
        });

        let achievements = Achievements {
            user_id,
            points,
            level: level_for(points),
            next_level_in: points_to_next_level(points),
            streak_days: streak,
            courses_completed,
            badges,
        };
        self.cache.achievements.insert(user_id, achievements.clone());
        Ok(achievements)
    }

    /// Statistics for every course an instructor owns
    pub async fn instructor_dashboard(
        &self,
        actor: &Actor,
        instructor_id: UserId,
    ) -> Result<InstructorDashboard> {
        require_self_or_admin(actor, instructor_id)?;
        let instructor = self.storage.get_user(instructor_id).await?;
        if !instructor.role.can_author() {
            return Err(LyceumError::InvalidOperation(format!(
                "user {} is not an instructor",
                instructor_id
            )));
        }

        let courses = self
            .storage
            .list_courses(&CourseFilter {
                status: None,
                instructor_id: Some(instructor_id),
            })
            .await?;

        let mut summaries = Vec::with_capacity(courses.len());
        for course in courses {
            let stats = self.cached_course_stats(course.id).await?;
            summaries.push(CourseSummary {
                title: course.title,
                stats,
            });
        }

        Ok(InstructorDashboard {
            instructor_id,
            total_enrolled: summaries.iter().map(|s| s.stats.enrolled).sum(),
            total_pending_submissions: summaries
                .iter()
                .map(|s| s.stats.pending_submissions)
                .sum(),
            courses: summaries,
        })
    }
}
