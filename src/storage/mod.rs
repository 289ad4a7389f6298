//! Storage layer for the Lyceum LMS
//!
//! Provides the persistence abstraction used by the service layer and its
//! libSQL implementation. Access control is NOT enforced here: callers are
//! expected to have checked permissions already.

pub mod libsql;
pub mod test_utils;

use crate::access::AuditEntry;
use crate::analytics::{CourseStats, LeaderboardEntry};
use crate::error::Result;
use crate::types::{
    CompletionOutcome, Course, CourseFilter, CourseId, EnrollOutcome, Enrollment, Grade, Lesson,
    LessonId, Module, ModuleId, PointsEntry, QuizAttempt, Role, Submission, SubmissionId, User,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage backend trait defining all required operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // ---- users and sessions ----

    /// Insert a user together with their password hash
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()>;

    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Look up a user and their password hash by email (case-insensitive)
    async fn find_user_by_email(&self, email: &str) -> Result<Option<(User, String)>>;

    async fn list_users(&self, limit: usize) -> Result<Vec<User>>;

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<()>;

    async fn create_session(
        &self,
        token_digest: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// User owning an unexpired session
    async fn session_user(&self, token_digest: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    /// Returns true if a session was removed
    async fn delete_session(&self, token_digest: &str) -> Result<bool>;

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    // ---- course content tree ----

    async fn create_course(&self, course: &Course) -> Result<()>;

    async fn get_course(&self, id: CourseId) -> Result<Course>;

    /// Persist title, description, status and updated_at
    async fn update_course(&self, course: &Course) -> Result<()>;

    /// Delete a course and everything hanging off it
    async fn delete_course(&self, id: CourseId) -> Result<()>;

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>>;

    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    async fn create_module(&self, module: &Module) -> Result<()>;

    async fn get_module(&self, id: ModuleId) -> Result<Module>;

    /// Modules of a course ordered by position
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>>;

    async fn delete_module(&self, id: ModuleId) -> Result<()>;

    /// Position for a module appended to the course
    async fn next_module_position(&self, course_id: CourseId) -> Result<u32>;

    async fn create_lesson(&self, lesson: &Lesson) -> Result<()>;

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson>;

    /// Lessons of a course ordered by module position, then lesson position
    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>>;

    async fn delete_lesson(&self, id: LessonId) -> Result<()>;

    /// Position for a lesson appended to the module
    async fn next_lesson_position(&self, module_id: ModuleId) -> Result<u32>;

    /// Course a lesson belongs to
    async fn course_for_lesson(&self, lesson_id: LessonId) -> Result<CourseId>;

    async fn count_lessons(&self, course_id: CourseId) -> Result<u64>;

    // ---- enrollment and progress ----

    /// Create the enrollment if missing; an existing one is returned untouched
    async fn enroll(&self, user_id: UserId, course_id: CourseId) -> Result<EnrollOutcome>;

    async fn get_enrollment(&self, user_id: UserId, course_id: CourseId)
        -> Result<Option<Enrollment>>;

    async fn list_user_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>>;

    async fn list_course_enrollments(&self, course_id: CourseId) -> Result<Vec<Enrollment>>;

    /// Remove the enrollment and the user's completions in that course
    async fn unenroll(&self, user_id: UserId, course_id: CourseId) -> Result<bool>;

    /// Record a completion and recompute progress in one transaction
    async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome>;

    /// Recompute progress from the stored completion set
    async fn recompute_progress(&self, user_id: UserId, course_id: CourseId) -> Result<Enrollment>;

    async fn completed_lessons(&self, user_id: UserId, course_id: CourseId) -> Result<Vec<LessonId>>;

    /// Timestamps of every lesson completion by the user, across courses
    async fn completion_times(&self, user_id: UserId) -> Result<Vec<DateTime<Utc>>>;

    // ---- grading ----

    async fn create_submission(&self, submission: &Submission) -> Result<()>;

    async fn get_submission(&self, id: SubmissionId) -> Result<Submission>;

    async fn list_lesson_submissions(&self, lesson_id: LessonId) -> Result<Vec<Submission>>;

    /// A user's submissions within one course, newest first
    async fn list_user_submissions(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<Submission>>;

    async fn set_grade(&self, id: SubmissionId, grade: &Grade) -> Result<()>;

    async fn record_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<()>;

    /// Attempts by a user on one quiz, newest first
    async fn list_quiz_attempts(&self, user_id: UserId, lesson_id: LessonId)
        -> Result<Vec<QuizAttempt>>;

    /// Best score per quiz lesson for a user within a course
    async fn best_quiz_scores(&self, user_id: UserId, course_id: CourseId)
        -> Result<Vec<(LessonId, u8)>>;

    async fn has_perfect_quiz(&self, user_id: UserId) -> Result<bool>;

    // ---- gamification and analytics ----

    /// Append to the ledger; false if the reason key was already rewarded
    async fn award_points(&self, entry: &PointsEntry) -> Result<bool>;

    async fn user_points(&self, user_id: UserId) -> Result<u64>;

    async fn leaderboard(&self, course_id: CourseId, limit: usize) -> Result<Vec<LeaderboardEntry>>;

    async fn course_stats(&self, course_id: CourseId) -> Result<CourseStats>;

    async fn count_completed_courses(&self, user_id: UserId) -> Result<u64>;

    // ---- audit ----

    async fn log_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Most recent entries first
    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>>;
}
