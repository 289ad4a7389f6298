//! Enrollment and lesson-completion bookkeeping

use super::Lms;
use crate::access::{can_enroll, can_manage, require_manage, require_self_or_admin, Actor, AuditAction};
use crate::analytics::PointsRule;
use crate::api::events::Event;
use crate::error::{LyceumError, Result};
use crate::types::{CompletionOutcome, CourseId, EnrollOutcome, Enrollment, LessonContent, LessonId, UserId};
use chrono::Utc;
use tracing::{debug, info};

impl Lms {
    /// Enroll the actor; enrolling twice returns the existing enrollment untouched
    pub async fn enroll(&self, actor: &Actor, course_id: CourseId) -> Result<EnrollOutcome> {
        let course = self.storage.get_course(course_id).await?;
        if let Some(enrollment) = self.storage.get_enrollment(actor.id, course_id).await? {
            debug!("User {} already enrolled in {}", actor.id, course.slug);
            return Ok(EnrollOutcome {
                enrollment,
                created: false,
            });
        }
        if !can_enroll(actor, &course) {
            return Err(LyceumError::InvalidOperation(format!(
                "course {} is not open for enrollment ({})",
                course.slug, course.status
            )));
        }

        let outcome = self.storage.enroll(actor.id, course_id).await?;
        if outcome.created {
            self.audit(actor, AuditAction::Enrolled, course_id, None)
                .await?;
            self.events
                .publish(Event::enrollment_created(actor.id, course_id));
            self.invalidate(course_id, Some(actor.id));
            info!("User {} enrolled in {}", actor.id, course.slug);
        } else {
            debug!("User {} already enrolled in {}", actor.id, course.slug);
        }
        Ok(outcome)
    }

    /// Remove an enrollment and its completions; learners may drop themselves
    pub async fn unenroll(&self, actor: &Actor, user_id: UserId, course_id: CourseId) -> Result<bool> {
        let course = self.storage.get_course(course_id).await?;
        if actor.id != user_id {
            require_manage(actor, &course)?;
        }

        let removed = self.storage.unenroll(user_id, course_id).await?;
        if removed {
            self.audit(
                actor,
                AuditAction::Unenrolled,
                course_id,
                Some(serde_json::json!({ "user_id": user_id })),
            )
            .await?;
            self.invalidate(course_id, Some(user_id));
        }
        Ok(removed)
    }

    /// An enrollment, readable by its owner and the course's managers
    pub async fn get_enrollment(
        &self,
        actor: &Actor,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Enrollment> {
        let course = self.storage.get_course(course_id).await?;
        if !can_manage(actor, &course) {
            require_self_or_admin(actor, user_id)?;
        }
        self.storage
            .get_enrollment(user_id, course_id)
            .await?
            .ok_or_else(|| LyceumError::not_found("Enrollment", format!("{}/{}", user_id, course_id)))
    }

    pub async fn my_enrollments(&self, actor: &Actor) -> Result<Vec<Enrollment>> {
        self.storage.list_user_enrollments(actor.id).await
    }

    pub async fn list_enrollments(&self, actor: &Actor, course_id: CourseId) -> Result<Vec<Enrollment>> {
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;
        self.storage.list_course_enrollments(course_id).await
    }

    /// Mark a video or text lesson as done.
    ///
    /// Quizzes complete on a passing attempt and assignments on submission.
    pub async fn complete_lesson(&self, actor: &Actor, lesson_id: LessonId) -> Result<CompletionOutcome> {
        let (lesson, _) = self.enrolled_lesson(actor, lesson_id).await?;
        match lesson.content {
            LessonContent::Quiz { .. } => {
                return Err(LyceumError::InvalidOperation(
                    "quiz lessons are completed by passing the quiz".to_string(),
                ))
            }
            LessonContent::Assignment { .. } => {
                return Err(LyceumError::InvalidOperation(
                    "assignment lessons are completed by submitting".to_string(),
                ))
            }
            LessonContent::Video { .. } | LessonContent::Text { .. } => {}
        }
        self.record_completion(actor, lesson_id).await
    }

    /// Recompute stored progress from the completion set (course managers only)
    pub async fn recompute_progress(
        &self,
        actor: &Actor,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Enrollment> {
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;
        let enrollment = self.storage.recompute_progress(user_id, course_id).await?;
        self.invalidate(course_id, Some(user_id));
        Ok(enrollment)
    }

    /// Store a completion, then award points and publish events for what changed
    pub(super) async fn record_completion(
        &self,
        actor: &Actor,
        lesson_id: LessonId,
    ) -> Result<CompletionOutcome> {
        let user_id = actor.id;
        let outcome = self
            .storage
            .complete_lesson(user_id, lesson_id, Utc::now())
            .await?;
        let course_id = outcome.enrollment.course_id;

        if outcome.newly_completed {
            self.audit(
                actor,
                AuditAction::LessonCompleted,
                lesson_id,
                Some(serde_json::json!({ "progress": outcome.enrollment.progress })),
            )
            .await?;
            self.award(user_id, course_id, PointsRule::LessonCompleted(lesson_id))
                .await?;
            self.events.publish(Event::lesson_completed(
                user_id,
                course_id,
                lesson_id,
                outcome.enrollment.progress,
            ));
        }
        if outcome.course_completed {
            self.award(user_id, course_id, PointsRule::CourseCompleted(course_id))
                .await?;
            self.events
                .publish(Event::course_completed(user_id, course_id));
            info!("User {} completed course {}", user_id, course_id);
        }

        self.invalidate(course_id, Some(user_id));
        Ok(outcome)
    }

    /// Recompute every enrollment of a course after its lesson set shrank.
    ///
    /// Learners whose remaining lessons are all done reach 100% here and earn
    /// the completion reward.
    pub(super) async fn refresh_course_progress(&self, course_id: CourseId) -> Result<()> {
        for before in self.storage.list_course_enrollments(course_id).await? {
            let user_id = before.user_id;
            let after = self.storage.recompute_progress(user_id, course_id).await?;
            if before.completed_at.is_none() && after.completed_at.is_some() {
                self.award(user_id, course_id, PointsRule::CourseCompleted(course_id))
                    .await?;
                self.events
                    .publish(Event::course_completed(user_id, course_id));
                info!("User {} completed course {} after a lesson was removed", user_id, course_id);
            }
            self.cache.invalidate_user(user_id);
        }
        self.cache.invalidate_course(course_id);
        Ok(())
    }
}
