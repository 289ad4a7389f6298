//! Assignment submissions, grading and quiz attempts

use super::Lms;
use crate::access::{can_manage, require_manage, require_self_or_admin, Actor, AuditAction};
use crate::analytics::PointsRule;
use crate::api::events::Event;
use crate::error::{LyceumError, Result};
use crate::grading::{course_grade, score_quiz, validate_score, CourseGrade};
use crate::types::{
    AttemptId, CourseId, Grade, Lesson, LessonContent, LessonId, QuizAttempt, Submission,
    SubmissionId, UserId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A scored attempt plus the raw tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttemptOutcome {
    pub attempt: QuizAttempt,
    pub correct: usize,
    pub total: usize,
    /// Course progress after the attempt, when it completed the lesson
    pub progress: Option<u8>,
}

impl Lms {
    /// Lesson plus its course id; the actor must be enrolled in that course
    pub(super) async fn enrolled_lesson(&self, actor: &Actor, lesson_id: LessonId) -> Result<(Lesson, CourseId)> {
        let course_id = self.storage.course_for_lesson(lesson_id).await?;
        if !self.is_enrolled(actor.id, course_id).await? {
            return Err(LyceumError::denied(format!(
                "user {} is not enrolled in course {}",
                actor.id, course_id
            )));
        }
        let lesson = self.storage.get_lesson(lesson_id).await?;
        Ok((lesson, course_id))
    }

    /// Submit work for an assignment lesson; this completes the lesson
    pub async fn submit_assignment(&self, actor: &Actor, lesson_id: LessonId, body: &str) -> Result<Submission> {
        let (lesson, course_id) = self.enrolled_lesson(actor, lesson_id).await?;
        if !matches!(lesson.content, LessonContent::Assignment { .. }) {
            return Err(LyceumError::Validation(format!(
                "lesson {} is not an assignment",
                lesson_id
            )));
        }
        if body.trim().is_empty() {
            return Err(LyceumError::Validation("submission body is empty".to_string()));
        }

        let submission = Submission {
            id: SubmissionId::new(),
            lesson_id,
            user_id: actor.id,
            body: body.to_string(),
            submitted_at: Utc::now(),
            grade: None,
        };
        self.storage.create_submission(&submission).await?;
        self.audit(actor, AuditAction::SubmissionCreated, submission.id, None)
            .await?;
        self.events.publish(Event::submission_received(
            submission.id,
            lesson_id,
            course_id,
            actor.id,
        ));

        // Also refreshes the course's cached pending-submission count
        self.record_completion(actor, lesson_id).await?;
        Ok(submission)
    }

    /// Grade or regrade a submission; points are credited once per assignment
    pub async fn grade_submission(
        &self,
        actor: &Actor,
        submission_id: SubmissionId,
        score: u32,
        feedback: &str,
    ) -> Result<Submission> {
        let mut submission = self.storage.get_submission(submission_id).await?;
        let course_id = self.storage.course_for_lesson(submission.lesson_id).await?;
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;

        let lesson = self.storage.get_lesson(submission.lesson_id).await?;
        let max_points = match lesson.content {
            LessonContent::Assignment { max_points, .. } => max_points,
            _ => {
                return Err(LyceumError::InvalidOperation(format!(
                    "lesson {} is not an assignment",
                    lesson.id
                )))
            }
        };
        validate_score(score, max_points)?;

        let regrade = submission.grade.is_some();
        let grade = Grade {
            score,
            max_points,
            feedback: feedback.trim().to_string(),
            graded_by: actor.id,
            graded_at: Utc::now(),
        };
        self.storage.set_grade(submission_id, &grade).await?;
        submission.grade = Some(grade);

        self.award(
            submission.user_id,
            course_id,
            PointsRule::AssignmentGraded {
                lesson: submission.lesson_id,
                score,
                max_points,
            },
        )
        .await?;

        self.audit(
            actor,
            AuditAction::SubmissionGraded,
            submission_id,
            Some(serde_json::json!({ "score": score, "max_points": max_points, "regrade": regrade })),
        )
        .await?;
        self.events.publish(Event::submission_graded(
            submission_id,
            course_id,
            submission.user_id,
            score,
            max_points,
        ));
        self.invalidate(course_id, Some(submission.user_id));
        info!("Submission {} graded {}/{}", submission_id, score, max_points);
        Ok(submission)
    }

    /// All submissions for an assignment (course managers only)
    pub async fn lesson_submissions(&self, actor: &Actor, lesson_id: LessonId) -> Result<Vec<Submission>> {
        let course_id = self.storage.course_for_lesson(lesson_id).await?;
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;
        self.storage.list_lesson_submissions(lesson_id).await
    }

    /// A learner's submissions in a course
    pub async fn user_submissions(
        &self,
        actor: &Actor,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<Submission>> {
        let course = self.storage.get_course(course_id).await?;
        if !can_manage(actor, &course) {
            require_self_or_admin(actor, user_id)?;
        }
        self.storage.list_user_submissions(user_id, course_id).await
    }

    /// Score a quiz attempt; a passing attempt completes the lesson
    pub async fn attempt_quiz(
        &self,
        actor: &Actor,
        lesson_id: LessonId,
        answers: Vec<usize>,
    ) -> Result<QuizAttemptOutcome> {
        let (lesson, course_id) = self.enrolled_lesson(actor, lesson_id).await?;
        let (questions, passing_score) = match &lesson.content {
            LessonContent::Quiz {
                questions,
                passing_score,
            } => (
                questions,
                passing_score.unwrap_or(self.settings.default_passing_score),
            ),
            _ => {
                return Err(LyceumError::Validation(format!(
                    "lesson {} is not a quiz",
                    lesson_id
                )))
            }
        };

        let scored = score_quiz(questions, &answers, passing_score)?;
        let attempt = QuizAttempt {
            id: AttemptId::new(),
            lesson_id,
            user_id: actor.id,
            answers,
            score: scored.score,
            passed: scored.passed,
            attempted_at: Utc::now(),
        };
        self.storage.record_quiz_attempt(&attempt).await?;
        self.audit(
            actor,
            AuditAction::QuizAttempted,
            attempt.id,
            Some(serde_json::json!({ "score": attempt.score, "passed": attempt.passed })),
        )
        .await?;
        self.events.publish(Event::quiz_attempted(
            lesson_id,
            course_id,
            actor.id,
            attempt.score,
            attempt.passed,
        ));

        let mut progress = None;
        if attempt.passed {
            self.award(actor.id, course_id, PointsRule::QuizPassed(lesson_id))
                .await?;
            if attempt.score == 100 {
                self.award(actor.id, course_id, PointsRule::QuizPerfect(lesson_id))
                    .await?;
            }
            let outcome = self.record_completion(actor, lesson_id).await?;
            progress = Some(outcome.enrollment.progress);
        }
        self.invalidate(course_id, Some(actor.id));

        Ok(QuizAttemptOutcome {
            attempt,
            correct: scored.correct,
            total: scored.total,
            progress,
        })
    }

    pub async fn quiz_attempts(&self, actor: &Actor, lesson_id: LessonId) -> Result<Vec<QuizAttempt>> {
        self.storage.list_quiz_attempts(actor.id, lesson_id).await
    }

    /// Mean of the latest graded score per assignment and the best score per quiz
    pub async fn course_grade(
        &self,
        actor: &Actor,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseGrade>> {
        let course = self.storage.get_course(course_id).await?;
        if !can_manage(actor, &course) {
            require_self_or_admin(actor, user_id)?;
        }

        let mut items = Vec::new();

        // Submissions arrive newest first, so the first graded one per lesson wins
        let mut latest: HashMap<LessonId, f64> = HashMap::new();
        for submission in self.storage.list_user_submissions(user_id, course_id).await? {
            if let Some(grade) = &submission.grade {
                latest.entry(submission.lesson_id).or_insert_with(|| grade.percent());
            }
        }
        items.extend(latest.into_values());

        for (_, best) in self.storage.best_quiz_scores(user_id, course_id).await? {
            items.push(best as f64);
        }

        Ok(course_grade(&items))
    }
}
