//! Audit trail for mutating operations
//!
//! Each service call that changes state appends one entry naming the actor,
//! the action and the target record.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LyceumError;

/// Type of modification being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserCreated,
    RoleChanged,
    CourseCreated,
    CourseUpdated,
    CoursePublished,
    CourseArchived,
    CourseDeleted,
    ModuleCreated,
    ModuleDeleted,
    LessonCreated,
    LessonDeleted,
    Enrolled,
    Unenrolled,
    LessonCompleted,
    SubmissionCreated,
    SubmissionGraded,
    QuizAttempted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserCreated => "user_created",
            AuditAction::RoleChanged => "role_changed",
            AuditAction::CourseCreated => "course_created",
            AuditAction::CourseUpdated => "course_updated",
            AuditAction::CoursePublished => "course_published",
            AuditAction::CourseArchived => "course_archived",
            AuditAction::CourseDeleted => "course_deleted",
            AuditAction::ModuleCreated => "module_created",
            AuditAction::ModuleDeleted => "module_deleted",
            AuditAction::LessonCreated => "lesson_created",
            AuditAction::LessonDeleted => "lesson_deleted",
            AuditAction::Enrolled => "enrolled",
            AuditAction::Unenrolled => "unenrolled",
            AuditAction::LessonCompleted => "lesson_completed",
            AuditAction::SubmissionCreated => "submission_created",
            AuditAction::SubmissionGraded => "submission_graded",
            AuditAction::QuizAttempted => "quiz_attempted",
        }
    }
}

impl FromStr for AuditAction {
    type Err = LyceumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| LyceumError::Validation(format!("Unknown audit action: {}", s)))
    }
}

/// Log entry for a modification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Log entry ID
    pub id: String,

    /// User that made the modification (None for system/CLI actions)
    pub actor_id: Option<UserId>,

    pub action: AuditAction,

    /// Identifier of the affected record
    pub target: String,

    pub timestamp: DateTime<Utc>,

    /// Optional JSON describing what changed
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(actor_id: Option<UserId>, action: AuditAction, target: impl ToString) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id,
            action,
            target: target.to_string(),
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_str_matches_serde() {
        for action in [
            AuditAction::UserCreated,
            AuditAction::CoursePublished,
            AuditAction::SubmissionGraded,
            AuditAction::LessonCompleted,
            AuditAction::QuizAttempted,
        ] {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json.as_str().unwrap(), action.as_str());
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_entry_builder() {
        let entry = AuditEntry::new(None, AuditAction::RoleChanged, "user-1")
            .with_details(serde_json::json!({"role": "ADMIN"}));
        assert_eq!(entry.target, "user-1");
        assert_eq!(entry.details.unwrap()["role"], "ADMIN");
    }
}
