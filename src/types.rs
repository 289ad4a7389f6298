//! Core data types for the Lyceum learning management system
//!
//! This module defines the fundamental data structures used throughout lyceum:
//! users and roles, the course/module/lesson content tree, enrollments,
//! submissions, quiz attempts and the gamification ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LyceumError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from a string
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_string(s)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for users
    UserId
);
entity_id!(
    /// Unique identifier for courses
    CourseId
);
entity_id!(
    /// Unique identifier for course modules
    ModuleId
);
entity_id!(
    /// Unique identifier for lessons
    LessonId
);
entity_id!(
    /// Unique identifier for assignment submissions
    SubmissionId
);
entity_id!(
    /// Unique identifier for quiz attempts
    AttemptId
);

/// Account role used by every access check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
        }
    }

    /// Whether this role may author courses
    pub fn can_author(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LyceumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(LyceumError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Publication state of a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    /// Being authored; visible to its managers only
    Draft,
    /// Listed in the catalog and open for enrollment
    Published,
    /// Closed to new enrollments, hidden from the catalog
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "DRAFT",
            CourseStatus::Published => "PUBLISHED",
            CourseStatus::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseStatus {
    type Err = LyceumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(CourseStatus::Draft),
            "PUBLISHED" => Ok(CourseStatus::Published),
            "ARCHIVED" => Ok(CourseStatus::Archived),
            other => Err(LyceumError::Validation(format!(
                "Unknown course status: {}",
                other
            ))),
        }
    }
}

/// A course owned by a single instructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub instructor_id: UserId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A titled group of lessons inside a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub position: u32,
}

/// One multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`. Stripped when a quiz is delivered to learners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<usize>,
}

/// Deliverable lesson payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LessonContent {
    Video {
        url: String,
        #[serde(default)]
        duration_secs: u32,
    },
    Text {
        body: String,
    },
    Quiz {
        questions: Vec<QuizQuestion>,
        /// Minimum percentage to pass; falls back to the configured default
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passing_score: Option<u8>,
    },
    Assignment {
        instructions: String,
        max_points: u32,
    },
}

impl LessonContent {
    /// Short kind tag, also the `kind` column in storage
    pub fn kind(&self) -> &'static str {
        match self {
            LessonContent::Video { .. } => "video",
            LessonContent::Text { .. } => "text",
            LessonContent::Quiz { .. } => "quiz",
            LessonContent::Assignment { .. } => "assignment",
        }
    }

    /// Copy of this content with quiz answer keys removed
    pub fn redacted(&self) -> Self {
        match self {
            LessonContent::Quiz {
                questions,
                passing_score,
            } => LessonContent::Quiz {
                questions: questions
                    .iter()
                    .map(|q| QuizQuestion {
                        prompt: q.prompt.clone(),
                        options: q.options.clone(),
                        correct: None,
                    })
                    .collect(),
                passing_score: *passing_score,
            },
            other => other.clone(),
        }
    }
}

/// A single unit of content inside a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub position: u32,
    pub content: LessonContent,
}

/// A user's membership in a course
///
/// `progress` is a percentage in `[0, 100]` and `completed_at` is set exactly
/// when `progress == 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress: u8,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id,
            course_id,
            progress: 0,
            enrolled_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Result of an enroll call; `created` is false when the user was already enrolled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollOutcome {
    pub enrollment: Enrollment,
    pub created: bool,
}

/// Result of recording a lesson completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub enrollment: Enrollment,
    /// False when the lesson had already been completed
    pub newly_completed: bool,
    /// True when this completion moved the course to 100%
    pub course_completed: bool,
}

/// Instructor-assigned grade on a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub score: u32,
    pub max_points: u32,
    pub feedback: String,
    pub graded_by: UserId,
    pub graded_at: DateTime<Utc>,
}

impl Grade {
    /// Score as a percentage of the maximum
    pub fn percent(&self) -> f64 {
        if self.max_points == 0 {
            return 0.0;
        }
        100.0 * self.score as f64 / self.max_points as f64
    }
}

/// A student's answer to an assignment lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub lesson_id: LessonId,
    pub user_id: UserId,
    pub body: String,
    pub submitted_at: DateTime<Utc>,
    pub grade: Option<Grade>,
}

/// A scored quiz attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub lesson_id: LessonId,
    pub user_id: UserId,
    pub answers: Vec<usize>,
    pub score: u8,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

/// One row of the gamification ledger; `reason_key` is unique per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub reason_key: String,
    pub points: u32,
    pub awarded_at: DateTime<Utc>,
}

/// Fields that may change on an existing course
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseUpdates {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Filter for catalog listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseFilter {
    pub status: Option<CourseStatus>,
    pub instructor_id: Option<UserId>,
}
