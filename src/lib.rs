//! Lyceum - Learning Management System Core
//!
//! Backend for an online learning platform:
//! - Course catalog with modules and typed lessons (video, text, quiz, assignment)
//! - Role-based access control (student, instructor, admin)
//! - Enrollment and progress tracking with an enforced completion invariant
//! - Assignment grading and auto-scored quizzes
//! - Gamified analytics: points, levels, streaks, badges and leaderboards
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (User, Course, Lesson, Enrollment, ...)
//! - **Access**: Pure authorization rules and the audit log model
//! - **Storage**: libSQL backend behind the [`StorageBackend`] trait
//! - **Services**: The [`Lms`] facade; every operation checks access first
//! - **API**: Axum router, bearer authentication and an SSE event stream
//!
//! # Example
//!
//! ```ignore
//! use lyceum_core::{api::EventBroadcaster, Actor, LibsqlStorage, Lms, LyceumConfig, Role};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LyceumConfig::load(None)?;
//!     let storage = Arc::new(LibsqlStorage::from_path(&config.db_path(), true).await?);
//!     let lms = Lms::new(storage, EventBroadcaster::default(), &config)?;
//!
//!     let instructor = lms.create_user(&Actor::system(), "ada@example.com", "Ada", "correct horse", Role::Instructor).await?;
//!     let course = lms.create_course(&Actor::from(&instructor), "Rust 101", "Ownership and borrowing").await?;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod grading;
pub mod progress;
pub mod services;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use access::{Actor, AuditAction, AuditEntry};
pub use config::LyceumConfig;
pub use error::{LyceumError, Result};
pub use services::{Lms, LmsSettings};
pub use storage::{
    libsql::{ConnectionMode, LibsqlStorage},
    StorageBackend,
};
pub use types::{
    Course, CourseId, CourseStatus, Enrollment, Lesson, LessonContent, LessonId, Module, ModuleId,
    QuizAttempt, Role, Submission, SubmissionId, User, UserId,
};
