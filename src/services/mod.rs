//! Services layer for the Lyceum LMS
//!
//! [`Lms`] is the single entry point used by the HTTP API and the CLI. Each
//! operation loads the facts it needs from storage, runs the access checks in
//! [`crate::access`], performs the mutation, then records an audit entry,
//! publishes domain events, awards points and invalidates cached analytics.

mod accounts;
mod assessment;
mod catalog;
mod insights;
mod learning;

pub use assessment::QuizAttemptOutcome;
pub use catalog::{CourseOutline, LessonSummary, ModuleOutline};

use crate::access::{Actor, AuditAction, AuditEntry};
use crate::analytics::cache::AnalyticsCache;
use crate::analytics::PointsRule;
use crate::api::events::{Event, EventBroadcaster};
use crate::auth::SessionKeys;
use crate::config::LyceumConfig;
use crate::error::Result;
use crate::storage::StorageBackend;
use crate::types::{Course, CourseId, PointsEntry, UserId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tunables taken from configuration at startup
#[derive(Debug, Clone)]
pub struct LmsSettings {
    pub password_iterations: u32,
    pub default_passing_score: u8,
    pub leaderboard_size: usize,
}

impl From<&LyceumConfig> for LmsSettings {
    fn from(config: &LyceumConfig) -> Self {
        Self {
            password_iterations: config.auth.password_iterations,
            default_passing_score: config.grading.default_passing_score,
            leaderboard_size: config.analytics.leaderboard_size,
        }
    }
}

/// Application service
pub struct Lms {
    storage: Arc<dyn StorageBackend>,
    events: EventBroadcaster,
    cache: AnalyticsCache,
    sessions: SessionKeys,
    settings: LmsSettings,
}

impl Lms {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        events: EventBroadcaster,
        config: &LyceumConfig,
    ) -> Result<Self> {
        let sessions = SessionKeys::new(config.session_secret(), config.auth.session_ttl_hours)?;
        let cache = AnalyticsCache::new(
            config.analytics.cache_capacity,
            Duration::from_secs(config.analytics.cache_ttl_secs),
        );
        Ok(Self {
            storage,
            events,
            cache,
            sessions,
            settings: LmsSettings::from(config),
        })
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn settings(&self) -> &LmsSettings {
        &self.settings
    }

    async fn audit(
        &self,
        actor: &Actor,
        action: AuditAction,
        target: impl ToString,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut entry = AuditEntry::new(actor.audit_id(), action, target);
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        debug!("Audit: {} {}", entry.action.as_str(), entry.target);
        self.storage.log_audit(&entry).await
    }

    async fn is_enrolled(&self, user_id: UserId, course_id: CourseId) -> Result<bool> {
        Ok(self
            .storage
            .get_enrollment(user_id, course_id)
            .await?
            .is_some())
    }

    /// Load a course together with the actor's enrollment flag
    async fn course_with_enrollment(&self, actor: &Actor, course_id: CourseId) -> Result<(Course, bool)> {
        let course = self.storage.get_course(course_id).await?;
        let enrolled = self.is_enrolled(actor.id, course_id).await?;
        Ok((course, enrolled))
    }

    /// Credit the ledger; returns the points granted, 0 if already rewarded
    async fn award(&self, user_id: UserId, course_id: CourseId, rule: PointsRule) -> Result<u32> {
        let entry = PointsEntry {
            user_id,
            course_id,
            reason_key: rule.reason_key(),
            points: rule.points(),
            awarded_at: Utc::now(),
        };
        if !self.storage.award_points(&entry).await? {
            debug!("Points for {} already awarded to {}", entry.reason_key, user_id);
            return Ok(0);
        }
        debug!("Awarded {} points to {} for {}", entry.points, user_id, entry.reason_key);
        self.events.publish(Event::points_awarded(
            user_id,
            course_id,
            entry.points,
            entry.reason_key,
        ));
        Ok(entry.points)
    }

    /// Drop cached analytics touched by a write to `course_id` on behalf of `user_id`
    fn invalidate(&self, course_id: CourseId, user_id: Option<UserId>) {
        self.cache.invalidate_course(course_id);
        if let Some(user_id) = user_id {
            self.cache.invalidate_user(user_id);
        }
    }
}
