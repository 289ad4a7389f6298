//! Course authoring, catalog listing and lesson delivery

use super::Lms;
use crate::access::{
    can_manage, can_view_listing, require_access, require_author, require_manage, Actor,
    AuditAction,
};
use crate::api::events::Event;
use crate::error::{LyceumError, Result};
use crate::types::{
    Course, CourseFilter, CourseId, CourseStatus, CourseUpdates, Lesson, LessonContent, LessonId,
    Module, ModuleId,
};
use crate::utils::string::slugify;
use crate::utils::validation::{validate_content, validate_title};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Attempts at finding a free slug before giving up
const MAX_SLUG_ATTEMPTS: usize = 50;

/// Lesson entry in a course outline; carries no content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: LessonId,
    pub title: String,
    pub kind: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub module: Module,
    pub lessons: Vec<LessonSummary>,
}

/// Table of contents for a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub course: Course,
    pub modules: Vec<ModuleOutline>,
}

fn slug_candidate(base: &str, attempt: usize) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt + 1)
    }
}

impl Lms {
    pub async fn create_course(&self, actor: &Actor, title: &str, description: &str) -> Result<Course> {
        require_author(actor)?;
        validate_title("title", title)?;

        let mut base = slugify(title);
        if base.is_empty() {
            base = "course".to_string();
        }

        let now = Utc::now();
        let mut course = Course {
            id: CourseId::new(),
            instructor_id: actor.id,
            title: title.trim().to_string(),
            slug: String::new(),
            description: description.trim().to_string(),
            status: CourseStatus::Draft,
            created_at: now,
            updated_at: now,
        };

        let mut created = false;
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let slug = slug_candidate(&base, attempt);
            if self.storage.slug_exists(&slug).await? {
                continue;
            }
            course.slug = slug;
            match self.storage.create_course(&course).await {
                Ok(()) => {
                    created = true;
                    break;
                }
                // Lost a race for this slug; try the next one
                Err(LyceumError::AlreadyExists(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        if !created {
            return Err(LyceumError::AlreadyExists(format!(
                "no free slug for course title '{}'",
                course.title
            )));
        }

        self.audit(
            actor,
            AuditAction::CourseCreated,
            course.id,
            Some(serde_json::json!({ "slug": course.slug })),
        )
        .await?;
        info!("Course {} created as '{}'", course.id, course.slug);
        Ok(course)
    }

    /// Course metadata, visible to listing viewers and enrolled users
    pub async fn get_course(&self, actor: &Actor, course_id: CourseId) -> Result<Course> {
        let (course, enrolled) = self.course_with_enrollment(actor, course_id).await?;
        if !(enrolled || can_view_listing(actor, &course)) {
            return Err(LyceumError::denied(format!(
                "course {} is not visible",
                course_id
            )));
        }
        Ok(course)
    }

    /// Catalog listing; anonymous callers see published courses only
    pub async fn list_courses(&self, actor: Option<&Actor>, filter: &CourseFilter) -> Result<Vec<Course>> {
        let courses = self.storage.list_courses(filter).await?;
        Ok(courses
            .into_iter()
            .filter(|c| match actor {
                Some(actor) => can_view_listing(actor, c),
                None => c.status == CourseStatus::Published,
            })
            .collect())
    }

    /// Ids of the courses the actor owns
    pub async fn managed_course_ids(&self, actor: &Actor) -> Result<HashSet<CourseId>> {
        let filter = CourseFilter {
            status: None,
            instructor_id: Some(actor.id),
        };
        let courses = self.storage.list_courses(&filter).await?;
        Ok(courses.into_iter().map(|c| c.id).collect())
    }

    pub async fn update_course(
        &self,
        actor: &Actor,
        course_id: CourseId,
        updates: CourseUpdates,
    ) -> Result<Course> {
        let mut course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;

        if let Some(title) = updates.title {
            validate_title("title", &title)?;
            course.title = title.trim().to_string();
        }
        if let Some(description) = updates.description {
            course.description = description.trim().to_string();
        }
        course.updated_at = Utc::now();

        self.storage.update_course(&course).await?;
        self.audit(actor, AuditAction::CourseUpdated, course_id, None)
            .await?;
        Ok(course)
    }

    /// Open a course for enrollment; it must contain at least one lesson
    pub async fn publish_course(&self, actor: &Actor, course_id: CourseId) -> Result<Course> {
        let mut course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;

        if self.storage.count_lessons(course_id).await? == 0 {
            return Err(LyceumError::InvalidOperation(
                "cannot publish a course without lessons".to_string(),
            ));
        }
        if course.status == CourseStatus::Published {
            return Ok(course);
        }

        course.status = CourseStatus::Published;
        course.updated_at = Utc::now();
        self.storage.update_course(&course).await?;
        self.audit(actor, AuditAction::CoursePublished, course_id, None)
            .await?;
        self.events
            .publish(Event::course_published(course.id, course.title.clone()));
        info!("Course {} published", course.slug);
        Ok(course)
    }

    /// Close a course to new enrollments and hide it from the catalog
    pub async fn archive_course(&self, actor: &Actor, course_id: CourseId) -> Result<Course> {
        let mut course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;
        if course.status == CourseStatus::Archived {
            return Ok(course);
        }

        course.status = CourseStatus::Archived;
        course.updated_at = Utc::now();
        self.storage.update_course(&course).await?;
        self.audit(actor, AuditAction::CourseArchived, course_id, None)
            .await?;
        info!("Course {} archived", course.slug);
        Ok(course)
    }

    pub async fn delete_course(&self, actor: &Actor, course_id: CourseId) -> Result<()> {
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;

        self.storage.delete_course(course_id).await?;
        self.audit(
            actor,
            AuditAction::CourseDeleted,
            course_id,
            Some(serde_json::json!({ "slug": course.slug })),
        )
        .await?;
        // Ledger rows went with the course, so every learner's totals may change
        self.cache.invalidate_course(course_id);
        self.cache.achievements.clear();
        Ok(())
    }

    pub async fn add_module(&self, actor: &Actor, course_id: CourseId, title: &str) -> Result<Module> {
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;
        validate_title("module title", title)?;

        let module = Module {
            id: ModuleId::new(),
            course_id,
            title: title.trim().to_string(),
            position: self.storage.next_module_position(course_id).await?,
        };
        self.storage.create_module(&module).await?;
        self.audit(actor, AuditAction::ModuleCreated, module.id, None)
            .await?;
        Ok(module)
    }

    pub async fn delete_module(&self, actor: &Actor, module_id: ModuleId) -> Result<()> {
        let module = self.storage.get_module(module_id).await?;
        let course = self.storage.get_course(module.course_id).await?;
        require_manage(actor, &course)?;

        self.storage.delete_module(module_id).await?;
        self.audit(actor, AuditAction::ModuleDeleted, module_id, None)
            .await?;
        self.refresh_course_progress(course.id).await
    }

    pub async fn add_lesson(
        &self,
        actor: &Actor,
        module_id: ModuleId,
        title: &str,
        content: LessonContent,
    ) -> Result<Lesson> {
        let module = self.storage.get_module(module_id).await?;
        let course = self.storage.get_course(module.course_id).await?;
        require_manage(actor, &course)?;
        validate_title("lesson title", title)?;
        validate_content(&content)?;

        let lesson = Lesson {
            id: LessonId::new(),
            module_id,
            title: title.trim().to_string(),
            position: self.storage.next_lesson_position(module_id).await?,
            content,
        };
        self.storage.create_lesson(&lesson).await?;
        self.audit(
            actor,
            AuditAction::LessonCreated,
            lesson.id,
            Some(serde_json::json!({ "kind": lesson.content.kind() })),
        )
        .await?;
        self.invalidate(course.id, None);
        Ok(lesson)
    }

    pub async fn delete_lesson(&self, actor: &Actor, lesson_id: LessonId) -> Result<()> {
        let course_id = self.storage.course_for_lesson(lesson_id).await?;
        let course = self.storage.get_course(course_id).await?;
        require_manage(actor, &course)?;

        self.storage.delete_lesson(lesson_id).await?;
        self.audit(actor, AuditAction::LessonDeleted, lesson_id, None)
            .await?;
        self.refresh_course_progress(course_id).await
    }

    /// Deliver a lesson; answer keys are stripped for non-managers
    pub async fn get_lesson(&self, actor: &Actor, lesson_id: LessonId) -> Result<Lesson> {
        let course_id = self.storage.course_for_lesson(lesson_id).await?;
        let (course, enrolled) = self.course_with_enrollment(actor, course_id).await?;
        require_access(actor, &course, enrolled)?;

        let mut lesson = self.storage.get_lesson(lesson_id).await?;
        if !can_manage(actor, &course) {
            lesson.content = lesson.content.redacted();
        }
        Ok(lesson)
    }

    /// Modules and lesson titles in order
    pub async fn course_outline(&self, actor: &Actor, course_id: CourseId) -> Result<CourseOutline> {
        let course = self.get_course(actor, course_id).await?;
        let modules = self.storage.list_modules(course_id).await?;
        let lessons = self.storage.list_lessons(course_id).await?;

        let modules = modules
            .into_iter()
            .map(|module| {
                let lessons = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .map(|l| LessonSummary {
                        id: l.id,
                        title: l.title.clone(),
                        kind: l.content.kind().to_string(),
                        position: l.position,
                    })
                    .collect();
                ModuleOutline { module, lessons }
            })
            .collect();

        Ok(CourseOutline { course, modules })
    }
}
