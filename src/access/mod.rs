//! Role-based access control for course operations
//!
//! Every check is a pure function of the acting user, the course and (for
//! content access) whether an enrollment exists. The service layer loads
//! those facts from storage and calls in here before touching data.

pub mod audit;

pub use audit::{AuditAction, AuditEntry};

use crate::error::{LyceumError, Result};
use crate::types::{Course, CourseStatus, Role, User, UserId};
use serde::{Deserialize, Serialize};

/// The authenticated principal behind a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Administrative principal for CLI and maintenance calls
    pub fn system() -> Self {
        Self {
            id: UserId(uuid::Uuid::nil()),
            role: Role::Admin,
        }
    }

    pub fn is_system(&self) -> bool {
        self.id.0.is_nil()
    }

    /// Actor recorded in audit entries; system calls are anonymous
    pub fn audit_id(&self) -> Option<UserId> {
        if self.is_system() {
            None
        } else {
            Some(self.id)
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

/// Content access: admin, the course's instructor, or an enrolled user
pub fn can_access(actor: &Actor, course: &Course, is_enrolled: bool) -> bool {
    actor.is_admin() || course.instructor_id == actor.id || is_enrolled
}

/// Management rights: admin or the course's instructor
pub fn can_manage(actor: &Actor, course: &Course) -> bool {
    actor.is_admin() || course.instructor_id == actor.id
}

/// Catalog visibility: published courses are public, the rest are for managers
pub fn can_view_listing(actor: &Actor, course: &Course) -> bool {
    course.status == CourseStatus::Published || can_manage(actor, course)
}

/// Whether the actor may enroll in the course in its current state
pub fn can_enroll(actor: &Actor, course: &Course) -> bool {
    course.status == CourseStatus::Published || can_manage(actor, course)
}

pub fn require_access(actor: &Actor, course: &Course, is_enrolled: bool) -> Result<()> {
    if can_access(actor, course, is_enrolled) {
        Ok(())
    } else {
        Err(LyceumError::denied(format!(
            "user {} is not enrolled in course {}",
            actor.id, course.id
        )))
    }
}

pub fn require_manage(actor: &Actor, course: &Course) -> Result<()> {
    if can_manage(actor, course) {
        Ok(())
    } else {
        Err(LyceumError::denied(format!(
            "user {} does not manage course {}",
            actor.id, course.id
        )))
    }
}

pub fn require_author(actor: &Actor) -> Result<()> {
    if actor.role.can_author() {
        Ok(())
    } else {
        Err(LyceumError::denied("only instructors and admins can author courses"))
    }
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LyceumError::denied("admin role required"))
    }
}

/// A user may read their own records; admins may read anyone's
pub fn require_self_or_admin(actor: &Actor, user_id: UserId) -> Result<()> {
    if actor.id == user_id || actor.is_admin() {
        Ok(())
    } else {
        Err(LyceumError::denied("cannot read another user's records"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CourseId;
    use chrono::Utc;

    fn course(instructor: UserId, status: CourseStatus) -> Course {
        Course {
            id: CourseId::new(),
            instructor_id: instructor,
            title: "Rust 101".to_string(),
            slug: "rust-101".to_string(),
            description: String::new(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_outsider_student_cannot_access() {
        let instructor = Actor::new(UserId::new(), Role::Instructor);
        let student = Actor::new(UserId::new(), Role::Student);
        let c = course(instructor.id, CourseStatus::Published);

        assert!(!can_access(&student, &c, false));
        assert!(can_access(&student, &c, true));
        assert!(require_access(&student, &c, false).is_err());
    }

    #[test]
    fn test_other_instructor_is_an_outsider() {
        let owner = Actor::new(UserId::new(), Role::Instructor);
        let other = Actor::new(UserId::new(), Role::Instructor);
        let c = course(owner.id, CourseStatus::Published);

        assert!(can_access(&owner, &c, false));
        assert!(!can_access(&other, &c, false));
        assert!(!can_manage(&other, &c));
    }

    #[test]
    fn test_admin_overrides() {
        let admin = Actor::new(UserId::new(), Role::Admin);
        let c = course(UserId::new(), CourseStatus::Draft);

        assert!(can_access(&admin, &c, false));
        assert!(can_manage(&admin, &c));
        assert!(can_view_listing(&admin, &c));
        assert!(require_admin(&admin).is_ok());
    }

    #[test]
    fn test_draft_listing_and_enrollment() {
        let owner = Actor::new(UserId::new(), Role::Instructor);
        let student = Actor::new(UserId::new(), Role::Student);
        let draft = course(owner.id, CourseStatus::Draft);

        assert!(!can_view_listing(&student, &draft));
        assert!(!can_enroll(&student, &draft));
        assert!(can_view_listing(&owner, &draft));

        let archived = course(owner.id, CourseStatus::Archived);
        assert!(!can_enroll(&student, &archived));
    }

    #[test]
    fn test_require_author() {
        assert!(require_author(&Actor::new(UserId::new(), Role::Student)).is_err());
        assert!(require_author(&Actor::new(UserId::new(), Role::Instructor)).is_ok());
    }

    #[test]
    fn test_system_actor() {
        let system = Actor::system();
        assert!(system.is_admin());
        assert!(system.is_system());
        assert_eq!(system.audit_id(), None);

        let user = Actor::new(UserId::new(), Role::Student);
        assert_eq!(user.audit_id(), Some(user.id));
    }

    #[test]
    fn test_require_self_or_admin() {
        let me = Actor::new(UserId::new(), Role::Student);
        assert!(require_self_or_admin(&me, me.id).is_ok());
        assert!(require_self_or_admin(&me, UserId::new()).is_err());
    }
}
