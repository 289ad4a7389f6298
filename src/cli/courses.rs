//! Catalog listing command

use clap::Subcommand;
use lyceum_core::{
    access::Actor,
    error::Result,
    types::{CourseFilter, CourseId, CourseStatus, UserId},
    LyceumConfig,
};

use super::helpers::{open_lms, short_id};

#[derive(Subcommand)]
pub enum CourseAction {
    /// List courses in any status
    List {
        /// Only show courses in this status (draft, published, archived)
        #[arg(short, long)]
        status: Option<CourseStatus>,

        /// Only show courses taught by this user id
        #[arg(long)]
        instructor: Option<String>,
    },

    /// Print a course's module and lesson outline
    Outline {
        /// Course id
        course_id: String,
    },
}

/// Handle course command
pub async fn handle(action: CourseAction, config: &LyceumConfig) -> Result<()> {
    let lms = open_lms(config).await?;
    let actor = Actor::system();

    match action {
        CourseAction::List { status, instructor } => {
            let filter = CourseFilter {
                status,
                instructor_id: instructor
                    .as_deref()
                    .map(UserId::from_string)
                    .transpose()?,
            };
            let courses = lms.list_courses(Some(&actor), &filter).await?;
            if courses.is_empty() {
                println!("No courses");
                return Ok(());
            }
            println!("{:<10} {:<10} {:<28} TITLE", "ID", "STATUS", "SLUG");
            for course in courses {
                println!(
                    "{:<10} {:<10} {:<28} {}",
                    short_id(&course.id),
                    course.status,
                    course.slug,
                    course.title
                );
            }
        }
        CourseAction::Outline { course_id } => {
            let course_id = CourseId::from_string(&course_id)?;
            let outline = lms.course_outline(&actor, course_id).await?;
            println!("{} [{}]", outline.course.title, outline.course.status);
            for module in &outline.modules {
                println!("  {}. {}", module.module.position + 1, module.module.title);
                for lesson in &module.lessons {
                    println!("     - {} ({})", lesson.title, lesson.kind);
                }
            }
        }
    }
    Ok(())
}
