//! Course statistics command

use lyceum_core::{access::Actor, error::Result, types::CourseId, LyceumConfig};

use super::helpers::{open_lms, short_id};

/// Print enrollment numbers and the top of the leaderboard for a course
pub async fn handle(course_id: String, top: usize, config: &LyceumConfig) -> Result<()> {
    let course_id = CourseId::from_string(&course_id)?;
    let lms = open_lms(config).await?;
    let actor = Actor::system();

    let course = lms.get_course(&actor, course_id).await?;
    let stats = lms.course_stats(&actor, course_id).await?;

    println!("{} [{}]", course.title, course.status);
    println!("  Lessons:          {}", stats.lesson_count);
    println!("  Enrolled:         {}", stats.enrolled);
    println!(
        "  Completed:        {} ({:.1}%)",
        stats.completed, stats.completion_rate
    );
    println!("  Average progress: {:.1}%", stats.average_progress);
    println!("  Ungraded:         {}", stats.pending_submissions);

    let board = lms.leaderboard(&actor, course_id, Some(top)).await?;
    if !board.is_empty() {
        println!();
        println!("Leaderboard:");
        for entry in board {
            println!(
                "  {:>3}. {:<24} {:>6} pts  {}",
                entry.rank,
                entry.name,
                entry.points,
                short_id(&entry.user_id)
            );
        }
    }
    Ok(())
}
