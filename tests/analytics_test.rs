//! Course statistics, leaderboards, achievements and dashboards

mod common;

use common::{assignment_lesson, setup, text_lesson, TestEnv};
use lyceum_core::access::Actor;
use lyceum_core::analytics::Badge;
use lyceum_core::types::{Course, Lesson, Role};
use lyceum_core::LyceumError;

/// Alice finishes the course, Bob is halfway, Carol has not started
async fn populated(env: &TestEnv) -> (Actor, Course, Vec<Lesson>, [Actor; 3]) {
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, alice) = env.user("Alice", Role::Student).await;
    let (_, bob) = env.user("Bob", Role::Student).await;
    let (_, carol) = env.user("Carol", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Stats", 2).await;

    for student in [&alice, &bob, &carol] {
        env.lms.enroll(student, course.id).await.unwrap();
    }
    for lesson in &lessons {
        env.lms.complete_lesson(&alice, lesson.id).await.unwrap();
    }
    env.lms.complete_lesson(&bob, lessons[0].id).await.unwrap();

    (instructor, course, lessons, [alice, bob, carol])
}

#[tokio::test]
async fn test_course_stats() {
    let env = setup().await;
    let (instructor, course, _, [alice, ..]) = populated(&env).await;

    let stats = env.lms.course_stats(&instructor, course.id).await.unwrap();
    assert_eq!(stats.enrolled, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.completion_rate, 33.3);
    assert_eq!(stats.average_progress, 50.0);
    assert_eq!(stats.lesson_count, 2);
    assert_eq!(stats.pending_submissions, 0);

    let result = env.lms.course_stats(&alice, course.id).await;
    assert!(matches!(result, Err(LyceumError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_stats_refresh_after_enrollment() {
    let env = setup().await;
    let (instructor, course, _, _) = populated(&env).await;

    let before = env.lms.course_stats(&instructor, course.id).await.unwrap();
    assert_eq!(before.enrolled, 3);

    let (_, dave) = env.user("Dave", Role::Student).await;
    env.lms.enroll(&dave, course.id).await.unwrap();

    // Enrollment invalidates the cached figures
    let after = env.lms.course_stats(&instructor, course.id).await.unwrap();
    assert_eq!(after.enrolled, 4);
    assert_eq!(after.average_progress, 37.5);
}

#[tokio::test]
async fn test_leaderboard_orders_by_points() {
    let env = setup().await;
    let (_, course, _, [alice, bob, carol]) = populated(&env).await;

    let board = env.lms.leaderboard(&carol, course.id, None).await.unwrap();
    assert_eq!(board.len(), 2, "Users without points are not ranked");
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[0].user_id, alice.id);
    assert_eq!(board[0].name, "Alice");
    assert_eq!(board[0].points, 120);
    assert_eq!(board[1].rank, 2);
    assert_eq!(board[1].user_id, bob.id);
    assert_eq!(board[1].points, 10);

    let top = env.lms.leaderboard(&carol, course.id, Some(1)).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].user_id, alice.id);
}

#[tokio::test]
async fn test_leaderboard_ties_favor_earlier_achiever() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, first) = env.user("First", Role::Student).await;
    let (_, second) = env.user("Second", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Ties", 3).await;

    env.lms.enroll(&first, course.id).await.unwrap();
    env.lms.enroll(&second, course.id).await.unwrap();
    env.lms.complete_lesson(&first, lessons[0].id).await.unwrap();
    env.lms.complete_lesson(&second, lessons[0].id).await.unwrap();

    let board = env.lms.leaderboard(&instructor, course.id, None).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].points, board[1].points);
    assert_eq!(board[0].user_id, first.id);
    assert_eq!(board[1].rank, 2);
}

#[tokio::test]
async fn test_leaderboard_requires_course_access() {
    let env = setup().await;
    let (_, course, _, _) = populated(&env).await;
    let (_, outsider) = env.user("Olly", Role::Student).await;

    let result = env.lms.leaderboard(&outsider, course.id, None).await;
    assert!(matches!(result, Err(LyceumError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_achievements_after_course_completion() {
    let env = setup().await;
    let (_, _, _, [alice, _, carol]) = populated(&env).await;

    let achievements = env.lms.achievements(&alice, alice.id).await.unwrap();
    assert_eq!(achievements.points, 120);
    assert_eq!(achievements.level, 2);
    assert_eq!(achievements.next_level_in, 80);
    assert_eq!(achievements.streak_days, 1);
    assert_eq!(achievements.courses_completed, 1);
    assert_eq!(
        achievements.badges,
        vec![Badge::FirstSteps, Badge::CourseFinisher]
    );

    let idle = env.lms.achievements(&carol, carol.id).await.unwrap();
    assert_eq!(idle.points, 0);
    assert_eq!(idle.level, 1);
    assert_eq!(idle.streak_days, 0);
    assert!(idle.badges.is_empty());
}

#[tokio::test]
async fn test_achievements_reflect_new_points() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Fresh", 3).await;
    env.lms.enroll(&student, course.id).await.unwrap();

    env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();
    let first = env.lms.achievements(&student, student.id).await.unwrap();
    assert_eq!(first.points, 10);

    env.lms.complete_lesson(&student, lessons[1].id).await.unwrap();
    let second = env.lms.achievements(&student, student.id).await.unwrap();
    assert_eq!(second.points, 20, "Cached achievements must be invalidated");
}

#[tokio::test]
async fn test_instructor_dashboard() {
    let env = setup().await;
    let (instructor_user, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (_, admin) = env.user("Root", Role::Admin).await;

    let (reading, _) = env.text_course(&instructor, "Reading", 1).await;
    let (homework, lessons) = env
        .course_with(
            &instructor,
            "Homework",
            vec![text_lesson("intro"), assignment_lesson(10)],
            true,
        )
        .await;
    env.lms.enroll(&student, reading.id).await.unwrap();
    env.lms.enroll(&student, homework.id).await.unwrap();
    env.lms
        .submit_assignment(&student, lessons[1].id, "done")
        .await
        .unwrap();

    let dashboard = env
        .lms
        .instructor_dashboard(&instructor, instructor_user.id)
        .await
        .unwrap();
    assert_eq!(dashboard.courses.len(), 2);
    assert_eq!(dashboard.total_enrolled, 2);
    assert_eq!(dashboard.total_pending_submissions, 1);

    let via_admin = env
        .lms
        .instructor_dashboard(&admin, instructor_user.id)
        .await
        .unwrap();
    assert_eq!(via_admin.total_enrolled, 2);

    let result = env.lms.instructor_dashboard(&student, instructor_user.id).await;
    assert!(matches!(result, Err(LyceumError::PermissionDenied(_))));

    let result = env.lms.instructor_dashboard(&student, student.id).await;
    assert!(matches!(result, Err(LyceumError::InvalidOperation(_))));
}
