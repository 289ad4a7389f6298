//! Enrollment lifecycle and progress bookkeeping against a real database

mod common;

use common::{quiz_lesson, setup, text_lesson, video_lesson};
use lyceum_core::api::EventType;
use lyceum_core::progress::is_consistent;
use lyceum_core::types::Role;
use lyceum_core::{LyceumError, StorageBackend};

#[tokio::test]
async fn test_enroll_twice_returns_existing() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Twice", 2).await;

    let first = env.lms.enroll(&student, course.id).await.unwrap();
    assert!(first.created);
    assert_eq!(first.enrollment.progress, 0);

    env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();

    let second = env.lms.enroll(&student, course.id).await.unwrap();
    assert!(!second.created, "Second enrollment should be a no-op");
    assert_eq!(second.enrollment.progress, 50);
    assert_eq!(
        second.enrollment.enrolled_at.timestamp(),
        first.enrollment.enrolled_at.timestamp()
    );

    let mine = env.lms.my_enrollments(&student).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_enroll_again_after_archive_returns_existing() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (_, latecomer) = env.user("Lee", Role::Student).await;
    let (course, _) = env.text_course(&instructor, "Retired", 2).await;

    let first = env.lms.enroll(&student, course.id).await.unwrap();
    assert!(first.created);
    env.lms.archive_course(&instructor, course.id).await.unwrap();

    let again = env.lms.enroll(&student, course.id).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.enrollment.progress, first.enrollment.progress);
    assert_eq!(
        again.enrollment.enrolled_at.timestamp(),
        first.enrollment.enrolled_at.timestamp()
    );

    // Archived courses stay closed to newcomers
    let result = env.lms.enroll(&latecomer, course.id).await;
    assert!(matches!(result, Err(LyceumError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_progress_advances_to_completion() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env
        .course_with(
            &instructor,
            "Three parts",
            vec![text_lesson("one"), video_lesson(), text_lesson("three")],
            true,
        )
        .await;
    env.lms.enroll(&student, course.id).await.unwrap();

    let expected = [33u8, 67, 100];
    for (lesson, want) in lessons.iter().zip(expected) {
        let outcome = env.lms.complete_lesson(&student, lesson.id).await.unwrap();
        assert!(outcome.newly_completed);
        assert_eq!(outcome.enrollment.progress, want);
        assert!(is_consistent(&outcome.enrollment));
        assert_eq!(outcome.course_completed, want == 100);
    }

    let enrollment = env
        .lms
        .get_enrollment(&student, student.id, course.id)
        .await
        .unwrap();
    assert_eq!(enrollment.progress, 100);
    assert!(enrollment.completed_at.is_some());
}

#[tokio::test]
async fn test_repeat_completion_is_noop() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Repeat", 2).await;
    env.lms.enroll(&student, course.id).await.unwrap();

    env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();
    let points_before = env.storage.user_points(student.id).await.unwrap();

    let again = env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();
    assert!(!again.newly_completed);
    assert!(!again.course_completed);
    assert_eq!(again.enrollment.progress, 50);

    let points_after = env.storage.user_points(student.id).await.unwrap();
    assert_eq!(points_before, points_after, "Repeat completion must not award points");
}

#[tokio::test]
async fn test_completion_requires_enrollment() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (_, lessons) = env.text_course(&instructor, "Closed door", 1).await;

    let result = env.lms.complete_lesson(&student, lessons[0].id).await;
    assert!(matches!(result, Err(LyceumError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_quiz_lesson_cannot_be_marked_complete() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env
        .course_with(&instructor, "Quiz only", vec![quiz_lesson(None)], true)
        .await;
    env.lms.enroll(&student, course.id).await.unwrap();

    let result = env.lms.complete_lesson(&student, lessons[0].id).await;
    assert!(matches!(result, Err(LyceumError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_progress_never_decreases_when_lessons_added() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Growing", 2).await;
    env.lms.enroll(&student, course.id).await.unwrap();

    for lesson in &lessons {
        env.lms.complete_lesson(&student, lesson.id).await.unwrap();
    }
    let finished = env
        .lms
        .get_enrollment(&student, student.id, course.id)
        .await
        .unwrap();
    assert_eq!(finished.progress, 100);

    // A third lesson would make the raw ratio 67%
    let module_id = lessons[0].module_id;
    env.lms
        .add_lesson(&instructor, module_id, "Bonus", text_lesson("extra"))
        .await
        .unwrap();

    let recomputed = env
        .lms
        .recompute_progress(&instructor, student.id, course.id)
        .await
        .unwrap();
    assert_eq!(recomputed.progress, 100);
    assert_eq!(
        recomputed.completed_at.map(|t| t.timestamp_micros()),
        finished.completed_at.map(|t| t.timestamp_micros()),
        "completed_at is set once and never moved"
    );
}

#[tokio::test]
async fn test_deleting_last_open_lesson_completes_course() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Shrinking", 3).await;
    env.lms.enroll(&student, course.id).await.unwrap();

    env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();
    env.lms.complete_lesson(&student, lessons[1].id).await.unwrap();
    let before = env
        .lms
        .get_enrollment(&student, student.id, course.id)
        .await
        .unwrap();
    assert_eq!(before.progress, 67);
    assert!(before.completed_at.is_none());
    let points_before = env.storage.user_points(student.id).await.unwrap();

    env.lms.delete_lesson(&instructor, lessons[2].id).await.unwrap();

    let after = env
        .lms
        .get_enrollment(&student, student.id, course.id)
        .await
        .unwrap();
    assert_eq!(after.progress, 100);
    assert!(after.completed_at.is_some());
    assert!(is_consistent(&after));
    assert_eq!(
        env.storage.user_points(student.id).await.unwrap(),
        points_before + 100
    );

    let stats = env.lms.course_stats(&instructor, course.id).await.unwrap();
    assert_eq!(stats.completed, 1);
}

#[tokio::test]
async fn test_unenroll_discards_completions() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (student_user, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Restart", 2).await;

    env.lms.enroll(&student, course.id).await.unwrap();
    env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();

    assert!(env
        .lms
        .unenroll(&student, student_user.id, course.id)
        .await
        .unwrap());
    assert!(!env
        .lms
        .unenroll(&student, student_user.id, course.id)
        .await
        .unwrap());

    let result = env.lms.get_enrollment(&student, student_user.id, course.id).await;
    assert!(matches!(result, Err(LyceumError::NotFound(..))));

    let fresh = env.lms.enroll(&student, course.id).await.unwrap();
    assert!(fresh.created);
    assert_eq!(fresh.enrollment.progress, 0);
    let completed = env
        .storage
        .completed_lessons(student_user.id, course.id)
        .await
        .unwrap();
    assert!(completed.is_empty());
}

#[tokio::test]
async fn test_concurrent_completions_stay_consistent() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (student_user, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Parallel", 4).await;
    env.lms.enroll(&student, course.id).await.unwrap();

    let mut handles = Vec::new();
    for lesson in &lessons {
        let lms = env.lms.clone();
        let lesson_id = lesson.id;
        handles.push(tokio::spawn(async move {
            lms.complete_lesson(&student, lesson_id).await
        }));
    }

    let mut course_completions = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(is_consistent(&outcome.enrollment));
        if outcome.course_completed {
            course_completions += 1;
        }
    }
    assert_eq!(course_completions, 1, "Exactly one call completes the course");

    let enrollment = env
        .storage
        .get_enrollment(student_user.id, course.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress, 100);
    assert!(enrollment.completed_at.is_some());
}

#[tokio::test]
async fn test_completion_publishes_events() {
    let env = setup().await;
    let (_, instructor) = env.user("Ines", Role::Instructor).await;
    let (_, student) = env.user("Sam", Role::Student).await;
    let (course, lessons) = env.text_course(&instructor, "Observed", 1).await;

    let mut rx = env.lms.events().subscribe();
    env.lms.enroll(&student, course.id).await.unwrap();
    env.lms.complete_lesson(&student, lessons[0].id).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.event_type);
    }

    assert!(kinds
        .iter()
        .any(|e| matches!(e, EventType::EnrollmentCreated { course_id, .. } if *course_id == course.id)));
    assert!(kinds
        .iter()
        .any(|e| matches!(e, EventType::LessonCompleted { progress: 100, .. })));
    assert!(kinds
        .iter()
        .any(|e| matches!(e, EventType::CourseCompleted { .. })));
    let awarded: u32 = kinds
        .iter()
        .filter_map(|e| match e {
            EventType::PointsAwarded { points, .. } => Some(*points),
            _ => None,
        })
        .sum();
    assert_eq!(awarded, 110);
}
