//! Common test utilities and helpers
#![allow(dead_code)]

use lyceum_core::{
    access::Actor,
    api::EventBroadcaster,
    types::{Course, Lesson, LessonContent, QuizQuestion, Role, User},
    ConnectionMode, LibsqlStorage, Lms, LyceumConfig,
};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Service layer over a file database that lives as long as this value
pub struct TestEnv {
    pub lms: Arc<Lms>,
    pub storage: Arc<LibsqlStorage>,
    _dir: TempDir,
}

/// Configuration tuned for tests: cheap password hashing, fixed secret
pub fn test_config() -> LyceumConfig {
    let mut config = LyceumConfig::default();
    config.auth.session_secret = Some("0123456789abcdef0123456789abcdef".to_string());
    config.auth.password_iterations = 1_000;
    config
}

/// Create a file-backed LibSQL storage for testing
pub async fn create_test_storage(dir: &TempDir) -> Arc<LibsqlStorage> {
    // A file rather than :memory: so every connection sees the same schema
    let path = dir.path().join("lyceum_test.db");
    let storage = LibsqlStorage::new_with_validation(
        ConnectionMode::Local(path.to_string_lossy().to_string()),
        true,
    )
    .await
    .expect("Failed to create test storage");
    Arc::new(storage)
}

pub async fn setup() -> TestEnv {
    setup_with(test_config()).await
}

pub async fn setup_with(config: LyceumConfig) -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = create_test_storage(&dir).await;
    let lms = Lms::new(storage.clone(), EventBroadcaster::new(256), &config)
        .expect("Failed to create Lms");
    TestEnv {
        lms: Arc::new(lms),
        storage,
        _dir: dir,
    }
}

impl TestEnv {
    /// Create an account with the given role and return it with its actor
    pub async fn user(&self, name: &str, role: Role) -> (User, Actor) {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = self
            .lms
            .create_user(&Actor::system(), &email, name, TEST_PASSWORD, role)
            .await
            .expect("Failed to create user");
        let actor = Actor::from(&user);
        (user, actor)
    }

    /// A course with one module holding `lessons`, published when `publish` is set
    pub async fn course_with(
        &self,
        instructor: &Actor,
        title: &str,
        lessons: Vec<LessonContent>,
        publish: bool,
    ) -> (Course, Vec<Lesson>) {
        let lms = &self.lms;
        let course = lms
            .create_course(instructor, title, "A course for tests")
            .await
            .expect("Failed to create course");
        let module = lms
            .add_module(instructor, course.id, "Module 1")
            .await
            .expect("Failed to add module");

        let mut created = Vec::new();
        for (i, content) in lessons.into_iter().enumerate() {
            let lesson = lms
                .add_lesson(instructor, module.id, &format!("Lesson {}", i + 1), content)
                .await
                .expect("Failed to add lesson");
            created.push(lesson);
        }

        let course = if publish {
            lms.publish_course(instructor, course.id)
                .await
                .expect("Failed to publish course")
        } else {
            course
        };
        (course, created)
    }

    /// Published course made of `n` text lessons
    pub async fn text_course(&self, instructor: &Actor, title: &str, n: usize) -> (Course, Vec<Lesson>) {
        let lessons = (0..n).map(|i| text_lesson(&format!("Reading {}", i + 1))).collect();
        self.course_with(instructor, title, lessons, true).await
    }
}

pub fn text_lesson(body: &str) -> LessonContent {
    LessonContent::Text {
        body: body.to_string(),
    }
}

pub fn video_lesson() -> LessonContent {
    LessonContent::Video {
        url: "https://videos.example.com/intro.mp4".to_string(),
        duration_secs: 300,
    }
}

/// Two questions; the right answers are `[0, 1]`
pub fn quiz_lesson(passing_score: Option<u8>) -> LessonContent {
    LessonContent::Quiz {
        questions: vec![
            QuizQuestion {
                prompt: "Which keyword declares an immutable binding?".to_string(),
                options: vec!["let".to_string(), "var".to_string()],
                correct: Some(0),
            },
            QuizQuestion {
                prompt: "Who owns a moved value?".to_string(),
                options: vec!["The old binding".to_string(), "The new binding".to_string()],
                correct: Some(1),
            },
        ],
        passing_score,
    }
}

pub fn assignment_lesson(max_points: u32) -> LessonContent {
    LessonContent::Assignment {
        instructions: "Write a function that reverses a string".to_string(),
        max_points,
    }
}
