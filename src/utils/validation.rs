//! Input validation for user-supplied fields and lesson content

use crate::error::{LyceumError, Result};
use crate::types::LessonContent;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_TITLE_LEN: usize = 200;

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(LyceumError::Validation(format!("invalid email address: {}", email)))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LyceumError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Non-empty after trimming and at most `MAX_TITLE_LEN` characters
pub fn validate_title(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LyceumError::Validation(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(LyceumError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Structural checks on authored lesson content
pub fn validate_content(content: &LessonContent) -> Result<()> {
    match content {
        LessonContent::Video { url, .. } => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(LyceumError::Validation(format!(
                    "video url must be http(s): {}",
                    url
                )));
            }
        }
        LessonContent::Text { body } => {
            if body.trim().is_empty() {
                return Err(LyceumError::Validation("text lesson body is empty".into()));
            }
        }
        LessonContent::Quiz {
            questions,
            passing_score,
        } => {
            if questions.is_empty() {
                return Err(LyceumError::Validation("quiz has no questions".into()));
            }
            if let Some(score) = passing_score {
                if *score > 100 {
                    return Err(LyceumError::Validation(format!(
                        "passing score {} is above 100",
                        score
                    )));
                }
            }
            for (i, q) in questions.iter().enumerate() {
                if q.options.len() < 2 {
                    return Err(LyceumError::Validation(format!(
                        "question {} needs at least two options",
                        i + 1
                    )));
                }
                match q.correct {
                    Some(idx) if idx < q.options.len() => {}
                    Some(idx) => {
                        return Err(LyceumError::Validation(format!(
                            "question {} answer index {} is out of range",
                            i + 1,
                            idx
                        )))
                    }
                    None => {
                        return Err(LyceumError::Validation(format!(
                            "question {} has no correct answer",
                            i + 1
                        )))
                    }
                }
            }
        }
        LessonContent::Assignment { max_points, .. } => {
            if *max_points == 0 {
                return Err(LyceumError::Validation(
                    "assignment max_points must be positive".into(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuizQuestion;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("ada example@x.io").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("title", "   ").is_err());
        assert!(validate_title("title", &"x".repeat(201)).is_err());
        assert!(validate_title("title", "Ownership").is_ok());
    }

    #[test]
    fn test_validate_quiz_content() {
        let mut quiz = LessonContent::Quiz {
            questions: vec![QuizQuestion {
                prompt: "Pick".into(),
                options: vec!["a".into(), "b".into()],
                correct: Some(1),
            }],
            passing_score: None,
        };
        assert!(validate_content(&quiz).is_ok());

        if let LessonContent::Quiz { questions, .. } = &mut quiz {
            questions[0].correct = Some(2);
        }
        assert!(validate_content(&quiz).is_err());

        assert!(validate_content(&quiz.redacted()).is_err());
    }

    #[test]
    fn test_validate_other_content() {
        assert!(validate_content(&LessonContent::Video {
            url: "ftp://x".into(),
            duration_secs: 10
        })
        .is_err());
        assert!(validate_content(&LessonContent::Assignment {
            instructions: "Do it".into(),
            max_points: 0
        })
        .is_err());
        assert!(validate_content(&LessonContent::Text { body: "Hi".into() }).is_ok());
    }
}
