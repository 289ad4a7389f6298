//! Quiz scoring and course grade aggregation

use crate::error::{LyceumError, Result};
use crate::types::QuizQuestion;
use serde::{Deserialize, Serialize};

/// Default pass mark for quizzes that do not set their own
pub const DEFAULT_PASSING_SCORE: u8 = 70;

/// Outcome of scoring one set of answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub score: u8,
    pub passed: bool,
}

/// Score answers against a quiz's answer key.
///
/// The answer vector must have one entry per question. An empty quiz scores
/// 100 and passes.
pub fn score_quiz(questions: &[QuizQuestion], answers: &[usize], passing_score: u8) -> Result<QuizScore> {
    if answers.len() != questions.len() {
        return Err(LyceumError::Validation(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct == Some(**a))
        .count();

    let score = if questions.is_empty() {
        100
    } else {
        ((100.0 * correct as f64) / questions.len() as f64).round() as u8
    };

    Ok(QuizScore {
        correct,
        total: questions.len(),
        score,
        passed: score >= passing_score,
    })
}

/// Reject scores outside `0..=max_points`
pub fn validate_score(score: u32, max_points: u32) -> Result<()> {
    if score > max_points {
        return Err(LyceumError::Validation(format!(
            "score {} exceeds maximum of {} points",
            score, max_points
        )));
    }
    Ok(())
}

/// Letter band for a percentage
pub fn letter_grade(percent: f64) -> char {
    match percent {
        p if p >= 90.0 => 'A',
        p if p >= 80.0 => 'B',
        p if p >= 70.0 => 'C',
        p if p >= 60.0 => 'D',
        _ => 'F',
    }
}

/// Aggregated grade for one student in one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseGrade {
    /// Mean of the graded item percentages, one decimal place
    pub percent: f64,
    pub letter: char,
    /// Number of graded items that contributed
    pub items: usize,
}

/// Average per-item percentages into a course grade; None when nothing is graded
pub fn course_grade(item_percents: &[f64]) -> Option<CourseGrade> {
    if item_percents.is_empty() {
        return None;
    }
    let mean = item_percents.iter().sum::<f64>() / item_percents.len() as f64;
    let percent = (mean * 10.0).round() / 10.0;
    Some(CourseGrade {
        percent,
        letter: letter_grade(percent),
        items: item_percents.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> QuizQuestion {
        QuizQuestion {
            prompt: "?".to_string(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct: Some(correct),
        }
    }

    #[test]
    fn test_score_quiz_all_correct() {
        let qs = vec![question(0), question(2)];
        let s = score_quiz(&qs, &[0, 2], DEFAULT_PASSING_SCORE).unwrap();
        assert_eq!(s.score, 100);
        assert!(s.passed);
    }

    #[test]
    fn test_score_quiz_partial() {
        let qs = vec![question(0), question(1), question(2)];
        let s = score_quiz(&qs, &[0, 1, 0], DEFAULT_PASSING_SCORE).unwrap();
        assert_eq!(s.correct, 2);
        assert_eq!(s.score, 67);
        assert!(!s.passed);

        let s = score_quiz(&qs, &[0, 1, 0], 60).unwrap();
        assert!(s.passed);
    }

    #[test]
    fn test_score_quiz_answer_count_mismatch() {
        let qs = vec![question(0), question(1)];
        assert!(matches!(
            score_quiz(&qs, &[0], DEFAULT_PASSING_SCORE),
            Err(LyceumError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_score() {
        assert!(validate_score(0, 10).is_ok());
        assert!(validate_score(10, 10).is_ok());
        assert!(validate_score(11, 10).is_err());
    }

    #[test]
    fn test_letter_grades() {
        assert_eq!(letter_grade(95.0), 'A');
        assert_eq!(letter_grade(80.0), 'B');
        assert_eq!(letter_grade(79.9), 'C');
        assert_eq!(letter_grade(60.0), 'D');
        assert_eq!(letter_grade(12.0), 'F');
    }

    #[test]
    fn test_course_grade() {
        assert!(course_grade(&[]).is_none());

        let grade = course_grade(&[100.0, 80.0, 75.0]).unwrap();
        assert_eq!(grade.percent, 85.0);
        assert_eq!(grade.letter, 'B');
        assert_eq!(grade.items, 3);
    }
}
