//! crates/lets_prep_core/src/grading.rs
//!
//! Checks a learner's responses against generated quiz items.

use crate::domain::{option_index, QuizItem};

/// Lowercases, drops punctuation and collapses whitespace so that
/// `"  The Nucleus. "` and `"the nucleus"` compare equal.
pub fn normalize_answer(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an MCQ response to an option index. Accepts a letter (`"b"`),
/// a 1-based number (`"2"`) or the option text itself.
fn resolve_option(options: &[String], response: &str) -> Option<usize> {
    let trimmed = response.trim();

    let mut chars = trimmed.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() {
            return option_index(letter).filter(|i| *i < options.len());
        }
    }

    if let Ok(number) = trimmed.parse::<usize>() {
        return number.checked_sub(1).filter(|i| *i < options.len());
    }

    let wanted = normalize_answer(trimmed);
    options
        .iter()
        .position(|option| normalize_answer(option) == wanted)
}

/// Whether `response` is a correct answer for `item`.
pub fn grade_response(item: &QuizItem, response: &str) -> bool {
    match item {
        QuizItem::Mcq {
            options,
            correct_index,
            ..
        } => resolve_option(options, response) == Some(*correct_index),
        _ => {
            let given = normalize_answer(response);
            !given.is_empty() && given == normalize_answer(item.answer())
        }
    }
}

/// The tally of a graded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

impl QuizScore {
    pub fn tally<I: IntoIterator<Item = bool>>(results: I) -> Self {
        results.into_iter().fold(Self::default(), |score, ok| Self {
            correct: score.correct + usize::from(ok),
            total: score.total + 1,
        })
    }

    /// Whole-number percentage, rounded down. An empty attempt scores 0.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.correct * 100 / self.total) as u32
    }
}
