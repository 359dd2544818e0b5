//! crates/lets_prep_core/src/generator.rs
//!
//! The offline, pattern-based question generator. It slices the source text into
//! sentences and turns each one into a study item of the requested type.

use async_trait::async_trait;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use std::collections::HashSet;

use crate::domain::{QuestionType, QuizItem, MAX_QUESTIONS};
use crate::ports::{PortResult, QuizGenerationService};

/// Source text with fewer alphanumeric characters than this is not worth generating from.
pub const MIN_SOURCE_CHARS: usize = 20;

/// Only this many characters of the source text are considered.
pub const MAX_SOURCE_CHARS: usize = 8000;

/// Every MCQ carries exactly this many wrong options next to the correct one.
pub const MCQ_DISTRACTORS: usize = 3;

/// Sentences longer than this are split into a stem and a concept for MCQs.
const MCQ_SPLIT_WORDS: usize = 10;

/// Longest term (in words) accepted as the front of a definitional flashcard.
const MAX_TERM_WORDS: usize = 6;

pub const BLANK: &str = "_____";

const STOP_WORDS: &[&str] = &[
    "the", "and", "of", "a", "an", "to", "in", "on", "is", "are", "was", "were", "for", "with",
    "as", "by", "or", "it", "its", "that", "this", "be",
];

const GENERIC_DISTRACTORS: [&str; 4] = [
    "A detail that does not fully match the notes.",
    "A statement that contradicts the notes.",
    "An unrelated concept.",
    "None of the ideas covered in the notes.",
];

const MCQ_EXPLANATION: &str =
    "The correct option is the one that best matches the idea in your notes.";

/// Normalises line endings, trims, and truncates to `MAX_SOURCE_CHARS` characters.
pub fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .trim()
        .chars()
        .take(MAX_SOURCE_CHARS)
        .collect()
}

/// Whether `text` is long enough that generation is guaranteed to produce an item.
pub fn meets_minimum_length(text: &str) -> bool {
    text.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_SOURCE_CHARS
}

/// Splits text into whitespace-collapsed sentences, dropping fragments without any
/// alphanumeric content and exact duplicates.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| c == '.' || c == '?' || c == '!')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// The generator used when no AI backend is configured, and as the AI fallback.
#[derive(Debug, Clone, Default)]
pub struct HeuristicQuizGenerator;

impl HeuristicQuizGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generates up to `count` items (clamped to `1..=MAX_QUESTIONS`).
    pub fn generate(&self, text: &str, question_type: QuestionType, count: usize) -> Vec<QuizItem> {
        self.generate_with_rng(text, question_type, count, &mut rand::thread_rng())
    }

    /// Same as [`generate`](Self::generate) with a caller-supplied random source.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        question_type: QuestionType,
        count: usize,
        rng: &mut R,
    ) -> Vec<QuizItem> {
        let sentences = split_sentences(&clean_text(text));
        if sentences.is_empty() {
            return Vec::new();
        }

        let count = count.clamp(1, MAX_QUESTIONS);
        let concepts: Vec<String> = sentences.iter().map(|s| split_stem(s).1).collect();

        let mut items = Vec::with_capacity(count);
        let mut seen = HashSet::new();

        // Cycle over the sentences; exact repeats of an earlier item are discarded.
        for attempt in 0..count * 3 {
            if items.len() == count {
                break;
            }
            let index = attempt % sentences.len();
            let sentence = &sentences[index];

            let item = match question_type {
                QuestionType::Flashcard => flashcard(sentence),
                QuestionType::Mcq => multiple_choice(sentence, index, &concepts, rng),
                QuestionType::FillBlank => fill_blank(sentence, rng),
                QuestionType::ShortAnswer => short_answer(sentence),
            };

            if seen.insert((item.prompt().to_string(), item.answer().to_string())) {
                items.push(item);
            }
        }

        items
    }
}

#[async_trait]
impl QuizGenerationService for HeuristicQuizGenerator {
    async fn generate_items(
        &self,
        text: &str,
        question_type: QuestionType,
        count: usize,
    ) -> PortResult<Vec<QuizItem>> {
        Ok(self.generate(text, question_type, count))
    }
}

//=========================================================================================
// Per-type item builders
//=========================================================================================

fn flashcard(sentence: &str) -> QuizItem {
    let prompt = match definitional_term(sentence) {
        Some(term) => format!("Define: {}", term),
        None => format!("What is the key idea in this statement?\n\n{}", sentence),
    };
    QuizItem::Flashcard {
        prompt,
        answer: sentence.to_string(),
        explanation: String::new(),
    }
}

/// Finds `<term> is|are <definition>` or `<term>: <definition>` shapes.
fn definitional_term(sentence: &str) -> Option<&str> {
    let split_at = [": ", " is ", " are "]
        .iter()
        .filter_map(|marker| sentence.find(marker).map(|pos| (pos, marker.len())))
        .min_by_key(|(pos, _)| *pos)?;

    let (term, rest) = (sentence[..split_at.0].trim(), sentence[split_at.0 + split_at.1..].trim());
    let term_words = term.split_whitespace().count();
    if term_words == 0 || term_words > MAX_TERM_WORDS || rest.is_empty() {
        return None;
    }
    Some(term)
}

/// Splits a long sentence into (stem, concept) halves; short sentences are their own concept.
fn split_stem(sentence: &str) -> (Option<String>, String) {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.len() > MCQ_SPLIT_WORDS {
        let mid = words.len() / 2;
        (Some(words[..mid].join(" ")), words[mid..].join(" "))
    } else {
        (None, sentence.to_string())
    }
}

fn multiple_choice<R: Rng + ?Sized>(
    sentence: &str,
    index: usize,
    concepts: &[String],
    rng: &mut R,
) -> QuizItem {
    let (stem, concept) = split_stem(sentence);
    let prompt = match stem {
        Some(stem) => format!(
            "According to your notes, which statement best completes this idea?\n\n{} ...",
            stem
        ),
        None => "Which of these statements appears in your notes?".to_string(),
    };

    // Candidates are the concepts of the other sentences, deduplicated.
    let mut pool_seen = HashSet::new();
    let pool = concepts
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != index && **c != concept)
        .map(|(_, c)| c.as_str())
        .filter(|c| pool_seen.insert(*c));

    let mut distractors: Vec<String> = pool
        .choose_multiple(rng, MCQ_DISTRACTORS)
        .into_iter()
        .map(str::to_string)
        .collect();

    for generic in GENERIC_DISTRACTORS {
        if distractors.len() == MCQ_DISTRACTORS {
            break;
        }
        if generic != concept && !distractors.iter().any(|d| d == generic) {
            distractors.push(generic.to_string());
        }
    }

    let mut options = Vec::with_capacity(MCQ_DISTRACTORS + 1);
    options.push(concept.clone());
    options.extend(distractors);
    options.shuffle(rng);

    let correct_index = options.iter().position(|o| *o == concept).unwrap_or(0);

    QuizItem::Mcq {
        prompt,
        options,
        correct_index,
        explanation: MCQ_EXPLANATION.to_string(),
    }
}

fn word_core(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_stop_word(core: &str) -> bool {
    STOP_WORDS.contains(&core.to_lowercase().as_str())
}

fn fill_blank<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> QuizItem {
    let words: Vec<&str> = sentence.split_whitespace().collect();

    let content_word = (0..words.len())
        .filter(|&i| {
            let core = word_core(words[i]);
            !core.is_empty() && !is_stop_word(core)
        })
        .choose(rng);

    // Sentences always hold an alphanumeric word, so the fallback finds one.
    let hidden = content_word.or_else(|| {
        (0..words.len())
            .rev()
            .find(|&i| !word_core(words[i]).is_empty())
    });

    let Some(hidden) = hidden else {
        return short_answer(sentence);
    };

    let answer = word_core(words[hidden]).to_string();
    // Repeated words are blanked at their first occurrence.
    let hidden = words
        .iter()
        .position(|w| word_core(w) == answer)
        .unwrap_or(hidden);
    let prompt_words: Vec<String> = words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            if i == hidden {
                w.replacen(answer.as_str(), BLANK, 1)
            } else {
                w.to_string()
            }
        })
        .collect();

    QuizItem::FillBlank {
        prompt: format!("Fill in the missing word:\n\n{}", prompt_words.join(" ")),
        answer,
        explanation: format!("The complete statement reads: {}", sentence),
    }
}

fn short_answer(sentence: &str) -> QuizItem {
    QuizItem::ShortAnswer {
        prompt: format!("In your own words, explain the following:\n\n{}", sentence),
        answer: sentence.to_string(),
        explanation: String::new(),
    }
}
