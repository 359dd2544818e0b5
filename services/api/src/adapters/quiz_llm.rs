//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for AI-backed question generation.
//! It implements the `QuizGenerationService` port with the Responses API and falls
//! back to the heuristic generator whenever the model call or its output fails.

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::responses::CreateResponseArgs, Client,
};
use async_trait::async_trait;
use lets_prep_core::{
    domain::{option_index, QuestionType, QuizItem, MAX_QUESTIONS},
    generator::{clean_text, HeuristicQuizGenerator, MCQ_DISTRACTORS},
    ports::{PortError, PortResult, QuizGenerationService},
};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{info, warn};

const SYSTEM_INSTRUCTIONS: &str = "You are an assistant that creates high quality study questions from course notes. Generate clear, concise questions appropriate for college-level studying.";

const USER_INPUT_TEMPLATE: &str = r#"You are given study notes. Generate {count} high-quality {label}
that directly test understanding of the ideas in the notes.

Use this main question style: "{style}" but you may vary exact wording
to make questions clear.

Rules:
- Base EVERY question ONLY on the text below. Do NOT invent facts that are not present.
- Focus on key concepts, definitions, processes, comparisons, and cause-effect.
- For MCQ: provide 1 correct option and 3 plausible but wrong distractors.
- For flashcards: use a short term/phrase on the front and a clear explanation on the back.
- For fill-in-the-blank: hide an important word or short phrase from a sentence.
- For short-answer: ask direct questions answerable in 1-3 sentences.
- Keep language clear and student-friendly.

Return STRICT JSON ONLY, no commentary. The JSON must be a list of question objects.
Each object must have:
- "type": "mcq" | "flashcard" | "fill_blank" | "short_answer"
- "prompt": the question text
- "option_a", "option_b", "option_c", "option_d": strings (empty if not MCQ)
- "correct_option": "A" | "B" | "C" | "D" (empty if not MCQ)
- "answer_text": the correct answer (for flashcards / fill-in / short answers)
- "explanation": a short explanation of why the answer is correct

NOTES:
{notes}"#;

/// Characters of the notes sent to the model.
const PROMPT_NOTES_CHARS: usize = 6000;

const MAX_OUTPUT_TOKENS: u32 = 2048;

//=========================================================================================
// Model Output Parsing
//=========================================================================================

/// One question object as the model returns it. Missing or null fields read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AiQuestion {
    prompt: Option<String>,
    option_a: Option<String>,
    option_b: Option<String>,
    option_c: Option<String>,
    option_d: Option<String>,
    correct_option: Option<String>,
    answer_text: Option<String>,
    explanation: Option<String>,
}

fn field(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// A reply wrapped in a markdown code fence, with or without a language tag.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[\w-]*\s*(.*?)\s*```$").expect("Failed to compile code fence regex")
});

/// Strips a surrounding markdown fence and keeps only the outermost `[...]` region.
fn json_array_region(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());

    match (unfenced.find('['), unfenced.rfind(']')) {
        (Some(start), Some(end)) if end > start => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Validates an MCQ and shuffles its options so the correct answer's position is random.
fn mcq_from<R: Rng + ?Sized>(q: AiQuestion, prompt: String, rng: &mut R) -> Option<QuizItem> {
    let options: Vec<String> = [q.option_a, q.option_b, q.option_c, q.option_d]
        .into_iter()
        .map(field)
        .collect();
    if options.len() != MCQ_DISTRACTORS + 1 || options.iter().any(String::is_empty) {
        return None;
    }
    let distinct: HashSet<String> = options.iter().map(|o| o.to_lowercase()).collect();
    if distinct.len() != options.len() {
        return None;
    }

    let correct = field(q.correct_option)
        .chars()
        .next()
        .and_then(option_index)
        .filter(|i| *i < options.len())?;

    let mut tagged: Vec<(bool, String)> = options
        .into_iter()
        .enumerate()
        .map(|(i, o)| (i == correct, o))
        .collect();
    tagged.shuffle(rng);
    let correct_index = tagged.iter().position(|(is_correct, _)| *is_correct)?;

    Some(QuizItem::Mcq {
        prompt,
        options: tagged.into_iter().map(|(_, o)| o).collect(),
        correct_index,
        explanation: field(q.explanation),
    })
}

/// Turns the model's raw reply into validated items of `question_type`, at most `count`.
/// Items that do not fit the requested type are dropped.
pub fn parse_ai_items<R: Rng + ?Sized>(
    raw: &str,
    question_type: QuestionType,
    count: usize,
    rng: &mut R,
) -> PortResult<Vec<QuizItem>> {
    let json = json_array_region(raw);
    let questions: Vec<AiQuestion> = serde_json::from_str(json)
        .map_err(|e| PortError::Unexpected(format!("model output is not a question list: {}", e)))?;

    let mut items = Vec::new();
    for q in questions {
        let prompt = field(q.prompt.clone());
        if prompt.is_empty() {
            continue;
        }

        let item = match question_type {
            QuestionType::Mcq => mcq_from(q, prompt, rng),
            _ => {
                let answer = field(q.answer_text);
                let explanation = field(q.explanation);
                (!answer.is_empty()).then(|| match question_type {
                    QuestionType::Flashcard => QuizItem::Flashcard { prompt, answer, explanation },
                    QuestionType::FillBlank => QuizItem::FillBlank { prompt, answer, explanation },
                    _ => QuizItem::ShortAnswer { prompt, answer, explanation },
                })
            }
        };
        items.extend(item);
    }

    items.truncate(count.clamp(1, MAX_QUESTIONS));
    if items.is_empty() {
        return Err(PortError::Unexpected(
            "model output contained no usable questions".to_string(),
        ));
    }
    Ok(items)
}

/// Collapses whitespace and shortens to `PROMPT_NOTES_CHARS`, cutting on a word boundary.
fn notes_snippet(text: &str) -> String {
    let collapsed = clean_text(text).split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PROMPT_NOTES_CHARS {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(PROMPT_NOTES_CHARS - 3).collect();
    let cut = cut.rsplit_once(' ').map_or(cut.as_str(), |(head, _)| head);
    format!("{}...", cut)
}

fn prompt_label(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Mcq => "multiple-choice questions",
        QuestionType::Flashcard => "flashcards (term + explanation)",
        QuestionType::FillBlank => "fill-in-the-blank items",
        QuestionType::ShortAnswer => "short-answer questions",
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    fallback: HeuristicQuizGenerator,
}

impl OpenAiQuizAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self {
            client,
            model,
            fallback: HeuristicQuizGenerator::new(),
        }
    }

    async fn generate_with_model(
        &self,
        text: &str,
        question_type: QuestionType,
        count: usize,
    ) -> PortResult<Vec<QuizItem>> {
        let notes = notes_snippet(text);
        if notes.is_empty() {
            return Err(PortError::Unexpected("no text to generate from".to_string()));
        }

        let count = count.clamp(1, MAX_QUESTIONS);
        let user_input = USER_INPUT_TEMPLATE
            .replace("{count}", &count.to_string())
            .replace("{label}", prompt_label(question_type))
            .replace("{style}", question_type.as_str())
            .replace("{notes}", &notes);

        let request = CreateResponseArgs::default()
            .model(&self.model)
            .instructions(SYSTEM_INSTRUCTIONS)
            .input(user_input)
            .max_output_tokens(MAX_OUTPUT_TOKENS)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let raw = response.output_text().unwrap_or_default();
        parse_ai_items(&raw, question_type, count, &mut rand::thread_rng())
    }
}

//=========================================================================================
// `QuizGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizGenerationService for OpenAiQuizAdapter {
    async fn generate_items(
        &self,
        text: &str,
        question_type: QuestionType,
        count: usize,
    ) -> PortResult<Vec<QuizItem>> {
        match self.generate_with_model(text, question_type, count).await {
            Ok(items) => {
                info!("Model generated {} {} items", items.len(), question_type);
                Ok(items)
            }
            Err(e) => {
                warn!("AI question generation failed, using heuristic generator: {}", e);
                self.fallback.generate_items(text, question_type, count).await
            }
        }
    }
}
