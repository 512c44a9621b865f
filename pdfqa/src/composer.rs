//! Grounded answer composition.
//!
//! The [`AnswerComposer`] "stuffs" the retrieved segments into a single
//! prompt together with the question and asks the language model to answer
//! from that context only.
//!
//! The prompt never exceeds `max_context_size` characters. Segments arrive
//! most relevant first, so when the budget runs out the trailing segments
//! are dropped. If even the first segment does not fit it is cut to the
//! remaining budget.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::document::{Answer, Segment};
use crate::error::{QaError, Result};
use crate::llm::{GenerationRequest, LanguageModel};

const INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

const SEPARATOR: &str = "\n\n";

/// A prompt ready to send, with the pages it draws on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// The full prompt text.
    pub text: String,
    /// Pages of the segments included in the prompt, in prompt order.
    pub source_pages: Vec<usize>,
}

/// Build the grounded prompt for `question`, bounded to `max_chars` characters.
///
/// # Errors
///
/// Returns [`QaError::InvalidInput`] if the instructions and question alone
/// exceed `max_chars`.
pub fn build_prompt(question: &str, segments: &[Segment], max_chars: usize) -> Result<Prompt> {
    let header = format!("{INSTRUCTIONS}{SEPARATOR}");
    let footer = format!("{SEPARATOR}Question: {question}\nHelpful Answer:");
    let fixed = header.chars().count() + footer.chars().count();
    if fixed > max_chars {
        return Err(QaError::InvalidInput(format!(
            "question needs {fixed} characters of prompt but max_context_size is {max_chars}"
        )));
    }

    let mut remaining = max_chars - fixed;
    let mut context = String::new();
    let mut source_pages = Vec::new();

    for segment in segments {
        let separator_len = if source_pages.is_empty() { 0 } else { SEPARATOR.len() };
        let text_len = segment.text.chars().count();

        if separator_len + text_len <= remaining {
            if separator_len > 0 {
                context.push_str(SEPARATOR);
            }
            context.push_str(&segment.text);
            source_pages.push(segment.source_page);
            remaining -= separator_len + text_len;
        } else if source_pages.is_empty() && remaining > 0 {
            context.extend(segment.text.chars().take(remaining));
            source_pages.push(segment.source_page);
            warn!(
                page = segment.source_page,
                kept_chars = remaining,
                text_len,
                "truncated context segment"
            );
            break;
        } else {
            break;
        }
    }

    let dropped = segments.len() - source_pages.len();
    if dropped > 0 {
        debug!(dropped, max_chars, "dropped lowest-relevance segments to fit prompt");
    }

    Ok(Prompt { text: format!("{header}{context}{footer}"), source_pages })
}

/// Composes a grounded answer from retrieved segments and a question.
#[derive(Clone)]
pub struct AnswerComposer {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
    max_context_size: usize,
}

impl AnswerComposer {
    /// Create a composer that calls `model` with the given settings.
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32, max_context_size: usize) -> Self {
        Self { model, temperature, max_context_size }
    }

    /// Ask the language model to answer `question` from `context_segments`.
    ///
    /// Segments are used in the given order, which should be most relevant
    /// first. One remote call is made per invocation.
    pub async fn compose(&self, question: &str, context_segments: &[Segment]) -> Result<Answer> {
        let prompt = build_prompt(question, context_segments, self.max_context_size)?;
        let request = GenerationRequest { prompt: prompt.text, temperature: self.temperature };

        let text = self.model.generate(&request).await?;
        info!(
            model = self.model.name(),
            context_segments = prompt.source_pages.len(),
            answer_len = text.len(),
            "composed answer"
        );

        Ok(Answer { text: text.trim().to_string(), source_pages: prompt.source_pages })
    }
}
