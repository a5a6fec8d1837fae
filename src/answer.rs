//! Answer composition over retrieved chunks.
//!
//! Turns a question plus a ranked candidate list into a [`ChatResponse`],
//! degrading gracefully through three states:
//!
//! 1. no candidates at all → fixed "nothing found" answer, confidence 0.0;
//! 2. candidates but none above the relevance threshold → the top candidates
//!    with a hedging disclaimer, confidence 0.3;
//! 3. relevant candidates → an LLM-grounded answer when a [`Generator`] is
//!    available (confidence = mean similarity clamped to `[0.6, 0.9]`),
//!    otherwise a deterministic templated answer (confidence 0.5).
//!
//! The template path is pure and fully testable without any live LLM; it is
//! also the fallback whenever a generation call fails or returns a malformed
//! response.

use tracing::warn;

use crate::generate::Generator;
use crate::models::{ChatResponse, SearchResult};

/// Candidates below this cosine similarity are not considered relevant.
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

/// Per-source character budget in the LLM context block.
const CONTEXT_CHARS_PER_SOURCE: usize = 1000;

/// Per-source character budget in the templated fallback answer.
const FALLBACK_CHARS_PER_SOURCE: usize = 300;

const NOT_FOUND_ANSWER: &str = "I couldn't find any relevant information in the \
knowledge base to answer your question. Try asking about topics that are covered \
in the stored learning resources.";

const HEDGE_ANSWER: &str = "I found some content that might be related to your \
question, but it doesn't seem directly relevant. Here's what I found:";

const APOLOGY_ANSWER: &str =
    "Sorry, I encountered an error while processing your question. Please try again.";

/// Compose a response for `question` from ranked `candidates`.
///
/// `candidates` is the over-fetched result list from the retrieval service;
/// threshold filtering and truncation to `max_sources` happen here.
pub async fn compose(
    question: &str,
    candidates: Vec<SearchResult>,
    max_sources: usize,
    generator: Option<&dyn Generator>,
) -> ChatResponse {
    if candidates.is_empty() {
        return ChatResponse {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
            confidence: 0.0,
            query: question.to_string(),
            error: None,
        };
    }

    let mut relevant: Vec<SearchResult> = Vec::new();
    for result in &candidates {
        if result.similarity > RELEVANCE_THRESHOLD {
            relevant.push(result.clone());
        }
        if relevant.len() >= max_sources {
            break;
        }
    }

    if relevant.is_empty() {
        let shown: Vec<SearchResult> = candidates.into_iter().take(max_sources).collect();
        return ChatResponse {
            answer: HEDGE_ANSWER.to_string(),
            sources: shown,
            confidence: 0.3,
            query: question.to_string(),
            error: None,
        };
    }

    let mean_similarity =
        relevant.iter().map(|r| r.similarity).sum::<f64>() / relevant.len() as f64;

    let (answer, confidence) = match generator {
        Some(g) => {
            let answer = match g.complete(&build_prompt(question, &relevant)).await {
                Ok(text) => strip_answer_echo(&text),
                Err(e) => {
                    warn!(error = %e, "generation failed; using templated answer");
                    template_answer(&relevant)
                }
            };
            (answer, mean_similarity.max(0.6).min(0.9))
        }
        None => (template_answer(&relevant), 0.5),
    };

    ChatResponse {
        answer,
        sources: relevant,
        confidence,
        query: question.to_string(),
        error: None,
    }
}

/// Fixed response for an empty or whitespace-only question.
pub fn invalid_question(question: &str) -> ChatResponse {
    ChatResponse {
        answer: "Please provide a valid question.".to_string(),
        sources: Vec::new(),
        confidence: 0.0,
        query: question.to_string(),
        error: Some(crate::error::Error::InvalidQuery.to_string()),
    }
}

/// Fixed apology response for a failure anywhere in the ask pipeline.
pub fn failure(question: &str, error: &crate::error::Error) -> ChatResponse {
    ChatResponse {
        answer: APOLOGY_ANSWER.to_string(),
        sources: Vec::new(),
        confidence: 0.0,
        query: question.to_string(),
        error: Some(error.to_string()),
    }
}

/// Build the instructional prompt grounding the LLM in the kept sources.
fn build_prompt(question: &str, sources: &[SearchResult]) -> String {
    let mut context_parts: Vec<String> = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        context_parts.push(format!(
            "Source {} - {}:\n{}\n",
            i + 1,
            source.chunk.title,
            truncate_chars(&source.chunk.content, CONTEXT_CHARS_PER_SOURCE),
        ));
    }
    let context = context_parts.join("\n");

    format!(
        "You are a helpful AI assistant that answers questions based on learning \
resources. Use the following context to answer the user's question accurately and \
helpfully.\n\n\
Context from Learning Resources:\n{context}\n\n\
Question: {question}\n\n\
Instructions:\n\
- Provide a clear, concise answer based primarily on the given context\n\
- If referencing specific information, mention which source it comes from\n\
- If the context doesn't fully answer the question, be honest about limitations\n\
- Keep the answer focused and practical\n\
- Use a helpful, educational tone\n\
- Format your response in a readable way with proper paragraphs\n\n\
Answer:"
    )
}

/// Deterministic answer built from the kept sources, no LLM involved.
fn template_answer(sources: &[SearchResult]) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.push("Based on the learning resources in my knowledge base:\n".to_string());

    for (i, source) in sources.iter().enumerate() {
        parts.push(format!("**{}. From '{}':**", i + 1, source.chunk.title));
        parts.push(truncate_chars(
            &source.chunk.content,
            FALLBACK_CHARS_PER_SOURCE,
        ));
        parts.push(String::new());
    }

    parts.push("For more detailed information, please refer to the original sources.".to_string());
    parts.join("\n")
}

/// Models often echo the prompt's trailing "Answer:" label; strip it.
fn strip_answer_echo(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.strip_prefix("Answer:") {
        Some(rest) => rest.trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Truncate to `max` characters, appending an ellipsis when content was cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}
