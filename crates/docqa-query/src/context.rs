//! Prompt and context assembly.

use docqa_core::{ChatMessage, RetrievalResult, SourceCitation};
use std::collections::HashSet;

/// Instruction preamble sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided document context.

Rules:
- Answer ONLY based on the provided context chunks
- If the context doesn't contain enough information, say so clearly
- Be concise and accurate
- Cite which document the information comes from when relevant
- Use markdown formatting for better readability";

/// Answer returned when a workspace has nothing indexed.
pub const NO_DOCUMENTS_ANSWER: &str =
    "No documents found in this workspace. Please upload some documents first.";

/// Separator between context sections.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Maximum preview length in characters, before the ellipsis.
pub const PREVIEW_CHARS: usize = 200;

/// Render retrieved chunks as labeled sections in rank order.
#[must_use]
pub fn build_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Source {} - {}]\n{}", i + 1, r.filename, r.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// User message combining the context block and the question.
#[must_use]
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Context from documents:\n\n{context}\n\n---\n\nQuestion: {query}\n\nAnswer based on the context above:"
    )
}

/// System and user messages for a grounded answer.
#[must_use]
pub fn build_messages(results: &[RetrievalResult], query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_prompt(&build_context(results), query)),
    ]
}

/// One citation per `(doc_id, chunk_index)`, first occurrence wins.
#[must_use]
pub fn dedup_sources(results: &[RetrievalResult]) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert((r.doc_id.as_str(), r.chunk_index)))
        .map(|r| SourceCitation {
            filename: r.filename.clone(),
            doc_id: r.doc_id.clone(),
            chunk_index: r.chunk_index,
            score: r.score,
            preview: preview(&r.text),
        })
        .collect()
}

/// First 200 characters of `text`, with `...` appended when cut.
#[must_use]
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
