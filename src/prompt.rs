//! Context assembly and conversational grounding policy.
//!
//! Everything that shapes the generation model's view of the world lives
//! here: joining retrieved passages into one bounded context block, the
//! sentinel for "nothing relevant was found", the strict grounding
//! instruction with its fixed refusal sentence, and the sanitization of
//! externally-supplied conversation history into the closed
//! `{role, content}` shape.

use serde_json::Value;

use crate::models::{Message, Role};

/// Separator placed between retrieved passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Fixed sentinel used when retrieval returns nothing. It is fed into the
/// system instruction so the model can say so instead of hallucinating.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant documents were found in the knowledge base.";

/// Fixed refusal sentence the model must use when the answer is absent
/// from the supplied context.
pub const REFUSAL_SENTENCE: &str = "that information is not in my current knowledge base";

/// Number of trailing conversation messages kept when building a prompt.
///
/// Older turns are dropped so the model cannot lean on knowledge about
/// documents that may since have been deleted from the store. This is a
/// staleness-avoidance policy, not a token-limit optimization.
pub const HISTORY_WINDOW: usize = 4;

/// Join retrieved passages into a single context block.
///
/// An empty list produces [`NO_CONTEXT_SENTINEL`] rather than an empty
/// string, so downstream prompting always has something explicit to point
/// the model at.
pub fn build_context(retrieved: &[String]) -> String {
    if retrieved.is_empty() {
        NO_CONTEXT_SENTINEL.to_string()
    } else {
        retrieved.join(CONTEXT_SEPARATOR)
    }
}

/// Reduce arbitrary external message records to normalized [`Message`]s.
///
/// Keeps only the most recent [`HISTORY_WINDOW`] entries. Role values are
/// folded into the closed set via [`Role::normalize`]; content is coerced
/// to a plain string whatever shape it arrived in. Extra fields on the
/// records (client-side ids, version markers) are dropped here and never
/// reach the generation client.
pub fn sanitize_history(raw: &[Value]) -> Vec<Message> {
    let start = raw.len().saturating_sub(HISTORY_WINDOW);
    raw[start..]
        .iter()
        .map(|record| {
            let role = record
                .get("role")
                .and_then(Value::as_str)
                .map(Role::normalize)
                .unwrap_or(Role::User);
            let content = match record.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Message { role, content }
        })
        .collect()
}

/// Build the system instruction that tethers the model to `context`.
///
/// The instruction demands answers drawn strictly from the context block
/// and prescribes the fixed refusal sentence for anything outside it.
/// Callers pair this with near-deterministic decoding.
pub fn build_system_instruction(context: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions about an organization's documents.\n\
         Answer the question using ONLY the context below.\n\
         If the answer is not contained in the context, reply exactly: \"{REFUSAL_SENTENCE}\".\n\
         Do not use outside knowledge and do not speculate.\n\
         \n\
         CONTEXT FROM DOCUMENTS:\n\
         {context}"
    )
}
