//! Conversation (continuation) resolution.
//!
//! A gambit with a conversation pattern may only fire right after one of the
//! bot's own replies. Resolution turns the pattern into the concrete set of
//! reply identifiers it may follow:
//!
//! ```text
//! % hello there   ──▶  (?i)^hello there\s*[?!.]*$  ──▶ tested against every reply
//! ```
//!
//! Every reply of the script is tested, whatever its topic, and all matches
//! are kept. A pattern matching nothing leaves an empty set: the gambit is
//! unreachable, which is worth a warning but not a compile failure.
//!
//! Cost is `gambits with a conversation × replies`, fine at script scale.

use super::trigger::TriggerCompiler;
use crate::{Diagnostic, ScriptGraph, SourceError};
use regex::RegexBuilder;
use tracing::warn;

pub(crate) fn resolve_conversations(
    graph: &mut ScriptGraph,
    triggers: &TriggerCompiler<'_>,
) -> Result<Vec<Diagnostic>, SourceError> {
    let mut diagnostics = Vec::new();
    let ScriptGraph { gambits, replies, .. } = graph;

    for gambit in gambits.values_mut() {
        let Some(conversation) = gambit.conversation.as_mut() else {
            continue;
        };

        let clean = triggers.clean(&conversation.raw)?;
        // Trailing punctuation is allowed so "hello there" still matches "Hello there!".
        let pattern = match RegexBuilder::new(&format!(r"^{clean}\s*[?!.]*$")).case_insensitive(true).build() {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(gambit = %gambit.id, pattern = %conversation.raw, %err, "conversation pattern does not compile");
                diagnostics.push(Diagnostic::InvalidConversationPattern {
                    gambit: gambit.id.clone(),
                    pattern: conversation.raw.clone(),
                    message: err.to_string(),
                });
                conversation.clean = Some(clean);
                conversation.replies.clear();
                continue;
            }
        };

        conversation.replies = replies.values().filter(|r| pattern.is_match(&r.text)).map(|r| r.id.clone()).collect();
        conversation.clean = Some(clean);

        if conversation.replies.is_empty() {
            warn!(gambit = %gambit.id, pattern = %conversation.raw, "no reply found for conversation");
            diagnostics.push(Diagnostic::UnresolvedConversation {
                gambit: gambit.id.clone(),
                pattern: conversation.raw.clone(),
            });
        }
    }

    Ok(diagnostics)
}
