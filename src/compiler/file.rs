//! Single-file compilation.
//!
//! ```text
//! text ── preprocess ── SyntaxParser ── lower ── conversations ── triggers ──▶ CompiledScript
//!   └─ blank? ──────────────────────────────────────────────────────────────▶ empty script
//! ```
//!
//! Syntax and pattern errors are fatal for the script; everything else ends
//! up as a [`Diagnostic`](crate::Diagnostic).

use super::conversation::resolve_conversations;
use super::ids::IdGenerator;
use super::lower::lower;
use super::merge::TopicConflict;
use super::trigger::TriggerCompiler;
use crate::syntax::SyntaxParser;
use crate::{CompileError, CompiledScript, SCHEMA_VERSION, SourceError};
use std::time::{Duration, Instant};
use tracing::info;

/// Drop blank lines, trim the rest and end with a newline, so the grammar
/// never sees an unterminated final block.
pub(crate) fn preprocess(text: &str) -> String {
    let mut out = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join("\n");
    out.push('\n');
    out
}

/// Compile one script's text. `scope` seeds identifier generation and is
/// normally the source path; `topics` decides what a repeated topic name does.
pub(crate) async fn compile_text(
    scope: &str,
    text: &str,
    syntax: &dyn SyntaxParser,
    triggers: &TriggerCompiler<'_>,
    topics: TopicConflict,
) -> Result<CompiledScript, SourceError> {
    if text.trim().is_empty() {
        return Ok(CompiledScript::empty());
    }

    let preprocessed = preprocess(text);
    let raw = syntax.parse(&preprocessed).map_err(|err| SourceError::Syntax {
        text: preprocessed.lines().nth(err.line.saturating_sub(1)).unwrap_or_default().to_string(),
        found: err.found,
        message: err.message,
        line: err.line,
    })?;

    let (mut graph, mut diagnostics) = lower(raw, &mut IdGenerator::scoped(scope), topics)?;
    diagnostics.extend(resolve_conversations(&mut graph, triggers)?);
    diagnostics.extend(triggers.compile_all(&mut graph).await?);

    Ok(CompiledScript { version: SCHEMA_VERSION, graph, diagnostics })
}

/// Compile the contents of the file at `path`, attributing errors to it.
pub(crate) async fn compile_source_file(
    path: &str,
    bytes: Vec<u8>,
    syntax: &dyn SyntaxParser,
    triggers: &TriggerCompiler<'_>,
    topics: TopicConflict,
) -> Result<(CompiledScript, Duration), CompileError> {
    let started = Instant::now();
    let text = String::from_utf8(bytes).map_err(|err| CompileError::file(path, err.into()))?;
    let script = compile_text(path, &text, syntax, triggers, topics).await.map_err(|err| CompileError::file(path, err))?;

    let elapsed = started.elapsed();
    info!(path, elapsed = ?elapsed, "processed file");
    Ok((script, elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_trims_and_drops_blank_lines() {
        let text = "  + hello  \n\n\t\n   - hi there\n";
        assert_eq!(preprocess(text), "+ hello\n- hi there\n");
    }

    #[test]
    fn preprocess_always_ends_with_a_newline() {
        assert_eq!(preprocess("+ a\n- b"), "+ a\n- b\n");
    }
}
