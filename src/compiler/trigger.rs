//! Trigger compilation.
//!
//! A raw trigger goes through three steps:
//!
//! ```text
//! raw ── canonicalize ──▶ text ── PatternGrammar ──▶ clean ── expand ~concepts ──▶ clean'
//!        (normalize.rs)           (pattern.rs)                (this module)
//! ```
//!
//! Concept expansion replaces each `~word` (and the whitespace around it) with
//! a word-boundary-anchored alternation of the word's synonyms plus the word
//! itself:
//!
//! ```text
//! i like ~animal  ──▶  i like(?=^|\s)\s*(cat|dog|animal)(?=\s|$)\s*
//! ```
//!
//! Matches are collected first, all lookups run concurrently, and the string
//! is reassembled once in textual order, so one trigger's substitutions can
//! never interleave.

use super::concepts::ConceptExpander;
use crate::syntax::{PatternGrammar, canonicalize};
use crate::{Diagnostic, Id, ScriptGraph, SourceError};
use futures::future::{join_all, try_join_all};
use std::ops::Range;
use tracing::debug;

/// A trigger's compiled pattern plus the concepts that had no expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTrigger {
    pub clean: String,
    pub unexpanded: Vec<String>,
}

pub struct TriggerCompiler<'a> {
    grammar: &'a dyn PatternGrammar,
    concepts: &'a ConceptExpander,
}

impl<'a> TriggerCompiler<'a> {
    pub fn new(grammar: &'a dyn PatternGrammar, concepts: &'a ConceptExpander) -> Self {
        TriggerCompiler { grammar, concepts }
    }

    /// Grammar step only; used for conversation patterns, which are not
    /// normalized or concept-expanded.
    pub fn clean(&self, raw: &str) -> Result<String, SourceError> {
        self.grammar
            .parse(raw)
            .map(|p| p.clean)
            .map_err(|err| SourceError::Pattern { pattern: raw.to_string(), message: err.to_string() })
    }

    pub async fn compile(&self, raw: &str) -> Result<CompiledTrigger, SourceError> {
        let clean = self.clean(&canonicalize(raw))?;
        Ok(self.expand(&clean).await)
    }

    /// Substitute every `~word` in `clean`.
    pub async fn expand(&self, clean: &str) -> CompiledTrigger {
        let matches: Vec<(Range<usize>, &str)> = regex!(r"\s*~(\w+)\s*")
            .captures_iter(clean)
            .filter_map(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str())))
            .collect();

        if matches.is_empty() {
            return CompiledTrigger { clean: clean.to_string(), unexpanded: Vec::new() };
        }

        let expansions = join_all(matches.iter().map(|(_, word)| self.concepts.expand(word))).await;

        let mut out = String::with_capacity(clean.len());
        let mut unexpanded = Vec::new();
        let mut last = 0;
        for ((span, word), synonyms) in matches.iter().zip(expansions) {
            out.push_str(&clean[last..span.start]);
            if synonyms.is_empty() {
                debug!(concept = word, "creating a trigger with a concept not expanded");
                out.push_str(&clean[span.clone()]);
                unexpanded.push(word.to_string());
            } else {
                out.push_str(&alternation(synonyms, word));
            }
            last = span.end;
        }
        out.push_str(&clean[last..]);

        CompiledTrigger { clean: out, unexpanded }
    }

    /// Compile every gambit trigger in `graph`. Replies are left alone.
    ///
    /// Gambits are compiled concurrently; each writes only its own trigger.
    pub async fn compile_all(&self, graph: &mut ScriptGraph) -> Result<Vec<Diagnostic>, SourceError> {
        let pending: Vec<(Id, String)> = graph
            .gambits
            .values()
            .filter_map(|g| g.trigger.as_ref().map(|t| (g.id.clone(), t.raw.clone())))
            .collect();

        let compiled = try_join_all(pending.iter().map(|(_, raw)| self.compile(raw))).await?;

        let mut diagnostics = Vec::new();
        for ((id, _), result) in pending.into_iter().zip(compiled) {
            diagnostics.extend(
                result.unexpanded.iter().map(|c| Diagnostic::ConceptNotExpanded { gambit: id.clone(), concept: c.clone() }),
            );
            if let Some(trigger) = graph.gambits.get_mut(&id).and_then(|g| g.trigger.as_mut()) {
                trigger.clean = Some(result.clean);
            }
        }
        Ok(diagnostics)
    }
}

fn alternation(synonyms: Vec<String>, word: &str) -> String {
    let mut alts: Vec<String> = Vec::with_capacity(synonyms.len() + 1);
    for w in synonyms.into_iter().chain(std::iter::once(word.to_string())) {
        let w = regex::escape(w.trim());
        if !w.is_empty() && !alts.contains(&w) {
            alts.push(w);
        }
    }
    format!(r"(?=^|\s)\s*({})(?=\s|$)\s*", alts.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::concepts::InMemoryConcepts;
    use crate::syntax::TriggerGrammar;
    use std::sync::Arc;

    fn expander() -> ConceptExpander {
        let facts = InMemoryConcepts::new().with("animal", &["cat", "dog"]).with("color", &["red", "blue"]);
        ConceptExpander::new(Some(Arc::new(facts)), None)
    }

    #[tokio::test]
    async fn expands_concepts_into_alternations() {
        let concepts = expander();
        let compiler = TriggerCompiler::new(&TriggerGrammar, &concepts);

        let out = compiler.compile("I like ~animal").await.unwrap();
        assert_eq!(out.clean, r"i like(?=^|\s)\s*(cat|dog|animal)(?=\s|$)\s*");
        assert!(out.unexpanded.is_empty());
    }

    #[tokio::test]
    async fn triggers_without_concepts_keep_the_grammar_output() {
        let concepts = expander();
        let compiler = TriggerCompiler::new(&TriggerGrammar, &concepts);

        for raw in ["hello there", "what is your name?", "i am *1 years old", "(hi|hey) [bot]"] {
            let expected = TriggerGrammar.parse(&canonicalize(raw)).unwrap().clean;
            assert_eq!(compiler.compile(raw).await.unwrap().clean, expected, "trigger: {raw}");
        }
    }

    #[tokio::test]
    async fn substitutions_follow_textual_order() {
        let concepts = expander();
        let compiler = TriggerCompiler::new(&TriggerGrammar, &concepts);

        let out = compiler.compile("~color ~animal").await.unwrap();
        let red = out.clean.find("red|blue|color").unwrap();
        let cat = out.clean.find("cat|dog|animal").unwrap();
        assert!(red < cat);
    }

    #[tokio::test]
    async fn unknown_concepts_are_left_verbatim() {
        let concepts = expander();
        let compiler = TriggerCompiler::new(&TriggerGrammar, &concepts);

        let out = compiler.compile("i like ~vehicle a lot").await.unwrap();
        assert_eq!(out.clean, "i like ~vehicle a lot");
        assert_eq!(out.unexpanded, vec!["vehicle".to_string()]);
    }

    #[tokio::test]
    async fn bad_patterns_are_reported_with_their_text() {
        let concepts = expander();
        let compiler = TriggerCompiler::new(&TriggerGrammar, &concepts);

        let err = compiler.compile("hello (there").await.unwrap_err();
        assert!(err.to_string().contains("hello (there"));
    }
}
