//! Default front-end collaborators.
//!
//! The compiler only talks to these through the [`SyntaxParser`] and
//! [`PatternGrammar`] traits, so an embedding application can swap in its own
//! grammar without touching the pipeline:
//!
//! ```text
//! script text ── preprocess ── SyntaxParser::parse ──▶ RawScript
//! trigger text ── canonicalize ── PatternGrammar::parse ──▶ CanonicalPattern
//! ```
//!
//! - `script.rs`: the line-oriented script dialect.
//! - `pattern.rs`: wildcard/alternation syntax → regex dialect.
//! - `normalize.rs`: case, contraction and punctuation folding for triggers.

pub mod normalize;
pub mod pattern;
pub mod script;

#[cfg(test)]
mod tests;

pub use normalize::canonicalize;
pub use pattern::{CanonicalPattern, PatternError, PatternGrammar, TriggerGrammar};
pub use script::{ScriptParser, SyntaxError, SyntaxParser};
