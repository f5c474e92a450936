//! Script compilation pipeline.
//!
//! Everything between "a parsed script" and "a knowledge base the dialogue
//! runtime can load" lives here, split into submodules under
//! `src/compiler/`.
//!
//! ## How the parts work together
//!
//! ```text
//! root ── discover + checksum (directory.rs) ── unchanged files ──────────────┐
//!                  │                                                         │
//!                  v changed files, compiled concurrently                    │
//!        ┌──────────────── compile_source_file (file.rs) ────────────────┐   │
//!        │ SyntaxParser ──▶ RawScript                                     │   │
//!        │     lower (lower.rs + ids.rs)       topics/gambits/replies     │   │
//!        │     resolve_conversations (conversation.rs)                    │   │
//!        │     TriggerCompiler::compile_all (trigger.rs + concepts.rs)    │   │
//!        └──────────────────────────────┬─────────────────────────────────┘   │
//!                                       v                                     │
//!                        ScriptGraph::absorb (merge.rs)                       │
//!                                       │                                     │
//!                                       v                                     v
//!                              KnowledgeBase (or empty)  +  checksum table ◀──┘
//! ```
//!
//! ## Responsibilities by module
//!
//! - `concepts.rs`: the concept source traits and the caching adapter over
//!   them ([`ConceptExpander`]).
//! - `trigger.rs`: canonicalizes triggers and expands `~concept` references.
//! - `ids.rs`: deterministic, content-addressed identifiers.
//! - `lower.rs`: turns a [`RawScript`](crate::RawScript) into a
//!   [`ScriptGraph`](crate::ScriptGraph).
//! - `conversation.rs`: resolves continuation patterns to reply identifiers.
//! - `file.rs`: runs the steps above for one script.
//! - `directory.rs`: enumeration, change detection, concurrency and the final
//!   empty-or-complete decision.
//! - `merge.rs`: typed union of per-file graphs.
//! - `metrics.rs`: timings returned with every directory run.
//!
//! Recoverable problems never stop the pipeline; they are logged through
//! `tracing` and returned as [`Diagnostic`](crate::Diagnostic)s.

#[path = "compiler/concepts.rs"]
mod concepts;
#[path = "compiler/conversation.rs"]
mod conversation;
#[path = "compiler/directory.rs"]
mod directory;
#[path = "compiler/file.rs"]
mod file;
#[path = "compiler/ids.rs"]
mod ids;
#[path = "compiler/lower.rs"]
mod lower;
#[path = "compiler/merge.rs"]
mod merge;
#[path = "compiler/metrics.rs"]
mod metrics;
#[path = "compiler/trigger.rs"]
mod trigger;


pub use concepts::{ConceptError, ConceptExpander, FactSystem, InMemoryConcepts, SynonymDictionary};
pub use directory::ChecksumCache;
pub use merge::TopicConflict;
pub use metrics::{FileMetrics, RunMetrics};

pub(crate) use directory::{compile_directory, rebuild_directory};
pub(crate) use file::{compile_source_file, compile_text};
pub(crate) use trigger::TriggerCompiler;
