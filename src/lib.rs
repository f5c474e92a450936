use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[macro_use]
mod macros;
mod api;
mod compiler;
mod error;
pub mod syntax;

pub use api::{
    CompiledDirectory, FailurePolicy, FileFailure, Options, Rebuild, compile_directory, compile_file, compile_source,
    normalize_trigger, rebuild_directory,
};
pub use compiler::{ChecksumCache, ConceptExpander, FileMetrics, RunMetrics, TopicConflict};
pub use compiler::{ConceptError, FactSystem, InMemoryConcepts, SynonymDictionary};
pub use error::{CompileError, SourceError};

/// Knowledge base format version. Bump on any breaking change to the
/// persisted shape; the dialogue runtime refuses versions it does not know.
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the topic that collects gambits declared outside any topic.
pub const RANDOM_TOPIC: &str = "random";

// --- Raw syntax tree (Syntax Parser output) ---------------------------------

/// One parsed script file before lowering.
///
/// `gambits` holds the topic-less gambits; lowering moves them into the
/// [`RANDOM_TOPIC`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawScript {
    pub topics: Vec<RawTopic>,
    pub gambits: Vec<RawGambit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTopic {
    pub name: String,
    pub flags: BTreeMap<String, String>,
    pub keywords: Vec<String>,
    pub filter: Option<String>,
    pub gambits: Vec<RawGambit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGambit {
    pub trigger: Option<String>,
    /// Empty for redirect-only gambits.
    pub replies: Vec<String>,
    /// Continuation pattern: the gambit only fires after a reply matching it.
    pub conversation: Option<String>,
    pub redirect: Option<String>,
}

// --- Lowered graph -----------------------------------------------------------

/// Opaque 8-character handle for a gambit or reply.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_string())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub flags: BTreeMap<String, String>,
    pub keywords: Vec<String>,
    pub filter: Option<String>,
    pub gambits: Vec<Id>,
}

/// Persisted as [`GambitRecord`]: `conversation` is the bare list of reply
/// identifiers the runtime checks, and the pattern it came from is kept
/// beside it under `conversation_pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "GambitRecord", from = "GambitRecord")]
pub struct Gambit {
    pub id: Id,
    /// Back-reference to the owning topic's name.
    pub topic: String,
    pub trigger: Option<Trigger>,
    pub replies: Vec<Id>,
    pub conversation: Option<Conversation>,
    pub redirect: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct GambitRecord {
    id: Id,
    topic: String,
    trigger: Option<Trigger>,
    replies: Vec<Id>,
    conversation: Option<Vec<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversation_pattern: Option<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
}

impl From<Gambit> for GambitRecord {
    fn from(g: Gambit) -> Self {
        let (conversation, conversation_pattern) = match g.conversation {
            Some(c) => (Some(c.replies), Some(Trigger { raw: c.raw, clean: c.clean })),
            None => (None, None),
        };
        GambitRecord {
            id: g.id,
            topic: g.topic,
            trigger: g.trigger,
            replies: g.replies,
            conversation,
            conversation_pattern,
            redirect: g.redirect,
        }
    }
}

impl From<GambitRecord> for Gambit {
    fn from(r: GambitRecord) -> Self {
        let conversation = match (r.conversation, r.conversation_pattern) {
            (None, None) => None,
            (replies, pattern) => {
                let Trigger { raw, clean } = pattern.unwrap_or_else(|| Trigger::new(""));
                Some(Conversation { raw, clean, replies: replies.unwrap_or_default() })
            }
        };
        Gambit {
            id: r.id,
            topic: r.topic,
            trigger: r.trigger,
            replies: r.replies,
            conversation,
            redirect: r.redirect,
        }
    }
}

/// A trigger as written (`raw`) and as compiled (`clean`).
///
/// `clean` is filled in by the trigger compiler; it is a pattern meant to be
/// compiled case-insensitively by the dialogue runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<String>,
}

impl Trigger {
    pub fn new(raw: impl Into<String>) -> Self {
        Trigger { raw: raw.into(), clean: None }
    }
}

/// A continuation rule and the replies it may follow.
///
/// `replies` is empty until resolution, and stays empty when no reply in the
/// script matches `clean`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub raw: String,
    pub clean: Option<String>,
    pub replies: Vec<Id>,
}

impl Conversation {
    pub fn new(raw: impl Into<String>) -> Self {
        Conversation { raw: raw.into(), clean: None, replies: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Id,
    #[serde(rename = "string")]
    pub text: String,
}

/// The addressable topic → gambit → reply graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptGraph {
    pub topics: BTreeMap<String, Topic>,
    pub gambits: BTreeMap<Id, Gambit>,
    pub replies: BTreeMap<Id, Reply>,
}

impl ScriptGraph {
    /// True when any of the three maps is empty; such a graph is not a usable
    /// knowledge base.
    pub fn is_incomplete(&self) -> bool {
        self.topics.is_empty() || self.gambits.is_empty() || self.replies.is_empty()
    }

    /// Every gambit referenced by a topic exists, and every reply referenced by
    /// a gambit (directly or through a resolved conversation) exists.
    pub fn is_closed(&self) -> bool {
        let topics_ok = self.topics.values().flat_map(|t| t.gambits.iter()).all(|id| self.gambits.contains_key(id));
        let gambits_ok = self.gambits.values().all(|g| {
            g.replies.iter().all(|id| self.replies.contains_key(id))
                && g.conversation.as_ref().is_none_or(|c| c.replies.iter().all(|id| self.replies.contains_key(id)))
        });
        topics_ok && gambits_ok
    }
}

/// Output of compiling one script file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScript {
    pub version: u32,
    #[serde(flatten)]
    pub graph: ScriptGraph,
    /// Recoverable conditions met while compiling; not persisted.
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledScript {
    pub(crate) fn empty() -> Self {
        CompiledScript { version: SCHEMA_VERSION, graph: ScriptGraph::default(), diagnostics: Vec::new() }
    }
}

/// The persisted artifact consumed by the dialogue runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(flatten)]
    pub graph: ScriptGraph,
    pub checksums: ChecksumCache,
    pub version: u32,
}

impl KnowledgeBase {
    /// The "nothing usable was produced" result.
    pub fn empty() -> Self {
        KnowledgeBase { graph: ScriptGraph::default(), checksums: ChecksumCache::new(), version: SCHEMA_VERSION }
    }

    pub fn is_empty(&self) -> bool {
        self.graph.topics.is_empty() && self.graph.gambits.is_empty() && self.graph.replies.is_empty()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::empty()
    }
}

// --- Diagnostics -------------------------------------------------------------

/// A recoverable condition. Never interrupts the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `~concept` had no expansion in any concept source; the trigger keeps the
    /// literal text.
    ConceptNotExpanded { gambit: Id, concept: String },
    /// No reply in the script matches the continuation pattern.
    UnresolvedConversation { gambit: Id, pattern: String },
    /// The continuation pattern did not compile as a regular expression.
    InvalidConversationPattern { gambit: Id, pattern: String, message: String },
    /// Two topics in one script share a name; their contents were combined.
    DuplicateTopic { topic: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ConceptNotExpanded { gambit, concept } => {
                write!(f, "gambit {gambit}: concept not expanded: ~{concept}")
            }
            Diagnostic::UnresolvedConversation { gambit, pattern } => {
                write!(f, "gambit {gambit}: no reply found for conversation: {pattern}")
            }
            Diagnostic::InvalidConversationPattern { gambit, pattern, message } => {
                write!(f, "gambit {gambit}: conversation pattern '{pattern}' is invalid: {message}")
            }
            Diagnostic::DuplicateTopic { topic } => write!(f, "topic '{topic}' declared more than once"),
        }
    }
}
