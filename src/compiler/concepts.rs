//! Concept source adapter.
//!
//! Triggers reference concepts as `~word`. Expansions come from two optional
//! sources, queried in order:
//!
//! ```text
//! word ──▶ FactSystem::concept_to_list(lowercased word)
//!            │ error or empty
//!            v
//!          SynonymDictionary::lookup(word)   ('_' → ' ')
//!            │ error or empty
//!            v
//!          []  (no expansion)
//! ```
//!
//! Lookup failures are logged and treated as "nothing found"; they never fail
//! a compile. Results, empty ones included, are cached for the lifetime of
//! the expander so a run asks each source about each word at most once.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConceptError {
    #[error("concept lookup for '{word}' failed: {message}")]
    Lookup { word: String, message: String },

    #[error("failed to load concepts from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A semantic-network fact store.
#[async_trait]
pub trait FactSystem: Send + Sync + fmt::Debug {
    /// Members of `concept`, e.g. `animal` → `["cat", "dog"]`.
    async fn concept_to_list(&self, concept: &str) -> Result<Vec<String>, ConceptError>;
}

/// A synonym dictionary. Multi-word entries may use `_` between words.
#[async_trait]
pub trait SynonymDictionary: Send + Sync + fmt::Debug {
    async fn lookup(&self, word: &str) -> Result<Vec<String>, ConceptError>;
}

/// Uniform `expand(word)` over the configured sources.
#[derive(Debug, Default)]
pub struct ConceptExpander {
    facts: Option<Arc<dyn FactSystem>>,
    dictionary: Option<Arc<dyn SynonymDictionary>>,
    cache: DashMap<String, Vec<String>>,
}

impl ConceptExpander {
    pub fn new(facts: Option<Arc<dyn FactSystem>>, dictionary: Option<Arc<dyn SynonymDictionary>>) -> Self {
        ConceptExpander { facts, dictionary, cache: DashMap::new() }
    }

    /// Synonyms for `word`, possibly empty. Never fails.
    pub async fn expand(&self, word: &str) -> Vec<String> {
        if let Some(hit) = self.cache.get(word) {
            return hit.value().clone();
        }

        let mut words = Vec::new();
        if let Some(facts) = &self.facts {
            match facts.concept_to_list(&word.to_lowercase()).await {
                Ok(found) => words = found,
                Err(err) => warn!(%err, word, "fact system lookup failed"),
            }
        }

        if words.is_empty() {
            if let Some(dictionary) = &self.dictionary {
                match dictionary.lookup(word).await {
                    Ok(found) => words = found.into_iter().map(|w| w.replace('_', " ")).collect(),
                    Err(err) => warn!(%err, word, "synonym dictionary lookup failed"),
                }
            }
        }

        self.cache.insert(word.to_string(), words.clone());
        words
    }
}

/// In-memory concept table usable as either source.
///
/// Keys are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConcepts {
    entries: HashMap<String, Vec<String>>,
}

impl InMemoryConcepts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, word: &str, synonyms: &[&str]) -> Self {
        self.insert(word, synonyms.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn insert(&mut self, word: &str, synonyms: Vec<String>) {
        self.entries.insert(word.to_lowercase(), synonyms);
    }

    /// Load a JSON object of `word → [synonym, ...]`.
    pub fn from_json_file(path: &Path) -> Result<Self, ConceptError> {
        let load_err = |source: Box<dyn std::error::Error + Send + Sync>| ConceptError::Load {
            path: path.display().to_string(),
            source,
        };
        let text = std::fs::read_to_string(path).map_err(|e| load_err(Box::new(e)))?;
        let table: HashMap<String, Vec<String>> = serde_json::from_str(&text).map_err(|e| load_err(Box::new(e)))?;

        let mut concepts = InMemoryConcepts::new();
        for (word, synonyms) in table {
            concepts.insert(&word, synonyms);
        }
        Ok(concepts)
    }

    fn get(&self, word: &str) -> Vec<String> {
        self.entries.get(&word.to_lowercase()).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl FactSystem for InMemoryConcepts {
    async fn concept_to_list(&self, concept: &str) -> Result<Vec<String>, ConceptError> {
        Ok(self.get(concept))
    }
}

#[async_trait]
impl SynonymDictionary for InMemoryConcepts {
    async fn lookup(&self, word: &str) -> Result<Vec<String>, ConceptError> {
        Ok(self.get(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Failing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FactSystem for Failing {
        async fn concept_to_list(&self, concept: &str) -> Result<Vec<String>, ConceptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ConceptError::Lookup { word: concept.to_string(), message: "store offline".to_string() })
        }
    }

    #[async_trait]
    impl SynonymDictionary for Failing {
        async fn lookup(&self, word: &str) -> Result<Vec<String>, ConceptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ConceptError::Lookup { word: word.to_string(), message: "dictionary offline".to_string() })
        }
    }

    #[tokio::test]
    async fn facts_take_precedence_over_dictionary() {
        let facts = InMemoryConcepts::new().with("animal", &["cat", "dog"]);
        let dictionary = InMemoryConcepts::new().with("animal", &["beast"]);
        let expander = ConceptExpander::new(Some(Arc::new(facts)), Some(Arc::new(dictionary)));

        assert_eq!(expander.expand("animal").await, vec!["cat", "dog"]);
    }

    #[tokio::test]
    async fn falls_back_to_dictionary_and_splits_compounds() {
        let facts = InMemoryConcepts::new();
        let dictionary = InMemoryConcepts::new().with("pet", &["guinea_pig", "hamster"]);
        let expander = ConceptExpander::new(Some(Arc::new(facts)), Some(Arc::new(dictionary)));

        assert_eq!(expander.expand("pet").await, vec!["guinea pig", "hamster"]);
    }

    #[tokio::test]
    async fn failing_sources_mean_no_expansion() {
        let failing = Arc::new(Failing::default());
        let expander = ConceptExpander::new(Some(failing.clone()), Some(failing.clone()));

        assert!(expander.expand("anything").await.is_empty());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_sources_is_not_an_error() {
        let expander = ConceptExpander::default();
        assert!(expander.expand("animal").await.is_empty());
    }

    #[tokio::test]
    async fn lookups_are_cached() {
        let failing = Arc::new(Failing::default());
        let expander = ConceptExpander::new(Some(failing.clone()), None);

        expander.expand("animal").await;
        expander.expand("animal").await;
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn loads_json_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synonyms.json");
        std::fs::write(&path, r#"{"Greeting": ["hi", "hello"]}"#).unwrap();

        let concepts = InMemoryConcepts::from_json_file(&path).unwrap();
        assert_eq!(concepts.get("greeting"), vec!["hi", "hello"]);
    }
}
