use crate::compiler::{self, ChecksumCache, ConceptExpander, FactSystem, RunMetrics, SynonymDictionary, TopicConflict};
use crate::compiler::TriggerCompiler;
use crate::syntax::{PatternGrammar, ScriptParser, SyntaxParser, TriggerGrammar};
use crate::{CompileError, CompiledScript, Diagnostic, KnowledgeBase, SourceError};
use std::path::Path;
use std::sync::Arc;

/// What a directory compile does when one script fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole run with the first error.
    #[default]
    FailFast,
    /// Record the failure and keep going. Failed scripts are left out of the
    /// checksum table so the next run retries them.
    Skip,
}

/// Options for every entry point.
///
/// All fields have working defaults; a default `Options` compiles `*.ss`
/// scripts with the built-in grammars and no concept sources.
#[derive(Debug, Clone)]
pub struct Options {
    /// Semantic-network concept source, queried first.
    pub facts: Option<Arc<dyn FactSystem>>,
    /// Synonym dictionary, queried when `facts` has nothing.
    pub dictionary: Option<Arc<dyn SynonymDictionary>>,
    /// Checksums from the previous run. Files whose content still matches are
    /// not recompiled.
    pub cache: ChecksumCache,
    /// Script file extension, without the dot.
    pub extension: String,
    pub failure_policy: FailurePolicy,
    /// How to combine topics declared in more than one file.
    pub topic_conflicts: TopicConflict,
    /// Upper bound on files read or compiled at the same time.
    pub max_concurrency: usize,
    pub syntax: Arc<dyn SyntaxParser>,
    pub grammar: Arc<dyn PatternGrammar>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            facts: None,
            dictionary: None,
            cache: ChecksumCache::new(),
            extension: "ss".to_string(),
            failure_policy: FailurePolicy::default(),
            topic_conflicts: TopicConflict::default(),
            max_concurrency: 16,
            syntax: Arc::new(ScriptParser),
            grammar: Arc::new(TriggerGrammar),
        }
    }
}

impl Options {
    /// A fresh adapter over the configured concept sources. Its cache lives
    /// as long as the adapter, i.e. one compile call.
    pub(crate) fn concept_expander(&self) -> ConceptExpander {
        ConceptExpander::new(self.facts.clone(), self.dictionary.clone())
    }
}

/// A script that could not be compiled under [`FailurePolicy::Skip`].
#[derive(Debug)]
pub struct FileFailure {
    pub path: String,
    pub error: CompileError,
}

/// Result from [`compile_directory`].
#[derive(Debug)]
pub struct CompiledDirectory {
    /// The merged knowledge base, or [`KnowledgeBase::empty`] when the
    /// recompiled scripts did not produce topics, gambits and replies.
    pub knowledge_base: KnowledgeBase,
    /// Checksums of every script compiled this run or unchanged since the
    /// last one. Returned even when the knowledge base is empty.
    pub checksums: ChecksumCache,
    /// Scripts compiled this run, in enumeration order.
    pub recompiled: Vec<String>,
    /// Scripts skipped because their checksum matched the cache.
    pub unchanged: Vec<String>,
    pub failures: Vec<FileFailure>,
    /// Recoverable conditions, tagged with the script they came from.
    pub diagnostics: Vec<(String, Diagnostic)>,
    pub metrics: RunMetrics,
}

/// Compile every script under `root` into one knowledge base.
///
/// Scripts are found recursively by [`Options::extension`] and processed in
/// lexicographic path order, so a fixed tree always yields the same result.
///
/// # Example
/// ```no_run
/// # async fn run() -> Result<(), parlance::CompileError> {
/// let out = parlance::compile_directory("chat", &parlance::Options::default()).await?;
/// println!("{} gambits", out.knowledge_base.graph.gambits.len());
/// # Ok(())
/// # }
/// ```
pub async fn compile_directory(root: impl AsRef<Path>, options: &Options) -> Result<CompiledDirectory, CompileError> {
    compiler::compile_directory(root.as_ref(), options).await
}

/// Result from [`rebuild_directory`].
#[derive(Debug)]
pub enum Rebuild {
    /// Every script under the root still matches [`Options::cache`] and no
    /// script was added or removed. Nothing was compiled.
    UpToDate,
    /// Something changed, so every script was compiled. The knowledge base
    /// and checksum table cover the same set of scripts.
    Compiled(CompiledDirectory),
}

/// Bring a persisted knowledge base up to date.
///
/// Unlike [`compile_directory`], which only compiles what changed and leaves
/// the unchanged graph to the caller, this treats [`Options::cache`] as the
/// checksums of a complete artifact. When the tree matches it exactly the
/// result is [`Rebuild::UpToDate`]; otherwise the whole tree is compiled
/// with the cache ignored, so the result can replace the artifact as is.
pub async fn rebuild_directory(root: impl AsRef<Path>, options: &Options) -> Result<Rebuild, CompileError> {
    compiler::rebuild_directory(root.as_ref(), options).await
}

/// Compile a single script file. The cache and failure policy are ignored.
pub async fn compile_file(path: impl AsRef<Path>, options: &Options) -> Result<CompiledScript, CompileError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| CompileError::Read { path: path.to_path_buf(), source })?;

    let concepts = options.concept_expander();
    let triggers = TriggerCompiler::new(options.grammar.as_ref(), &concepts);
    let (script, _) = compiler::compile_source_file(
        &path.display().to_string(),
        bytes,
        options.syntax.as_ref(),
        &triggers,
        options.topic_conflicts,
    )
    .await?;
    Ok(script)
}

/// Compile script text that does not come from a file. `name` seeds the
/// identifiers, so the same name and text always give the same output.
pub async fn compile_source(name: &str, text: &str, options: &Options) -> Result<CompiledScript, SourceError> {
    let concepts = options.concept_expander();
    let triggers = TriggerCompiler::new(options.grammar.as_ref(), &concepts);
    compiler::compile_text(name, text, options.syntax.as_ref(), &triggers, options.topic_conflicts).await
}

/// Compile one trigger the way a script's gambit trigger is compiled and
/// return its clean pattern.
pub async fn normalize_trigger(raw: &str, options: &Options) -> Result<String, SourceError> {
    let concepts = options.concept_expander();
    let triggers = TriggerCompiler::new(options.grammar.as_ref(), &concepts);
    Ok(triggers.compile(raw).await?.clean)
}
