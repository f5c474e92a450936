//! Incremental directory compilation.
//!
//! ```text
//! root ── walk (*.ext, sorted) ── read + sha256 ──┬── in cache, same sum ──▶ unchanged
//!                                                 └── otherwise ── compile (bounded, ordered)
//!                                                                      │
//!                         ScriptGraph::absorb in file order ◀──────────┘
//!                                      │
//!                                      v
//!                    KnowledgeBase (or empty) + checksum table
//! ```
//!
//! Files are compiled concurrently but results come back in enumeration
//! order, so the merge is reproducible for a fixed tree. Unchanged files are
//! only carried in the checksum table: their graph is whatever the caller
//! persisted last time.
//!
//! [`rebuild_directory`] is the variant for callers that persist one artifact
//! and feed it back as the cache: it either reports that the tree still
//! matches the cache or compiles every script, so the graph and the checksum
//! table it returns always describe the same files.

use super::file::compile_source_file;
use super::metrics::{FileMetrics, RunMetrics};
use super::trigger::TriggerCompiler;
use crate::syntax::SyntaxParser;
use crate::{
    CompileError, CompiledDirectory, FailurePolicy, FileFailure, KnowledgeBase, Options, Rebuild, ScriptGraph,
};
use futures::stream::{self, Stream, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Source path → SHA-256 hex of the file's bytes.
pub type ChecksumCache = BTreeMap<String, String>;

pub(crate) fn checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for b in digest {
        let _ = write!(hex, "{:02x}", b);
    }
    hex
}

/// Every regular file under `root` whose extension is `extension`, sorted.
pub(crate) async fn discover(root: &Path, extension: &str) -> Result<Vec<PathBuf>, CompileError> {
    let root = root.to_path_buf();
    let extension = extension.trim_start_matches('.').to_string();

    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry.map_err(|source| CompileError::Walk { root: root.clone(), source })?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == extension.as_str()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    })
    .await?
}

enum Scanned {
    Unchanged { checksum: String },
    Changed { checksum: String, bytes: Vec<u8> },
}

async fn scan(path: &Path, cache: &ChecksumCache) -> Result<Scanned, CompileError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CompileError::Read { path: path.to_path_buf(), source })?;
    let checksum = checksum(&bytes);
    if cache.get(&path.display().to_string()) == Some(&checksum) {
        Ok(Scanned::Unchanged { checksum })
    } else {
        Ok(Scanned::Changed { checksum, bytes })
    }
}

/// Drain `results` in order. Under [`FailurePolicy::FailFast`] the first
/// error is returned and the remaining work is dropped; under
/// [`FailurePolicy::Skip`] errors are recorded in `failures`.
async fn settle<T>(
    results: impl Stream<Item = (String, Result<T, CompileError>)>,
    policy: FailurePolicy,
    failures: &mut Vec<FileFailure>,
) -> Result<Vec<(String, T)>, CompileError> {
    let mut results = pin!(results);
    let mut settled = Vec::new();

    while let Some((path, result)) = results.next().await {
        match result {
            Ok(value) => settled.push((path, value)),
            Err(error) if policy == FailurePolicy::Skip => {
                warn!(path, %error, "skipping script");
                failures.push(FileFailure { path, error });
            }
            Err(error) => return Err(error),
        }
    }
    Ok(settled)
}

pub(crate) async fn compile_directory(root: &Path, options: &Options) -> Result<CompiledDirectory, CompileError> {
    let started = Instant::now();
    let width = options.max_concurrency.max(1);
    let mut failures = Vec::new();

    let files = discover(root, &options.extension).await?;
    debug!(root = %root.display(), files = files.len(), "discovered scripts");

    let scans = stream::iter(files)
        .map(|path| async move {
            let scanned = scan(&path, &options.cache).await;
            (path.display().to_string(), scanned)
        })
        .buffered(width);
    let scanned = settle(scans, options.failure_policy, &mut failures).await?;
    let scan_elapsed = started.elapsed();

    let mut checksums = ChecksumCache::new();
    let mut unchanged = Vec::new();
    let mut changed = Vec::new();
    for (path, scan) in scanned {
        match scan {
            Scanned::Unchanged { checksum } => {
                checksums.insert(path.clone(), checksum);
                unchanged.push(path);
            }
            Scanned::Changed { checksum, bytes } => changed.push((path, checksum, bytes)),
        }
    }
    info!(changed = changed.len(), unchanged = unchanged.len(), "scanned scripts");

    let concepts = options.concept_expander();
    let triggers = &TriggerCompiler::new(options.grammar.as_ref(), &concepts);
    let syntax: &dyn SyntaxParser = options.syntax.as_ref();

    let compiles = stream::iter(changed)
        .map(|(path, checksum, bytes)| async move {
            let compiled = compile_source_file(&path, bytes, syntax, triggers, options.topic_conflicts).await;
            (path, compiled.map(|(script, elapsed)| (checksum, script, elapsed)))
        })
        .buffered(width);
    let compiled = settle(compiles, options.failure_policy, &mut failures).await?;

    let mut graph = ScriptGraph::default();
    let mut recompiled = Vec::with_capacity(compiled.len());
    let mut diagnostics = Vec::new();
    let mut metrics = RunMetrics { scan: scan_elapsed, ..RunMetrics::default() };

    for (path, (checksum, script, elapsed)) in compiled {
        metrics.files.push(FileMetrics {
            path: path.clone(),
            elapsed,
            topics: script.graph.topics.len(),
            gambits: script.graph.gambits.len(),
            replies: script.graph.replies.len(),
            diagnostics: script.diagnostics.len(),
        });
        diagnostics.extend(script.diagnostics.into_iter().map(|d| (path.clone(), d)));
        graph.absorb(script.graph, options.topic_conflicts)?;
        checksums.insert(path.clone(), checksum);
        recompiled.push(path);
    }

    let knowledge_base = if graph.is_incomplete() {
        debug!(
            topics = graph.topics.len(),
            gambits = graph.gambits.len(),
            replies = graph.replies.len(),
            "nothing usable compiled; returning an empty knowledge base"
        );
        KnowledgeBase::empty()
    } else {
        KnowledgeBase { graph, checksums: checksums.clone(), ..KnowledgeBase::empty() }
    };

    metrics.total = started.elapsed();
    info!(
        topics = knowledge_base.graph.topics.len(),
        gambits = knowledge_base.graph.gambits.len(),
        replies = knowledge_base.graph.replies.len(),
        recompiled = recompiled.len(),
        failed = failures.len(),
        elapsed = ?metrics.total,
        "compiled knowledge base"
    );

    Ok(CompiledDirectory { knowledge_base, checksums, recompiled, unchanged, failures, diagnostics, metrics })
}

/// True when `options.cache` names exactly the scripts under `root` and
/// every one still has the cached checksum. Unreadable scripts count as
/// changed.
pub(crate) async fn is_current(root: &Path, options: &Options) -> Result<bool, CompileError> {
    let files = discover(root, &options.extension).await?;
    if files.len() != options.cache.len() {
        debug!(files = files.len(), cached = options.cache.len(), "script set differs from the cache");
        return Ok(false);
    }

    let scans = stream::iter(files)
        .map(|path| async move { (path.display().to_string(), scan(&path, &options.cache).await) })
        .buffered(options.max_concurrency.max(1));
    let mut scans = pin!(scans);

    while let Some((path, scanned)) = scans.next().await {
        match scanned {
            Ok(Scanned::Unchanged { .. }) => {}
            Ok(Scanned::Changed { .. }) => {
                debug!(path, "script changed since the cache");
                return Ok(false);
            }
            Err(error) => {
                debug!(path, %error, "script unreadable; treating as changed");
                return Ok(false);
            }
        }
    }
    Ok(true)
}

pub(crate) async fn rebuild_directory(root: &Path, options: &Options) -> Result<Rebuild, CompileError> {
    if !options.cache.is_empty() && is_current(root, options).await? {
        info!(scripts = options.cache.len(), "knowledge base is up to date");
        return Ok(Rebuild::UpToDate);
    }

    let fresh = Options { cache: ChecksumCache::new(), ..options.clone() };
    compile_directory(root, &fresh).await.map(Rebuild::Compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(checksum(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[tokio::test]
    async fn discover_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.ss"), "+ b\n- b").unwrap();
        fs::write(dir.path().join("a.ss"), "+ a\n- a").unwrap();
        fs::write(dir.path().join("nested/c.ss"), "+ c\n- c").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a script").unwrap();

        let files = discover(dir.path(), ".ss").await.unwrap();
        let names: Vec<_> =
            files.iter().map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned()).collect();

        assert_eq!(names, vec!["a.ss", "b.ss", "nested/c.ss"]);
    }

    #[tokio::test]
    async fn discover_reports_a_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("missing"), "ss").await.unwrap_err();
        assert!(matches!(err, CompileError::Walk { .. }));
    }

    #[tokio::test]
    async fn scan_compares_against_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ss");
        fs::write(&path, "+ hi\n- hello").unwrap();

        let mut cache = ChecksumCache::new();
        assert!(matches!(scan(&path, &cache).await.unwrap(), Scanned::Changed { .. }));

        cache.insert(path.display().to_string(), checksum(b"+ hi\n- hello"));
        assert!(matches!(scan(&path, &cache).await.unwrap(), Scanned::Unchanged { .. }));

        cache.insert(path.display().to_string(), "stale".to_string());
        assert!(matches!(scan(&path, &cache).await.unwrap(), Scanned::Changed { .. }));
    }

    #[tokio::test]
    async fn is_current_needs_the_exact_script_set() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ss");
        fs::write(&a, "+ a\n- a").unwrap();

        let mut cache = ChecksumCache::new();
        cache.insert(a.display().to_string(), checksum(b"+ a\n- a"));
        let options = Options { cache: cache.clone(), ..Options::default() };
        assert!(is_current(dir.path(), &options).await.unwrap());

        // A new script is not in the cache.
        fs::write(dir.path().join("b.ss"), "+ b\n- b").unwrap();
        assert!(!is_current(dir.path(), &options).await.unwrap());

        // A cached script that no longer exists.
        fs::remove_file(dir.path().join("b.ss")).unwrap();
        cache.insert(dir.path().join("gone.ss").display().to_string(), "0".repeat(64));
        let options = Options { cache, ..Options::default() };
        assert!(!is_current(dir.path(), &options).await.unwrap());
    }
}
