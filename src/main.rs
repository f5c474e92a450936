mod report;

use parlance::{
    ChecksumCache, FailurePolicy, InMemoryConcepts, KnowledgeBase, Options, Rebuild, TopicConflict, rebuild_directory,
};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "parlance=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(&config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run(config: &CliConfig) -> Result<ExitCode, String> {
    let cache = match &config.cache {
        Some(path) => load_cache(path)?,
        None => ChecksumCache::new(),
    };
    let dictionary = match &config.synonyms {
        Some(path) => Some(InMemoryConcepts::from_json_file(path).map_err(|err| err.to_string())?),
        None => None,
    };

    let options = Options {
        dictionary: dictionary.map(|d| Arc::new(d) as Arc<dyn parlance::SynonymDictionary>),
        cache,
        extension: config.extension.clone(),
        failure_policy: if config.keep_going { FailurePolicy::Skip } else { FailurePolicy::FailFast },
        topic_conflicts: if config.strict_topics { TopicConflict::Reject } else { TopicConflict::Extend },
        ..Options::default()
    };

    let out = match rebuild_directory(&config.root, &options).await.map_err(|err| err.to_string())? {
        Rebuild::UpToDate => return Ok(ExitCode::SUCCESS),
        Rebuild::Compiled(out) => out,
    };
    report::print_run(&config.root.display().to_string(), &out, config.color);

    let written = match &config.out {
        Some(path) => write_knowledge_base(path, &out.knowledge_base)?,
        None => {
            let json = serde_json::to_string_pretty(&out.knowledge_base).map_err(|err| format!("error: {err}"))?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").map_err(|err| format!("error: failed to write stdout: {err}"))?;
            true
        }
    };

    Ok(if written && out.failures.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

/// Write `kb` to `path`. An empty knowledge base never replaces an existing
/// file; returns false when the write was refused.
fn write_knowledge_base(path: &Path, kb: &KnowledgeBase) -> Result<bool, String> {
    if kb.is_empty() && path.exists() {
        warn!(path = %path.display(), "compiled knowledge base is empty; keeping the existing file");
        return Ok(false);
    }

    let json = serde_json::to_string_pretty(kb).map_err(|err| format!("error: {err}"))?;
    std::fs::write(path, json).map_err(|err| format!("error: failed to write {}: {err}", path.display()))?;
    info!(path = %path.display(), "wrote knowledge base");
    Ok(true)
}

/// Accepts either a previous knowledge base (its `checksums` are used) or a
/// bare `{ path: checksum }` map. A missing file is an empty cache.
fn load_cache(path: &Path) -> Result<ChecksumCache, String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cache file yet");
            return Ok(ChecksumCache::new());
        }
        Err(err) => return Err(format!("error: failed to read cache {}: {err}", path.display())),
    };

    let mut value: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| format!("error: invalid cache {}: {err}", path.display()))?;
    if let Some(checksums) = value.get_mut("checksums") {
        value = checksums.take();
    }
    serde_json::from_value(value).map_err(|err| format!("error: invalid cache {}: {err}", path.display()))
}

struct CliConfig {
    root: PathBuf,
    out: Option<PathBuf>,
    cache: Option<PathBuf>,
    synonyms: Option<PathBuf>,
    extension: String,
    keep_going: bool,
    strict_topics: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut root: Option<PathBuf> = None;
    let mut out = None;
    let mut cache = None;
    let mut synonyms = None;
    let mut extension = Options::default().extension;
    let mut keep_going = false;
    let mut strict_topics = false;
    let mut color = io::stderr().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().ok_or_else(|| format!("error: {name} expects a value"));
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("parlance {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--keep-going" => keep_going = true,
            "--strict-topics" => strict_topics = true,
            "-o" | "--out" => out = Some(PathBuf::from(value("--out")?)),
            "--cache" => cache = Some(PathBuf::from(value("--cache")?)),
            "--synonyms" => synonyms = Some(PathBuf::from(value("--synonyms")?)),
            "--ext" => extension = value("--ext")?,
            _ if arg.starts_with("--out=") => out = Some(PathBuf::from(arg.trim_start_matches("--out="))),
            _ if arg.starts_with("--cache=") => cache = Some(PathBuf::from(arg.trim_start_matches("--cache="))),
            _ if arg.starts_with("--synonyms=") => {
                synonyms = Some(PathBuf::from(arg.trim_start_matches("--synonyms=")));
            }
            _ if arg.starts_with("--ext=") => extension = arg.trim_start_matches("--ext=").to_string(),
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if root.is_some() {
                    return Err("error: root directory provided multiple times".to_string());
                }
                root = Some(PathBuf::from(arg));
            }
        }
    }

    let root = root.ok_or_else(|| format!("error: no root directory provided\n\n{}", help_text()))?;
    if extension.trim_start_matches('.').is_empty() {
        return Err("error: --ext must not be empty".to_string());
    }

    Ok(CliConfig { root, out, cache, synonyms, extension, keep_going, strict_topics, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "parlance {version}

Compiles a directory of chat scripts into a knowledge base.

Usage:
  parlance [OPTIONS] <root>

Options:
  -o, --out <file>           Write the knowledge base here instead of stdout.
  --cache <file>             Previous knowledge base (or bare checksum map).
                             When every script still matches it nothing is
                             written; otherwise all scripts are recompiled.
                             An empty result never replaces an existing --out.
  --synonyms <file>          JSON object of word -> [synonyms] used to expand
                             ~concepts in triggers.
  --ext <extension>          Script file extension. Default: {extension}
  --keep-going               Skip scripts that fail instead of aborting.
  --strict-topics            Fail when a topic is declared more than once,
                             in one script or across scripts.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging goes to stderr; set RUST_LOG (default: parlance=info).

Exit codes:
  0  Success.
  1  Compile error, scripts skipped with --keep-going, or an empty
     knowledge base that was not written over --out.
  2  Invalid arguments or missing root.
",
        version = env!("CARGO_PKG_VERSION"),
        extension = Options::default().extension,
    )
}
