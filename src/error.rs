use std::path::PathBuf;
use thiserror::Error;

/// A failure inside one script's text.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The syntax parser rejected the script. `line` is 1-based into the
    /// preprocessed text and `text` is that line.
    #[error("Error in parser\nFound: {found}\nMessage: {message}\nLine: '{text}'")]
    Syntax { found: String, message: String, line: usize, text: String },

    /// A trigger or conversation pattern could not be canonicalized.
    #[error("Error in pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// The same topic is declared twice in one script under
    /// `TopicConflict::Reject`.
    #[error("topic '{name}' is declared more than once")]
    DuplicateTopic { name: String },

    #[error("script is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// A fatal compile failure for a file or a whole run.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Error reading file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error whilst processing file: {path}\n{source}")]
    File {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to enumerate scripts under {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("topic '{name}' is declared in more than one file")]
    DuplicateTopic { name: String },

    #[error("identifier {id} was generated twice")]
    DuplicateId { id: String },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CompileError {
    pub(crate) fn file(path: impl Into<String>, source: SourceError) -> Self {
        CompileError::File { path: path.into(), source }
    }
}
