//! Compile run metrics.
//!
//! Collected on every directory compile; cheap enough that there is no
//! opt-in. The CLI report prints them and they are logged at `info`.

use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for the directory compile.
    pub total: Duration,
    /// Time spent enumerating and checksumming sources.
    pub scan: Duration,
    /// One entry per freshly compiled file, in processing order.
    pub files: Vec<FileMetrics>,
}

/// Timing and output size of one compiled file.
#[derive(Debug, Default, Clone)]
pub struct FileMetrics {
    pub path: String,
    pub elapsed: Duration,
    pub topics: usize,
    pub gambits: usize,
    pub replies: usize,
    pub diagnostics: usize,
}
