use parlance::CompiledDirectory;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Human-readable run summary on stderr; stdout is reserved for the
/// knowledge base.
pub fn print_run(root: &str, run: &CompiledDirectory, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("\n{}", palette.bold(palette.paint(format!("⚙  Compiling: {root}"), ansi::CYAN)));

    eprintln!("\n{}", palette.paint("━━━ Scripts ━━━", ansi::GRAY));
    if run.recompiled.is_empty() && run.unchanged.is_empty() && run.failures.is_empty() {
        eprintln!("{}", palette.dim("  No scripts found"));
    }
    for file in &run.metrics.files {
        eprintln!(
            "  {} {} {} {}",
            palette.paint("✓", ansi::GREEN),
            palette.paint(&file.path, ansi::BLUE),
            palette.dim("│"),
            palette.dim(format!(
                "{} topics, {} gambits, {} replies in {:?}",
                file.topics, file.gambits, file.replies, file.elapsed
            )),
        );
    }
    for path in &run.unchanged {
        eprintln!("  {} {} {}", palette.dim("="), palette.dim(path), palette.dim("(unchanged)"));
    }
    for failure in &run.failures {
        eprintln!("  {} {}", palette.paint("✗", ansi::RED), palette.paint(&failure.path, ansi::RED));
        for line in failure.error.to_string().lines().skip(1) {
            eprintln!("      {}", palette.dim(line));
        }
    }

    if !run.diagnostics.is_empty() {
        eprintln!("\n{}", palette.paint("━━━ Diagnostics ━━━", ansi::GRAY));
        for (path, diagnostic) in &run.diagnostics {
            eprintln!("  {} {} {}", palette.paint("!", ansi::YELLOW), palette.dim(format!("{path}:")), diagnostic);
        }
    }

    let graph = &run.knowledge_base.graph;
    eprintln!("\n{}", palette.paint("━━━ Knowledge base ━━━", ansi::GRAY));
    if run.knowledge_base.is_empty() {
        eprintln!("{}", palette.dim("  Empty (no complete topic/gambit/reply set)"));
    } else {
        eprintln!(
            "  Topics: {}  │  Gambits: {}  │  Replies: {}",
            palette.bold(palette.paint(graph.topics.len().to_string(), ansi::GREEN)),
            palette.bold(palette.paint(graph.gambits.len().to_string(), ansi::GREEN)),
            palette.bold(palette.paint(graph.replies.len().to_string(), ansi::GREEN)),
        );
    }

    eprintln!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    eprintln!(
        "  Total: {}  │  Scan: {}  │  Compiled: {}  │  Unchanged: {}",
        palette.paint(format!("{:?}", run.metrics.total), ansi::GREEN),
        palette.paint(format!("{:?}", run.metrics.scan), ansi::CYAN),
        palette.dim(run.recompiled.len().to_string()),
        palette.dim(run.unchanged.len().to_string()),
    );
    eprintln!();
}
