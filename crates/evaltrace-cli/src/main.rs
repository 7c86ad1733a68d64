//! Evaluation trace CLI.
//!
//! Provides the `evaltrace` binary for inspecting trace dumps offline.
//! `render` prints the debug tree of a dump; `tags` lists the tag assigned
//! to every node so a host can check which records belong where.
//!
//! Reads configuration from environment variables:
//! - `EVALTRACE_MAX_WIDTH`: default value width for `render` (unset: no limit)

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use evaltrace_render::{tag, DumpError, RenderOptions, TraceDump};

const MAX_WIDTH_VAR: &str = "EVALTRACE_MAX_WIDTH";

/// Expression evaluation trace tools.
#[derive(Parser)]
#[command(name = "evaltrace", about = "Expression evaluation trace tools")]
struct Cli {
    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Render the debug tree of a trace dump.
    Render {
        /// Path to the trace dump (JSON).
        file: PathBuf,

        /// Print the tree as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Expand argument and element lists made only of literals.
        #[arg(long)]
        full: bool,

        /// Cut values longer than this many characters (default: $EVALTRACE_MAX_WIDTH).
        #[arg(long)]
        max_width: Option<usize>,

        /// Render at most this many array elements.
        #[arg(long)]
        max_elements: Option<usize>,
    },

    /// List the tag of every node in a dump's expression.
    Tags {
        /// Path to the trace dump (JSON).
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Render {
            file,
            json,
            full,
            max_width,
            max_elements,
        } => run_render(&file, json, full, max_width.or_else(env_max_width), max_elements),
        Commands::Tags { file } => run_tags(&file),
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

/// Execute the render subcommand.
///
/// Returns exit code: 0 = success, 1 = render failure, 3 = I/O or parse error.
fn run_render(
    path: &Path,
    json: bool,
    full: bool,
    max_width: Option<usize>,
    max_elements: Option<usize>,
) -> i32 {
    let dump = match TraceDump::load(path) {
        Ok(dump) => dump,
        Err(e) => {
            eprintln!("Error: failed to load trace dump '{}': {}", path.display(), e);
            return exit_code(&e);
        }
    };
    tracing::debug!("loaded {} records from {}", dump.records.len(), path.display());

    let mut options = RenderOptions::default().compact_literals(!full);
    if let Some(width) = max_width {
        options = options.max_value_width(width);
    }
    if let Some(count) = max_elements {
        options = options.max_elements(count);
    }

    match dump.render(options) {
        Ok(tree) => {
            if json {
                let text = serde_json::to_string_pretty(&tree).unwrap_or_else(|e| {
                    format!("{{\"error\": \"failed to serialize tree: {}\"}}", e)
                });
                println!("{}", text);
            } else {
                println!("{}", tree);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(&e)
        }
    }
}

/// Execute the tags subcommand.
fn run_tags(path: &Path) -> i32 {
    let dump = match TraceDump::load(path) {
        Ok(dump) => dump,
        Err(e) => {
            eprintln!("Error: failed to load trace dump '{}': {}", path.display(), e);
            return exit_code(&e);
        }
    };
    let tags = match tag(&dump.expr) {
        Ok(tags) => tags,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    for (t, node) in tags.iter() {
        println!("{:>4}  {:<20} {}", t, node.kind_name(), node);
    }
    0
}

/// A dump that cannot be read or does not fit its expression is an input
/// problem; anything the renderer rejects is a render failure.
fn exit_code(err: &DumpError) -> i32 {
    match err {
        DumpError::Io(_) | DumpError::Json(_) | DumpError::UnknownTag { .. } => 3,
        DumpError::Trace(_) => 1,
    }
}

fn env_max_width() -> Option<usize> {
    let raw = std::env::var(MAX_WIDTH_VAR).ok()?;
    match parse_width(&raw) {
        Ok(width) => width,
        Err(msg) => {
            tracing::warn!("ignoring {}: {}", MAX_WIDTH_VAR, msg);
            None
        }
    }
}

/// Parse a width setting. Blank means no limit.
fn parse_width(raw: &str) -> Result<Option<usize>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| format!("invalid width '{}', expected a non-negative integer", raw))
}
