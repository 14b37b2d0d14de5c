use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strand_pattern::{MatchingOptions, PatternOptions};

/// Dependency-aware task runner and regex toolkit.
///
/// Runs task plans on a priority queue and enumerates or replaces regex
/// matches.
#[derive(Parser, Debug)]
#[command(name = "strand", about = "Dependency-aware task runner and regex toolkit")]
pub struct CliArgs {
    /// Path to a TOML config file (default: environment only)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Worker thread count override (0 = available parallelism)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a task plan (TOML, or JSON by extension) and print the report
    Plan {
        /// Plan file
        file: PathBuf,

        /// Override the plan's concurrency limit
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Print every match of a pattern as JSON
    Matches {
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Replace every match of a pattern using a template ($n, \ escapes)
    Replace {
        #[command(flatten)]
        pattern: PatternArgs,

        /// Replacement template
        template: String,
    },
}

#[derive(Args, Debug)]
pub struct PatternArgs {
    /// Regular expression
    pub pattern: String,

    /// Subject text (stdin when neither --text nor --file is given)
    #[arg(long)]
    pub text: Option<String>,

    /// Read the subject from a file
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// ^ and $ match at line boundaries
    #[arg(short = 'm', long)]
    pub multiline: bool,

    /// . matches line terminators
    #[arg(short = 's', long)]
    pub dot_all: bool,

    /// Ignore whitespace and # comments in the pattern
    #[arg(short = 'x', long)]
    pub extended: bool,

    /// Treat the pattern as a literal string
    #[arg(long)]
    pub literal: bool,

    /// Only accept matches chained from the start of the subject
    #[arg(long)]
    pub anchored: bool,
}

impl PatternArgs {
    pub fn pattern_options(&self) -> PatternOptions {
        let mut options = PatternOptions::empty();
        options.set(PatternOptions::CASE_INSENSITIVE, self.ignore_case);
        options.set(PatternOptions::ANCHORS_MATCH_LINES, self.multiline);
        options.set(PatternOptions::DOT_MATCHES_LINE_SEPARATORS, self.dot_all);
        options.set(PatternOptions::ALLOW_COMMENTS_AND_WHITESPACE, self.extended);
        options.set(PatternOptions::IGNORE_METACHARACTERS, self.literal);
        options
    }

    pub fn matching_options(&self) -> MatchingOptions {
        if self.anchored {
            MatchingOptions::ANCHORED
        } else {
            MatchingOptions::empty()
        }
    }
}
