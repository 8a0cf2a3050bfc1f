//! Command line argument handling with clap v4 and subcommands.

use crate::eval::memory::heap::HeapSettings;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// loxheap - Lox object heap and string interning
#[derive(Parser, Debug, Clone)]
#[command(name = "loxheap")]
#[command(about = "Intern strings into a Lox object heap and report on it")]
#[command(version)]
pub struct LoxHeapCli {
    /// Log heap events to stderr
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Print metrics to stderr before exiting
    #[arg(short = 'S', long = "statistics", global = true)]
    pub statistics: bool,

    /// Fail allocations beyond this many MiB of live objects
    #[arg(long = "heap-limit-mib", global = true)]
    pub heap_limit_mib: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Intern strings and report canonical handles (default)
    Intern(InternArgs),
    /// Print the FNV-1a hash of each string
    Hash(HashArgs),
    /// Explain what would be executed
    Explain(InternArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InternArgs {
    /// Read a file and intern each of its lines
    #[arg(short = 'f', long = "file", action = clap::ArgAction::Append)]
    pub files: Vec<PathBuf>,

    /// Output the report as JSON
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Strings to intern
    #[arg(value_name = "STRINGS")]
    pub strings: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct HashArgs {
    /// Strings to hash
    #[arg(value_name = "STRINGS")]
    pub strings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Intern,
    Hash,
    Explain,
}

/// Combined options structure
#[derive(Debug, Clone, Default)]
pub struct LoxHeapOptions {
    pub mode: Mode,
    pub debug: bool,
    pub statistics: bool,
    pub heap_limit_mib: Option<usize>,
    pub json: bool,
    pub strings: Vec<String>,
    pub files: Vec<PathBuf>,
}

impl From<LoxHeapCli> for LoxHeapOptions {
    fn from(cli: LoxHeapCli) -> Self {
        let (mode, args) = match cli.command {
            Some(Commands::Intern(args)) => (Mode::Intern, args),
            Some(Commands::Explain(args)) => (Mode::Explain, args),
            Some(Commands::Hash(args)) => (
                Mode::Hash,
                InternArgs {
                    strings: args.strings,
                    ..InternArgs::default()
                },
            ),
            None => (Mode::Intern, InternArgs::default()),
        };

        LoxHeapOptions {
            mode,
            debug: cli.debug,
            statistics: cli.statistics,
            heap_limit_mib: cli.heap_limit_mib,
            json: args.json,
            strings: args.strings,
            files: args.files,
        }
    }
}

// Parsing logic to handle default subcommand
impl LoxHeapCli {
    pub fn parse_with_fallback() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::parse_from_with_fallback(args)
    }

    /// Parse `args`, treating anything that doesn't start with a
    /// subcommand as arguments to `intern`
    pub fn parse_from_with_fallback(args: Vec<String>) -> Self {
        if args.len() <= 1 {
            return Self::parse_from(args);
        }

        const SUBCOMMANDS: &[&str] = &["intern", "hash", "explain", "help"];
        if SUBCOMMANDS.contains(&args[1].as_str())
            || args[1] == "--help"
            || args[1] == "-h"
            || args[1] == "--version"
            || args[1] == "-V"
        {
            return Self::parse_from(args);
        }

        let mut modified_args = vec![args[0].clone(), "intern".to_string()];
        modified_args.extend_from_slice(&args[1..]);

        Self::try_parse_from(modified_args).unwrap_or_else(|e| {
            e.exit();
        })
    }
}

impl LoxHeapOptions {
    /// Parse command line arguments
    pub fn from_args() -> Self {
        LoxHeapOptions::from(LoxHeapCli::parse_with_fallback())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn explain(&self) -> bool {
        self.mode == Mode::Explain
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn statistics(&self) -> bool {
        self.statistics
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Heap configuration implied by the options
    pub fn heap_settings(&self) -> HeapSettings {
        let settings = HeapSettings::default().with_log_gc(self.debug);
        match self.heap_limit_mib {
            Some(limit) => settings.with_limit_mib(limit),
            None => settings,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_strings<S: Into<String>>(mut self, strings: Vec<S>) -> Self {
        self.strings = strings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn with_heap_limit_mib(mut self, limit: usize) -> Self {
        self.heap_limit_mib = Some(limit);
        self
    }

    /// Produce a dry run explanation of the selected options
    pub fn explanation(&self) -> String {
        let mut explanation = String::new();

        explanation.push_str("loxheap will ");
        match self.mode {
            Mode::Hash => explanation.push_str("print the FNV-1a hash of each string"),
            Mode::Intern | Mode::Explain => {
                explanation.push_str("intern each string by copy and each file line by transfer")
            }
        }
        explanation.push_str("\n\n");

        if !self.strings.is_empty() {
            explanation.push_str("Strings:\n");
            for s in &self.strings {
                explanation.push_str(&format!(" • {s:?}\n"));
            }
            explanation.push('\n');
        }

        if !self.files.is_empty() {
            explanation.push_str("Files:\n");
            for p in &self.files {
                explanation.push_str(&format!(" • {}\n", p.display()));
            }
            explanation.push('\n');
        }

        let f = if self.json { "json" } else { "text" };
        explanation.push_str(&format!("Report output: {f} to stdout\n\n"));

        if self.debug || self.statistics || self.heap_limit_mib.is_some() {
            explanation.push_str("Other options:\n");
        }
        if self.debug {
            explanation.push_str(" • heap events are logged to stderr\n")
        }
        if let Some(limit) = self.heap_limit_mib {
            explanation.push_str(&format!(" • heap limited to {limit} MiB\n"))
        }
        if self.statistics {
            explanation.push_str(" • print statistics to stderr\n")
        }

        explanation
    }
}
