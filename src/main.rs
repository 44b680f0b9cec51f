//! CLI tool to parse and check C preprocessor source files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use c_preproc::{ParseConfig, Parser, tokenize};
use clap::{Parser as _, Subcommand};

#[derive(clap::Parser)]
#[command(name = "cpreproc", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Treat `# 42 "file"` lines as unknown directives
    #[arg(long, global = true)]
    no_line_markers: bool,

    /// Treat `#elifdef` and `#elifndef` as unknown directives
    #[arg(long, global = true)]
    no_elifdef: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the syntax tree of each file as an S-expression
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Report syntax errors, exiting non-zero if any are found
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the token stream of each file
    Tokens {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = ParseConfig::default()
        .line_markers(!cli.no_line_markers)
        .elifdef(!cli.no_elifdef);
    let parser = Parser::new().with_config(config);

    let files = match &cli.command {
        Command::Parse { files } | Command::Check { files } | Command::Tokens { files } => files,
    };

    let mut had_error = false;

    for path in files {
        let content = match fs::read(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                had_error = true;
                continue;
            }
        };

        match cli.command {
            Command::Parse { .. } => {
                let tree = parser.parse(&content);
                println!("{}", tree.to_sexp());
            }
            Command::Check { .. } => {
                if !check(&parser, path, &content) {
                    had_error = true;
                }
            }
            Command::Tokens { .. } => print_tokens(&content),
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Print one line per syntax error; true when there were none.
fn check(parser: &Parser, path: &Path, content: &[u8]) -> bool {
    let tree = parser.parse(content);
    let errors = tree.errors();
    for error in &errors {
        eprintln!(
            "{}:{}:{}: {}",
            path.display(),
            error.line,
            error.column,
            error.kind
        );
    }
    if errors.is_empty() {
        eprintln!("{}: ok", path.display());
    }
    errors.is_empty()
}

fn print_tokens(content: &[u8]) {
    for token in tokenize(content) {
        let text = String::from_utf8_lossy(token.text);
        let error = token.error.map(|e| format!("  ({e})")).unwrap_or_default();
        println!(
            "{:>6}..{:<6} {:<18} {text:?}{error}",
            token.span.start,
            token.span.end,
            token.kind.name()
        );
    }
}
