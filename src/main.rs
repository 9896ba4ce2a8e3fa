use std::{fs::read_to_string, path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser;
use flexc::{compile_sources, display_error};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Front end for the flex language: parses and resolves source files and
/// reports every diagnostic found.
#[derive(Parser)]
#[command(name = "flexc")]
#[command(about = "flex language front end", long_about = None)]
struct Cli {
    /// Source files making up the program
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Print the token stream of every file
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree of every file
    #[arg(long)]
    dump_ast: bool,

    /// Print the resolved module forest
    #[arg(long)]
    dump_program: bool,

    /// Print how long the front end took
    #[arg(long)]
    timings: bool,
}

fn main() -> ExitCode {
    // FLEXC_LOG takes an env-filter directive, e.g. FLEXC_LOG=flexc::program=trace
    if let Ok(filter) = EnvFilter::try_from_env("FLEXC_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    let mut sources = vec![];
    for path in &cli.files {
        match read_to_string(path) {
            Ok(source) => {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned());
                sources.push((name, source));
            }
            Err(error) => {
                eprintln!("Failed to read {}: {}", path.display(), error);
                return ExitCode::FAILURE;
            }
        }
    }

    let start = Instant::now();
    let compilation = compile_sources(&sources);
    if cli.timings {
        println!("Front end finished in {:?}", start.elapsed());
    }

    if cli.dump_tokens {
        for ((name, _), tokens) in sources.iter().zip(&compilation.tokens) {
            println!("-- tokens: {}", name);
            for token in tokens {
                println!("{}", token);
            }
        }
    }

    if cli.dump_ast {
        let asts = match &compilation.program {
            Some(program) => &program.files,
            None => &compilation.asts,
        };
        for ast in asts {
            println!("{}", ast.dump());
        }
    }

    if cli.dump_program {
        if let Some(program) = &compilation.program {
            println!("{}", program.dump());
        }
    }

    for error in &compilation.errors {
        let file = error.get_position().file.as_str();
        let source = sources
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, source)| source.as_str())
            .unwrap_or("");
        display_error(error, source);
    }

    if compilation.has_errors() {
        eprintln!("{} error(s)", compilation.errors.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
