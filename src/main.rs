use std::fs;
use std::process::ExitCode;

use clap::Parser;
use clap_stdin::FileOrStdin;
use log::{debug, LevelFilter};

use fancc::error::InputError;

/// Type checks a JSON syntax tree and prints its LLVM IR.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Syntax tree as JSON, or `-` for stdin
    #[arg(default_value = "-")]
    input: FileOrStdin,

    /// Write the IR to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Write the IR even when diagnostics were reported
    #[arg(long)]
    emit_on_error: bool,

    /// Raise the log level, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<bool, InputError> {
    let json = cli.input.contents()?;
    let compilation = fancc::compile_json(&json)?;

    for diagnostic in &compilation.diagnostics {
        eprintln!("{}", diagnostic);
    }
    debug!("{} diagnostics", compilation.diagnostics.len());

    if compilation.is_ok() || cli.emit_on_error {
        match &cli.output {
            Some(path) => fs::write(path, &compilation.ir).map_err(|source| InputError::Io {
                path: path.clone(),
                source,
            })?,
            None => print!("{}", compilation.ir),
        }
    }
    Ok(compilation.is_ok())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}
