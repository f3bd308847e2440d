use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::parser::Parser;
use rox::scanner::{self, Scanner};
use rox::token::Token;

/// sysexits `EX_USAGE`
const EXIT_USAGE: i32 = 64;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program, or starts a prompt without one
    Run { filename: Option<PathBuf> },
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Report a pipeline error on stderr and leave with its exit status.
fn fail(e: LoxError) -> ! {
    debug!("Exiting on error: {:?}", e);
    eprintln!("{}", e);
    process::exit(e.exit_code());
}

fn require(filename: Option<PathBuf>, command: &str) -> PathBuf {
    match filename {
        Some(filename) => filename,
        None => {
            info!("No filepath provided for {}", command);
            eprintln!("Usage: rox {} <filename>", command);
            process::exit(EXIT_USAGE);
        }
    }
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    if json {
        let tokens: Vec<Token<'_>> = scanner::tokenize(source).unwrap_or_else(|e| fail(e));
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }

    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str) -> rox::error::Result<String> {
    let tokens: Vec<Token<'_>> = scanner::tokenize(source)?;
    let expr = Parser::new(&tokens).parse_expression()?;

    Ok(AstPrinter::print(&expr))
}

/// One fresh interpreter per line; `exit` or end of input leaves.
fn repl() -> Result<()> {
    info!("Starting interactive prompt");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let line: String = match lines.next() {
            Some(line) => line?,
            None => break,
        };

        if line.trim() == "exit" {
            break;
        }

        if let Err(e) = rox::run(&line, io::stdout()) {
            eprintln!("{}", e);
        }
    }

    info!("Leaving interactive prompt");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let source: String =
                rox::read_source(&require(filename, "tokenize")).unwrap_or_else(|e| fail(e));
            tokenize(&source, json)?;
        }

        Commands::Parse { filename } => {
            let source: String =
                rox::read_source(&require(filename, "parse")).unwrap_or_else(|e| fail(e));
            let ast: String = parse(&source).unwrap_or_else(|e| fail(e));

            debug!("AST: {}", ast);
            println!("{}", ast);
        }

        Commands::Evaluate { filename } => {
            let source: String =
                rox::read_source(&require(filename, "evaluate")).unwrap_or_else(|e| fail(e));
            let value: String = rox::evaluate(&source).unwrap_or_else(|e| fail(e));

            println!("{}", value);
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                let source: String = rox::read_source(&filename).unwrap_or_else(|e| fail(e));

                if let Err(e) = rox::run(&source, io::stdout()) {
                    fail(e);
                }

                info!("Program executed successfully");
            }

            None => repl()?,
        },
    }

    Ok(())
}
