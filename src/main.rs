use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand};
use log::LevelFilter;
use sprig_lang::cli::{self, ApplyCommand, CheckResult, CliError};
use sprig_lang::{Engine, EngineConfig};

#[derive(ClapParser)]
#[command(name = "sprig")]
#[command(about = "Sprig - reshape JSON documents with expression templates")]
#[command(version)]
struct Cli {
    /// Log engine activity to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON file with engine settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use native floating point numbers instead of exact decimals
    #[arg(long, global = true)]
    native_numbers: bool,

    /// Write exact decimals in results as strings
    #[arg(long, global = true)]
    decimal_strings: bool,

    /// Disable the parsed expression cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply transforms to a JSON document
    Apply {
        /// Transform dictionary as JSON (or a file holding it), or a single (: :) leaf
        transforms: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Dictionary entry to run instead of 'out'
        #[arg(short, long)]
        name: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Depth budget for nested transforms
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Check the syntax of one expression
    Check {
        /// The expression, with or without (: :) delimiters
        expression: String,
    },

    /// List helpers, or show the documentation of one
    Helpers {
        /// Helper name or alias
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => cli::load_config(path)?,
        None => EngineConfig::default(),
    };
    if cli.native_numbers {
        config.use_exact_decimal = false;
    }
    if cli.decimal_strings {
        config.decimals_as_strings = true;
    }
    if cli.no_cache {
        config.use_expression_cache = false;
    }
    let engine = Engine::with_config(config);

    match cli.command {
        Commands::Apply {
            transforms,
            input,
            name,
            pretty,
            max_depth,
        } => {
            let command = ApplyCommand {
                transforms: cli::read_source(&transforms)?,
                input: read_input(input)?,
                entry: name,
                pretty,
                max_depth,
            };
            println!("{}", cli::execute_apply(&engine, &command)?);
        }
        Commands::Check { expression } => match cli::execute_check(&engine, &expression)? {
            CheckResult::Valid => println!("Syntax is valid"),
            CheckResult::Invalid(message) => {
                eprintln!("{}", message);
                std::process::exit(1);
            }
        },
        Commands::Helpers { name } => match name {
            Some(name) => print!("{}", cli::helper_page(engine.helpers(), &name)?),
            None => print!("{}", cli::helper_listing(engine.helpers())),
        },
    }
    Ok(())
}

/// The `--input` value, a file it names, or piped stdin.
fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(source) => Ok(Some(cli::read_source(&source)?)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}
