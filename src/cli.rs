//! Command-line interface implementation for yaldevtools.
//! Provides argument parsing and help text formatting using clap.

use crate::constants::DEFAULT_MAIN_OPERATION;
use clap::{error::ErrorKind, Args as ClapArgs, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for yaldevtools.
#[derive(Parser, Debug)]
#[command(author, version, about = "yaldevtools: source generator for libyal style libraries", long_about = None)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate files by running operations of an operations file
    Generate(GenerateArgs),
    /// Reformat C source files in place
    Format(FormatArgs),
}

#[derive(ClapArgs, Debug)]
pub struct GenerateArgs {
    /// Path to the operations file
    #[arg(value_name = "OPERATIONS_FILE")]
    pub operations_file: PathBuf,

    /// Directory where the generated files are written
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    pub output: PathBuf,

    /// Directory that contains the template files
    #[arg(long, value_name = "DIR")]
    pub templates_path: PathBuf,

    /// Operation to run; each one is written to a file of the same name.
    /// Can be repeated.
    #[arg(long = "main", value_name = "ID", default_value = DEFAULT_MAIN_OPERATION)]
    pub mains: Vec<String>,

    /// Project configuration file (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// Extra mapping values (JSON or YAML mapping)
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Extra mapping value, overrides values of the context file
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    pub definitions: Vec<String>,

    /// Reformat generated .c and .h files
    #[arg(long)]
    pub format: bool,
}

#[derive(ClapArgs, Debug)]
pub struct FormatArgs {
    /// Source file or directory to reformat
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// File name pattern to select; defaults to *.c and *.h. Can be repeated.
    #[arg(long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// Only report files that would change and exit with 1 if there are any
    #[arg(long)]
    pub check: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument | ErrorKind::MissingSubcommand
            ) {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
