//! yaldevtools entry point.
//! Parses the command line, sets up logging and dispatches to the
//! generator or the batch formatter.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{info, warn};
use serde_json::Value;
use yaldevtools::{
    cli::{get_args, Commands, FormatArgs, GenerateArgs},
    error::default_error_handler,
    generator::{load_context, parse_definition, SourceGenerator},
    logger::init_logger,
    processor::Processor,
    project::ProjectConfiguration,
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    let result = match args.command {
        Commands::Generate(args) => generate(args),
        Commands::Format(args) => format(args),
    };
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => default_error_handler(format!("{err:#}")),
    }
}

/// Runs the requested operations. Fails only when the inputs cannot be
/// loaded; failures of single output files are logged.
fn generate(args: GenerateArgs) -> Result<bool> {
    let project = match &args.project {
        Some(path) => ProjectConfiguration::from_file(path)
            .with_context(|| format!("Unable to load project: {}", path.display()))?,
        None => ProjectConfiguration::default(),
    };

    let mut mappings: IndexMap<String, Value> = match &args.context {
        Some(path) => load_context(path)
            .with_context(|| format!("Unable to load context: {}", path.display()))?,
        None => IndexMap::new(),
    };
    for definition in &args.definitions {
        let (key, value) = parse_definition(definition)?;
        mappings.insert(key, value);
    }

    let generator = SourceGenerator::from_file(&args.operations_file, &args.templates_path, project)
        .with_context(|| format!("Unable to read operations: {}", args.operations_file.display()))?
        .with_mappings(mappings)
        .with_formatting(args.format);

    let report = generator.generate(&args.mains, &args.output);
    for (main, reason) in &report.failed {
        warn!("No output for: {} ({})", main, reason);
    }
    info!(
        "Generated {} of {} files in {}.",
        report.generated.len(),
        args.mains.len(),
        args.output.display()
    );
    Ok(true)
}

/// Reformats sources. Returns `false` if a file could not be formatted or,
/// in check mode, if any file would change.
fn format(args: FormatArgs) -> Result<bool> {
    let processor = Processor::new(&args.patterns, args.check)?;
    let report = processor.process(&args.path)?;

    info!(
        "Checked {} files, {} changed, {} failed.",
        report.checked,
        report.changed.len(),
        report.failed.len()
    );
    Ok(report.failed.is_empty() && !(args.check && !report.changed.is_empty()))
}
