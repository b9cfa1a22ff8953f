use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::parsing::annotations;

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON file with annotations (one object or a list)
    pub json: PathBuf,
}

/// Execute validate subcommand
///
/// # Errors
///
/// Returns an error when the file cannot be read or any record is malformed.
pub fn run(args: ValidateArgs, verbose: bool) -> anyhow::Result<()> {
    let annotations = annotations::parse_file(&args.json)
        .with_context(|| format!("reading annotations from {}", args.json.display()))?;

    if verbose {
        for annotation in &annotations {
            println!(
                "{}\t{}\t{} included\t{} excluded\t{} error checks\t{} warning checks",
                annotation.id,
                annotation.target.kind,
                annotation.target.included_ids.len(),
                annotation.target.excluded_ids.len(),
                annotation.target.error_checks.len(),
                annotation.target.warning_checks.len(),
            );
        }
    }
    println!("{} annotation(s) OK", annotations.len());
    Ok(())
}
