use std::path::Path;

use {
    anyhow::{Context, Result},
    configr_config::{Error, Loader, RawMap, Record},
    tracing::debug,
};

use crate::schema_file::SchemaSet;

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print the registered extensions, default first.
pub fn formats(loader: &Loader) {
    let registry = loader.formats();
    let default = registry.default_extension();
    for ext in registry.extensions() {
        let name = registry.get(ext).map(|l| l.name()).unwrap_or_default();
        let marker = if Some(ext) == default {
            " (default)"
        } else {
            ""
        };
        println!("{ext:<8} {name}{marker}");
    }
}

/// Parse `file` with the loader for its extension and print it as JSON.
pub fn show(loader: &Loader, file: &Path) -> Result<()> {
    let raw = read_path(loader, file)?;
    println!("{}", serde_json::to_string_pretty(&raw)?);
    Ok(())
}

/// Load `file` (or the target record's own file) against the records in
/// `schema_file` and report the outcome.
///
/// Exits with status 1 when the document does not load.
pub fn check(
    loader: &Loader,
    schema_file: &Path,
    record: Option<&str>,
    file: Option<&Path>,
) -> Result<()> {
    let schemas = SchemaSet::from_raw(read_path(loader, schema_file)?)
        .with_context(|| format!("loading schema from {}", schema_file.display()))?;
    let schema = schemas.target(record)?;

    let outcome = match file {
        Some(file) => {
            eprintln!("Checking {} as {}\n", file.display(), schema.name());
            read_path(loader, file)
                .and_then(|raw| loader.load_schema(schema, Some(raw)).map_err(Into::into))
        },
        None => {
            let shown = loader
                .file_name_for(schema)
                .unwrap_or_else(|_| "<none>".to_string());
            eprintln!(
                "Checking {} as {}\n",
                loader.base_dir().join(shown).display(),
                schema.name()
            );
            loader.load_schema(schema, None).map_err(anyhow::Error::from)
        },
    };

    match outcome {
        Ok(record) => {
            report_success(&record)?;
            Ok(())
        },
        Err(err) => {
            let errors = report_failure(&err);
            eprintln!("\n{errors} error(s)");
            std::process::exit(1);
        },
    }
}

fn report_success(record: &Record) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&record.to_value())?);
    eprintln!("\n{BOLD}{GREEN}ok{RESET} {} loaded, no issues found.", record.type_name());
    Ok(())
}

/// Print one line per problem and return how many were printed.
fn report_failure(err: &anyhow::Error) -> usize {
    match err.downcast_ref::<Error>() {
        Some(Error::Validation(report)) => {
            for violation in report.violations() {
                eprintln!("  {BOLD}{RED}error{RESET} {violation}");
            }
            report.violations().len()
        },
        _ => {
            eprintln!("  {BOLD}{RED}error{RESET} {err:#}");
            1
        },
    }
}

/// Read a document at an arbitrary path with the loader's registry.
fn read_path(loader: &Loader, path: &Path) -> Result<RawMap> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", path.display()))?;

    let mut scoped = loader.clone();
    scoped.set_base_dir(dir.unwrap_or_else(|| Path::new(".")));
    debug!(path = %path.display(), "reading document");
    Ok(scoped.read_document(name)?)
}
