//! ORMDB Mapping Tool
//!
//! Builds a mapping configuration from a type registry file, validates it,
//! and prints the resulting classes and relations.

mod formatter;

use clap::{Parser, ValueEnum};
use formatter::{Formatter, OutputFormat};
use ormdb_mapping::{
    MappingConfiguration, MappingOptions, NameBasedLoader, StaticTypeRegistry, TypeName,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// ORMDB Mapping Tool
#[derive(Parser, Debug)]
#[command(name = "ormdb-mapping")]
#[command(version, about = "Build and inspect ORMDB mapping configurations")]
pub struct Args {
    /// Type registry file (JSON)
    pub registry: PathBuf,

    /// Types to map; defaults to every registered type
    #[arg(short = 't', long = "type")]
    pub types: Vec<String>,

    /// Mapping options file (JSON)
    #[arg(short = 'o', long)]
    pub options: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Which part of the mapping to print
    #[arg(long, default_value = "all", value_enum)]
    pub show: Section,

    /// Only validate the mapping; print a summary instead of the tables
    #[arg(long)]
    pub check_only: bool,

    /// Skip the mixin drift check
    #[arg(long)]
    pub no_drift_check: bool,
}

/// Part of a mapping configuration to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    /// Classes and relations
    All,
    /// Classes only
    Classes,
    /// Relations only
    Relations,
}

fn main() {
    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ormdb_mapping=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    match run(&args, &*formatter) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

fn run(args: &Args, formatter: &dyn Formatter) -> Result<String, Box<dyn std::error::Error>> {
    let registry = StaticTypeRegistry::from_path(&args.registry)?;
    let mut options = match &args.options {
        Some(path) => MappingOptions::from_path(path)?,
        None => MappingOptions::default(),
    };
    if args.no_drift_check {
        options = options.without_mixin_drift_check();
    }

    let types: Vec<TypeName> = if args.types.is_empty() {
        registry.type_names()
    } else {
        args.types.iter().map(TypeName::new).collect()
    };
    debug!(registry = %args.registry.display(), types = types.len(), "loaded type registry");

    let configuration =
        MappingConfiguration::build(&registry, &types, &NameBasedLoader::new(), options)?;

    if args.check_only {
        return Ok(formatter.format_message(&format!(
            "mapping is valid: {} class(es), {} relation(s)",
            configuration.classes().len(),
            configuration.relations().len()
        )));
    }

    Ok(match args.show {
        Section::All => formatter.format_configuration(&configuration),
        Section::Classes => formatter.format_classes(configuration.classes()),
        Section::Relations => formatter.format_relations(configuration.relations()),
    })
}
