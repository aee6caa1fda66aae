//! lattice-fixtures - run the test resource's admission hooks on manifests

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use lattice_fixtures::admission::{CustomDefaulter, CustomValidator, Warnings};
use lattice_fixtures::crd::{add_to_scheme, TestResourceUnexportedFields};
use lattice_fixtures::equality::Equalities;
use lattice_fixtures::scheme::Scheme;
use lattice_fixtures::telemetry::{init_telemetry, TelemetryConfig};
use lattice_fixtures::yaml::from_manifest;

const KIND: &str = "TestResourceUnexportedFields";

/// Run defaulting, validation and semantic comparison on test resources
#[derive(Parser, Debug)]
#[command(name = "lattice-fixtures", version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply defaults to a manifest and print the encoded result
    Default {
        /// Manifest file (YAML or JSON)
        file: PathBuf,
    },

    /// Run a validation hook on a manifest
    Validate {
        /// Manifest file (YAML or JSON)
        file: PathBuf,

        /// Previous revision, required for updates
        #[arg(long)]
        old: Option<PathBuf>,

        /// Admission operation to validate
        #[arg(long, value_enum, default_value_t = OperationArg::Create)]
        operation: OperationArg,
    },

    /// Compare two manifests semantically and structurally
    Diff {
        /// First manifest
        a: PathBuf,
        /// Second manifest
        b: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OperationArg {
    Create,
    Update,
    Delete,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = TelemetryConfig::default();
    config.json |= cli.log_json;
    init_telemetry(config)?;

    let scheme = Scheme::new();
    let equalities = Equalities::new();
    add_to_scheme(&scheme, &equalities).context("failed to register test resources")?;

    match cli.command {
        Commands::Default { file } => run_default(&file),
        Commands::Validate {
            file,
            old,
            operation,
        } => run_validate(&file, old.as_deref(), operation),
        Commands::Diff { a, b } => run_diff(&a, &b, &equalities),
    }
}

fn load(path: &Path) -> anyhow::Result<TestResourceUnexportedFields> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    from_manifest(KIND, &input).with_context(|| format!("failed to decode {}", path.display()))
}

fn run_default(file: &Path) -> anyhow::Result<()> {
    let mut obj = load(file)?;
    TestResourceUnexportedFields::default().apply_defaults(&mut obj)?;
    let encoded = obj.encode()?;
    println!("{}", String::from_utf8(encoded)?);
    Ok(())
}

fn run_validate(file: &Path, old: Option<&Path>, operation: OperationArg) -> anyhow::Result<()> {
    let obj = load(file)?;
    let handler = TestResourceUnexportedFields::default();

    let warnings: Warnings = match operation {
        OperationArg::Create => handler.validate_create(&obj)?,
        OperationArg::Update => {
            let old = old.context("--old is required for update validation")?;
            handler.validate_update(&load(old)?, &obj)?
        }
        OperationArg::Delete => handler.validate_delete(&obj)?,
    };

    for warning in &warnings {
        println!("warning: {warning}");
    }
    tracing::info!(operation = ?operation, warnings = warnings.len(), "validation passed");
    Ok(())
}

fn run_diff(a: &Path, b: &Path, equalities: &Equalities) -> anyhow::Result<()> {
    let a = load(a)?;
    let b = load(b)?;
    println!("semantically equal: {}", a.semantic_eq(&b, equalities));
    println!("structurally equal: {}", a == b);
    Ok(())
}
