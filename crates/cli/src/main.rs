//! CLI tool for generating feasibility study PDFs.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use estudo_convert::StudyGenerator;
use estudo_core::{LookupTable, RenderedArtifact, Selection, Settings};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generate battery feasibility studies from the client/cargo table.
#[derive(Parser, Debug)]
#[command(name = "estudo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Client/cargo lookup table (CSV)
    #[arg(long, global = true, default_value = estudo_core::config::DEFAULT_TABLE_PATH)]
    table: PathBuf,

    /// Presentation template (.pptx)
    #[arg(long, global = true, default_value = estudo_core::config::DEFAULT_TEMPLATE_PATH)]
    template: PathBuf,

    /// Conversion executable
    #[arg(long, global = true, default_value = estudo_core::config::DEFAULT_CONVERTER)]
    soffice: String,

    /// Argument placed before the conversion arguments (repeatable)
    #[arg(long = "launcher-arg", global = true, allow_hyphen_values = true)]
    launcher_args: Vec<String>,

    /// Directory for temporary files (default: system temp dir)
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the clients in the lookup table
    Entities,

    /// List the cargos of a client
    Cargos {
        /// Client name, exactly as in the table
        entity: String,
    },

    /// Generate the study PDF for a client and cargo
    Generate {
        /// Client name, exactly as in the table
        #[arg(short, long)]
        entity: String,

        /// Cargo name, exactly as in the table
        #[arg(short, long)]
        cargo: String,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn settings(&self) -> Settings {
        Settings::new()
            .with_table_path(&self.table)
            .with_template_path(&self.template)
            .with_converter(&self.soffice)
            .with_launcher_args(self.launcher_args.clone())
            .with_scratch_root(self.scratch_dir.clone())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let settings = args.settings();
    log::debug!("Loading table from {}", settings.table_path.display());
    let table = LookupTable::load(&settings.table_path)
        .context("Could not load the client/cargo table; check that the CSV is present and well formed")?;
    log::debug!("Loaded {} records", table.len());

    match &args.command {
        Command::Entities => {
            for entity in table.distinct_entities() {
                println!("{}", entity);
            }
        }
        Command::Cargos { entity } => {
            print!("{}", format_cargos(&table, entity)?);
        }
        Command::Generate {
            entity,
            cargo,
            output,
        } => {
            let selection = validate_selection(&table, entity, cargo)?;
            let generator = StudyGenerator::from_settings(&settings);
            log::debug!("Generating {} / {}", entity, cargo);
            let artifact = generator
                .generate(&selection)
                .with_context(|| format!("Failed to generate the study for {} / {}", entity, cargo))?;
            let output_path = get_output_path(&artifact, output.as_ref())?;
            write_output(&output_path, &artifact.bytes)?;
            if args.verbose {
                eprintln!("Written to: {}", output_path.display());
            } else {
                println!("{}", output_path.display());
            }
        }
    }

    Ok(())
}

/// One line per cargo: name, tax id and code, tab separated.
fn format_cargos(table: &LookupTable, entity: &str) -> Result<String> {
    let cargos = table.cargos_for(entity);
    if cargos.is_empty() {
        bail!("Unknown client: {}", entity);
    }

    let mut out = String::new();
    for cargo in cargos {
        match table.find(entity, &cargo) {
            Some(record) => out.push_str(&format!(
                "{}\t{}\t{}\n",
                cargo, record.cargo_tax_id, record.cargo_code
            )),
            None => out.push_str(&format!("{}\n", cargo)),
        }
    }
    Ok(out)
}

/// Check that the pair exists in the table before generating anything.
fn validate_selection(table: &LookupTable, entity: &str, cargo: &str) -> Result<Selection> {
    let selection = Selection::new(entity, cargo);
    if !selection.is_complete() {
        bail!("Both --entity and --cargo must be non-empty");
    }
    if table.cargos_for(entity).is_empty() {
        bail!("Unknown client: {}", entity);
    }
    if table.find(entity, cargo).is_none() {
        bail!("Cargo '{}' is not listed for client '{}'", cargo, entity);
    }
    Ok(selection)
}

/// Determine where the generated study is written.
fn get_output_path(artifact: &RenderedArtifact, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(&artifact.filename)
        }
        None => PathBuf::from(&artifact.filename),
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estudo_core::LookupRecord;

    fn record(entity: &str, cargo: &str, tax_id: &str, code: &str) -> LookupRecord {
        LookupRecord {
            entity_name: entity.to_string(),
            cargo_name: cargo.to_string(),
            cargo_tax_id: tax_id.to_string(),
            cargo_code: code.to_string(),
        }
    }

    fn table() -> LookupTable {
        LookupTable::from_records(vec![
            record("Acme Ltd", "LFP 48V", "22.222.222/0001-22", "C-02"),
            record("Acme Ltd", "Lithium-Ion Pack", "33.333.333/0001-33", "C-03"),
        ])
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["estudo", "entities"]).unwrap();
        let settings = args.settings();
        assert_eq!(settings, Settings::new());
        assert!(matches!(args.command, Command::Entities));
    }

    #[test]
    fn test_args_generate_with_launcher() {
        let args = Args::try_parse_from([
            "estudo",
            "generate",
            "--entity",
            "Acme Ltd",
            "--cargo",
            "LFP 48V",
            "--soffice",
            "flatpak",
            "--launcher-arg",
            "run",
            "--launcher-arg",
            "org.libreoffice.LibreOffice",
        ])
        .unwrap();
        let settings = args.settings();
        assert_eq!(settings.converter, "flatpak");
        assert_eq!(settings.launcher_args, vec!["run", "org.libreoffice.LibreOffice"]);
        match args.command {
            Command::Generate { entity, cargo, output } => {
                assert_eq!(entity, "Acme Ltd");
                assert_eq!(cargo, "LFP 48V");
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_format_cargos() {
        let out = format_cargos(&table(), "Acme Ltd").unwrap();
        assert_eq!(
            out,
            "LFP 48V\t22.222.222/0001-22\tC-02\nLithium-Ion Pack\t33.333.333/0001-33\tC-03\n"
        );
        assert!(format_cargos(&table(), "Gamma").is_err());
    }

    #[test]
    fn test_validate_selection() {
        let table = table();
        assert!(validate_selection(&table, "Acme Ltd", "LFP 48V").is_ok());
        assert!(validate_selection(&table, "Acme Ltd", "").is_err());
        assert!(validate_selection(&table, "Gamma", "LFP 48V").is_err());
        let err = validate_selection(&table, "Acme Ltd", "Diesel").unwrap_err();
        assert!(err.to_string().contains("not listed"));
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = RenderedArtifact::for_selection(
            &Selection::new("Acme Ltd", "LFP 48V"),
            b"%PDF".to_vec(),
        );

        let nested = dir.path().join("out");
        let path = get_output_path(&artifact, Some(&nested)).unwrap();
        assert_eq!(path, nested.join("estudoAcme_Ltd_LFP_48V.pdf"));
        assert!(nested.is_dir());

        let path = get_output_path(&artifact, None).unwrap();
        assert_eq!(path, PathBuf::from("estudoAcme_Ltd_LFP_48V.pdf"));
    }
}
