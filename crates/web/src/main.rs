//! Web server for the feasibility study form.

use anyhow::{Context, Result};
use clap::Parser;
use estudo_convert::SofficeConverter;
use estudo_core::Settings;
use estudo_web::{router, AppState};
use std::path::PathBuf;

/// Serve the client/cargo selection form.
#[derive(Parser, Debug)]
#[command(name = "estudo-web")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8501")]
    bind: String,

    /// Client/cargo lookup table (CSV)
    #[arg(long, default_value = estudo_core::config::DEFAULT_TABLE_PATH)]
    table: PathBuf,

    /// Presentation template (.pptx)
    #[arg(long, default_value = estudo_core::config::DEFAULT_TEMPLATE_PATH)]
    template: PathBuf,

    /// Conversion executable
    #[arg(long, default_value = estudo_core::config::DEFAULT_CONVERTER)]
    soffice: String,

    /// Argument placed before the conversion arguments (repeatable)
    #[arg(long = "launcher-arg", allow_hyphen_values = true)]
    launcher_args: Vec<String>,

    /// Directory for temporary files (default: system temp dir)
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::new()
        .with_table_path(args.table)
        .with_template_path(args.template)
        .with_converter(args.soffice)
        .with_launcher_args(args.launcher_args)
        .with_scratch_root(args.scratch_dir);

    let state = AppState::from_settings(&settings);

    // Load once up front so problems show in the log before the first request
    match state.tables.get() {
        Ok(table) => log::info!("{} clients available", table.distinct_entities().len()),
        Err(e) => log::error!("{}", e),
    }
    if !settings.template_path.is_file() {
        log::warn!("Template not found: {}", settings.template_path.display());
    }
    if SofficeConverter::from_settings(&settings).resolve().is_none() {
        log::warn!(
            "Conversion tool '{}' not found on PATH; generation will fail until it is installed",
            settings.converter
        );
    }

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    log::info!("Listening on http://{}", args.bind);

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}
