use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use waybill_stamper::cli;
use waybill_stamper::config::StampConfig;
use waybill_stamper::error::StampError;
use waybill_stamper::logging::{init_logging, LoggingConfig};

#[derive(Parser)]
#[command(name = "waybill")]
#[command(about = "Read a waybill PDF, find SKU codes and quantities, and write a stamped copy with summary pages")]
#[command(version = "1.0.0")]
struct Cli {
    /// Path to a TOML config file with extraction and layout settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract SKUs and write the stamped output PDF
    Stamp {
        /// Input waybill PDF
        pdf: PathBuf,

        /// Output path (defaults to <input>_SKUs_Qty_EndPage.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract SKUs only and dump them as JSON
    Extract {
        /// Input waybill PDF
        pdf: PathBuf,

        /// JSON output path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let mut logging = LoggingConfig::default();
    if args.verbose {
        logging.level = "debug".to_string();
    }
    init_logging(&logging)?;

    let config = match &args.config {
        Some(path) => StampConfig::load_from_file(path)?,
        None => StampConfig::load_from_env(),
    };

    let result = match args.command {
        Commands::Stamp { pdf, output } => cli::stamp_command(pdf, output, &config),
        Commands::Extract { pdf, output } => cli::extract_command(pdf, output, &config),
    };

    if let Err(err) = result {
        let message = err
            .downcast_ref::<StampError>()
            .map(StampError::user_message)
            .unwrap_or_else(|| err.to_string());
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
    Ok(())
}
