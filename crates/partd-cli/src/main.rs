mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use partd_core::PageRange;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "partd",
    version,
    about = "Extract and classify material-property tables and charts from ASME PDFs"
)]
struct Cli {
    /// Log debug detail per page and region to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tables and charts from a PDF and classify them by schema
    Extract {
        /// Path to the PDF
        pdf: PathBuf,

        /// 1-based inclusive page range, e.g. "10-40" or "7"
        #[arg(short, long, value_name = "RANGE")]
        pages: Option<PageRange>,

        /// JSON config file (defaults apply to omitted fields)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Supplement embedded text with tesseract OCR in the given language
        #[arg(long, value_name = "LANG", num_args = 0..=1, default_missing_value = "eng")]
        ocr: Option<String>,

        /// Raster resolution for OCR
        #[arg(long, default_value_t = 300)]
        dpi: u32,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Write the full result JSON to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Query a previously written result JSON
    Query {
        /// Path to a result JSON written with `extract --out`
        result: PathBuf,

        /// Material or spec number to search for, e.g. "SA-516"
        #[arg(short, long)]
        material: Option<String>,

        /// Temperature in °F; interpolates between adjacent columns
        #[arg(short, long)]
        temperature: Option<Decimal>,

        /// Only tables with this schema label, e.g. "allowable_stress"
        #[arg(short, long)]
        label: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Print the default configuration, or validate a config file
    Config {
        /// Config file to validate and print with defaults filled in
        file: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            pdf,
            pages,
            config,
            ocr,
            dpi,
            workers,
            format,
            out,
        } => commands::extract::run(commands::extract::ExtractArgs {
            pdf,
            pages,
            config,
            ocr,
            dpi,
            workers,
            format,
            out,
        }),
        Commands::Query {
            result,
            material,
            temperature,
            label,
            format,
        } => commands::query::run(&result, material.as_deref(), temperature, label.as_deref(), format),
        Commands::Config { file } => commands::config::run(file.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
