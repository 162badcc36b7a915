use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "fidocad")]
#[command(about = "Export FidoCad drawings to vector, CAD and bitmap formats")]
#[command(version)]
#[command(long_about = "
Reads a FidoCad drawing, expands its macros against the loaded libraries
and writes it out in another format.

Examples:
  fidocad export board.fcd -o board.svg
  fidocad export board.fcd -o board.png --resolution 4
  fidocad export board.fcd -o board.pdf --split-layers --bw
  fidocad export board.fcd -o board.fcd --library mylib.fcl --no-ext
  fidocad formats
  fidocad config --example > fidocad.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads used for split-layer exports
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export a drawing to another format
    Export {
        /// FidoCad drawing to read
        input: PathBuf,

        /// Output file; its extension picks the format unless --format is given
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// Output format (fcd, fcda, svg, eps, pdf, scr, pcb, png, jpg)
        #[arg(short, long)]
        format: Option<String>,

        /// Pixels per logical unit
        #[arg(short, long)]
        resolution: Option<f64>,

        /// Bitmap width in pixels; the resolution is fitted to it
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Bitmap height in pixels
        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// Write one file per used layer
        #[arg(long)]
        split_layers: bool,

        /// Draw everything in black
        #[arg(long)]
        bw: bool,

        /// Disable bitmap anti-aliasing
        #[arg(long)]
        no_antialias: bool,

        /// Write plain FidoCad without FidoCadJ extensions
        #[arg(long)]
        no_ext: bool,

        /// Fail when the drawing has malformed lines
        #[arg(long)]
        strict: bool,

        /// Extra macro library file (repeatable)
        #[arg(short = 'l', long = "library")]
        libraries: Vec<PathBuf>,
    },

    /// List the supported export formats
    Formats,

    /// Print the effective configuration or an example file
    Config {
        /// Print an example configuration instead of the effective one
        #[arg(long)]
        example: bool,

        /// Write to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread count")?;
    }

    match cli.command {
        Commands::Export {
            input,
            output,
            format,
            resolution,
            width,
            height,
            split_layers,
            bw,
            no_antialias,
            no_ext,
            strict,
            libraries,
        } => {
            commands::export::execute(
                &config,
                input,
                output,
                format,
                resolution,
                width,
                height,
                split_layers,
                bw,
                no_antialias,
                no_ext,
                strict,
                libraries,
            )?;
        }

        Commands::Formats => commands::formats::execute(),

        Commands::Config { example, output } => {
            commands::config::execute(&config, example, output)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            print_error_and_exit(cli_err);
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
