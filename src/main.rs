use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use foodscan::{
    check_digit, load_config, save_config, validate_manual_entry, ManualEntryError, Scanner,
    ScannerConfig,
};

const TIPS: [&str; 4] = [
    "Make sure the barcode is in focus",
    "Ensure good lighting",
    "Try different angles",
    "Clean the camera lens",
];

#[derive(Parser)]
#[command(name = "foodscan")]
#[command(about = "Read product barcodes from photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect a barcode in an image
    Scan {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Scanner configuration (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,

        /// Skip the OCR fallback (direct decoding only)
        #[arg(long)]
        skip_ocr: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a hand-typed barcode
    Check {
        #[arg(value_name = "CODE")]
        code: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration to a file
    InitConfig {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "foodscan=debug" } else { "foodscan=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    match args.command {
        Command::Scan {
            image_path,
            config,
            verbose,
            debug_out,
            skip_ocr,
            json,
        } => {
            init_logging(verbose);

            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => ScannerConfig::default(),
            };
            if skip_ocr {
                config.strategies.clear();
            }

            let mut scanner = Scanner::from_config(&config);
            if let Some(debug_dir) = debug_out {
                scanner = scanner.with_debug(debug_dir)?;
            }

            match scanner.scan_file(&image_path)? {
                Some(detection) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&detection)?);
                    } else {
                        println!(
                            "{} ({}, {} digits) via {}",
                            detection.barcode.code(),
                            detection.barcode.symbology(),
                            detection.barcode.len(),
                            detection.strategy
                        );
                    }
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    if json {
                        println!("{}", serde_json::json!({ "barcode": null, "tips": TIPS }));
                    } else {
                        println!("No valid barcode detected. Please ensure the barcode is clearly visible and well-lit.");
                        for tip in TIPS {
                            println!("  - {}", tip);
                        }
                        println!("You can also enter the code by hand: foodscan check <CODE>");
                    }
                    Ok(ExitCode::from(2))
                }
            }
        }

        Command::Check { code, json } => {
            init_logging(false);

            match validate_manual_entry(&code) {
                Ok(barcode) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&barcode)?);
                    } else {
                        println!("{} is a valid {} code", barcode.code(), barcode.symbology());
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    // Suggest the check digit the payload would need
                    let hint = match e {
                        ManualEntryError::Checksum => {
                            let code = code.trim();
                            code.get(..code.len() - 1)
                                .and_then(check_digit)
                                .map(|d| format!("{}{}", &code[..code.len() - 1], d))
                        }
                        _ => None,
                    };

                    if json {
                        println!(
                            "{}",
                            serde_json::json!({ "error": e.to_string(), "suggestion": hint })
                        );
                    } else {
                        println!("{}", e);
                        if let Some(hint) = hint {
                            println!("A code with a correct check digit would be {}", hint);
                        }
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::InitConfig { path } => {
            init_logging(false);
            save_config(&ScannerConfig::default(), &path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
