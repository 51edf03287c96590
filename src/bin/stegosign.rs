use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stegosign::{ProcessOptions, ProcessResult, SignatureEngine};

#[derive(Parser)]
#[command(
    name = "stegosign",
    about = "Embed, detect and extract a tiled handwriting signature in photos",
    version,
    after_help = "Example: stegosign embed photo.jpg signature.png signed.jpg 0.08\n\n\
                  NOTE: The mark rides on luminance and survives resizing and mild color\n\
                  changes. It is not a cryptographic watermark."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Embed the signature into a carrier image
    Embed {
        /// Carrier image
        input: PathBuf,
        /// Signature stroke image (dark strokes on white or transparent)
        watermark: PathBuf,
        /// Output image (format follows the extension, unknown -> PNG)
        output: PathBuf,
        /// Embedding strength (recommended 0.04-0.12)
        #[arg(allow_negative_numbers = true)]
        strength: f32,
        /// JPEG quality for lossy outputs
        #[arg(long, default_value = "95")]
        jpeg_quality: u8,
    },
    /// Print the detection score of a suspect image or every image in a directory
    Detect {
        /// Suspect image file or directory
        suspect: PathBuf,
        /// Signature stroke image
        watermark: PathBuf,
        /// Score above which a signature counts as present
        #[arg(short, long, default_value = "0.02")]
        threshold: f64,
    },
    /// Render the signature pattern found in a suspect image (always PNG)
    Extract {
        /// Suspect image
        suspect: PathBuf,
        /// Signature stroke image
        watermark: PathBuf,
        /// Output visualization
        output: PathBuf,
    },
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stegosign={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_engine(watermark: &Path) -> SignatureEngine {
    match SignatureEngine::open(watermark) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match &cli.command {
        Command::Embed {
            input,
            watermark,
            output,
            strength,
            jpeg_quality,
        } => {
            let opts = ProcessOptions {
                strength: *strength,
                jpeg_quality: *jpeg_quality,
                ..ProcessOptions::default()
            };
            let engine = open_engine(watermark);
            if let Err(e) = engine.embed_file(input, output, &opts) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            if !cli.quiet {
                println!("Embedded -> {}", output.display());
            }
        }
        Command::Detect {
            suspect,
            watermark,
            threshold,
        } => {
            let opts = ProcessOptions {
                threshold: *threshold,
                ..ProcessOptions::default()
            };
            let engine = open_engine(watermark);
            if suspect.is_dir() {
                let results = engine.detect_directory(suspect, &opts);
                let failed = results.iter().filter(|r| !r.success).count();
                for r in &results {
                    print_result(r, cli.verbose);
                }
                if failed > 0 {
                    process::exit(1);
                }
            } else {
                match engine.detect_file(suspect) {
                    Ok(result) => {
                        println!("Detection score: {:.5}", result.score);
                        if cli.verbose {
                            eprintln!(
                                "  -> best scale {} (scores {:.5} / {:.5} / {:.5}), {}",
                                result.best_scale,
                                result.scale_scores[0],
                                result.scale_scores[1],
                                result.scale_scores[2],
                                if result.is_detected(opts.threshold) {
                                    "detected"
                                } else {
                                    "not detected"
                                }
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: {e}");
                        process::exit(1);
                    }
                }
            }
        }
        Command::Extract {
            suspect,
            watermark,
            output,
        } => {
            let engine = open_engine(watermark);
            if let Err(e) = engine.extract_file(suspect, output) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            if !cli.quiet {
                println!("Extracted -> {}", output.display());
            }
        }
    }
}

fn print_result(result: &ProcessResult, verbose: bool) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if !result.success {
        eprintln!("[FAIL] {filename}: {}", result.message);
        return;
    }

    let tag = if result.detected { "FOUND" } else { "NONE" };
    println!("[{tag}] {filename}: {:.5}", result.score);
    if verbose {
        eprintln!("  -> {}", result.message);
    }
}
