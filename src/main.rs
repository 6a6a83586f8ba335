use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use simg_rechunk::simg;

/// Format seconds into a human-readable time string (e.g., "1h30m45s", "5m30s", or "45s")
fn format_time(secs: f64) -> String {
    let total_secs = secs as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{:.2}s", secs)
    }
}

#[derive(Parser)]
#[command(name = "simg-rechunk")]
#[command(about = "Coalesce Android sparse image chunks into aligned windows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a sparse image with chunks merged into aligned windows
    Rechunk {
        /// Source sparse image ("-" for stdin)
        input: PathBuf,
        /// Destination ("-" for stdout, default: <INPUT>.aligned, or stdout for stdin input)
        output: Option<PathBuf>,
        /// Merge window size in KiB (default: 1024, i.e. 1 MiB)
        #[arg(short = 'a', long = "alignment-kib", default_value_t = simg::DEFAULT_ALIGNMENT_KIB)]
        alignment_kib: u32,
        /// Enable debug output
        #[arg(long)]
        debug: bool,
    },
    /// Print the header and chunk table of a sparse image
    Inspect {
        /// Sparse image to read ("-" for stdin)
        input: PathBuf,
        /// Enable debug output
        #[arg(long)]
        debug: bool,
    },
}

/// Log to stderr so stdout stays usable for image data.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_layout(layout: &simg::ImageLayout) {
    let header = &layout.header;
    println!("Sparse image:");
    println!("  Version: {}.{}", header.major_version, header.minor_version);
    println!("  Block size: {} bytes", header.block_size);
    println!(
        "  Total blocks: {} ({} bytes)",
        header.total_blocks,
        header.image_size()
    );
    println!("  Total chunks: {}", header.total_chunks);
    println!("  Checksum: 0x{:08X}", header.image_checksum);
    println!();
    println!(
        "{:>8}  {:<10}  {:>12}  {:>10}  {:>14}",
        "chunk", "type", "start", "blocks", "bytes"
    );
    for chunk in &layout.chunks {
        println!(
            "{:>8}  {:<10}  {:>12}  {:>10}  {:>14}",
            chunk.index,
            chunk.chunk_type.name(),
            chunk.start_block,
            chunk.block_count,
            chunk.payload_bytes
        );
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rechunk {
            input,
            output,
            alignment_kib,
            debug,
        } => {
            init_tracing(debug);

            let output = output.unwrap_or_else(|| simg::default_output_path(&input));
            eprintln!("Rechunk command:");
            eprintln!("  Input: {}", input.display());
            eprintln!("  Output: {}", output.display());
            eprintln!("  Alignment: {} KiB", alignment_kib);
            eprintln!("  Debug: {}", debug);
            eprintln!();

            let options = simg::RechunkOptions::with_alignment_kib(alignment_kib);
            let result = tokio::task::spawn_blocking(move || {
                simg::rechunk_path(&input, &output, &options)
            })
            .await;

            match result {
                Ok(Ok(summary)) => {
                    info!(
                        "{} chunks -> {} chunks, {} blocks, {} bytes written in {}",
                        summary.input_chunks,
                        summary.output_chunks,
                        summary.input_blocks,
                        summary.bytes_written,
                        format_time(summary.elapsed_secs)
                    );
                    eprintln!("Result: RECHUNK_COMPLETED");
                    std::process::exit(0);
                }
                Ok(Err(e)) => {
                    eprintln!("Error: {}", e);
                    eprintln!("Result: RECHUNK_FAILED");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: rechunk task failed: {}", e);
                    eprintln!("Result: RECHUNK_FAILED");
                    std::process::exit(1);
                }
            }
        }
        Commands::Inspect { input, debug } => {
            init_tracing(debug);

            let result = tokio::task::spawn_blocking(move || simg::inspect_path(&input)).await;
            match result {
                Ok(Ok(layout)) => print_layout(&layout),
                Ok(Err(e)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: inspect task failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(3725.0), "1h2m5s");
        assert_eq!(format_time(330.0), "5m30s");
        assert_eq!(format_time(1.5), "1.50s");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["simg-rechunk", "rechunk", "system.simg"]);
        match cli.command {
            Commands::Rechunk {
                input,
                output,
                alignment_kib,
                debug,
            } => {
                assert_eq!(input, PathBuf::from("system.simg"));
                assert!(output.is_none());
                assert_eq!(alignment_kib, 1024);
                assert!(!debug);
            }
            _ => panic!("Expected rechunk subcommand"),
        }
    }

    #[test]
    fn test_cli_alignment_flag() {
        let cli = Cli::parse_from(["simg-rechunk", "rechunk", "-a", "4", "in.simg", "-"]);
        match cli.command {
            Commands::Rechunk {
                output,
                alignment_kib,
                ..
            } => {
                assert_eq!(output, Some(PathBuf::from("-")));
                assert_eq!(alignment_kib, 4);
            }
            _ => panic!("Expected rechunk subcommand"),
        }
    }
}
