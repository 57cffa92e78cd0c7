//! arisconv
//!
//! Command-line front end for validating and converting ARIS recordings.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use arisfile::{
    BatchConverter, ConversionConfig, ConversionPipeline, DirectorySink, FileHeader, FileOutcome,
};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "arisconv")]
#[command(author, version, about = "ARIS sonar recording converter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a recording's file header and print a summary
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Convert one recording into a directory of YAML and raw rasters
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        #[command(flatten)]
        options: ConversionArgs,
    },

    /// Convert every recording in a directory
    Batch {
        #[arg(value_name = "INPUT_DIR")]
        input_dir: PathBuf,

        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Recordings converted concurrently (default: available cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        options: ConversionArgs,
    },
}

#[derive(Args)]
struct ConversionArgs {
    /// Keep every Nth frame
    #[arg(long, value_name = "N")]
    frame_interval: Option<u32>,

    /// Skip writing .raw raster files
    #[arg(long)]
    no_rasters: bool,

    /// YAML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl ConversionArgs {
    fn load(&self) -> Result<ConversionConfig> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::from_file(path)
                .with_context(|| format!("Loading config {}", path.display()))?,
            None => ConversionConfig::default(),
        };
        if let Some(interval) = self.frame_interval {
            config.frame_interval = interval;
        }
        if self.no_rasters {
            config.write_rasters = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next frame boundary");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Convert { input, output_dir, options } => {
            convert(input, output_dir, options.load()?, cancel).await
        }
        Commands::Batch { input_dir, output_dir, recursive, jobs, options } => {
            let mut config = options.load()?;
            config.recursive |= recursive;
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            batch(&input_dir, &output_dir, config, cancel).await
        }
    }
}

fn print_header(path: &Path, header: &FileHeader) {
    println!("{}", path.display());
    println!("  version:             {:#010x}", header.version);
    println!("  frame count:         {}", header.frame_count);
    println!("  raw beams:           {}", header.num_raw_beams);
    println!("  sample rate:         {}", header.sample_rate);
    println!("  samples per channel: {}", header.samples_per_channel);
    println!("  serial number:       {}", header.serial_number);
    println!("  date:                {}", header.date.as_string());
}

fn validate(file: &Path) -> Result<ExitCode> {
    match ConversionPipeline::inspect_file(file) {
        Ok(header) => {
            print_header(file, &header);
            println!("  status:              valid");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}: {}", file.display(), e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  - {}", suggestion);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn convert(
    input: PathBuf,
    output_dir: PathBuf,
    config: ConversionConfig,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    config.validate()?;
    let pipeline = ConversionPipeline::from_config(&config).with_cancellation(cancel);

    let result = tokio::task::spawn_blocking(move || {
        ConversionPipeline::inspect_file(&input)?;
        let mut sink = DirectorySink::create(&output_dir)?.with_rasters(config.write_rasters);
        pipeline.run_file(&input, &mut sink)
    })
    .await
    .context("Conversion task panicked")?;

    match result {
        Ok(summary) => {
            println!(
                "Decoded {} frames ({} skipped, {} written)",
                summary.frames_decoded, summary.frames_skipped, summary.frames_written
            );
            if summary.count_mismatch() {
                println!("Header declared {} frames", summary.declared_frame_count);
            }
            Ok(if summary.cancelled { ExitCode::from(130) } else { ExitCode::SUCCESS })
        }
        Err(e) => {
            eprintln!("Conversion failed: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  - {}", suggestion);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn batch(
    input_dir: &Path,
    output_dir: &Path,
    config: ConversionConfig,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let converter = BatchConverter::new(config)?.with_cancellation(cancel);
    let report = converter.convert_dir(input_dir, output_dir).await?;

    for file in &report.files {
        match &file.outcome {
            FileOutcome::Converted(summary) => println!(
                "ok      {} ({} frames, {} skipped)",
                file.input.display(),
                summary.frames_decoded,
                summary.frames_skipped
            ),
            FileOutcome::Failed(e) => println!("failed  {}: {}", file.input.display(), e),
            FileOutcome::NotStarted => println!("skipped {}", file.input.display()),
        }
    }

    let failed = report.failed().count();
    info!("{} of {} recordings failed", failed, report.files.len());
    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else if report.cancelled {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    })
}
