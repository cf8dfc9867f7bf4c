//! Process command - turn one uploaded document into vouchers.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{debug, info};

use voucher_core::{BatchProgress, BatchScheduler, map_outcomes};

use super::output::{OutputFormat, format_vouchers};
use super::{build_ocr, load_config, load_document, print_failures};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (DOCX, PDF, JPEG or PNG)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Number of images read concurrently (overrides config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Report fields a printed voucher still needs
    #[arg(long)]
    validate: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let ocr = build_ocr(&config)?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Extracting images...");

    let images = load_document(&args.input, &config, false)?;
    if images.is_empty() {
        pb.finish_and_clear();
        anyhow::bail!("No images found in {}", args.input.display());
    }

    let scheduler = BatchScheduler::new(args.jobs.unwrap_or(config.batch.concurrency));
    let (tx, mut rx) = watch::channel(BatchProgress::default());

    let report_pb = pb.clone();
    let watch_progress = async move {
        while rx.changed().await.is_ok() {
            let progress = *rx.borrow_and_update();
            report_pb.set_message(format!(
                "Reading images {}/{}",
                progress.processed(),
                progress.total
            ));
            if progress.is_done() {
                break;
            }
        }
    };

    let (report, ()) = tokio::join!(scheduler.run(&ocr, images, &tx), watch_progress);
    pb.finish_and_clear();

    let vouchers = map_outcomes(report.outcomes());

    if args.validate {
        for voucher in &vouchers {
            let issues = voucher.validate();
            if !issues.is_empty() {
                eprintln!(
                    "{} {}:",
                    style("Validation issues in").yellow(),
                    voucher.source_file_name
                );
                for issue in &issues {
                    eprintln!("  - {}", issue);
                }
            }
        }
    }

    let output = format_vouchers(&vouchers, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    eprintln!("{} {}", style("ℹ").blue(), report.summary());
    print_failures(report.failures());

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
