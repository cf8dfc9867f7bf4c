//! Batch command - turn many uploaded documents into vouchers.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{debug, warn};

use voucher_core::{
    BatchProgress, BatchReport, BatchScheduler, DocumentKind, OcrOutcome, OcrStatus, SourceImage,
    map_outcomes,
};

use super::output::{OutputFormat, format_vouchers};
use super::{build_ocr, load_config, load_document, print_failures};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory (one file per input document)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of images read concurrently (overrides config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Give each failed image one more primary/fallback attempt
    #[arg(long)]
    retry_failed: bool,
}

/// Images contributed by one input document, in extraction order.
struct Document {
    path: PathBuf,
    image_names: Vec<String>,
    /// Output file stem, unique within the batch.
    stem: String,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| DocumentKind::from_path(p).is_ok())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let ocr = build_ocr(&config)?;

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let mut documents = Vec::with_capacity(files.len());
    let mut images: Vec<SourceImage> = Vec::new();
    for path in files {
        match load_document(&path, &config, true) {
            Ok(sources) => {
                documents.push(Document {
                    path,
                    image_names: sources.iter().map(|s| s.name.clone()).collect(),
                    stem: String::new(),
                });
                images.extend(sources);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if images.is_empty() {
        anyhow::bail!("No images found in any input file");
    }

    let paths: Vec<&Path> = documents.iter().map(|d| d.path.as_path()).collect();
    let stems = unique_stems(&paths);
    for (document, stem) in documents.iter_mut().zip(stems) {
        document.stem = stem;
    }

    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images {msg}")?
            .progress_chars("=>-"),
    );

    let scheduler = BatchScheduler::new(args.jobs.unwrap_or(config.batch.concurrency));
    let (tx, mut rx) = watch::channel(BatchProgress::default());

    let report_pb = pb.clone();
    let watch_progress = async move {
        while rx.changed().await.is_ok() {
            let progress = *rx.borrow_and_update();
            report_pb.set_position(progress.processed() as u64);
            if progress.failed > 0 {
                report_pb.set_message(format!("({} failed)", progress.failed));
            }
            if progress.is_done() {
                break;
            }
        }
    };

    let (mut report, ()) = tokio::join!(scheduler.run(&ocr, images, &tx), watch_progress);
    pb.finish_with_message("Complete");

    if args.retry_failed && report.failure_count() > 0 {
        retry_failures(&ocr, &mut report).await;
    }

    if let Some(output_dir) = &args.output_dir {
        for document in &documents {
            write_document(document, &report, output_dir, args.format)?;
        }
    } else {
        let vouchers = map_outcomes(report.outcomes());
        println!("{}", format_vouchers(&vouchers, args.format)?);
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &documents, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} images from {} files in {:?}",
        style("✓").green(),
        report.len(),
        documents.len(),
        start.elapsed()
    );
    println!("   {}", report.summary());
    print_failures(report.failures());

    Ok(())
}

async fn retry_failures(ocr: &voucher_core::FailoverClient, report: &mut BatchReport) {
    let failed: Vec<SourceImage> = report.failures().map(OcrOutcome::source).collect();
    println!(
        "{} Retrying {} failed images",
        style("ℹ").blue(),
        failed.len()
    );

    let mut recovered = 0;
    for source in &failed {
        let outcome = BatchScheduler::retry(ocr, source).await;
        if outcome.is_success() {
            recovered += 1;
        }
        report.replace(outcome);
    }

    println!(
        "   {} of {} recovered",
        style(recovered).green(),
        failed.len()
    );
}

/// Outcomes of one document, in its own image order.
fn document_outcomes(document: &Document, report: &BatchReport) -> Vec<OcrOutcome> {
    document
        .image_names
        .iter()
        .filter_map(|name| report.find(name).cloned())
        .collect()
}

fn write_document(
    document: &Document,
    report: &BatchReport,
    output_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let vouchers = map_outcomes(&document_outcomes(document, report));
    if vouchers.is_empty() {
        debug!("No vouchers for {}", document.path.display());
        return Ok(());
    }

    let output_path = output_dir.join(format!("{}.{}", document.stem, format.extension()));

    fs::write(&output_path, format_vouchers(&vouchers, format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn write_summary(path: &Path, documents: &[Document], report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["file", "image", "status", "provider", "amount", "payTo", "error"])?;

    for document in documents {
        let file = document.path.display().to_string();

        for outcome in document_outcomes(document, report) {
            match &outcome.status {
                OcrStatus::Success { payload, provider } => wtr.write_record([
                    file.as_str(),
                    outcome.image_name.as_str(),
                    "success",
                    provider.as_str(),
                    payload.amount.as_str(),
                    payload.to_account.as_str(),
                    "",
                ])?,
                OcrStatus::Failure { error } => wtr.write_record([
                    file.as_str(),
                    outcome.image_name.as_str(),
                    "error",
                    "",
                    "",
                    "",
                    error.as_str(),
                ])?,
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// File stems for the output files, suffixed `_2`, `_3`, ... on repeats.
fn unique_stems(paths: &[&Path]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    paths
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("vouchers")
                .to_string();
            let count = seen.entry(stem.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                stem
            } else {
                format!("{}_{}", stem, count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::batch_image_name;
    use voucher_core::{ImageRef, OcrPayload, ProviderId};

    #[test]
    fn test_unique_stems() {
        let paths = [
            Path::new("in/a/receipt.pdf"),
            Path::new("in/b/receipt.pdf"),
            Path::new("in/b/receipt.docx"),
            Path::new("in/slip.png"),
        ];

        assert_eq!(
            unique_stems(&paths),
            vec!["receipt", "receipt_2", "receipt_3", "slip"]
        );
    }

    #[test]
    fn test_same_named_documents_keep_their_own_outcomes() {
        let a = Path::new("in/a/receipt.pdf");
        let b = Path::new("in/b/receipt.pdf");
        let outcome = |path: &Path, status: OcrStatus| OcrOutcome {
            image_name: batch_image_name(path, "pdf_img_01.jpeg"),
            image: ImageRef::parse("data:image/jpeg;base64,AA"),
            status,
        };

        let report = BatchReport::from(vec![
            outcome(
                a,
                OcrStatus::Failure {
                    error: "timed out".to_string(),
                },
            ),
            outcome(
                b,
                OcrStatus::Success {
                    payload: OcrPayload::default(),
                    provider: ProviderId::OpenAi,
                },
            ),
        ]);

        let document = |path: &Path| Document {
            path: path.to_path_buf(),
            image_names: vec![batch_image_name(path, "pdf_img_01.jpeg")],
            stem: String::new(),
        };

        assert!(!document_outcomes(&document(a), &report)[0].is_success());
        assert!(document_outcomes(&document(b), &report)[0].is_success());
    }
}
