//! Bounded-concurrency batch OCR.
//!
//! A fixed number of workers pull images from a shared queue and run each one
//! through an [`OcrService`]. Item failures are recorded in the item's outcome
//! and never abort the batch. Progress is published on a `watch` channel after
//! every outcome.

use std::collections::VecDeque;

use futures_util::future::join_all;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::models::config::BatchConfig;
use crate::models::payload::OcrPayload;
use crate::models::voucher::ProviderId;
use crate::vlm::{ImageRef, OcrService, VlmResult};

/// One image queued for OCR.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    /// Identity used to correlate outcomes.
    pub name: String,
    pub image: ImageRef,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, image: ImageRef) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }
}

/// Result of one image: exactly one of payload or error.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrStatus {
    Success {
        payload: OcrPayload,
        provider: ProviderId,
    },
    Failure {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutcome {
    pub image_name: String,
    pub image: ImageRef,
    pub status: OcrStatus,
}

impl OcrOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OcrStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OcrStatus::Failure { error } => Some(error),
            OcrStatus::Success { .. } => None,
        }
    }

    /// The input this outcome was produced from, for a retry.
    pub fn source(&self) -> SourceImage {
        SourceImage::new(self.image_name.clone(), self.image.clone())
    }
}

/// Running totals. `completed` counts successes only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchProgress {
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn is_done(&self) -> bool {
        self.processed() >= self.total
    }
}

/// All outcomes of a batch, in completion order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: Vec<OcrOutcome>,
}

impl From<Vec<OcrOutcome>> for BatchReport {
    fn from(outcomes: Vec<OcrOutcome>) -> Self {
        Self { outcomes }
    }
}

impl BatchReport {
    pub fn outcomes(&self) -> &[OcrOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<OcrOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Look up an outcome by image name.
    pub fn find(&self, image_name: &str) -> Option<&OcrOutcome> {
        self.outcomes.iter().find(|o| o.image_name == image_name)
    }

    /// Swap in a new outcome for the image with the same name.
    ///
    /// Returns `false` (and leaves the report unchanged) if no such image exists.
    pub fn replace(&mut self, outcome: OcrOutcome) -> bool {
        match self
            .outcomes
            .iter_mut()
            .find(|o| o.image_name == outcome.image_name)
        {
            Some(slot) => {
                *slot = outcome;
                true
            }
            None => false,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &OcrOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &OcrOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// "M succeeded, N failed".
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.success_count(),
            self.failure_count()
        )
    }
}

/// Worker-pool scheduler for batch OCR.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    concurrency: usize,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

impl BatchScheduler {
    /// A concurrency of zero is treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.concurrency)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// OCR every image, at most `concurrency` at a time.
    ///
    /// The report holds one outcome per input image.
    pub async fn run<S>(
        &self,
        ocr: &S,
        images: Vec<SourceImage>,
        progress: &watch::Sender<BatchProgress>,
    ) -> BatchReport
    where
        S: OcrService + ?Sized,
    {
        let total = images.len();
        progress.send_replace(BatchProgress {
            total,
            completed: 0,
            failed: 0,
        });

        if total == 0 {
            return BatchReport::default();
        }

        let workers = self.concurrency.min(total);
        info!("Starting batch OCR of {} images with {} workers", total, workers);

        let queue = Mutex::new(VecDeque::from(images));
        let results = Mutex::new(Vec::with_capacity(total));

        let worker = |worker_id: usize| {
            let queue = &queue;
            let results = &results;
            async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(source) = next else {
                        debug!("Worker {} idle, queue drained", worker_id);
                        break;
                    };

                    let outcome = process_one(ocr, source).await;
                    let success = outcome.is_success();
                    results.lock().await.push(outcome);

                    progress.send_modify(|p| {
                        if success {
                            p.completed += 1;
                        } else {
                            p.failed += 1;
                        }
                    });
                }
            }
        };

        join_all((0..workers).map(worker)).await;

        let report = BatchReport::from(results.into_inner());
        info!("Batch OCR finished: {}", report.summary());
        report
    }

    /// One fresh primary-then-fallback attempt for a single image.
    pub async fn retry<S>(ocr: &S, source: &SourceImage) -> OcrOutcome
    where
        S: OcrService + ?Sized,
    {
        info!("Retrying {}", source.name);
        process_one(ocr, source.clone()).await
    }
}

async fn process_one<S>(ocr: &S, source: SourceImage) -> OcrOutcome
where
    S: OcrService + ?Sized,
{
    let SourceImage { name, image } = source;

    let status = match ocr.ocr(&image).await {
        Ok(VlmResult { payload, provider }) => {
            debug!("{} read by {}", name, provider);
            OcrStatus::Success { payload, provider }
        }
        Err(e) => {
            warn!("OCR failed for {}: {}", name, e);
            OcrStatus::Failure {
                error: e.to_string(),
            }
        }
    };

    OcrOutcome {
        image_name: name,
        image,
        status,
    }
}
