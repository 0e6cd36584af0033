//! Parallel OCR over document pages
//!
//! Each page runs preprocess → recognize → clean as an independent job on a
//! dedicated worker pool. Jobs finish in any order; results are written
//! into a slot per page and read back strictly in page order.

use image::DynamicImage;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use crate::cleaner::clean_text;
use crate::engine::Recognizer;
use crate::error::ExtractError;
use crate::preprocessing::preprocess;

/// Blank-line delimiter between page blocks in document text
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Page OCR pipeline sharing one recognizer across a bounded worker pool
pub struct PagePipeline {
    recognizer: Arc<dyn Recognizer>,
    pool: rayon::ThreadPool,
}

impl PagePipeline {
    /// Create a pipeline with one worker per available CPU
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Result<Self, ExtractError> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ocr-page-{}", i))
            .build()
            .map_err(|e| {
                ExtractError::Initialization(format!("Failed to start page workers: {}", e))
            })?;

        tracing::info!(
            "Page pipeline ready: {} workers, engine {}",
            workers,
            recognizer.name()
        );

        Ok(Self { recognizer, pool })
    }

    /// The shared recognizer
    pub fn recognizer(&self) -> &Arc<dyn Recognizer> {
        &self.recognizer
    }

    /// Number of page workers
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// OCR a single image on the calling thread and return its cleaned text.
    ///
    /// Fragments are joined line by line before cleaning, so a noisy line is
    /// dropped on its own even when a recognizer returns multi-line paragraphs.
    pub fn process_image(&self, image: &DynamicImage) -> Result<String, ExtractError> {
        let prepared = preprocess(image);
        let fragments = self.recognizer.recognize(&prepared.image)?;
        Ok(clean_text(&fragments.join("\n")))
    }

    /// OCR every page concurrently and return the cleaned text of each, in page order.
    ///
    /// Every page runs to completion. If any page failed, the error of the
    /// first failing page (by page number) is returned for the whole document.
    pub fn run(&self, pages: Vec<DynamicImage>) -> Result<Vec<String>, ExtractError> {
        let start = Instant::now();
        let total = pages.len();
        let mut slots: Vec<Option<Result<String, ExtractError>>> =
            (0..total).map(|_| None).collect();

        let (tx, rx) = mpsc::channel();
        self.pool.scope(|scope| {
            for (index, page) in pages.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let page_start = Instant::now();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| self.process_image(&page)))
                        .unwrap_or_else(|_| {
                            Err(ExtractError::Recognition {
                                page: index + 1,
                                reason: "recognizer panicked".to_string(),
                            })
                        });
                    tracing::debug!(
                        page = index + 1,
                        elapsed_ms = page_start.elapsed().as_millis() as u64,
                        ok = result.is_ok(),
                        "Page job finished"
                    );
                    // The receiver outlives the scope, so this cannot fail
                    let _ = tx.send((index, result));
                });
            }
        });
        drop(tx);

        for (index, result) in rx {
            slots[index] = Some(result);
        }

        let texts = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(e.on_page(index + 1)),
                None => Err(ExtractError::Recognition {
                    page: index + 1,
                    reason: "page job produced no result".to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            "OCR completed for {} pages in {}ms",
            total,
            start.elapsed().as_millis()
        );

        Ok(texts)
    }
}

/// Join per-page texts into document text, skipping pages with no text
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .filter(|page| !page.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
