//! Document assembly: page geometry in, [`Document`] out.
//!
//! The [`DocumentAssembler`] owns the text pipeline and the two extractors and
//! turns each [`PageGeometry`] into a [`PageRecord`]. Two drivers share that
//! per-page step:
//!
//! * [`DocumentAssembler::assemble`]: sequential, on the calling thread.
//! * [`DocumentAssembler::assemble_concurrent`]: one blocking reader thread
//!   streams owned pages through a bounded channel into a worker pool of
//!   `concurrency` blocking tasks; results are re-sorted by page number.
//!
//! In both the [`GeometrySource`] is owned by exactly one scope and dropped on
//! every exit path, so the underlying document handle is always released.
//! When the concurrent run is abandoned (fatal error, deadline) the channel
//! closes, the reader's next send fails, and it returns, dropping the source.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, PageWarning};
use crate::model::{Document, ExtractionOutput, ExtractionStats, PageGeometry, PageRecord};
use crate::pipeline::images::ImageExtractor;
use crate::pipeline::tables::TableExtractor;
use crate::pipeline::text::TextPipeline;
use crate::progress::ProgressCallback;
use futures::stream::{StreamExt, TryStreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Supplies page geometry for one open document.
///
/// Dropping the source must release the document. Implementations need not be
/// `Send`: the concurrent driver keeps the source on a single thread.
pub trait GeometrySource {
    fn page_count(&self) -> usize;

    /// Geometry of the page at 0-based `index`; `page_num` is `index + 1`.
    fn read_page(&mut self, index: usize) -> Result<PageGeometry, ExtractionError>;

    /// Document metadata; absent fields are omitted.
    fn metadata(&self) -> Result<BTreeMap<String, String>, ExtractionError>;
}

/// Pages held in memory, for callers running their own layout engine.
#[derive(Debug, Default)]
pub struct MemorySource {
    pages: VecDeque<PageGeometry>,
    total: usize,
    metadata: BTreeMap<String, String>,
}

impl MemorySource {
    /// Pages are renumbered 1..N in the given order.
    pub fn new(pages: Vec<PageGeometry>) -> Self {
        let total = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.page_num = i + 1;
                p
            })
            .collect();
        Self {
            pages,
            total,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

impl GeometrySource for MemorySource {
    fn page_count(&self) -> usize {
        self.total
    }

    fn read_page(&mut self, index: usize) -> Result<PageGeometry, ExtractionError> {
        match self.pages.pop_front() {
            Some(page) if page.page_num == index + 1 => Ok(page),
            _ => Err(ExtractionError::GeometryFailed {
                page: index + 1,
                detail: "pages must be read once, in order".into(),
            }),
        }
    }

    fn metadata(&self) -> Result<BTreeMap<String, String>, ExtractionError> {
        Ok(self.metadata.clone())
    }
}

/// One processed page plus what it contributed to the stats.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub record: PageRecord,
    pub warnings: Vec<PageWarning>,
    pub math_paragraphs: usize,
}

/// First message from the reader: page count and metadata, or why the
/// document could not be opened.
type Header = Result<(usize, BTreeMap<String, String>), ExtractionError>;

/// Producer end of the concurrent driver, handed to the blocking reader.
///
/// The reader opens its document, then calls [`PageFeed::drain`] with it (or
/// [`PageFeed::fail`] if opening failed).
pub struct PageFeed {
    header: oneshot::Sender<Header>,
    pages: mpsc::Sender<Result<PageGeometry, ExtractionError>>,
}

impl PageFeed {
    /// Report a failure to open the document.
    pub fn fail(self, err: ExtractionError) {
        let _ = self.header.send(Err(err));
    }

    /// Stream every page of `source` to the workers.
    ///
    /// Returns early when a page fails or the consumer has gone away; `source`
    /// is dropped before this returns.
    pub fn drain<S: GeometrySource>(self, mut source: S) {
        let metadata = match source.metadata() {
            Ok(m) => m,
            Err(e) => return self.fail(e),
        };
        let total = source.page_count();
        if self.header.send(Ok((total, metadata))).is_err() {
            return;
        }

        for index in 0..total {
            let page = source.read_page(index);
            let failed = page.is_err();
            if self.pages.blocking_send(page).is_err() {
                debug!("Page consumer gone; reader stopping before page {}", index + 1);
                return;
            }
            if failed {
                return;
            }
        }
        debug!("Reader finished {} pages", total);
    }
}

/// Turns page geometry into the final document.
#[derive(Clone)]
pub struct DocumentAssembler {
    text: TextPipeline,
    tables: Option<Arc<dyn TableExtractor>>,
    images: Arc<dyn ImageExtractor>,
    extract_images: bool,
    progress: Option<ProgressCallback>,
}

impl DocumentAssembler {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            text: TextPipeline::from_config(config),
            tables: config.table_extractor.clone(),
            images: Arc::clone(&config.image_extractor),
            extract_images: config.extract_images,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn text_pipeline(&self) -> &TextPipeline {
        &self.text
    }

    /// Produce the record for one page. Never fails: extractor errors become
    /// warnings and leave the page with empty tables or fewer images.
    pub fn process_page(&self, geometry: PageGeometry, total_pages: usize) -> PageOutcome {
        let page_num = geometry.page_num;
        if let Some(ref cb) = self.progress {
            cb.on_page_start(page_num, total_pages);
        }

        let text = self.text.render_page(&geometry.blocks);
        let mut warnings = Vec::new();

        let tables = match (&self.tables, &geometry.raster) {
            (Some(extractor), Some(raster)) => match extractor.extract_tables(page_num, raster) {
                Ok(tables) => tables,
                Err(e) => {
                    warn!(
                        "Page {}: table extraction ({}) failed: {}",
                        page_num,
                        extractor.name(),
                        e
                    );
                    warnings.push(PageWarning::TableExtraction {
                        page: page_num,
                        detail: e.to_string(),
                    });
                    Vec::new()
                }
            },
            (Some(_), None) => {
                debug!("Page {}: no raster, skipping tables", page_num);
                Vec::new()
            }
            (None, _) => Vec::new(),
        };

        let images = if self.extract_images {
            let (refs, image_warnings) = self.images.extract_images(page_num, &geometry.images);
            warnings.extend(image_warnings);
            refs
        } else {
            Vec::new()
        };

        if let Some(ref cb) = self.progress {
            for w in &warnings {
                cb.on_page_warning(w);
            }
            cb.on_page_complete(page_num, total_pages, text.content.len());
        }

        debug!(
            "Page {}: {} chars, {} tables, {} images, {} warnings",
            page_num,
            text.content.len(),
            tables.len(),
            images.len(),
            warnings.len()
        );

        PageOutcome {
            math_paragraphs: text.math.len(),
            record: PageRecord {
                page: page_num,
                content: text.content,
                tables,
                images,
            },
            warnings,
        }
    }

    /// Process every page of `source` in order on the calling thread.
    ///
    /// The source is consumed and released before this returns, whether or
    /// not extraction succeeded.
    pub fn assemble<S: GeometrySource>(&self, mut source: S) -> Result<ExtractionOutput, ExtractionError> {
        let start = Instant::now();
        let metadata = source.metadata()?;
        let total = source.page_count();
        self.notify_start(total);

        let mut outcomes = Vec::with_capacity(total);
        for index in 0..total {
            let geometry = source.read_page(index)?;
            outcomes.push(self.process_page(geometry, total));
        }
        drop(source);

        self.finish(outcomes, total, metadata, start)
    }

    /// Process pages on a bounded worker pool.
    ///
    /// `reader` runs on a dedicated blocking thread: it opens the document and
    /// hands it to [`PageFeed::drain`]. Pages are processed by up to
    /// `concurrency` blocking tasks at once and re-sorted by page number.
    pub async fn assemble_concurrent<R>(
        self: Arc<Self>,
        reader: R,
        concurrency: usize,
    ) -> Result<ExtractionOutput, ExtractionError>
    where
        R: FnOnce(PageFeed) + Send + 'static,
    {
        let start = Instant::now();
        let concurrency = concurrency.max(1);
        let (header_tx, header_rx) = oneshot::channel();
        let (page_tx, page_rx) = mpsc::channel(concurrency);

        let reader_task = tokio::task::spawn_blocking(move || {
            reader(PageFeed {
                header: header_tx,
                pages: page_tx,
            })
        });

        let (total, metadata) = header_rx
            .await
            .map_err(|_| ExtractionError::Internal("Page reader exited before opening the document".into()))??;
        info!("Document opened: {} pages, {} workers", total, concurrency);
        self.notify_start(total);

        let outcomes: Vec<PageOutcome> = ReceiverStream::new(page_rx)
            .map(|page| {
                let assembler = Arc::clone(&self);
                async move {
                    let geometry = page?;
                    tokio::task::spawn_blocking(move || assembler.process_page(geometry, total))
                        .await
                        .map_err(|e| ExtractionError::Internal(format!("Page worker panicked: {}", e)))
                }
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        reader_task
            .await
            .map_err(|e| ExtractionError::Internal(format!("Page reader panicked: {}", e)))?;

        self.finish(outcomes, total, metadata, start)
    }

    fn notify_start(&self, total: usize) {
        if let Some(ref cb) = self.progress {
            cb.on_extraction_start(total);
        }
    }

    /// Order the outcomes, check every page is present, and build the output.
    fn finish(
        &self,
        mut outcomes: Vec<PageOutcome>,
        total: usize,
        metadata: BTreeMap<String, String>,
        start: Instant,
    ) -> Result<ExtractionOutput, ExtractionError> {
        outcomes.sort_by_key(|o| o.record.page);

        if outcomes.len() != total {
            return Err(ExtractionError::Internal(format!(
                "Expected {} pages, assembled {}",
                total,
                outcomes.len()
            )));
        }
        if let Some((i, o)) = outcomes
            .iter()
            .enumerate()
            .find(|(i, o)| o.record.page != i + 1)
        {
            return Err(ExtractionError::Internal(format!(
                "Page sequence broken at position {}: found page {}",
                i + 1,
                o.record.page
            )));
        }

        let mut stats = ExtractionStats {
            total_pages: total,
            ..Default::default()
        };
        let mut pages = Vec::with_capacity(total);
        let mut warnings = Vec::new();
        for o in outcomes {
            stats.math_paragraphs += o.math_paragraphs;
            stats.tables += o.record.tables.len();
            stats.images += o.record.images.len();
            warnings.extend(o.warnings);
            pages.push(o.record);
        }
        stats.warnings = warnings.len();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Extraction complete: {} pages, {} math paragraphs, {} warnings, {}ms",
            total, stats.math_paragraphs, stats.warnings, stats.total_duration_ms
        );

        if let Some(ref cb) = self.progress {
            cb.on_extraction_complete(total, warnings.len());
        }

        Ok(ExtractionOutput {
            document: Document::new(pages, metadata),
            warnings,
            stats,
        })
    }
}
