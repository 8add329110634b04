//! PDFium-backed geometry provider.
//!
//! Reads each page's text segments, groups them into spans, lines and blocks,
//! exports embedded images, and renders a raster when a table extractor will
//! consume it.
//!
//! ## Grouping
//!
//! PDFium returns text as segments (runs sharing one font and baseline) in
//! content-stream order, which is close to reading order for most producers.
//! Segments are walked in that order:
//!
//! * a segment whose vertical band overlaps the current line by at least half
//!   the smaller height joins it, otherwise it starts a new line;
//! * a new line starts a new block when the vertical gap above it exceeds the
//!   previous line's height, or when it jumps back up the page (next column).
//!
//! ## Threading
//!
//! A [`PdfiumSource`] borrows its [`Pdfium`] bindings and is used from one
//! thread only; the concurrent driver opens it inside the blocking reader.

use crate::error::ExtractionError;
use crate::model::{Block, Line, PageGeometry, RawImage, Span};
use crate::pipeline::assemble::GeometrySource;
use crate::pipeline::images::encode_png;
use pdfium_render::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Minimum vertical overlap, as a fraction of the smaller height, for a
/// segment to join the current line.
const LINE_OVERLAP_RATIO: f32 = 0.5;

/// Horizontal gap, as a fraction of the line height, that counts as a space.
const SPACE_GAP_RATIO: f32 = 0.15;

/// Bind to a pdfium library: `PDFIUM_LIB_PATH`, then the working directory,
/// then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    let bind_cwd = || Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"));

    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from) {
        Some(p) => {
            let lib = if p.is_file() {
                p.clone()
            } else {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            };
            Pdfium::bind_to_library(&lib).or_else(|e| {
                warn!("{} = {} unusable ({:?}); trying defaults", PDFIUM_LIB_PATH_ENV, p.display(), e);
                bind_cwd()
            })
        }
        None => bind_cwd(),
    }
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// An open PDF document serving page geometry.
pub struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
    path: PathBuf,
    render_config: Option<PdfRenderConfig>,
    extract_images: bool,
}

impl<'a> PdfiumSource<'a> {
    /// Open `path`, mapping password failures to their own errors.
    pub fn open(pdfium: &'a Pdfium, path: &Path, password: Option<&'a str>) -> Result<Self, ExtractionError> {
        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| map_load_error(path, password, e))?;

        info!("PDF loaded: {} pages", document.pages().len());

        Ok(Self {
            document,
            path: path.to_path_buf(),
            render_config: None,
            extract_images: true,
        })
    }

    /// Render every page, longest edge capped at `max_pixels`.
    pub fn with_rasters(mut self, max_pixels: u32) -> Self {
        self.render_config = Some(
            PdfRenderConfig::new()
                .set_target_width(max_pixels as i32)
                .set_maximum_height(max_pixels as i32),
        );
        self
    }

    pub fn with_images(mut self, v: bool) -> Self {
        self.extract_images = v;
        self
    }

    fn page_text(page: &PdfPage, page_num: usize) -> Result<Vec<TextFragment>, ExtractionError> {
        let text = page.text().map_err(|e| ExtractionError::GeometryFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;
        let page_height = page.height().value;

        let fragments = text
            .segments()
            .iter()
            .filter_map(|segment| {
                let content = segment.text();
                if content.trim().is_empty() {
                    return None;
                }
                let bounds = segment.bounds();
                // PDF origin is bottom-left; fragments use top-left.
                Some(TextFragment {
                    text: content,
                    left: bounds.left().value,
                    right: bounds.right().value,
                    top: page_height - bounds.top().value,
                    bottom: page_height - bounds.bottom().value,
                })
            })
            .collect();

        Ok(fragments)
    }

    fn page_images(page: &PdfPage, page_num: usize) -> Vec<RawImage> {
        let mut images = Vec::new();

        for object in page.objects().iter() {
            let Some(image) = object.as_image_object() else {
                continue;
            };
            let id = format!("p{}-img{}", page_num, images.len());
            // An undecodable image is handed on empty so it surfaces as a
            // page warning.
            let data = match image.get_raw_image() {
                Ok(img) => encode_png(&img).unwrap_or_else(|e| {
                    warn!("Page {}: cannot re-encode '{}': {}", page_num, id, e);
                    Vec::new()
                }),
                Err(e) => {
                    warn!("Page {}: cannot decode '{}': {:?}", page_num, id, e);
                    Vec::new()
                }
            };
            images.push(RawImage {
                id,
                data,
                extension: "png".into(),
            });
        }

        images
    }
}

impl Drop for PdfiumSource<'_> {
    fn drop(&mut self) {
        debug!("Closing {}", self.path.display());
    }
}

impl GeometrySource for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn read_page(&mut self, index: usize) -> Result<PageGeometry, ExtractionError> {
        let page_num = index + 1;
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| ExtractionError::GeometryFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let fragments = Self::page_text(&page, page_num)?;
        let blocks = group_fragments(&fragments);
        debug!(
            "Page {}: {} segments → {} blocks",
            page_num,
            fragments.len(),
            blocks.len()
        );

        let mut geometry = PageGeometry::new(page_num, blocks);

        if self.extract_images {
            geometry = geometry.with_images(Self::page_images(&page, page_num));
        }

        if let Some(ref cfg) = self.render_config {
            let raster = page
                .render_with_config(cfg)
                .map_err(|e| ExtractionError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?
                .as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                raster.width(),
                raster.height()
            );
            geometry = geometry.with_raster(raster);
        }

        Ok(geometry)
    }

    fn metadata(&self) -> Result<BTreeMap<String, String>, ExtractionError> {
        let metadata = self.document.metadata();
        let mut map = BTreeMap::new();

        let tags = [
            ("title", PdfDocumentMetadataTagType::Title),
            ("author", PdfDocumentMetadataTagType::Author),
            ("subject", PdfDocumentMetadataTagType::Subject),
            ("keywords", PdfDocumentMetadataTagType::Keywords),
            ("creator", PdfDocumentMetadataTagType::Creator),
            ("producer", PdfDocumentMetadataTagType::Producer),
            ("creation_date", PdfDocumentMetadataTagType::CreationDate),
            ("modification_date", PdfDocumentMetadataTagType::ModificationDate),
        ];
        for (key, tag) in tags {
            if let Some(value) = metadata.get(tag) {
                let value = value.value().trim();
                if !value.is_empty() {
                    map.insert(key.to_string(), value.to_string());
                }
            }
        }
        map.insert(
            "pdf_version".to_string(),
            format!("{:?}", self.document.version()),
        );

        Ok(map)
    }
}

fn map_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> ExtractionError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ExtractionError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ExtractionError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        ExtractionError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

// ── Segment grouping ─────────────────────────────────────────────────────

/// A positioned run of text, top-left origin (y grows downward).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextFragment {
    fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }
}

/// A line under construction, with its running bounding box.
struct LineBox {
    spans: Vec<Span>,
    top: f32,
    bottom: f32,
    right: f32,
}

impl LineBox {
    fn start(f: &TextFragment) -> Self {
        Self {
            spans: vec![Span::new(f.text.trim_start())],
            top: f.top,
            bottom: f.bottom,
            right: f.right,
        }
    }

    fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    fn overlaps(&self, f: &TextFragment) -> bool {
        let overlap = self.bottom.min(f.bottom) - self.top.max(f.top);
        let smaller = self.height().min(f.height());
        if smaller <= 0.0 {
            return overlap >= 0.0;
        }
        overlap >= smaller * LINE_OVERLAP_RATIO
    }

    fn push(&mut self, f: &TextFragment) {
        let gap = f.left - self.right;
        let leading_ws = f.text.starts_with(char::is_whitespace);
        let spaced = leading_ws || gap > self.height() * SPACE_GAP_RATIO;
        let text = f.text.trim_start();
        self.spans.push(if spaced { Span::spaced(text) } else { Span::new(text) });
        self.top = self.top.min(f.top);
        self.bottom = self.bottom.max(f.bottom);
        self.right = self.right.max(f.right);
    }

    fn into_line(self) -> Line {
        Line::new(self.spans)
    }
}

/// Group fragments, in reading order, into blocks of lines of spans.
pub fn group_fragments(fragments: &[TextFragment]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut current_block: Vec<Line> = Vec::new();
    let mut current_line: Option<LineBox> = None;
    // (top, bottom, height) of the last finished line
    let mut prev: Option<(f32, f32, f32)> = None;

    for f in fragments {
        match current_line {
            Some(ref mut line) if line.overlaps(f) => line.push(f),
            _ => {
                if let Some(line) = current_line.take() {
                    prev = Some((line.top, line.bottom, line.height()));
                    current_block.push(line.into_line());
                }
                if let Some((prev_top, prev_bottom, prev_height)) = prev {
                    let gap = f.top - prev_bottom;
                    let jumped_up = f.top < prev_top;
                    if (gap > prev_height || jumped_up) && !current_block.is_empty() {
                        blocks.push(Block::new(std::mem::take(&mut current_block)));
                    }
                }
                current_line = Some(LineBox::start(f));
            }
        }
    }

    if let Some(line) = current_line {
        current_block.push(line.into_line());
    }
    if !current_block.is_empty() {
        blocks.push(Block::new(current_block));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout;

    fn frag(text: &str, left: f32, top: f32, right: f32, bottom: f32) -> TextFragment {
        TextFragment {
            text: text.into(),
            left,
            top,
            right,
            bottom,
        }
    }

    #[test]
    fn segments_on_one_baseline_form_a_line() {
        let frags = vec![
            frag("Hello", 10.0, 100.0, 40.0, 110.0),
            frag("world", 45.0, 100.5, 80.0, 110.5),
        ];
        let blocks = group_fragments(&frags);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines.len(), 1);
        assert_eq!(layout::reconstruct(&blocks), "Hello world");
    }

    #[test]
    fn touching_segments_are_not_spaced() {
        let frags = vec![
            frag("E=mc", 10.0, 100.0, 40.0, 110.0),
            frag("^2", 40.0, 98.0, 45.0, 106.0),
        ];
        assert_eq!(layout::reconstruct(&group_fragments(&frags)), "E=mc^2");
    }

    #[test]
    fn close_lines_share_a_block() {
        let frags = vec![
            frag("first line", 10.0, 100.0, 80.0, 110.0),
            frag("second line", 10.0, 112.0, 80.0, 122.0),
        ];
        let blocks = group_fragments(&frags);
        assert_eq!(blocks.len(), 1);
        assert_eq!(layout::reconstruct(&blocks), "first line\nsecond line");
    }

    #[test]
    fn wide_gap_starts_a_new_block() {
        let frags = vec![
            frag("para one", 10.0, 100.0, 80.0, 110.0),
            frag("para two", 10.0, 140.0, 80.0, 150.0),
        ];
        let blocks = group_fragments(&frags);
        assert_eq!(blocks.len(), 2);
        assert_eq!(layout::reconstruct(&blocks), "para one\n\npara two");
    }

    #[test]
    fn jump_back_up_starts_a_new_block() {
        let frags = vec![
            frag("left column", 10.0, 700.0, 200.0, 710.0),
            frag("right column", 300.0, 100.0, 500.0, 110.0),
        ];
        assert_eq!(group_fragments(&frags).len(), 2);
    }

    #[test]
    fn leading_whitespace_becomes_a_space_hint() {
        let frags = vec![
            frag("a", 10.0, 100.0, 15.0, 110.0),
            frag(" b", 15.0, 100.0, 25.0, 110.0),
        ];
        let blocks = group_fragments(&frags);
        assert!(blocks[0].lines[0].spans[1].space_before);
        assert_eq!(layout::reconstruct(&blocks), "a b");
    }

    #[test]
    fn no_fragments_no_blocks() {
        assert!(group_fragments(&[]).is_empty());
    }

    /// Needs `E2E_ENABLED` and a pdfium library, like `tests/e2e.rs`.
    fn sample_pdf() -> Option<PathBuf> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_cases")
            .join("attention_is_all_you_need.pdf");
        (std::env::var("E2E_ENABLED").is_ok() && path.exists()).then_some(path)
    }

    #[test]
    fn opens_sample_and_reads_first_page() {
        let Some(path) = sample_pdf() else {
            println!("SKIP: set E2E_ENABLED=1 and add test_cases/attention_is_all_you_need.pdf");
            return;
        };
        let pdfium = bind_pdfium().unwrap();
        let password = String::new();
        let mut source = PdfiumSource::open(&pdfium, &path, Some(password.as_str()))
            .unwrap()
            .with_rasters(400);

        assert_eq!(source.page_count(), 15);
        assert!(source.metadata().unwrap().contains_key("pdf_version"));

        let page = source.read_page(0).unwrap();
        assert_eq!(page.page_num, 1);
        assert!(!page.blocks.is_empty());
        let raster = page.raster.as_ref().unwrap();
        assert!(raster.width() <= 400 && raster.height() <= 400);
    }
}
