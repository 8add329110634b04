//! Pipeline stages for PDF text extraction.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable and swappable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ geometry ──▶ layout ──▶ normalize ──▶ classify ──▶ latex
//! (path)    (pdfium)     (blocks)   (cleanup)     (math?)      (\( \))
//!              │
//!              ├──▶ tables  (raster → external detector)
//!              └──▶ images  (raw payload → data URI)
//!                              │
//!                         assemble (page records, page order)
//! ```
//!
//! 1. [`input`]    : reject anything that is not a readable PDF
//! 2. [`geometry`] : pdfium-backed [`assemble::GeometrySource`]; blocking,
//!    so it runs on a dedicated reader thread
//! 3. [`layout`]   : blocks/lines/spans → paragraph text
//! 4. [`normalize`]: ordered cleanup rules for extraction artefacts
//! 5. [`classify`] : decide per paragraph whether it is mathematical
//! 6. [`latex`]    : rewrite math paragraphs as LaTeX
//! 7. [`text`]     : stages 3–6 composed for one page
//! 8. [`tables`] / [`images`]: external collaborators; failures are warnings
//! 9. [`assemble`] : drive pages through the above, sequentially or on a
//!    bounded worker pool

pub mod assemble;
pub mod classify;
pub mod geometry;
pub mod images;
pub mod input;
pub mod latex;
pub mod layout;
pub mod normalize;
pub mod tables;
pub mod text;
