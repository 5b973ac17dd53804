//! # pdf-page-extractor
//!
//! Extracts a configured subset of pages from a PDF, optionally prepends a
//! cover rendered from Markdown, and writes the result to a new PDF.
//!
//! ## Features
//!
//! - YAML page lists under `pages:` or `workouts:`, deduplicated in order
//! - Markdown covers rendered through an external command or headless Chromium
//! - Page copying with lopdf
//!
//! ## Usage
//!
//! ```bash
//! pdf-extractor extract --yaml resources/config.yaml
//! pdf-extractor workout --markdown ""
//! ```

mod assembler;
mod config;
mod cover;
mod error;
mod extractor;
mod renderer;
mod resolve;
mod selector;

pub use assembler::{load_pdf, AssembledDocument, AssemblyReport, DocumentAssembler};
pub use config::{Config, ListKey, PageEntry};
pub use cover::{html_document, markdown_to_html, CoverRenderer};
pub use error::{Error, RenderError, Result};
pub use extractor::{ExtractReport, Extractor, Job, Outcome, PathArgs, Profile};
pub use renderer::{ChromiumRenderer, CommandRenderer, HtmlToPdf, PdfOptions, Renderer};
pub use resolve::{discover, resolve_first, Origin, PathSource, Resolved};
pub use selector::{select_pages, Selection};
