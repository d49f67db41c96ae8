//! Documents module - everything that turns a rental request into files.
//!
//! - `filler` - fills the `.docx` contract template
//! - `converter` - `.docx` to PDF through a headless office suite
//! - `image_pdf` - image attachments to single-page PDFs
//! - `merger` - concatenates the PDFs into the final contract

pub mod common;
pub mod context;
pub mod converter;
pub mod filler;
pub mod image_pdf;
pub mod merger;

pub use context::RenderContext;
pub use converter::{ConversionError, DocumentConverter, SofficeConverter};
pub use filler::{DocxFiller, FillError};
pub use image_pdf::{prepare_attachment, AttachmentKind, ImageError};
pub use merger::{merge_pdfs, MergeError, MergeReport, SkipReason};
