//! Image attachments rendered as single-page A4 PDFs.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

/// A4 in PostScript points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {0} has no pixels")]
    Empty(PathBuf),
    #[error("failed to build PDF page: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// How an attachment takes part in the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Image,
    Unsupported,
}

impl AttachmentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("jpg") | Some("jpeg") | Some("png") => Self::Image,
            _ => Self::Unsupported,
        }
    }
}

/// Where an image is drawn on the page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `width` × `height` uniformly to fit the page, centred.
pub fn fit_to_page(width: f32, height: f32, page_width: f32, page_height: f32) -> Placement {
    let scale = (page_width / width).min(page_height / height);
    let drawn_width = width * scale;
    let drawn_height = height * scale;
    Placement {
        x: (page_width - drawn_width) / 2.0,
        y: (page_height - drawn_height) / 2.0,
        width: drawn_width,
        height: drawn_height,
    }
}

/// Render an image file onto one A4 page and save it to `output`.
pub fn image_to_pdf(input: &Path, output: &Path) -> Result<PathBuf, ImageError> {
    let rgb = image::open(input)
        .map_err(|source| ImageError::Decode {
            path: input.to_path_buf(),
            source,
        })?
        .to_rgb8();

    let (px_width, px_height) = rgb.dimensions();
    if px_width == 0 || px_height == 0 {
        return Err(ImageError::Empty(input.to_path_buf()));
    }

    let placement = fit_to_page(
        px_width as f32,
        px_height as f32,
        A4_WIDTH_PT,
        A4_HEIGHT_PT,
    );

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_width as i64,
            "Height" => px_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    let image_id = doc.add_object(image_stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH_PT.into(), A4_HEIGHT_PT.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    doc.save(output)?;

    log::info!(
        "Rendered image {} ({}x{} px) into {}",
        input.display(),
        px_width,
        px_height,
        output.display()
    );
    Ok(output.to_path_buf())
}

/// Turn a stored upload into something mergeable.
///
/// PDFs pass through unchanged, images are rendered into `out_dir` as
/// `<stem>_<ext>.pdf`, and any other type is dropped (`Ok(None)`). An empty or
/// missing image is dropped too, like an empty PDF in the merge.
pub fn prepare_attachment(path: &Path, out_dir: &Path) -> Result<Option<PathBuf>, ImageError> {
    match AttachmentKind::from_path(path) {
        AttachmentKind::Pdf => Ok(Some(path.to_path_buf())),
        AttachmentKind::Image => {
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            if size == 0 {
                log::info!(
                    "Dropping attachment {} from merge: empty or missing image",
                    path.display()
                );
                return Ok(None);
            }
            image_to_pdf(path, &out_dir.join(converted_name(path))).map(Some)
        }
        AttachmentKind::Unsupported => {
            log::info!(
                "Dropping attachment {} from merge: unsupported file type",
                path.display()
            );
            Ok(None)
        }
    }
}

/// Images sharing a stem (`foto.jpg`, `foto.PNG`) must not share a PDF.
fn converted_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "anexo".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    format!("{}_{}.pdf", stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_attachment_kind() {
        assert_eq!(AttachmentKind::from_path(Path::new("a.PDF")), AttachmentKind::Pdf);
        assert_eq!(AttachmentKind::from_path(Path::new("a.jpeg")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_path(Path::new("a.JPG")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_path(Path::new("a.png")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_path(Path::new("a.gif")), AttachmentKind::Unsupported);
        assert_eq!(AttachmentKind::from_path(Path::new("noext")), AttachmentKind::Unsupported);
    }

    #[test]
    fn test_fit_wide_image() {
        let p = fit_to_page(2000.0, 1000.0, A4_WIDTH_PT, A4_HEIGHT_PT);
        assert!(approx(p.width, A4_WIDTH_PT));
        assert!(approx(p.height, A4_WIDTH_PT / 2.0));
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, (A4_HEIGHT_PT - p.height) / 2.0));
    }

    #[test]
    fn test_fit_tall_image() {
        let p = fit_to_page(100.0, 1000.0, A4_WIDTH_PT, A4_HEIGHT_PT);
        assert!(approx(p.height, A4_HEIGHT_PT));
        assert!(approx(p.width, A4_HEIGHT_PT / 10.0));
        assert!(approx(p.y, 0.0));
        assert!(approx(p.x * 2.0 + p.width, A4_WIDTH_PT));
    }

    #[test]
    fn test_fit_preserves_aspect_ratio() {
        let p = fit_to_page(640.0, 480.0, A4_WIDTH_PT, A4_HEIGHT_PT);
        assert!(approx(p.width / p.height, 640.0 / 480.0));
        assert!(p.width <= A4_WIDTH_PT + 0.01 && p.height <= A4_HEIGHT_PT + 0.01);
    }

    #[test]
    fn test_converted_name_keeps_extension() {
        assert_eq!(converted_name(Path::new("/u/1_cnh_foto.PNG")), "1_cnh_foto_png.pdf");
        assert_eq!(converted_name(Path::new("/u/1_cnh_foto.jpg")), "1_cnh_foto_jpg.pdf");
    }

    #[test]
    fn test_empty_or_missing_image_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("cnh.jpg");
        fs::write(&empty, b"").unwrap();

        assert_eq!(prepare_attachment(&empty, dir.path()).unwrap(), None);
        assert_eq!(
            prepare_attachment(&dir.path().join("ghost.png"), dir.path()).unwrap(),
            None
        );
        assert!(!dir.path().join("cnh_jpg.pdf").exists());
    }

    #[test]
    fn test_corrupt_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("cnh.png");
        fs::write(&corrupt, b"not really a png").unwrap();

        let err = prepare_attachment(&corrupt, dir.path()).unwrap_err();
        assert!(matches!(err, ImageError::Decode { ref path, .. } if *path == corrupt));
    }

    #[test]
    fn test_unsupported_is_dropped() {
        let out = prepare_attachment(Path::new("/nowhere/doc.txt"), Path::new("/nowhere")).unwrap();
        assert!(out.is_none());
    }
}
